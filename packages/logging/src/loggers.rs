use zwave_core::submodule;

submodule!(background);
submodule!(base);
submodule!(capturing);
submodule!(driver);
submodule!(message);
submodule!(unit);
