use zwave_core::submodule;

submodule!(in_msg);
submodule!(out_msg);
submodule!(priority);
submodule!(reply_match);
