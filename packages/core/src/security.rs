use crate::submodule;

submodule!(crypto);
submodule!(manager);
