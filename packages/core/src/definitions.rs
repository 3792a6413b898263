use crate::submodule;

submodule!(command_classes);
submodule!(command_type);
submodule!(endpoint_index);
submodule!(function_type);
submodule!(node_id);
submodule!(transmit_options);
