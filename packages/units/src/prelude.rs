pub use crate::ccimpl::{CCImpl, CCImplOps, ImplCtx, ImplEvent};
pub use crate::config_store::ConfigStore;
pub use crate::controller::{ControllerInterface, EventTrigger, NodeCaps};
pub use crate::device_info::{DeviceCatalog, DeviceInfo, ManIds, MemCatalog};
pub use crate::engine::Engine;
pub use crate::error::{ConfigError, Error, PersistError, TransmitError};
pub use crate::fields::*;
pub use crate::options::EngineOptions;
pub use crate::unit::{ImplId, UnitHandler};
pub use crate::unit_info::{UnitInfo, UnitState, UnitStatus};
