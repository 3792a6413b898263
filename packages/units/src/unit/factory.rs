use super::{GenericUnit, LockUnit, SceneControllerUnit, UnitHandler, build_impls};
use crate::device_info::DeviceInfo;
use crate::error::ConfigError;

/// Creates the unit handler a device info asks for, with its capabilities configured.
/// The handler is not prepared yet.
pub fn create_handler(info: &DeviceInfo) -> Result<Box<dyn UnitHandler>, ConfigError> {
    let impls = build_impls(&info.classes)?;
    let mut handler: Box<dyn UnitHandler> = match info.handler.as_str() {
        GenericUnit::NAME => Box::new(GenericUnit::new(impls)),
        LockUnit::NAME => Box::new(LockUnit::new(impls)?),
        SceneControllerUnit::NAME => Box::new(SceneControllerUnit::new(impls)),
        other => return Err(ConfigError::UnknownHandler(other.to_string())),
    };
    handler.parse_extra_info(&info.extra)?;
    Ok(handler)
}
