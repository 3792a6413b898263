use crate::ccimpl::ExtraInfo;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

/// The manufacturer, product type and product id a node reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
pub struct ManIds {
    pub manufacturer: u16,
    pub product_type: u16,
    pub product_id: u16,
}

impl ManIds {
    pub fn new(manufacturer: u16, product_type: u16, product_id: u16) -> Self {
        Self {
            manufacturer,
            product_type,
            product_id,
        }
    }

    /// The catalog key
    pub fn packed(&self) -> u64 {
        ((self.manufacturer as u64) << 32)
            | ((self.product_type as u64) << 16)
            | self.product_id as u64
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&ManufacturerSpecificCCReport> for ManIds {
    fn from(report: &ManufacturerSpecificCCReport) -> Self {
        Self::new(report.manufacturer_id, report.product_type, report.product_id)
    }
}

impl Display for ManIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04x}-{:04x}-{:04x}",
            self.manufacturer, self.product_type, self.product_id
        )
    }
}

/// A command class the device supports
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ClassInfo {
    /// Class name (`BinarySwitch`) or id (`0x25`)
    pub class: String,
    #[serde(default = "default_version")]
    pub version: u8,
    /// Must be sent encrypted
    #[serde(default)]
    pub secure: bool,
    /// 0 for the root device
    #[serde(default)]
    pub endpoint: u8,
    #[serde(default)]
    pub extra: ExtraInfo,
}

fn default_version() -> u8 {
    1
}

impl ClassInfo {
    pub fn command_class(&self) -> Result<CommandClasses, ConfigError> {
        self.class
            .parse()
            .map_err(|_| ConfigError::UnknownClass(self.class.clone()))
    }

    pub fn endpoint_index(&self) -> EndpointIndex {
        EndpointIndex::from(self.endpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssociationDirective {
    /// The controller is added to this group
    pub group: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParamDirective {
    pub number: u8,
    /// 1, 2 or 4 bytes. Derived from the value if missing.
    #[serde(default)]
    pub size: Option<u8>,
    pub value: i32,
}

impl ParamDirective {
    pub fn size(&self) -> u8 {
        self.size.unwrap_or_else(|| size_for_value(self.value))
    }
}

/// Settings the engine keeps asserting on the device
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct AutoConfig {
    #[serde(default)]
    pub associations: Vec<AssociationDirective>,
    #[serde(default)]
    pub params: Vec<ParamDirective>,
    /// Wake up interval in seconds, for battery devices
    #[serde(default)]
    pub wakeup_interval: Option<u32>,
}

impl AutoConfig {
    pub fn is_empty(&self) -> bool {
        self.associations.is_empty() && self.params.is_empty() && self.wakeup_interval.is_none()
    }

    /// The commands that assert this configuration. The controller is made the target of
    /// associations and wake up notifications.
    pub fn commands(&self, controller: NodeId) -> Vec<CC> {
        let mut ret: Vec<CC> = Vec::new();
        for assoc in &self.associations {
            ret.push(
                AssociationCCSet::builder()
                    .group_id(assoc.group)
                    .node_ids(vec![controller])
                    .build()
                    .into(),
            );
        }
        for param in &self.params {
            ret.push(
                ConfigurationCCSet::builder()
                    .parameter(param.number)
                    .size(param.size())
                    .value(param.value)
                    .build()
                    .into(),
            );
        }
        if let Some(interval) = self.wakeup_interval {
            ret.push(
                WakeUpCCIntervalSet::builder()
                    .wake_up_interval(interval.min(MAX_WAKEUP_INTERVAL))
                    .controller_node_id(controller)
                    .build()
                    .into(),
            );
        }
        ret
    }
}

/// Everything the engine needs to know about a device model
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    #[serde(default)]
    pub make: String,
    pub ids: ManIds,
    /// The unit handler kind, e.g. `Generic`
    #[serde(default = "default_handler")]
    pub handler: String,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub auto_config: AutoConfig,
    /// Unit level keys for the handler
    #[serde(default)]
    pub extra: ExtraInfo,
}

fn default_handler() -> String {
    "Generic".to_string()
}

impl DeviceInfo {
    pub fn parse_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Catalog(e.to_string()))
    }

    /// Checks that all classes are known
    pub fn validate(&self) -> Result<(), ConfigError> {
        for class in &self.classes {
            class.command_class()?;
        }
        Ok(())
    }

    pub fn supports(&self, class: CommandClasses) -> bool {
        self.classes
            .iter()
            .any(|c| c.command_class().is_ok_and(|cc| cc == class))
    }

    /// Ids of the classes that must be sent encrypted
    pub fn secure_classes(&self) -> Vec<u8> {
        self.classes
            .iter()
            .filter(|c| c.secure)
            .filter_map(|c| c.command_class().ok())
            .map(|cc| cc as u8)
            .collect()
    }
}

/// Looks up device info by manufacturer ids. Read-only for the engine.
pub trait DeviceCatalog: Send + Sync {
    fn find(&self, ids: &ManIds) -> Option<DeviceInfo>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A catalog held in memory, filled from TOML files or programmatically
#[derive(Debug, Default, Clone)]
pub struct MemCatalog {
    devices: BTreeMap<u64, DeviceInfo>,
}

impl MemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device, replacing an earlier one with the same ids
    pub fn insert(&mut self, info: DeviceInfo) {
        self.devices.insert(info.ids.packed(), info);
    }

    /// Adds the device described by a TOML document
    pub fn parse_str(&mut self, s: &str) -> Result<(), ConfigError> {
        let info = DeviceInfo::parse_str(s)?;
        self.insert(info);
        Ok(())
    }

    /// Loads all `.toml` files in a directory. Returns the number of devices loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, ConfigError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| ConfigError::Catalog(format!("{}: {}", dir.display(), e)))?;
        let mut count = 0;
        for entry in entries {
            let path = entry
                .map_err(|e| ConfigError::Catalog(format!("{}: {}", dir.display(), e)))?
                .path();
            if path.extension().is_none_or(|ext| ext != "toml") {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Catalog(format!("{}: {}", path.display(), e)))?;
            let info = DeviceInfo::parse_str(&content)
                .map_err(|e| ConfigError::Catalog(format!("{}: {}", path.display(), e)))?;
            self.insert(info);
            count += 1;
        }
        Ok(count)
    }
}

impl DeviceCatalog for MemCatalog {
    fn find(&self, ids: &ManIds) -> Option<DeviceInfo> {
        self.devices.get(&ids.packed()).cloned()
    }

    fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SWITCH: &str = r#"
        name = "Smart Plug"
        make = "Acme"

        [ids]
        manufacturer = 0x0086
        product_type = 0x0003
        product_id = 0x0060

        [[classes]]
        class = "BinarySwitch"

        [[classes]]
        class = "0x80"
        secure = true
        extra = { Name = "Charge" }

        [auto_config]
        wakeup_interval = 3600

        [[auto_config.associations]]
        group = 1

        [[auto_config.params]]
        number = 80
        value = 2

        [[auto_config.params]]
        number = 3
        size = 2
        value = 7
    "#;

    #[test]
    fn test_packed_ids() {
        let ids = ManIds::new(0x0086, 0x0003, 0x0060);
        assert_eq!(ids.packed(), 0x0086_0003_0060);
        assert_eq!(ids.to_string(), "0086-0003-0060");
        assert!(ManIds::default().is_unset());
    }

    #[test]
    fn test_parse_device() {
        let info = DeviceInfo::parse_str(SWITCH).unwrap();
        assert_eq!(info.handler, "Generic");
        assert_eq!(info.classes.len(), 2);
        assert_eq!(info.classes[0].version, 1);
        assert_eq!(
            info.classes[1].command_class(),
            Ok(CommandClasses::Battery)
        );
        assert_eq!(info.classes[1].extra.get("Name").map(|s| s.as_str()), Some("Charge"));
        assert_eq!(info.secure_classes(), vec![0x80]);
        assert!(info.supports(CommandClasses::BinarySwitch));
        assert_eq!(info.auto_config.params[0].size(), 1);
        assert_eq!(info.auto_config.params[1].size(), 2);
    }

    #[test]
    fn test_auto_config_commands() {
        let info = DeviceInfo::parse_str(SWITCH).unwrap();
        let commands = info.auto_config.commands(NodeId::new(1));
        assert_eq!(commands.len(), 4);
        assert_eq!(
            commands[0],
            CC::from(
                AssociationCCSet::builder()
                    .group_id(1)
                    .node_ids(vec![NodeId::new(1)])
                    .build()
            )
        );
        assert!(matches!(commands[3], CC::WakeUpCCIntervalSet(_)));
    }

    #[test]
    fn test_unknown_class() {
        let mut info = DeviceInfo::parse_str(SWITCH).unwrap();
        info.classes[0].class = "Teleporter".to_string();
        assert_eq!(
            info.validate(),
            Err(ConfigError::UnknownClass("Teleporter".to_string()))
        );
    }

    #[test]
    fn test_catalog() {
        let mut catalog = MemCatalog::new();
        catalog.parse_str(SWITCH).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.find(&ManIds::new(0x0086, 0x0003, 0x0060)).is_some());
        assert!(catalog.find(&ManIds::new(0x0086, 0x0003, 0x0061)).is_none());
        assert!(catalog.parse_str("name = 5").is_err());
    }

    #[test]
    fn test_load_shipped_devices() {
        let mut catalog = MemCatalog::new();
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("devices");
        let count = catalog.load_dir(&dir).unwrap();
        assert_eq!(count, catalog.len());
        assert!(count >= 3);
        for ids in [
            ManIds::new(0x0086, 0x0003, 0x0060),
            ManIds::new(0x0129, 0x0006, 0x0000),
            ManIds::new(0x0086, 0x0002, 0x0082),
            ManIds::new(0x0086, 0x0001, 0x0003),
        ] {
            let info = catalog.find(&ids).unwrap();
            info.validate().unwrap();
            let handler = crate::unit::create_handler(&info).unwrap();
            assert_eq!(handler.name(), info.handler);
        }
    }
}
