use crate::controller::ControllerInterface;
use crate::device_info::ManIds;
use crate::error::{ConfigError, PersistError};
use crate::persist::{Persist, PersistResult, read_str, write_str};
use crate::unit_info::{UnitInfo, UnitRecord};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use zwave_core::parse::bytes::{be_u8, be_u16, be_u32};
use zwave_core::prelude::*;
use zwave_core::serialize::bytes::{be_u8 as put_u8, be_u16 as put_u16, be_u32 as put_u32};
use zwave_logging::ImmutableLogger;
use zwave_logging::loggers::{DriverLogger, UnitLogger};

/// All units of one Z-Wave network, plus what is known about its controller
pub struct ConfigStore {
    home_id: u32,
    controller_node_id: NodeId,
    controller_ids: ManIds,
    firmware: String,
    /// Bumped when store level data changes
    serial: u32,
    units: Vec<UnitInfo>,
    /// Lowercase names, sorted
    name_index: Vec<(String, NodeId)>,
    logger: Arc<dyn ImmutableLogger>,
    log: DriverLogger,
}

impl ConfigStore {
    pub fn new(logger: Arc<dyn ImmutableLogger>) -> Self {
        Self {
            home_id: 0,
            controller_node_id: NodeId::new(1),
            controller_ids: ManIds::default(),
            firmware: String::new(),
            serial: 0,
            units: Vec::new(),
            name_index: Vec::new(),
            log: DriverLogger::new(logger.clone()),
            logger,
        }
    }

    pub fn home_id(&self) -> u32 {
        self.home_id
    }

    pub fn controller_node_id(&self) -> NodeId {
        self.controller_node_id
    }

    pub fn controller_ids(&self) -> ManIds {
        self.controller_ids
    }

    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    /// Remembers the identity of the controller the store belongs to
    pub fn set_controller_info(
        &mut self,
        home_id: u32,
        node_id: NodeId,
        ids: ManIds,
        firmware: impl Into<String>,
    ) {
        let firmware = firmware.into();
        if self.home_id == home_id
            && self.controller_node_id == node_id
            && self.controller_ids == ids
            && self.firmware == firmware
        {
            return;
        }
        if self.home_id != 0 && self.home_id != home_id {
            self.log.warn(format!(
                "home id changed from {:08x} to {:08x}",
                self.home_id, home_id
            ));
        }
        self.home_id = home_id;
        self.controller_node_id = node_id;
        self.controller_ids = ids;
        self.firmware = firmware;
        self.serial = self.serial.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> impl Iterator<Item = &UnitInfo> {
        self.units.iter()
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut UnitInfo> {
        self.units.iter_mut()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.units.iter().map(|u| u.node_id()).collect()
    }

    pub fn find(&self, node_id: NodeId) -> Option<&UnitInfo> {
        self.units.iter().find(|u| u.node_id() == node_id)
    }

    pub fn find_mut(&mut self, node_id: NodeId) -> Option<&mut UnitInfo> {
        self.units.iter_mut().find(|u| u.node_id() == node_id)
    }

    fn name_position(&self, name: &str) -> Result<usize, usize> {
        let key = name.to_lowercase();
        self.name_index
            .binary_search_by(|(n, _)| n.as_str().cmp(key.as_str()))
    }

    /// Case-insensitive
    pub fn find_by_name(&self, name: &str) -> Option<&UnitInfo> {
        let index = self.name_position(name).ok()?;
        self.find(self.name_index[index].1)
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.name_position(name).is_ok()
    }

    fn check_name(name: &str) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "name".to_string(),
                value: name.to_string(),
            });
        }
        Ok(())
    }

    /// Adds a unit. Node ids and names (ignoring case) must be unique.
    pub fn add(&mut self, unit: UnitInfo) -> Result<(), ConfigError> {
        Self::check_name(unit.name())?;
        if self.find(unit.node_id()).is_some() {
            return Err(ConfigError::DuplicateNodeId(unit.node_id()));
        }
        let Err(pos) = self.name_position(unit.name()) else {
            return Err(ConfigError::DuplicateName(unit.name().to_string()));
        };
        self.name_index
            .insert(pos, (unit.name().to_lowercase(), unit.node_id()));
        self.units.push(unit);
        self.serial = self.serial.wrapping_add(1);
        Ok(())
    }

    /// Creates and adds a unit for a newly found node
    pub fn create_unit(&mut self, node_id: NodeId, name: &str) -> Result<&mut UnitInfo, ConfigError> {
        let unit = UnitInfo::new(node_id, name, self.unit_logger(node_id));
        self.add(unit)?;
        self.find_mut(node_id).ok_or(ConfigError::UnknownUnit(node_id))
    }

    fn unit_logger(&self, node_id: NodeId) -> UnitLogger {
        UnitLogger::new(self.logger.clone(), node_id)
    }

    pub fn rename(&mut self, node_id: NodeId, name: &str) -> Result<(), ConfigError> {
        Self::check_name(name)?;
        let old = self
            .find(node_id)
            .ok_or(ConfigError::UnknownUnit(node_id))?
            .name()
            .to_string();
        if old == name {
            return Ok(());
        }
        if let Ok(pos) = self.name_position(name) {
            // Changing only the case of its own name is fine
            if self.name_index[pos].1 != node_id {
                return Err(ConfigError::DuplicateName(name.to_string()));
            }
        }

        if let Ok(pos) = self.name_position(&old) {
            self.name_index.remove(pos);
        }
        let pos = self.name_position(name).unwrap_or_else(|pos| pos);
        self.name_index.insert(pos, (name.to_lowercase(), node_id));
        if let Some(unit) = self.find_mut(node_id) {
            unit.set_name(name);
        }
        self.log.info(format!("renamed {} to {}", old, name));
        Ok(())
    }

    pub fn remove(&mut self, node_id: NodeId) -> Option<UnitInfo> {
        let index = self.units.iter().position(|u| u.node_id() == node_id)?;
        let unit = self.units.remove(index);
        self.name_index.retain(|(_, id)| *id != node_id);
        self.serial = self.serial.wrapping_add(1);
        Some(unit)
    }

    /// A fingerprint of everything that is persisted. Changes whenever any serial is bumped.
    pub fn change_hash(&self) -> u64 {
        let fold = |h: u64, x: u64| h.wrapping_mul(31).wrapping_add(x);
        let mut h = fold(17, self.serial as u64);
        for unit in &self.units {
            h = fold(h, unit.node_id().raw() as u64);
            h = fold(h, unit.serial() as u64);
        }
        h
    }

    /// The default name of a new unit, `Unit_007`. A suffix is added if that is taken.
    pub fn default_name(&self, node_id: NodeId) -> String {
        let base = format!("Unit_{:03}", node_id.raw());
        let mut name = base.clone();
        let mut suffix = 2;
        while self.name_taken(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        name
    }

    /// Adds units for nodes the controller knows and the store doesn't. Returns the new ids.
    pub fn probe_new_units(&mut self, ctl: &dyn ControllerInterface) -> Vec<NodeId> {
        let own = ctl.own_node_id();
        let mut added = Vec::new();
        for node_id in ctl.node_list() {
            if node_id == own || self.find(node_id).is_some() {
                continue;
            }
            let name = self.default_name(node_id);
            match self.create_unit(node_id, &name) {
                Ok(_) => {
                    self.log.info(format!("found new node {}, named {}", node_id, name));
                    added.push(node_id);
                }
                Err(e) => self.log.error(format!("cannot add node {}: {}", node_id, e)),
            }
        }
        added
    }

    pub fn save(&self) -> Bytes {
        StoreRecord {
            home_id: self.home_id,
            controller_node_id: self.controller_node_id,
            controller_ids: self.controller_ids,
            firmware: self.firmware.clone(),
            units: self.units.iter().map(|u| u.to_record()).collect(),
        }
        .persist()
    }

    /// Replaces the content of the store with persisted data. Nothing changes if the data is invalid.
    pub fn load(&mut self, data: impl Into<Bytes>) -> Result<(), PersistError> {
        let record = StoreRecord::restore(data)?;
        let mut loaded = Self::new(self.logger.clone());
        loaded.home_id = record.home_id;
        loaded.controller_node_id = record.controller_node_id;
        loaded.controller_ids = record.controller_ids;
        loaded.firmware = record.firmware;
        for unit in record.units {
            let log = loaded.unit_logger(unit.node_id);
            loaded
                .add(UnitInfo::from_record(unit, log))
                .map_err(|e| PersistError::Invalid(e.to_string()))?;
        }
        loaded.serial = self.serial.wrapping_add(1);

        self.log.info(format!("loaded {} units", loaded.len()));
        *self = loaded;
        Ok(())
    }
}

/// The persisted form of the store.
/// v1: home id, controller node id, controller ids, units.
/// v2: adds the controller firmware version.
struct StoreRecord {
    home_id: u32,
    controller_node_id: NodeId,
    controller_ids: ManIds,
    firmware: String,
    units: Vec<UnitRecord>,
}

impl Persist for StoreRecord {
    const VERSION: u16 = 2;

    fn write_fields(&self, output: &mut BytesMut) {
        put_u32(self.home_id).serialize(output);
        put_u8(self.controller_node_id.raw()).serialize(output);
        self.controller_ids.write_to(output);
        put_u16(self.units.len() as u16).serialize(output);
        for unit in &self.units {
            unit.write_to(output);
        }
        write_str(output, &self.firmware);
    }

    fn read_fields(input: &mut Bytes, version: u16) -> PersistResult<Self> {
        let home_id = be_u32(input)?;
        let controller_node_id = NodeId::new(be_u8(input)?);
        let controller_ids = ManIds::read_from(input)?;
        let count = be_u16(input)?;
        let units = (0..count)
            .map(|_| UnitRecord::read_from(input))
            .collect::<PersistResult<Vec<_>>>()?;
        let firmware = if version >= 2 {
            read_str(input)?
        } else {
            String::new()
        };
        Ok(Self {
            home_id,
            controller_node_id,
            controller_ids,
            firmware,
            units,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::NodeCaps;
    use crate::testing::FakeController;
    use crate::unit_info::UnitState;
    use zwave_logging::loggers::CapturingLogger;

    fn store() -> ConfigStore {
        ConfigStore::new(Arc::new(CapturingLogger::default()))
    }

    fn filled() -> ConfigStore {
        let mut store = store();
        store.set_controller_info(0xc0ffee01, NodeId::new(1), ManIds::new(0x0086, 1, 2), "7.19");
        store.create_unit(NodeId::new(5), "Kitchen").unwrap();
        store.create_unit(NodeId::new(9), "Hall").unwrap();
        store.create_unit(NodeId::new(2), "attic").unwrap();
        store
    }

    #[test]
    fn test_names_are_unique() {
        let mut store = filled();
        assert_eq!(
            store.create_unit(NodeId::new(12), "KITCHEN").err(),
            Some(ConfigError::DuplicateName("KITCHEN".to_string()))
        );
        assert_eq!(
            store.create_unit(NodeId::new(5), "Porch").err(),
            Some(ConfigError::DuplicateNodeId(NodeId::new(5)))
        );
        assert!(store.create_unit(NodeId::new(12), " ").is_err());
        assert_eq!(store.len(), 3);

        assert_eq!(store.find_by_name("hall").map(|u| u.node_id()), Some(NodeId::new(9)));
        assert_eq!(store.find_by_name("ATTIC").map(|u| u.node_id()), Some(NodeId::new(2)));
        assert!(store.find_by_name("Porch").is_none());
    }

    #[test]
    fn test_rename() {
        let mut store = filled();
        assert_eq!(
            store.rename(NodeId::new(9), "kitchen"),
            Err(ConfigError::DuplicateName("kitchen".to_string()))
        );
        store.rename(NodeId::new(9), "Porch").unwrap();
        assert!(store.find_by_name("Hall").is_none());
        assert_eq!(store.find_by_name("porch").map(|u| u.name()), Some("Porch"));

        // Only the case changes
        store.rename(NodeId::new(9), "PORCH").unwrap();
        assert_eq!(store.find(NodeId::new(9)).map(|u| u.name()), Some("PORCH"));
        assert_eq!(
            store.rename(NodeId::new(77), "Cellar"),
            Err(ConfigError::UnknownUnit(NodeId::new(77)))
        );
    }

    #[test]
    fn test_change_hash() {
        let mut store = filled();
        let hash = store.change_hash();
        // Stable while nothing changes
        assert_eq!(store.change_hash(), hash);
        assert_eq!(store.change_hash(), filled().change_hash());

        // Any single serial bump changes it
        store
            .find_mut(NodeId::new(9))
            .unwrap()
            .set_option("PollSecs", "60");
        let after_option = store.change_hash();
        assert_ne!(after_option, hash);

        store.rename(NodeId::new(2), "Loft").unwrap();
        let after_rename = store.change_hash();
        assert_ne!(after_rename, after_option);

        store.remove(NodeId::new(5));
        assert_ne!(store.change_hash(), after_rename);
    }

    #[test]
    fn test_remove() {
        let mut store = filled();
        let unit = store.remove(NodeId::new(5)).unwrap();
        assert_eq!(unit.name(), "Kitchen");
        assert!(store.find_by_name("Kitchen").is_none());
        assert!(store.remove(NodeId::new(5)).is_none());
        store.create_unit(NodeId::new(6), "Kitchen").unwrap();
    }

    #[test]
    fn test_probe_new_units() {
        let mut store = filled();
        store.create_unit(NodeId::new(3), "Unit_004").unwrap();
        let mut ctl = FakeController::new();
        for id in [1, 2, 4, 5, 23] {
            ctl.set_caps(NodeId::new(id), NodeCaps::default());
        }

        let added = store.probe_new_units(&ctl);
        assert_eq!(added, vec![NodeId::new(4), NodeId::new(23)]);
        assert_eq!(store.find(NodeId::new(4)).map(|u| u.name()), Some("Unit_004_2"));
        assert_eq!(store.find(NodeId::new(23)).map(|u| u.name()), Some("Unit_023"));
        assert_eq!(
            store.find(NodeId::new(23)).map(|u| u.state()),
            Some(UnitState::InitUnit)
        );
        // The controller itself is not a unit
        assert!(store.find(NodeId::new(1)).is_none());

        assert!(store.probe_new_units(&ctl).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let mut original = filled();
        original
            .find_mut(NodeId::new(5))
            .unwrap()
            .set_option("PollSecs", "60");
        let data = original.save();

        let mut loaded = store();
        loaded.load(data).unwrap();
        assert_eq!(loaded.home_id(), 0xc0ffee01);
        assert_eq!(loaded.controller_ids(), ManIds::new(0x0086, 1, 2));
        assert_eq!(loaded.firmware(), "7.19");
        assert_eq!(loaded.len(), 3);
        let kitchen = loaded.find_by_name("kitchen").unwrap();
        assert_eq!(kitchen.node_id(), NodeId::new(5));
        assert_eq!(kitchen.options().get("PollSecs"), Some("60"));
        assert_eq!(
            kitchen.to_record(),
            original.find(NodeId::new(5)).unwrap().to_record()
        );
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let mut store = filled();
        let hash = store.change_hash();
        let mut data = store.save().to_vec();
        data.truncate(data.len() - 3);
        assert!(store.load(data).is_err());

        let mut data = store.save().to_vec();
        data[2] = 0x09;
        assert_eq!(
            store.load(data),
            Err(PersistError::VersionTooHigh { found: 9, max: 2 })
        );
        assert_eq!(store.len(), 3);
        assert_eq!(store.change_hash(), hash);
    }

    #[test]
    fn test_load_v1() {
        let mut v1 = BytesMut::new();
        put_u8(crate::persist::START_MARKER).serialize(&mut v1);
        put_u16(1).serialize(&mut v1);
        put_u32(0x01020304).serialize(&mut v1);
        put_u8(1).serialize(&mut v1);
        ManIds::new(1, 2, 3).write_to(&mut v1);
        put_u16(0).serialize(&mut v1);
        put_u8(crate::persist::END_MARKER).serialize(&mut v1);

        let mut store = store();
        store.load(v1.freeze()).unwrap();
        assert_eq!(store.home_id(), 0x01020304);
        assert_eq!(store.firmware(), "");
        assert!(store.is_empty());
    }
}
