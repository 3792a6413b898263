use crate::ccimpl::HandleResult;
use crate::config_store::ConfigStore;
use crate::controller::ControllerInterface;
use crate::device_info::{DeviceCatalog, ManIds};
use crate::error::{ConfigError, PersistError, TransmitError};
use crate::fields::{FieldDef, FieldId, FieldValue, UnitAttr, WriteResult};
use crate::options::EngineOptions;
use crate::transmit::Transport;
use crate::unit_info::{DriverCtx, UnitInfo, UnitState, UnitStatus};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use zwave_core::clock::Clock;
use zwave_core::prelude::*;
use zwave_core::security::{NetworkKey, SecurityManager, SecurityManagerOptions};
use zwave_logging::ImmutableLogger;
use zwave_logging::loggers::{DriverLogger, MessageLogger};
use zwave_serial::command_raw::CommandRaw;
use zwave_serial::message::InMsg;

/// Drives all units of a network. The host calls [`Engine::process`] periodically from a single
/// worker and feeds it every frame the controller receives.
pub struct Engine {
    store: ConfigStore,
    transport: Transport,
    catalog: Arc<dyn DeviceCatalog>,
    options: EngineOptions,
    clock: Arc<dyn Clock>,
    log: DriverLogger,
}

impl Engine {
    pub fn new(
        options: EngineOptions,
        catalog: Arc<dyn DeviceCatalog>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn ImmutableLogger>,
    ) -> Self {
        logger.set_log_level(options.log_level);
        let security = SecurityManager::new(SecurityManagerOptions {
            nonce_lifetime: options.nonce_lifetime,
            ..Default::default()
        })
        .into_shared();
        let transport = Transport::new(security, &options, MessageLogger::new(logger.clone()));
        let log = DriverLogger::new(logger.clone());
        log.info(format!("{} devices in the catalog", catalog.len()));
        Self {
            store: ConfigStore::new(logger),
            transport,
            catalog,
            options,
            clock,
            log,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Rotates the S0 network key. All nonces of the old key are discarded.
    pub fn set_network_key(&mut self, key: NetworkKey) {
        match self.transport.security().lock() {
            Ok(mut security) => {
                security.set_network_key(key);
                self.log.info("network key changed");
            }
            Err(_) => self.log.error("cannot change the network key, the security manager is poisoned"),
        }
    }

    fn sync_own_node_id(&mut self, ctl: &dyn ControllerInterface) {
        let own = ctl.own_node_id();
        if let Ok(mut security) = self.transport.security().lock() {
            if security.own_node_id() != own {
                security.set_own_node_id(own);
            }
        }
    }

    /// One pass over all units: new nodes are picked up, every unit advances its discovery or
    /// polls, and the transmit queue is drained.
    pub fn process(&mut self, ctl: &mut dyn ControllerInterface) {
        let now = self.clock.now();
        self.sync_own_node_id(ctl);
        self.store.probe_new_units(ctl);

        for unit in self.store.units_mut() {
            let mut ctx = DriverCtx {
                now,
                ctl: &mut *ctl,
                transport: &mut self.transport,
                catalog: self.catalog.as_ref(),
                options: &self.options,
            };
            unit.process(&mut ctx);
        }
        self.flush(ctl, now);
    }

    fn flush(&mut self, ctl: &mut dyn ControllerInterface, now: Instant) {
        for (msg, e) in self.transport.flush(ctl, now) {
            let target = msg
                .target()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "the controller".to_string());
            match e {
                TransmitError::Disconnected => {
                    self.log.error("the controller is not connected");
                }
                e => self.log.warn(format!("message to {} failed: {}", target, e)),
            }
        }
    }

    /// Decodes a received frame and hands it to the unit it came from
    pub fn handle_raw(&mut self, ctl: &mut dyn ControllerInterface, raw: CommandRaw) -> HandleResult {
        let now = self.clock.now();
        let msg = match InMsg::decode(raw, Some(self.transport.security()), now) {
            Ok(msg) => msg,
            Err(e) => {
                self.log.warn(format!("discarding frame: {}", e));
                return HandleResult::Unhandled;
            }
        };
        self.transport.log().inbound(&msg);
        self.handle_msg(ctl, &msg)
    }

    pub fn handle_msg(&mut self, ctl: &mut dyn ControllerInterface, msg: &InMsg) -> HandleResult {
        let now = self.clock.now();
        let Some(source) = msg.source_node() else {
            return HandleResult::Unhandled;
        };
        let Some(unit) = self.store.find_mut(source) else {
            self.log.verbose(format!("message from unknown node {}", source));
            return HandleResult::Unhandled;
        };
        let mut ctx = DriverCtx {
            now,
            ctl: &mut *ctl,
            transport: &mut self.transport,
            catalog: self.catalog.as_ref(),
            options: &self.options,
        };
        let ret = unit.handle_message(msg, &mut ctx);
        self.flush(ctl, now);
        ret
    }

    /// The host changed a field. It is forwarded to the unit that registered it.
    pub fn write_field(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        field: FieldId,
        value: &FieldValue,
    ) -> WriteResult {
        let now = self.clock.now();
        let Some(unit) = self.store.units_mut().find(|u| u.owns_field(field)) else {
            self.log.warn(format!("no unit owns field {}", field));
            return WriteResult::NotWritable;
        };
        let mut ctx = DriverCtx {
            now,
            ctl: &mut *ctl,
            transport: &mut self.transport,
            catalog: self.catalog.as_ref(),
            options: &self.options,
        };
        let ret = unit.field_changed(field, value, &mut ctx);
        self.flush(ctl, now);
        ret
    }

    fn unit(&self, node_id: NodeId) -> Result<&UnitInfo, ConfigError> {
        self.store.find(node_id).ok_or(ConfigError::UnknownUnit(node_id))
    }

    fn unit_mut(&mut self, node_id: NodeId) -> Result<&mut UnitInfo, ConfigError> {
        self.store
            .find_mut(node_id)
            .ok_or(ConfigError::UnknownUnit(node_id))
    }

    pub fn state(&self, node_id: NodeId) -> Option<UnitState> {
        self.store.find(node_id).map(|u| u.state())
    }

    pub fn status(&self, node_id: NodeId) -> Option<UnitStatus> {
        self.store.find(node_id).map(|u| u.status())
    }

    /// Diagnostic text of one unit
    pub fn report(&self, node_id: NodeId) -> Result<String, ConfigError> {
        Ok(self.unit(node_id)?.report(self.clock.now()))
    }

    /// The options a unit understands
    pub fn unit_attrs(&mut self, node_id: NodeId) -> Result<Vec<UnitAttr>, ConfigError> {
        Ok(self.unit_mut(node_id)?.query_unit_attrs())
    }

    pub fn edit_option(&mut self, node_id: NodeId, key: &str, value: &str) -> Result<(), ConfigError> {
        self.unit_mut(node_id)?.edit_option(key, value)
    }

    pub fn rescan(&mut self, node_id: NodeId) -> Result<(), ConfigError> {
        self.unit_mut(node_id)?.force_rescan();
        Ok(())
    }

    pub fn rename(&mut self, node_id: NodeId, name: &str) -> Result<(), ConfigError> {
        self.store.rename(node_id, name)
    }

    /// Binds a device info by hand, for nodes that cannot report their ids or are not in the catalog
    pub fn bind_device_info(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        node_id: NodeId,
        ids: ManIds,
    ) -> Result<(), ConfigError> {
        let now = self.clock.now();
        let unit = self
            .store
            .find_mut(node_id)
            .ok_or(ConfigError::UnknownUnit(node_id))?;
        let mut ctx = DriverCtx {
            now,
            ctl: &mut *ctl,
            transport: &mut self.transport,
            catalog: self.catalog.as_ref(),
            options: &self.options,
        };
        let ret = unit.bind_device_info(ids, &mut ctx);
        self.flush(ctl, now);
        ret
    }

    /// The fields of one unit, for the host to register
    pub fn field_defs(&self, node_id: NodeId) -> Result<Vec<FieldDef>, ConfigError> {
        Ok(self.unit(node_id)?.field_defs())
    }

    /// The fields of all units
    pub fn all_field_defs(&self) -> Vec<FieldDef> {
        self.store.units().flat_map(|u| u.field_defs()).collect()
    }

    /// Looks up all field ids again, after the host registered fields
    pub fn refresh_field_ids(&mut self, ctl: &dyn ControllerInterface) {
        for unit in self.store.units_mut() {
            unit.refresh_field_ids(ctl);
        }
    }

    pub fn change_hash(&self) -> u64 {
        self.store.change_hash()
    }

    pub fn save(&self) -> Bytes {
        self.store.save()
    }

    pub fn load(&mut self, data: impl Into<Bytes>) -> Result<(), PersistError> {
        self.store.load(data)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::NodeCaps;
    use crate::testing::*;
    use std::time::Duration;
    use zwave_cc::prelude::*;
    use zwave_core::clock::ManualClock;
    use zwave_logging::loggers::CapturingLogger;

    const NODE: u8 = 5;
    const SWITCH_FIELD: FieldId = FieldId(1);

    struct Setup {
        engine: Engine,
        ctl: FakeController,
        clock: Arc<ManualClock>,
        logger: Arc<CapturingLogger>,
    }

    fn setup() -> Setup {
        let clock = Arc::new(ManualClock::new());
        let logger = Arc::new(CapturingLogger::default());
        let engine = Engine::new(
            EngineOptions::default(),
            Arc::new(catalog(&[SWITCH_DEVICE, SLEEPY_DEVICE])),
            clock.clone(),
            logger.clone(),
        );
        let mut ctl = FakeController::new();
        ctl.set_caps(
            NodeId::new(NODE),
            NodeCaps {
                listener: true,
                supports_man_spec: true,
                ..Default::default()
            },
        );
        ctl.register_field("Unit_005_Switch", SWITCH_FIELD);
        Setup {
            engine,
            ctl,
            clock,
            logger,
        }
    }

    fn report_raw(on: bool) -> CommandRaw {
        let value = if on { BinaryReport::On } else { BinaryReport::Off };
        let cc = CC::from(BinarySwitchCCReport::builder().current_value(value).build())
            .as_raw()
            .as_bytes();
        let mut payload = vec![0x00, NODE, cc.len() as u8];
        payload.extend_from_slice(&cc);
        CommandRaw::new(CommandType::Request, FunctionType::ApplicationCommand, payload)
    }

    fn man_spec_reply() -> InMsg {
        let report = ManufacturerSpecificCCReport {
            manufacturer_id: 0x0086,
            product_type: 0x0003,
            product_id: 0x0060,
        };
        InMsg::application_command(NodeId::new(NODE), &CC::from(report).as_raw())
    }

    /// Discovers the switch and runs its first poll
    fn ready(s: &mut Setup) {
        s.ctl.script_reply(man_spec_reply());
        s.engine.process(&mut s.ctl);
        assert_eq!(s.engine.state(NodeId::new(NODE)), Some(UnitState::Ready));
        s.engine.process(&mut s.ctl);
    }

    #[test]
    fn test_binary_switch() {
        let mut s = setup();
        ready(&mut s);
        assert_eq!(
            s.ctl.sent_commands(),
            vec![
                (CommandClasses::ManufacturerSpecific as u8, 0x04),
                (CommandClasses::Association as u8, 0x01),
                (CommandClasses::BinarySwitch as u8, 0x02),
            ]
        );

        // No value yet
        assert_eq!(s.ctl.field_errors(), &[(SWITCH_FIELD, true)]);
        assert_eq!(s.engine.status(NodeId::new(NODE)), Some(UnitStatus::Ready));

        // The poll is answered
        assert_eq!(
            s.engine.handle_raw(&mut s.ctl, report_raw(true)),
            HandleResult::ValueProduced
        );
        assert_eq!(s.ctl.written(), &[(SWITCH_FIELD, FieldValue::Bool(true))]);
        assert_eq!(
            s.ctl.field_errors(),
            &[(SWITCH_FIELD, true), (SWITCH_FIELD, false)]
        );

        // The host switches it off
        s.ctl.clear_sent();
        assert_eq!(
            s.engine
                .write_field(&mut s.ctl, SWITCH_FIELD, &FieldValue::Bool(false)),
            WriteResult::Ok
        );
        assert_eq!(
            s.ctl.sent_commands(),
            vec![(CommandClasses::BinarySwitch as u8, 0x01)]
        );
        assert_eq!(
            s.ctl.written().last(),
            Some(&(SWITCH_FIELD, FieldValue::Bool(false)))
        );

        // A report with the same value changes nothing
        let written = s.ctl.written().len();
        s.engine.handle_raw(&mut s.ctl, report_raw(false));
        assert_eq!(s.ctl.written().len(), written);
        assert_eq!(s.engine.status(NodeId::new(NODE)), Some(UnitStatus::Ready));
    }

    #[test]
    fn test_unanswered_polls() {
        let mut s = setup();
        ready(&mut s);
        let polls = |ctl: &FakeController| {
            ctl.sent_commands()
                .iter()
                .filter(|c| **c == (CommandClasses::BinarySwitch as u8, 0x02))
                .count()
        };
        assert_eq!(polls(&s.ctl), 1);

        // Retries back off: 1, 2, then 4 minutes
        for (wait, expected) in [(59, 1), (1, 2), (119, 2), (1, 3)] {
            s.clock.advance(Duration::from_secs(wait));
            s.engine.process(&mut s.ctl);
            assert_eq!(polls(&s.ctl), expected);
        }
        // Flagged when bound, and again when it stopped responding
        assert_eq!(
            s.ctl.field_errors(),
            &[(SWITCH_FIELD, true), (SWITCH_FIELD, true)]
        );
        assert_eq!(s.engine.status(NodeId::new(NODE)), Some(UnitStatus::Failed));
        assert!(s.logger.contains("stopped responding"));

        s.clock.advance(Duration::from_secs(239));
        s.engine.process(&mut s.ctl);
        assert_eq!(polls(&s.ctl), 3);
        s.clock.advance(Duration::from_secs(1));
        s.engine.process(&mut s.ctl);
        assert_eq!(polls(&s.ctl), 4);
        // Still in error, not raised again
        assert_eq!(s.ctl.field_errors().len(), 2);

        s.engine.handle_raw(&mut s.ctl, report_raw(true));
        assert_eq!(
            s.ctl.field_errors(),
            &[(SWITCH_FIELD, true), (SWITCH_FIELD, true), (SWITCH_FIELD, false)]
        );
        assert_eq!(s.engine.status(NodeId::new(NODE)), Some(UnitStatus::Ready));
    }

    #[test]
    fn test_foreign_traffic() {
        let mut s = setup();
        ready(&mut s);

        // A node without a unit
        let msg = InMsg::application_command(
            NodeId::new(77),
            &CC::from(BatteryCCGet::default()).as_raw(),
        );
        assert_eq!(s.engine.handle_msg(&mut s.ctl, &msg), HandleResult::Unhandled);

        // A frame that doesn't decode
        let raw = CommandRaw::new(
            CommandType::Request,
            FunctionType::ApplicationCommand,
            vec![0x00, NODE, 0x05, 0x25],
        );
        assert_eq!(s.engine.handle_raw(&mut s.ctl, raw), HandleResult::Unhandled);
        assert!(s.logger.contains("discarding frame"));

        // A field nobody registered
        assert_eq!(
            s.engine
                .write_field(&mut s.ctl, FieldId(99), &FieldValue::Bool(true)),
            WriteResult::NotWritable
        );
    }

    #[test]
    fn test_admin_surface() {
        let mut s = setup();
        ready(&mut s);
        let node = NodeId::new(NODE);

        let defs = s.engine.field_defs(node).unwrap();
        assert_eq!(defs[0].name, "Unit_005_Switch");
        assert_eq!(s.engine.all_field_defs().len(), 1);
        assert!(s.engine.report(node).unwrap().contains("Smart Switch"));

        let attrs = s.engine.unit_attrs(node).unwrap();
        assert!(attrs.iter().any(|a| a.key == "PollSecs"));
        let hash = s.engine.change_hash();
        s.engine.edit_option(node, "PollSecs", "30").unwrap();
        assert_ne!(s.engine.change_hash(), hash);
        assert_eq!(
            s.engine.edit_option(NodeId::new(40), "PollSecs", "30"),
            Err(ConfigError::UnknownUnit(NodeId::new(40)))
        );

        s.engine.rename(node, "Porch").unwrap();
        s.ctl.register_field("Porch_Switch", FieldId(2));
        s.engine.refresh_field_ids(&s.ctl);
        assert_eq!(
            s.engine.write_field(&mut s.ctl, FieldId(2), &FieldValue::Bool(true)),
            WriteResult::Ok
        );

        s.engine.rescan(node).unwrap();
        assert_eq!(s.engine.state(node), Some(UnitState::InitUnit));
        assert_eq!(s.engine.store().find(node).map(|u| u.name()), Some("Porch"));
    }

    #[test]
    fn test_manual_binding() {
        let mut s = setup();
        // No reply to the manufacturer query
        s.ctl.set_caps(
            NodeId::new(NODE),
            NodeCaps {
                listener: true,
                ..Default::default()
            },
        );
        s.engine.process(&mut s.ctl);
        let node = NodeId::new(NODE);
        assert_eq!(s.engine.state(node), Some(UnitState::WaitDevInfo));
        assert_eq!(s.engine.status(node), Some(UnitStatus::NeedsAction));

        s.engine
            .bind_device_info(&mut s.ctl, node, ManIds::new(0x0086, 0x0003, 0x0060))
            .unwrap();
        assert_eq!(s.engine.state(node), Some(UnitState::Ready));
        assert_eq!(
            s.ctl.sent_commands(),
            vec![(CommandClasses::Association as u8, 0x01)]
        );
    }

    #[test]
    fn test_restart() {
        let mut s = setup();
        ready(&mut s);
        s.engine.edit_option(NodeId::new(NODE), "PollSecs", "30").unwrap();
        let data = s.engine.save();

        let mut t = setup();
        t.engine.load(data).unwrap();
        assert_eq!(t.engine.change_hash(), t.engine.change_hash());
        assert_eq!(
            t.engine.state(NodeId::new(NODE)),
            Some(UnitState::HaveDevInfo)
        );
        t.engine.process(&mut t.ctl);
        assert_eq!(t.engine.state(NodeId::new(NODE)), Some(UnitState::Ready));
        // Bound from the catalog without asking the node
        assert!(
            !t.ctl
                .sent_commands()
                .contains(&(CommandClasses::ManufacturerSpecific as u8, 0x04))
        );
        let unit = t.engine.store().find(NodeId::new(NODE)).unwrap();
        assert_eq!(unit.options().get("PollSecs"), Some("30"));
    }

    #[test]
    fn test_secure_node_without_key() {
        let mut s = setup();
        s.ctl.set_caps(
            NodeId::new(NODE),
            NodeCaps {
                listener: true,
                secure: true,
                supports_man_spec: true,
                man_spec_secure: true,
                ..Default::default()
            },
        );
        s.engine.process(&mut s.ctl);
        // The query cannot be encrypted, discovery backs off
        assert_eq!(
            s.engine.state(NodeId::new(NODE)),
            Some(UnitState::GetUnitInfo)
        );
        assert!(s.ctl.sent().is_empty());

        s.engine.set_network_key(NetworkKey::new([0x42; 16]));
        s.clock.advance(Duration::from_secs(30));
        s.engine.process(&mut s.ctl);
        // The nonce request goes out first
        assert_eq!(
            s.ctl.sent_commands().first(),
            Some(&(CommandClasses::Security as u8, 0x40))
        );
    }
}
