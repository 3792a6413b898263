//! Test doubles for engine level scenarios

use crate::controller::{ControllerInterface, EventTrigger, NodeCaps};
use crate::device_info::MemCatalog;
use crate::error::TransmitError;
use crate::fields::{FieldId, FieldValue};
use crate::options::EngineOptions;
use crate::transmit::Transport;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use zwave_core::prelude::*;
use zwave_core::security::{SecurityManager, SecurityManagerOptions};
use zwave_logging::loggers::{CapturingLogger, MessageLogger};
use zwave_serial::message::{InMsg, OutMsg, ReplyMatch};

/// A controller that records everything it is asked to do. Replies are scripted up front,
/// a request without a matching scripted reply times out.
#[derive(Default)]
pub struct FakeController {
    nodes: BTreeMap<NodeId, NodeCaps>,
    fields: BTreeMap<String, FieldId>,
    replies: VecDeque<InMsg>,
    fail_acks: bool,
    sent: Vec<OutMsg>,
    written: Vec<(FieldId, FieldValue)>,
    field_errors: Vec<(FieldId, bool)>,
    triggers: Vec<EventTrigger>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_caps(&mut self, node_id: NodeId, caps: NodeCaps) {
        self.nodes.insert(node_id, caps);
    }

    pub fn register_field(&mut self, name: &str, id: FieldId) {
        self.fields.insert(name.to_string(), id);
    }

    pub fn script_reply(&mut self, msg: InMsg) {
        self.replies.push_back(msg);
    }

    pub fn set_fail_acks(&mut self, fail: bool) {
        self.fail_acks = fail;
    }

    pub fn sent(&self) -> &[OutMsg] {
        &self.sent
    }

    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// Class and command of every sent message
    pub fn sent_commands(&self) -> Vec<(u8, u8)> {
        self.sent.iter().filter_map(|m| m.class_cmd()).collect()
    }

    pub fn written(&self) -> &[(FieldId, FieldValue)] {
        &self.written
    }

    pub fn field_errors(&self) -> &[(FieldId, bool)] {
        &self.field_errors
    }

    pub fn triggers(&self) -> &[EventTrigger] {
        &self.triggers
    }
}

impl ControllerInterface for FakeController {
    fn own_node_id(&self) -> NodeId {
        NodeId::new(1)
    }

    fn node_caps(&self, node_id: NodeId) -> Option<NodeCaps> {
        self.nodes.get(&node_id).copied()
    }

    fn node_list(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn send(&mut self, msg: &OutMsg) -> Result<(), TransmitError> {
        self.sent.push(msg.clone());
        Ok(())
    }

    fn send_wait_ack(&mut self, msg: &OutMsg, _timeout: Duration) -> Result<(), TransmitError> {
        self.sent.push(msg.clone());
        if self.fail_acks {
            Err(TransmitError::NoAck)
        } else {
            Ok(())
        }
    }

    fn send_wait_reply(
        &mut self,
        msg: &OutMsg,
        reply: &ReplyMatch,
        _timeout: Duration,
    ) -> Result<InMsg, TransmitError> {
        self.sent.push(msg.clone());
        let index = self
            .replies
            .iter()
            .position(|r| reply.matches(r))
            .ok_or(TransmitError::Timeout)?;
        self.replies.remove(index).ok_or(TransmitError::Timeout)
    }

    fn write_field(&mut self, field: FieldId, value: &FieldValue) {
        self.written.push((field, value.clone()));
    }

    fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields.get(name).copied()
    }

    fn set_field_error(&mut self, field: FieldId, error: bool) {
        self.field_errors.push((field, error));
    }

    fn queue_event_trigger(&mut self, trigger: EventTrigger) {
        self.triggers.push(trigger);
    }
}

/// A transport without a network key, logging into the void
pub fn transport() -> Transport {
    let security = SecurityManager::new(SecurityManagerOptions {
        own_node_id: NodeId::new(1),
        ..Default::default()
    })
    .into_shared();
    Transport::new(
        security,
        &EngineOptions::default(),
        MessageLogger::new(Arc::new(CapturingLogger::default())),
    )
}

/// A catalog with the given TOML documents
pub fn catalog(devices: &[&str]) -> MemCatalog {
    let mut catalog = MemCatalog::new();
    for device in devices {
        if let Err(e) = catalog.parse_str(device) {
            panic!("invalid test device: {}", e);
        }
    }
    catalog
}

/// A wall powered switch, ids 0086-0003-0060
pub const SWITCH_DEVICE: &str = r#"
    name = "Smart Switch"
    make = "Acme"
    ids = { manufacturer = 0x0086, product_type = 0x0003, product_id = 0x0060 }

    [[classes]]
    class = "BinarySwitch"

    [[auto_config.associations]]
    group = 1
"#;

/// A battery powered switch, ids 0086-0004-0010
pub const SLEEPY_DEVICE: &str = r#"
    name = "Sleepy Switch"
    make = "Acme"
    ids = { manufacturer = 0x0086, product_type = 0x0004, product_id = 0x0010 }

    [[classes]]
    class = "BinarySwitch"

    [[classes]]
    class = "Battery"

    [auto_config]
    wakeup_interval = 3600
"#;
