use crate::error::TransmitError;
use crate::fields::{FieldId, FieldValue};
use std::time::Duration;
use zwave_core::prelude::*;
use zwave_serial::message::{InMsg, OutMsg, ReplyMatch};

/// What the local controller knows about a node without asking it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeCaps {
    pub is_controller: bool,
    /// Always powered and receiving
    pub listener: bool,
    /// Wakes up often enough to be reached with a beam
    pub frequent_listener: bool,
    pub secure: bool,
    pub supports_man_spec: bool,
    /// The manufacturer specific class must be queried encrypted
    pub man_spec_secure: bool,
    pub supports_wakeup: bool,
}

impl NodeCaps {
    /// Nodes that can be reached at any time, possibly with a beam
    pub fn reachable(&self) -> bool {
        self.listener || self.frequent_listener
    }
}

/// Standard event triggers the engine can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A user pressed a button or activated a scene on a device
    UserAction,
    /// A lock changed state, with the source of the change as parameter
    LockStatus,
    /// A battery dropped below its threshold
    LowBattery,
    /// A sensor like a motion or door contact changed state
    SensorChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventTrigger {
    pub kind: EventKind,
    pub field: Option<String>,
    pub unit: String,
    /// Up to 4 parameters, meaning depends on the kind
    pub params: Vec<String>,
}

impl EventTrigger {
    pub const MAX_PARAMS: usize = 4;

    pub fn new(kind: EventKind, unit: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            unit: unit.into(),
            params: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Adds a parameter. Parameters beyond the fourth are dropped.
    pub fn with_param(mut self, param: impl ToString) -> Self {
        if self.params.len() < Self::MAX_PARAMS {
            self.params.push(param.to_string());
        }
        self
    }
}

/// Everything the engine needs from its host: traffic to the controller and access to fields.
/// The engine never talks to the serial port itself.
pub trait ControllerInterface {
    fn own_node_id(&self) -> NodeId;

    /// Cached protocol info about a node, `None` if the controller doesn't know it
    fn node_caps(&self, node_id: NodeId) -> Option<NodeCaps>;

    /// All nodes in the network, including the controller
    fn node_list(&self) -> Vec<NodeId>;

    /// Queues a message without waiting for anything
    fn send(&mut self, msg: &OutMsg) -> Result<(), TransmitError>;

    /// Sends a message and waits for the transmit acknowledgement
    fn send_wait_ack(&mut self, msg: &OutMsg, timeout: Duration) -> Result<(), TransmitError>;

    /// Sends a message and waits for a matching reply
    fn send_wait_reply(
        &mut self,
        msg: &OutMsg,
        reply: &ReplyMatch,
        timeout: Duration,
    ) -> Result<InMsg, TransmitError>;

    fn write_field(&mut self, field: FieldId, value: &FieldValue);

    fn field_id(&self, name: &str) -> Option<FieldId>;

    fn set_field_error(&mut self, field: FieldId, error: bool);

    fn queue_event_trigger(&mut self, trigger: EventTrigger);
}
