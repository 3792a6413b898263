use crate::controller::{EventTrigger, NodeCaps};
use crate::error::ConfigError;
use crate::fields::{AccessFlags, FieldDef, FieldId, FieldKind, FieldValue, UnitAttr, ValueSource, WriteResult};
use crate::options::EngineOptions;
use crate::unit::ImplId;
use crate::unit_info::UnitOptions;
use enum_dispatch::enum_dispatch;
use std::collections::BTreeMap;
use std::time::Instant;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_core::submodule;
use zwave_logging::loggers::UnitLogger;
use zwave_serial::message::MsgPriority;

submodule!(impl_core);
submodule!(battery);
submodule!(binary_sensor);
submodule!(binary_switch);
submodule!(door_lock);
submodule!(multilevel_switch);
submodule!(notification);

/// Device info key/value pairs scoped to one class and end point
pub type ExtraInfo = BTreeMap<String, String>;

/// Outcome of offering an inbound command to a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleResult {
    Unhandled,
    Handled,
    /// Handled, and the command carried a value
    ValueProduced,
}

/// Notifications from a capability to its owner. Queued in the [`ImplCtx`] and
/// drained by the unit handler after every call.
#[derive(Debug, Clone, PartialEq)]
pub enum ImplEvent {
    ValueChanged {
        impl_id: ImplId,
        field: Option<FieldId>,
        value: FieldValue,
        source: ValueSource,
        /// Class specific, e.g. a transition duration
        aux: i32,
    },
    EnteredError {
        impl_id: ImplId,
        field: Option<FieldId>,
    },
    LeftError {
        impl_id: ImplId,
        field: Option<FieldId>,
    },
}

impl ImplEvent {
    pub fn impl_id(&self) -> ImplId {
        match self {
            Self::ValueChanged { impl_id, .. }
            | Self::EnteredError { impl_id, .. }
            | Self::LeftError { impl_id, .. } => *impl_id,
        }
    }
}

/// A command a capability wants to send to its node
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub cc: CC,
    pub endpoint: EndpointIndex,
    pub priority: MsgPriority,
    /// Set for writes. The capability is told through `write_sent` once the command is accepted.
    pub confirms: Option<ImplId>,
}

/// Everything a capability may need while handling a call, and the place it leaves its results
pub struct ImplCtx<'a> {
    pub now: Instant,
    pub node_id: NodeId,
    pub unit_name: &'a str,
    pub caps: NodeCaps,
    pub options: &'a EngineOptions,
    pub log: &'a UnitLogger,
    pub events: Vec<ImplEvent>,
    pub outbound: Vec<Outbound>,
    pub triggers: Vec<EventTrigger>,
}

impl<'a> ImplCtx<'a> {
    pub fn new(
        now: Instant,
        node_id: NodeId,
        unit_name: &'a str,
        caps: NodeCaps,
        options: &'a EngineOptions,
        log: &'a UnitLogger,
    ) -> Self {
        Self {
            now,
            node_id,
            unit_name,
            caps,
            options,
            log,
            events: Vec::new(),
            outbound: Vec::new(),
            triggers: Vec::new(),
        }
    }
}

/// Inputs for [`CCImplOps::prepare`]
pub struct PrepareCtx<'a> {
    pub now: Instant,
    pub caps: NodeCaps,
    pub options: &'a EngineOptions,
}

impl AccessFlags {
    /// Access of a capability that the device info does not override
    pub fn defaults_for(caps: &NodeCaps, writable: bool) -> Self {
        let mut ret = if caps.reachable() {
            Self::READABLE
        } else if caps.supports_wakeup {
            Self::READABLE | Self::READ_ON_WAKEUP
        } else {
            Self::empty()
        };
        if writable {
            ret |= Self::WRITABLE;
        }
        ret
    }
}

#[enum_dispatch]
/// The behavior of one command class for one unit and end point
pub trait CCImplOps {
    fn core(&self) -> &ImplCore;
    fn core_mut(&mut self) -> &mut ImplCore;

    /// Field name used when the device info doesn't give one
    fn default_name(&self) -> &'static str;

    /// The kind of the field this capability drives. `None` for capabilities without a field.
    fn field_kind(&self) -> Option<FieldKind>;

    fn writable(&self) -> bool {
        false
    }

    /// Parses the class specific keys of the device info. The keys every capability
    /// understands are handled by the core.
    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        let _ = extra;
        Ok(())
    }

    fn default_access(&self, caps: &NodeCaps) -> AccessFlags {
        AccessFlags::defaults_for(caps, self.writable())
    }

    fn prepare(&mut self, ctx: &PrepareCtx) -> Result<(), ConfigError> {
        let access = self.default_access(&ctx.caps);
        let can_query = self.build_query().is_some();
        let name = self.default_name();
        let has_field = self.field_kind().is_some();
        self.core_mut().prepare(ctx, access, can_query, name, has_field)
    }

    /// The command that asks the node for the current value
    fn build_query(&self) -> Option<CC>;

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult;

    fn query_field_defs(&self, defs: &mut Vec<FieldDef>) {
        let core = self.core();
        if let (Some(kind), Some(name)) = (self.field_kind(), core.field_name()) {
            defs.push(FieldDef::new(name, kind, core.access()));
        }
    }

    fn store_field_ids(&mut self, lookup: &dyn Fn(&str) -> Option<FieldId>) {
        let id = self.core().field_name().and_then(lookup);
        self.core_mut().set_field_id(id);
    }

    fn owns_field(&self, field: FieldId) -> bool {
        self.core().field_id() == Some(field)
    }

    fn query_unit_attrs(&self, attrs: &mut Vec<UnitAttr>) {
        let _ = attrs;
    }

    fn apply_options(&mut self, options: &UnitOptions) {
        self.core_mut().apply_options(options);
    }

    /// Translates a write of the owned field into an outbound command
    fn field_changed(&mut self, value: &FieldValue, ctx: &mut ImplCtx) -> WriteResult {
        let _ = (value, ctx);
        WriteResult::NotWritable
    }

    /// The command produced by `field_changed` was accepted for sending
    fn write_sent(&mut self, ctx: &mut ImplCtx) {
        let _ = ctx;
    }

    fn process(&mut self, ctx: &mut ImplCtx) {
        if !self.core().poll_due(ctx.now) {
            return;
        }
        if let Some(query) = self.build_query() {
            self.core_mut().send_query(query, ctx);
        }
    }

    fn on_wakeup(&mut self, ctx: &mut ImplCtx) {
        if !self.core().access().contains(AccessFlags::READ_ON_WAKEUP) {
            return;
        }
        if let Some(query) = self.build_query() {
            self.core_mut().send_query(query, ctx);
        }
    }

    /// The current value as text, for diagnostics
    fn value_text(&self) -> String;

    fn report(&self, out: &mut String, now: Instant) {
        self.core().report(out, &self.value_text(), now);
    }
}

#[enum_dispatch(CCImplOps)]
pub enum CCImpl {
    BatteryImpl,
    BinarySensorImpl,
    BinarySwitchImpl,
    DoorLockImpl,
    MultilevelSwitchImpl,
    NotificationImpl,
}

impl CCImpl {
    /// Creates the capability for a class, if there is one
    pub fn for_class(class: CommandClasses, endpoint: EndpointIndex) -> Option<Self> {
        let ret: CCImpl = match class {
            CommandClasses::Battery => BatteryImpl::new(endpoint).into(),
            CommandClasses::BinarySensor => BinarySensorImpl::new(endpoint).into(),
            CommandClasses::BinarySwitch => BinarySwitchImpl::new(endpoint).into(),
            CommandClasses::DoorLock => DoorLockImpl::new(endpoint).into(),
            CommandClasses::MultilevelSwitch => MultilevelSwitchImpl::new(endpoint).into(),
            CommandClasses::Notification => NotificationImpl::new(endpoint).into(),
            _ => return None,
        };
        Some(ret)
    }

    /// Applies the device info keys, both the common ones and the class specific ones
    pub fn configure(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        self.core_mut().parse_extra_info(extra)?;
        self.parse_extra_info(extra)
    }

    pub fn class(&self) -> CommandClasses {
        self.core().class()
    }

    pub fn endpoint(&self) -> EndpointIndex {
        self.core().endpoint()
    }

    /// Whether an inbound command from the given end point is meant for this capability
    pub fn accepts(&self, class_id: u8, endpoint: EndpointIndex) -> bool {
        let core = self.core();
        core.class() as u8 == class_id && (core.sees_all_endpoints() || core.endpoint() == endpoint)
    }
}
