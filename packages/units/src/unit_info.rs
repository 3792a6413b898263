use crate::ccimpl::{CCImplOps, HandleResult, ImplCtx, ImplEvent, Outbound, PrepareCtx};
use crate::controller::{ControllerInterface, EventTrigger, NodeCaps};
use crate::device_info::{DeviceCatalog, DeviceInfo, ManIds};
use crate::error::{ConfigError, TransmitError};
use crate::fields::{FieldDef, FieldId, FieldValue, UnitAttr, WriteResult};
use crate::options::EngineOptions;
use crate::transmit::{SendMode, Transport};
use crate::unit::{UnitHandler, create_handler};
use std::fmt::Write;
use std::time::Instant;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_core::submodule;
use zwave_logging::loggers::UnitLogger;
use zwave_serial::message::{InMsg, MsgPriority, OutMsg, ReplyMatch};

submodule!(state);
submodule!(options);
submodule!(wakeup);
submodule!(auto_config);

/// What a unit needs from the engine while it is processed or handles a message
pub struct DriverCtx<'a> {
    pub now: Instant,
    pub ctl: &'a mut dyn ControllerInterface,
    pub transport: &'a mut Transport,
    pub catalog: &'a dyn DeviceCatalog,
    pub options: &'a EngineOptions,
}

/// The part of a unit that survives a restart
#[derive(Debug, Clone, PartialEq)]
pub struct UnitRecord {
    pub node_id: NodeId,
    pub name: String,
    pub man_ids: ManIds,
    pub manual_binding: bool,
    pub options: UnitOptions,
    pub serial: u32,
}

/// Tracks one node from its first appearance until its unit handler runs, and owns
/// everything the node needs afterwards: the handler, the wakeup queue and the options.
pub struct UnitInfo {
    node_id: NodeId,
    name: String,
    /// Bumped on every change that needs to be persisted
    serial: u32,
    state: UnitState,
    caps: NodeCaps,
    man_ids: ManIds,
    /// The device info was chosen by an administrator, not by the reported ids
    manual_binding: bool,
    device_info: Option<DeviceInfo>,
    handler: Option<Box<dyn UnitHandler>>,
    options: UnitOptions,
    wakeup_queue: WakeupQueue,
    awake_until: Option<Instant>,
    retries: u32,
    next_attempt: Option<Instant>,
    auto_config: AutoConfigSchedule,
    config_error: Option<ConfigError>,
    log: UnitLogger,
}

impl UnitInfo {
    /// A unit for a node that was just found
    pub fn new(node_id: NodeId, name: impl Into<String>, log: UnitLogger) -> Self {
        Self {
            node_id,
            name: name.into(),
            serial: 0,
            state: UnitState::InitUnit,
            caps: NodeCaps::default(),
            man_ids: ManIds::default(),
            manual_binding: false,
            device_info: None,
            handler: None,
            options: UnitOptions::default(),
            wakeup_queue: WakeupQueue::default(),
            awake_until: None,
            retries: 0,
            next_attempt: None,
            auto_config: AutoConfigSchedule::default(),
            config_error: None,
            log,
        }
    }

    /// A unit loaded from persistence. If its ids are known, it re-binds from the catalog
    /// on its first `process`, otherwise discovery starts over.
    pub fn from_record(record: UnitRecord, log: UnitLogger) -> Self {
        let mut ret = Self::new(record.node_id, record.name, log);
        ret.serial = record.serial;
        ret.options = record.options;
        ret.man_ids = record.man_ids;
        ret.manual_binding = record.manual_binding;
        if !ret.man_ids.is_unset() {
            ret.state = UnitState::HaveDevInfo;
        }
        ret
    }

    pub fn to_record(&self) -> UnitRecord {
        UnitRecord {
            node_id: self.node_id,
            name: self.name.clone(),
            man_ids: self.man_ids,
            manual_binding: self.manual_binding,
            options: self.options.clone(),
            serial: self.serial,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn caps(&self) -> NodeCaps {
        self.caps
    }

    pub fn man_ids(&self) -> ManIds {
        self.man_ids
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    pub fn handler(&self) -> Option<&dyn UnitHandler> {
        self.handler.as_deref()
    }

    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    pub fn config_error(&self) -> Option<&ConfigError> {
        self.config_error.as_ref()
    }

    pub fn wakeup_queue_len(&self) -> usize {
        self.wakeup_queue.len()
    }

    pub fn is_awake(&self, now: Instant) -> bool {
        self.awake_until.is_some_and(|until| now <= until)
    }

    pub fn status(&self) -> UnitStatus {
        if self.config_error.is_some() || self.state.needs_action() {
            UnitStatus::NeedsAction
        } else if self.state != UnitState::Ready {
            UnitStatus::Busy
        } else if self.handler.as_ref().is_some_and(|h| h.stopped_responding()) {
            UnitStatus::Failed
        } else {
            UnitStatus::Ready
        }
    }

    fn bump_serial(&mut self) {
        self.serial = self.serial.wrapping_add(1);
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.bump_serial();
        // The fields are registered under the old name
        if let Some(handler) = &mut self.handler {
            handler.store_field_ids(&|_| None);
        }
    }

    fn set_state(&mut self, state: UnitState) {
        if state != self.state {
            self.log.info(format!("{} -> {}", self.state, state));
            self.state = state;
        }
        self.retries = 0;
        self.next_attempt = None;
    }

    fn attempt_due(&self, now: Instant) -> bool {
        self.next_attempt.is_none_or(|next| now >= next)
    }

    fn attempt_failed(&mut self, what: &str, now: Instant, options: &EngineOptions) {
        self.retries += 1;
        let delay = options.discovery_backoff(self.retries);
        self.next_attempt = Some(now + delay);
        self.log.verbose(format!(
            "{} failed ({} in a row), retrying in {}s",
            what,
            self.retries,
            delay.as_secs()
        ));
    }

    /// Drives discovery, or the unit handler once the unit is ready
    pub fn process(&mut self, ctx: &mut DriverCtx) {
        match self.state {
            UnitState::Unknown => self.set_state(UnitState::InitUnit),
            UnitState::InitUnit => self.init_unit(ctx),
            UnitState::GetUnitInfo => {
                if self.attempt_due(ctx.now) {
                    self.get_unit_info(ctx);
                }
            }
            UnitState::HaveDevInfo => self.bring_up(ctx),
            UnitState::Ready => {
                self.with_handler(ctx, |handler, c| handler.process(c));
                if self.auto_config.due(ctx.now) {
                    self.assert_auto_config(ctx);
                }
            }
            UnitState::NoAutoMatch | UnitState::WaitDevInfo | UnitState::WaitWakeup => {}
        }

        if self.awake_until.is_some_and(|until| ctx.now >= until) {
            self.go_to_sleep(ctx);
        }
    }

    fn init_unit(&mut self, ctx: &mut DriverCtx) {
        if !self.attempt_due(ctx.now) {
            return;
        }
        if !self.refresh_caps(ctx.ctl) {
            self.attempt_failed("reading the node capabilities", ctx.now, ctx.options);
            return;
        }
        self.set_state(UnitState::GetUnitInfo);
        self.get_unit_info(ctx);
    }

    /// Reads the capabilities from the controller. Classes learned from a node info frame stay known.
    fn refresh_caps(&mut self, ctl: &dyn ControllerInterface) -> bool {
        let Some(mut caps) = ctl.node_caps(self.node_id) else {
            return false;
        };
        caps.supports_man_spec |= self.caps.supports_man_spec;
        caps.supports_wakeup |= self.caps.supports_wakeup;
        self.caps = caps;
        true
    }

    fn get_unit_info(&mut self, ctx: &mut DriverCtx) {
        let reachable = self.caps.reachable() || self.is_awake(ctx.now);
        if !self.caps.supports_man_spec {
            if reachable {
                self.log.warn("the node cannot report its manufacturer ids");
                self.set_state(UnitState::WaitDevInfo);
            } else {
                self.set_state(UnitState::WaitWakeup);
            }
            return;
        }

        match self.query_man_ids(ctx) {
            Ok(ids) => self.ids_received(ids, ctx),
            Err(e) if self.caps.reachable() => {
                self.attempt_failed(&format!("manufacturer query ({})", e), ctx.now, ctx.options);
            }
            Err(e) => {
                self.log.verbose(format!("manufacturer query failed: {}", e));
                self.set_state(UnitState::WaitWakeup);
            }
        }
    }

    fn query_man_ids(&mut self, ctx: &mut DriverCtx) -> Result<ManIds, TransmitError> {
        let get = CC::from(ManufacturerSpecificCCGet::default()).as_raw();
        let mut msg = OutMsg::send_data(self.node_id, &get, MsgPriority::Control);
        msg.set_secure(self.caps.man_spec_secure);
        let reply = ReplyMatch::cc_reply(
            self.node_id,
            CommandClasses::ManufacturerSpecific,
            ManufacturerSpecificCCCommand::Report as u8,
        );
        let response = ctx.transport.request(ctx.ctl, msg, &reply, ctx.now)?;
        match response.cc()? {
            CC::ManufacturerSpecificCCReport(report) => Ok(ManIds::from(&report)),
            _ => Err(TransmitError::NoReply),
        }
    }

    fn ids_received(&mut self, ids: ManIds, ctx: &mut DriverCtx) {
        self.log.info(format!("manufacturer ids {}", ids));
        if self.man_ids != ids || self.manual_binding {
            self.man_ids = ids;
            self.manual_binding = false;
            self.bump_serial();
        }
        match ctx.catalog.find(&ids) {
            Some(info) => {
                self.device_info = Some(info);
                self.set_state(UnitState::HaveDevInfo);
                self.bring_up(ctx);
            }
            None => {
                self.log.warn(format!("no device info for {}", ids));
                self.set_state(UnitState::NoAutoMatch);
            }
        }
    }

    /// Creates and prepares the unit handler for the bound device info
    fn bring_up(&mut self, ctx: &mut DriverCtx) {
        if self.config_error.is_some() {
            return;
        }
        if self.device_info.is_none() {
            let Some(info) = ctx.catalog.find(&self.man_ids) else {
                self.log.warn(format!("no device info for {}", self.man_ids));
                self.set_state(UnitState::NoAutoMatch);
                return;
            };
            self.device_info = Some(info);
        }
        self.refresh_caps(ctx.ctl);
        let Some(info) = &self.device_info else {
            return;
        };

        let prepare = PrepareCtx {
            now: ctx.now,
            caps: self.caps,
            options: ctx.options,
        };
        let result = info
            .validate()
            .and_then(|_| create_handler(info))
            .and_then(|mut handler| {
                handler.prepare(&prepare)?;
                Ok(handler)
            });
        let device_name = info.name.clone();

        match result {
            Ok(handler) => {
                self.log.info(format!(
                    "bound to {}, handler {}",
                    device_name,
                    handler.name()
                ));
                self.handler = Some(handler);
                self.query_unit_attrs();
                self.refresh_field_ids(ctx.ctl);
                self.flag_fields_without_value(&mut *ctx.ctl);
                self.set_state(UnitState::Ready);
                self.assert_auto_config(ctx);
            }
            Err(e) => {
                self.log.error(format!("cannot bring up {}: {}", device_name, e));
                self.config_error = Some(e);
            }
        }
    }

    /// Looks up the ids of the fields the unit declares, after the host registered them
    pub fn refresh_field_ids(&mut self, ctl: &dyn ControllerInterface) {
        let prefix = &self.name;
        if let Some(handler) = &mut self.handler {
            handler.store_field_ids(&|name| ctl.field_id(&format!("{}_{}", prefix, name)));
        }
    }

    /// Capabilities start in error until their first good value
    fn flag_fields_without_value(&self, ctl: &mut dyn ControllerInterface) {
        let Some(handler) = &self.handler else {
            return;
        };
        for imp in handler.impls().iter() {
            if let (true, Some(field)) = (imp.core().in_error(), imp.core().field_id()) {
                ctl.set_field_error(field, true);
            }
        }
    }

    /// The fields of the unit, named `<unit>_<field>`
    pub fn field_defs(&self) -> Vec<FieldDef> {
        let mut defs = Vec::new();
        if let Some(handler) = &self.handler {
            handler.query_field_defs(&mut defs);
        }
        for def in defs.iter_mut() {
            def.name = format!("{}_{}", self.name, def.name);
        }
        defs
    }

    pub fn owns_field(&self, field: FieldId) -> bool {
        self.handler
            .as_ref()
            .is_some_and(|h| h.impls().iter().any(|imp| imp.owns_field(field)))
    }

    /// The options the handler understands. Stored options nobody understands anymore are
    /// dropped, new ones get their default, and the result is applied to the handler.
    pub fn query_unit_attrs(&mut self) -> Vec<UnitAttr> {
        let mut attrs = Vec::new();
        let Some(handler) = &mut self.handler else {
            // Keep the stored options until there is a handler to judge them
            return attrs;
        };
        handler.query_unit_attrs(&mut attrs);
        let changed = self.options.prune(&attrs);
        handler.apply_options(&self.options);
        if changed {
            self.bump_serial();
        }
        attrs
    }

    /// Stores an option without checking it
    pub fn set_option(&mut self, key: &str, value: &str) {
        if self.options.set(key, value) {
            self.bump_serial();
        }
        if let Some(handler) = &mut self.handler {
            handler.apply_options(&self.options);
        }
    }

    /// Stores an option after checking it against the attributes the handler declares
    pub fn edit_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut attrs = Vec::new();
        if let Some(handler) = &self.handler {
            handler.query_unit_attrs(&mut attrs);
        }
        let attr = attrs
            .iter()
            .find(|attr| attr.key == key)
            .ok_or_else(|| ConfigError::UnknownOption(key.to_string()))?;
        if !attr.accepts(value) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.set_option(key, value);
        Ok(())
    }

    /// Forgets everything learned about the node except its id and name. Discovery starts over.
    pub fn force_rescan(&mut self) {
        self.log.info("rescanning");
        self.handler = None;
        self.device_info = None;
        self.config_error = None;
        self.man_ids = ManIds::default();
        self.manual_binding = false;
        self.auto_config.cancel();
        self.wakeup_queue.clear();
        self.set_state(UnitState::InitUnit);
        self.bump_serial();
    }

    /// Binds the catalog device with the given ids, regardless of what the node reports
    pub fn bind_device_info(&mut self, ids: ManIds, ctx: &mut DriverCtx) -> Result<(), ConfigError> {
        let info = ctx
            .catalog
            .find(&ids)
            .ok_or_else(|| ConfigError::NoDeviceInfo(ids.to_string()))?;
        info.validate()?;

        self.log.info(format!("manually bound to {}", ids));
        self.handler = None;
        self.config_error = None;
        self.man_ids = ids;
        self.manual_binding = true;
        self.device_info = Some(info);
        self.bump_serial();
        self.set_state(UnitState::HaveDevInfo);
        self.bring_up(ctx);
        match &self.config_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Handles a message from this node
    pub fn handle_message(&mut self, msg: &InMsg, ctx: &mut DriverCtx) -> HandleResult {
        if let Some(info) = msg.node_info() {
            self.on_awake(Some(&info.supported_classes), ctx);
            return HandleResult::Handled;
        }
        if msg.is_wakeup_notification() {
            self.on_awake(None, ctx);
            return HandleResult::Handled;
        }
        if !msg.is_cc_msg() {
            return HandleResult::Unhandled;
        }

        let cc = match msg.cc() {
            Ok(cc) => cc,
            Err(e) => {
                self.log.warn(format!("discarding command: {}", e));
                return HandleResult::Unhandled;
            }
        };
        match &cc {
            CC::SecurityCCNonceGet(_) => {
                if let Err(e) = ctx.transport.answer_nonce_get(ctx.ctl, self.node_id, ctx.now) {
                    self.log.warn(format!("cannot answer the nonce request: {}", e));
                }
                return HandleResult::Handled;
            }
            CC::SecurityCCNonceReport(report) => {
                ctx.transport.store_nonce(self.node_id, report.nonce.clone(), ctx.now);
                return HandleResult::Handled;
            }
            CC::ManufacturerSpecificCCReport(report) => {
                let ids = ManIds::from(report);
                if !self.manual_binding && !self.man_ids.is_unset() && ids != self.man_ids {
                    self.log.warn(format!(
                        "manufacturer ids changed from {} to {}",
                        self.man_ids, ids
                    ));
                    self.force_rescan();
                    return HandleResult::Handled;
                }
            }
            _ => {}
        }

        if self.state != UnitState::Ready {
            return HandleResult::Unhandled;
        }
        self.with_handler(ctx, |handler, c| handler.handle_message(msg, &cc, c))
            .unwrap_or(HandleResult::Unhandled)
    }

    /// A field of this unit was written by the host
    pub fn field_changed(&mut self, field: FieldId, value: &FieldValue, ctx: &mut DriverCtx) -> WriteResult {
        if self.state != UnitState::Ready {
            return WriteResult::CommFailure;
        }
        self.with_handler(ctx, |handler, c| handler.field_changed(field, value, c))
            .unwrap_or(WriteResult::CommFailure)
    }

    /// The node signalled that it is awake, by a wakeup notification or a node info frame
    fn on_awake(&mut self, classes: Option<&[u8]>, ctx: &mut DriverCtx) {
        if let Some(classes) = classes {
            self.caps.supports_man_spec |= classes.contains(&(CommandClasses::ManufacturerSpecific as u8));
            self.caps.supports_wakeup |= classes.contains(&(CommandClasses::WakeUp as u8));
        }
        let sleeper = !self.caps.reachable();
        if sleeper {
            self.log.verbose("awake");
            self.awake_until = Some(ctx.now + ctx.options.wake_window);
        }

        self.drain_wakeup_queue(ctx);
        if self.state == UnitState::WaitWakeup {
            self.set_state(UnitState::GetUnitInfo);
            self.get_unit_info(ctx);
        }
        if self.state == UnitState::Ready {
            self.with_handler(ctx, |handler, c| handler.on_wakeup(c));
        }
        if sleeper && ctx.options.wake_window.is_zero() {
            self.go_to_sleep(ctx);
        }
    }

    fn drain_wakeup_queue(&mut self, ctx: &mut DriverCtx) {
        let msgs = self.wakeup_queue.take_all();
        if msgs.is_empty() {
            return;
        }
        self.log.verbose(format!("sending {} queued messages", msgs.len()));
        for msg in msgs {
            if let Err(e) = ctx.transport.transmit(ctx.ctl, msg, SendMode::WaitAck, ctx.now) {
                self.log.warn(format!("queued message not delivered: {}", e));
            }
        }
    }

    fn go_to_sleep(&mut self, ctx: &mut DriverCtx) {
        self.awake_until = None;
        if !self.caps.supports_wakeup {
            return;
        }
        let cc = CC::from(WakeUpCCNoMoreInformation::default()).as_raw();
        let msg = OutMsg::send_data(self.node_id, &cc, MsgPriority::Control);
        if let Err(e) = ctx.transport.transmit(ctx.ctl, msg, SendMode::Async, ctx.now) {
            self.log.debug(format!("cannot send the node back to sleep: {}", e));
        }
    }

    /// Sends the auto-configuration of the device info and plans the next round
    fn assert_auto_config(&mut self, ctx: &mut DriverCtx) {
        let Some(info) = &self.device_info else {
            return;
        };
        let commands = info.auto_config.commands(ctx.ctl.own_node_id());
        self.auto_config.schedule(ctx.now, ctx.options);
        if commands.is_empty() {
            return;
        }
        self.log.info(format!("asserting auto-configuration, {} commands", commands.len()));
        for cc in commands {
            self.route(
                Outbound {
                    cc,
                    endpoint: EndpointIndex::Root,
                    priority: MsgPriority::Low,
                    confirms: None,
                },
                ctx,
            );
        }
    }

    fn must_encrypt(&self, cc: &CC) -> bool {
        self.caps.secure
            && self
                .device_info
                .as_ref()
                .is_some_and(|info| info.secure_classes().contains(&(cc.cc_id() as u8)))
    }

    /// Sends a command to the node right away, or keeps it until the node wakes up
    fn route(&mut self, out: Outbound, ctx: &mut DriverCtx) {
        let mut msg =
            OutMsg::send_data_to_endpoint(self.node_id, out.endpoint, &out.cc.as_raw(), out.priority);
        if self.must_encrypt(&out.cc) {
            msg.set_secure(true);
        }

        let accepted = if self.caps.reachable() {
            ctx.transport.queue(msg);
            true
        } else if self.is_awake(ctx.now) {
            match ctx.transport.transmit(ctx.ctl, msg, SendMode::WaitAck, ctx.now) {
                Ok(()) => true,
                Err(e) => {
                    self.log.warn(format!("{} not delivered: {}", out.cc.cc_id(), e));
                    false
                }
            }
        } else {
            self.wakeup_queue.push(msg);
            true
        };

        if let (true, Some(impl_id)) = (accepted, out.confirms) {
            self.with_handler(ctx, |handler, c| handler.write_sent(impl_id, c));
        }
    }

    /// Runs a call on the unit handler and carries out what it asked for
    fn with_handler<R>(
        &mut self,
        ctx: &mut DriverCtx,
        f: impl FnOnce(&mut dyn UnitHandler, &mut ImplCtx) -> R,
    ) -> Option<R> {
        let handler = self.handler.as_mut()?;
        let mut impl_ctx = ImplCtx::new(
            ctx.now,
            self.node_id,
            &self.name,
            self.caps,
            ctx.options,
            &self.log,
        );
        let ret = f(handler.as_mut(), &mut impl_ctx);
        let ImplCtx {
            events,
            outbound,
            triggers,
            ..
        } = impl_ctx;
        self.apply(events, outbound, triggers, ctx);
        Some(ret)
    }

    fn apply(
        &mut self,
        events: Vec<ImplEvent>,
        outbound: Vec<Outbound>,
        triggers: Vec<EventTrigger>,
        ctx: &mut DriverCtx,
    ) {
        for event in &events {
            match event {
                ImplEvent::ValueChanged {
                    field: Some(field),
                    value,
                    ..
                } => ctx.ctl.write_field(*field, value),
                ImplEvent::EnteredError {
                    field: Some(field), ..
                } => ctx.ctl.set_field_error(*field, true),
                ImplEvent::LeftError {
                    field: Some(field), ..
                } => ctx.ctl.set_field_error(*field, false),
                _ => {}
            }
        }
        for trigger in triggers {
            ctx.ctl.queue_event_trigger(trigger);
        }
        for out in outbound {
            self.route(out, ctx);
        }
    }

    /// Diagnostic text for the administrator
    pub fn report(&self, now: Instant) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Unit {} ({})", self.name, self.node_id);
        let _ = writeln!(out, "State: {}, status {:?}", self.state, self.status());
        let _ = writeln!(
            out,
            "Listener: {}, frequent listener: {}, secure: {}",
            self.caps.listener, self.caps.frequent_listener, self.caps.secure
        );
        if !self.man_ids.is_unset() {
            let manual = if self.manual_binding { " (manual)" } else { "" };
            let _ = writeln!(out, "Manufacturer ids: {}{}", self.man_ids, manual);
        }
        if let Some(info) = &self.device_info {
            let _ = writeln!(out, "Device: {} {}", info.make, info.name);
        }
        if let Some(e) = &self.config_error {
            let _ = writeln!(out, "Configuration error: {}", e);
        }
        if self.retries > 0 {
            let _ = writeln!(out, "Failed attempts: {}", self.retries);
        }
        if let Some(next) = self.next_attempt {
            let _ = writeln!(
                out,
                "Next attempt in {}s",
                next.saturating_duration_since(now).as_secs()
            );
        }
        if !self.wakeup_queue.is_empty() {
            let _ = writeln!(out, "Waiting for wakeup: {} messages", self.wakeup_queue.len());
        }
        for (key, value) in self.options.iter() {
            let _ = writeln!(out, "Option {} = {}", key, value);
        }
        if let Some(handler) = &self.handler {
            handler.report(&mut out, now);
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::controller::EventKind;
    use crate::device_info::MemCatalog;
    use crate::testing::*;
    use std::sync::Arc;
    use std::time::Duration;
    use zwave_logging::loggers::CapturingLogger;

    const NODE: u8 = 7;

    fn unit() -> UnitInfo {
        UnitInfo::new(
            NodeId::new(NODE),
            "Kitchen",
            UnitLogger::new(Arc::new(CapturingLogger::default()), NodeId::new(NODE)),
        )
    }

    fn listener_caps() -> NodeCaps {
        NodeCaps {
            listener: true,
            supports_man_spec: true,
            ..Default::default()
        }
    }

    fn sleeper_caps() -> NodeCaps {
        NodeCaps {
            supports_wakeup: true,
            supports_man_spec: true,
            ..Default::default()
        }
    }

    fn man_spec_report(ids: ManIds) -> InMsg {
        let report = ManufacturerSpecificCCReport {
            manufacturer_id: ids.manufacturer,
            product_type: ids.product_type,
            product_id: ids.product_id,
        };
        InMsg::application_command(NodeId::new(NODE), &CC::from(report).as_raw())
    }

    fn switch_ids() -> ManIds {
        ManIds::new(0x0086, 0x0003, 0x0060)
    }

    fn sleepy_ids() -> ManIds {
        ManIds::new(0x0086, 0x0004, 0x0010)
    }

    /// Owns what a `DriverCtx` borrows
    struct Env {
        ctl: FakeController,
        transport: Transport,
        catalog: MemCatalog,
        options: EngineOptions,
        now: Instant,
    }

    impl Env {
        fn new(caps: NodeCaps) -> Self {
            let mut ctl = FakeController::new();
            ctl.set_caps(NodeId::new(NODE), caps);
            Self {
                ctl,
                transport: transport(),
                catalog: catalog(&[SWITCH_DEVICE, SLEEPY_DEVICE]),
                options: EngineOptions::builder().wake_window(Duration::ZERO).build(),
                now: Instant::now(),
            }
        }

        fn ctx(&mut self) -> DriverCtx<'_> {
            DriverCtx {
                now: self.now,
                ctl: &mut self.ctl,
                transport: &mut self.transport,
                catalog: &self.catalog,
                options: &self.options,
            }
        }

        fn process(&mut self, unit: &mut UnitInfo) {
            unit.process(&mut self.ctx());
        }

        fn deliver(&mut self, unit: &mut UnitInfo, msg: &InMsg) -> HandleResult {
            unit.handle_message(msg, &mut self.ctx())
        }

        fn wakeup(&mut self, unit: &mut UnitInfo) {
            let msg = InMsg::application_command(
                NodeId::new(NODE),
                &CC::from(WakeUpCCNotification::default()).as_raw(),
            );
            self.deliver(unit, &msg);
        }
    }

    #[test]
    fn test_listener_discovery() {
        let mut env = Env::new(listener_caps());
        env.ctl.register_field("Kitchen_Switch", FieldId(3));
        env.ctl.script_reply(man_spec_report(switch_ids()));
        let mut unit = unit();

        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::Ready);
        assert_eq!(unit.status(), UnitStatus::Ready);
        assert_eq!(unit.man_ids(), switch_ids());
        assert!(unit.owns_field(FieldId(3)));
        assert_eq!(unit.field_defs()[0].name, "Kitchen_Switch");
        // The association is queued right away
        assert_eq!(env.transport.queued().len(), 1);
        let queued = env.transport.queued_mut().pop().unwrap();
        assert_eq!(
            queued.class_cmd(),
            Some((CommandClasses::Association as u8, 0x01))
        );
    }

    #[test]
    fn test_listener_discovery_backoff() {
        let mut env = Env::new(listener_caps());
        let mut unit = unit();

        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::GetUnitInfo);
        assert_eq!(env.ctl.sent().len(), 1);

        // Not due before the back-off expired
        env.now += Duration::from_secs(29);
        env.process(&mut unit);
        assert_eq!(env.ctl.sent().len(), 1);

        env.now += Duration::from_secs(1);
        env.process(&mut unit);
        assert_eq!(env.ctl.sent().len(), 2);
        env.now += Duration::from_secs(59);
        env.process(&mut unit);
        assert_eq!(env.ctl.sent().len(), 2);
        assert_eq!(unit.status(), UnitStatus::Busy);

        env.now += Duration::from_secs(1);
        env.ctl.script_reply(man_spec_report(switch_ids()));
        env.process(&mut unit);
        assert_eq!(env.ctl.sent().len(), 3);
        assert_eq!(unit.state(), UnitState::Ready);
        assert!(!unit.report(env.now).contains("Failed attempts"));
    }

    #[test]
    fn test_silent_sleeper_waits_for_wakeup() {
        let mut env = Env::new(NodeCaps {
            supports_wakeup: true,
            ..Default::default()
        });
        let mut unit = unit();

        for _ in 0..10 {
            env.process(&mut unit);
            assert_eq!(unit.state(), UnitState::WaitWakeup);
            env.now += Duration::from_secs(3600);
        }
        // Nothing is sent to a node that sleeps
        assert!(env.ctl.sent().is_empty());

        // Its node info says it can report its ids after all
        env.ctl.script_reply(man_spec_report(sleepy_ids()));
        let nif = InMsg::node_info_update(
            NodeId::new(NODE),
            &[
                CommandClasses::ManufacturerSpecific as u8,
                CommandClasses::WakeUp as u8,
            ],
        );
        assert_eq!(env.deliver(&mut unit, &nif), HandleResult::Handled);
        assert_eq!(unit.state(), UnitState::Ready);

        // Auto-configuration went out during the same wakeup, then the node was sent back to sleep
        let commands = env.ctl.sent_commands();
        assert_eq!(commands[0], (CommandClasses::ManufacturerSpecific as u8, 0x04));
        assert_eq!(commands[1], (CommandClasses::WakeUp as u8, 0x04));
        assert_eq!(
            commands.last(),
            Some(&(CommandClasses::WakeUp as u8, 0x08))
        );
        assert_eq!(unit.wakeup_queue_len(), 0);
    }

    #[test]
    fn test_sleeper_without_man_spec_needs_binding() {
        let mut env = Env::new(NodeCaps {
            supports_wakeup: true,
            ..Default::default()
        });
        let mut unit = unit();
        env.process(&mut unit);
        env.wakeup(&mut unit);
        assert_eq!(unit.state(), UnitState::WaitDevInfo);
        assert_eq!(unit.status(), UnitStatus::NeedsAction);

        unit.bind_device_info(sleepy_ids(), &mut env.ctx()).unwrap();
        assert_eq!(unit.state(), UnitState::Ready);
        assert!(unit.to_record().manual_binding);
    }

    #[test]
    fn test_wakeup_queue_is_fifo() {
        let mut env = Env::new(sleeper_caps());
        let mut unit = unit();
        unit.bind_device_info(sleepy_ids(), &mut env.ctx()).unwrap();
        env.process(&mut unit);
        // The wakeup interval set from the auto-configuration
        assert_eq!(unit.wakeup_queue_len(), 1);

        let configs: Vec<CC> = (1..=3)
            .map(|p| {
                ConfigurationCCSet::builder()
                    .parameter(p)
                    .value(p as i32)
                    .build()
                    .into()
            })
            .collect();
        for cc in configs {
            unit.route(
                Outbound {
                    cc,
                    endpoint: EndpointIndex::Root,
                    priority: MsgPriority::Command,
                    confirms: None,
                },
                &mut env.ctx(),
            );
        }
        assert_eq!(unit.wakeup_queue_len(), 4);
        assert!(env.ctl.sent().is_empty());

        env.wakeup(&mut unit);
        assert_eq!(unit.wakeup_queue_len(), 0);
        let params: Vec<u8> = env
            .ctl
            .sent()
            .iter()
            .filter(|m| m.class_cmd() == Some((CommandClasses::Configuration as u8, 0x04)))
            .map(|m| m.cc_bytes().unwrap()[2])
            .collect();
        assert_eq!(params, vec![1, 2, 3]);
        let commands = env.ctl.sent_commands();
        assert_eq!(commands[0], (CommandClasses::WakeUp as u8, 0x04));
        assert_eq!(commands[4], (CommandClasses::BinarySwitch as u8, 0x02));
    }

    #[test]
    fn test_wake_window() {
        let mut env = Env::new(sleeper_caps());
        env.options = EngineOptions::builder()
            .wake_window(Duration::from_secs(10))
            .build();
        let mut unit = unit();
        unit.bind_device_info(sleepy_ids(), &mut env.ctx()).unwrap();

        env.wakeup(&mut unit);
        assert!(unit.is_awake(env.now));
        let sent = env.ctl.sent().len();

        env.now += Duration::from_secs(10);
        env.process(&mut unit);
        assert!(!unit.is_awake(env.now));
        assert_eq!(env.ctl.sent().len(), sent + 1);
        assert_eq!(
            env.ctl.sent_commands().last(),
            Some(&(CommandClasses::WakeUp as u8, 0x08))
        );
    }

    #[test]
    fn test_no_catalog_match() {
        let mut env = Env::new(listener_caps());
        env.ctl.script_reply(man_spec_report(ManIds::new(1, 2, 3)));
        let mut unit = unit();
        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::NoAutoMatch);
        assert_eq!(unit.status(), UnitStatus::NeedsAction);

        assert_eq!(
            unit.bind_device_info(ManIds::new(9, 9, 9), &mut env.ctx()),
            Err(ConfigError::NoDeviceInfo("0009-0009-0009".to_string()))
        );
        unit.bind_device_info(switch_ids(), &mut env.ctx()).unwrap();
        assert_eq!(unit.state(), UnitState::Ready);
    }

    #[test]
    fn test_config_error_is_reported() {
        let mut env = Env::new(listener_caps());
        env.catalog
            .parse_str(
                r#"
                name = "Broken Lock"
                handler = "Lock"
                ids = { manufacturer = 5, product_type = 5, product_id = 5 }
                [[classes]]
                class = "Battery"
                "#,
            )
            .unwrap();
        env.ctl.script_reply(man_spec_report(ManIds::new(5, 5, 5)));
        let mut unit = unit();
        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::HaveDevInfo);
        assert_eq!(unit.status(), UnitStatus::NeedsAction);
        assert!(matches!(
            unit.config_error(),
            Some(ConfigError::MissingClass { .. })
        ));
        assert!(unit.report(env.now).contains("Configuration error"));

        // Stays put
        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::HaveDevInfo);
    }

    #[test]
    fn test_values_reach_the_host() {
        let mut env = Env::new(listener_caps());
        env.ctl.register_field("Kitchen_Switch", FieldId(3));
        let mut unit = unit();
        unit.bind_device_info(switch_ids(), &mut env.ctx()).unwrap();

        let report = InMsg::application_command(
            NodeId::new(NODE),
            &CC::from(
                BinarySwitchCCReport::builder()
                    .current_value(BinaryReport::On)
                    .build(),
            )
            .as_raw(),
        );
        assert_eq!(env.deliver(&mut unit, &report), HandleResult::ValueProduced);
        assert_eq!(env.ctl.written(), &[(FieldId(3), FieldValue::Bool(true))]);

        // Writes are queued for the listener and the value is assumed
        let before = env.transport.queued().len();
        assert_eq!(
            unit.field_changed(FieldId(3), &FieldValue::Bool(false), &mut env.ctx()),
            WriteResult::Ok
        );
        assert_eq!(env.transport.queued().len(), before + 1);
        assert_eq!(env.ctl.written().last(), Some(&(FieldId(3), FieldValue::Bool(false))));
    }

    #[test]
    fn test_options_follow_the_handler() {
        let mut env = Env::new(sleeper_caps());
        let mut unit = unit();
        unit.set_option("Stale", "1");
        let serial = unit.serial();
        unit.bind_device_info(sleepy_ids(), &mut env.ctx()).unwrap();
        assert!(unit.serial() > serial);
        assert_eq!(unit.options().get("Stale"), None);
        assert_eq!(unit.options().get("LowBattery"), Some("20"));

        assert_eq!(
            unit.edit_option("Nope", "1"),
            Err(ConfigError::UnknownOption("Nope".to_string()))
        );
        assert!(matches!(
            unit.edit_option("LowBattery", "300"),
            Err(ConfigError::InvalidValue { .. })
        ));
        unit.edit_option("LowBattery", "30").unwrap();
        assert_eq!(unit.options().opt_card("LowBattery", 0), 30);
    }

    #[test]
    fn test_changed_ids_force_rescan() {
        let mut env = Env::new(listener_caps());
        env.ctl.script_reply(man_spec_report(switch_ids()));
        let mut unit = unit();
        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::Ready);

        let serial = unit.serial();
        env.deliver(&mut unit, &man_spec_report(sleepy_ids()));
        assert_eq!(unit.state(), UnitState::InitUnit);
        assert!(unit.handler().is_none());
        assert_eq!(unit.name(), "Kitchen");
        assert_ne!(unit.serial(), serial);
    }

    #[test]
    fn test_restored_unit_rebinds() {
        let mut env = Env::new(listener_caps());
        let mut options = UnitOptions::default();
        options.set("PollSecs", "120");
        let record = UnitRecord {
            node_id: NodeId::new(NODE),
            name: "Hall".to_string(),
            man_ids: switch_ids(),
            manual_binding: false,
            options,
            serial: 12,
        };
        let mut unit = UnitInfo::from_record(
            record.clone(),
            UnitLogger::new(Arc::new(CapturingLogger::default()), NodeId::new(NODE)),
        );
        assert_eq!(unit.state(), UnitState::HaveDevInfo);
        assert_eq!(unit.to_record(), record);

        env.process(&mut unit);
        assert_eq!(unit.state(), UnitState::Ready);
        // No manufacturer query was needed
        assert!(env.ctl.sent().is_empty());
        assert_eq!(unit.options().get("PollSecs"), Some("120"));
    }

    #[test]
    fn test_scene_controller_triggers() {
        let mut env = Env::new(listener_caps());
        env.catalog
            .parse_str(
                r#"
                name = "Remote"
                handler = "SceneController"
                ids = { manufacturer = 6, product_type = 6, product_id = 6 }
                "#,
            )
            .unwrap();
        let mut unit = unit();
        unit.bind_device_info(ManIds::new(6, 6, 6), &mut env.ctx()).unwrap();

        let set = InMsg::application_command(
            NodeId::new(NODE),
            &CC::from(SceneActivationCCSet::builder().scene_id(3).build()).as_raw(),
        );
        env.deliver(&mut unit, &set);
        assert_eq!(env.ctl.triggers().len(), 1);
        assert_eq!(env.ctl.triggers()[0].kind, EventKind::UserAction);
        assert_eq!(env.ctl.triggers()[0].unit, "Kitchen");
    }
}
