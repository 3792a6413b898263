use crate::ccimpl::{CCImpl, CCImplOps, ExtraInfo, HandleResult, ImplCtx, ImplEvent, PrepareCtx};
use crate::error::ConfigError;
use crate::fields::{AttrKind, FieldDef, FieldId, FieldValue, UnitAttr, WriteResult};
use crate::unit_info::UnitOptions;
use std::fmt::Write;
use std::time::Instant;
use zwave_cc::prelude::*;
use zwave_core::submodule;
use zwave_serial::message::InMsg;

submodule!(impl_set);
submodule!(generic);
submodule!(lock);
submodule!(scene_ctrl);
submodule!(factory);

/// Index of a capability in its unit's [`ImplSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImplId(pub u8);

pub const POLL_SECS_OPTION: &str = "PollSecs";

/// The behavior of one node once its device info is known. Owns the node's capabilities,
/// or handles the command class traffic itself.
pub trait UnitHandler: Send {
    /// Name of the handler kind, as used in the device info
    fn name(&self) -> &'static str;

    fn impls(&self) -> &ImplSet;
    fn impls_mut(&mut self) -> &mut ImplSet;

    /// Parses the unit level keys of the device info. Called before [`UnitHandler::prepare`].
    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        let _ = extra;
        Ok(())
    }

    fn prepare(&mut self, ctx: &PrepareCtx) -> Result<(), ConfigError> {
        for imp in self.impls_mut().iter_mut() {
            imp.prepare(ctx)?;
        }
        Ok(())
    }

    fn query_field_defs(&self, defs: &mut Vec<FieldDef>) {
        for imp in self.impls().iter() {
            imp.query_field_defs(defs);
        }
    }

    fn store_field_ids(&mut self, lookup: &dyn Fn(&str) -> Option<FieldId>) {
        for imp in self.impls_mut().iter_mut() {
            imp.store_field_ids(lookup);
        }
    }

    fn query_unit_attrs(&self, attrs: &mut Vec<UnitAttr>) {
        if self.impls().iter().any(|imp| imp.core().poll_interval().is_some()) {
            attrs.push(UnitAttr::new(
                POLL_SECS_OPTION,
                AttrKind::Card { min: 0, max: 86400 },
                "0",
                "Poll interval in seconds, 0 for the default",
            ));
        }
        for imp in self.impls().iter() {
            imp.query_unit_attrs(attrs);
        }
    }

    fn apply_options(&mut self, options: &UnitOptions) {
        for imp in self.impls_mut().iter_mut() {
            imp.apply_options(options);
        }
    }

    /// Routes an inbound command to the capability for its class and end point
    fn handle_message(&mut self, msg: &InMsg, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        self.dispatch_to_impls(msg, cc, ctx)
    }

    fn dispatch_to_impls(&mut self, msg: &InMsg, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let class_id = cc.cc_id() as u8;
        let endpoint = msg.source_endpoint();
        let first_event = ctx.events.len();
        let mut ret = HandleResult::Unhandled;
        for imp in self.impls_mut().iter_mut() {
            if !imp.accepts(class_id, endpoint) {
                continue;
            }
            ret = imp.handle_cc(cc, ctx);
            if ret != HandleResult::Unhandled {
                break;
            }
        }
        self.dispatch_events(first_event, ctx);
        ret
    }

    fn process(&mut self, ctx: &mut ImplCtx) {
        let first_event = ctx.events.len();
        for imp in self.impls_mut().iter_mut() {
            imp.process(ctx);
        }
        self.dispatch_events(first_event, ctx);
    }

    /// The node is awake. Capabilities that read on wakeup send their queries now.
    fn on_wakeup(&mut self, ctx: &mut ImplCtx) {
        let first_event = ctx.events.len();
        for imp in self.impls_mut().iter_mut() {
            imp.on_wakeup(ctx);
        }
        self.dispatch_events(first_event, ctx);
    }

    /// Forwards a field write to the capability that owns the field
    ///
    /// # Panics
    /// If no capability owns the field. The engine only forwards fields this unit registered.
    fn field_changed(&mut self, field: FieldId, value: &FieldValue, ctx: &mut ImplCtx) -> WriteResult {
        let first_event = ctx.events.len();
        let Some(imp) = self.impls_mut().iter_mut().find(|imp| imp.owns_field(field)) else {
            panic!("field {} is not owned by unit {}", field, ctx.unit_name);
        };
        let ret = imp.field_changed(value, ctx);
        self.dispatch_events(first_event, ctx);
        ret
    }

    /// A write issued by the given capability was accepted for sending
    fn write_sent(&mut self, impl_id: ImplId, ctx: &mut ImplCtx) {
        let first_event = ctx.events.len();
        if let Some(imp) = self.impls_mut().get_mut(impl_id) {
            imp.write_sent(ctx);
        }
        self.dispatch_events(first_event, ctx);
    }

    /// A capability reported a new value
    fn value_impl_changed(&mut self, event: &ImplEvent, ctx: &mut ImplCtx) {
        let _ = (event, ctx);
    }

    /// A capability stopped responding
    fn impl_entered_error(&mut self, impl_id: ImplId, ctx: &mut ImplCtx) {
        let _ = (impl_id, ctx);
    }

    /// Calls the hooks for the events queued since `from`. Events the hooks queue are
    /// dispatched as well.
    fn dispatch_events(&mut self, from: usize, ctx: &mut ImplCtx) {
        let mut i = from;
        while i < ctx.events.len() {
            let event = ctx.events[i].clone();
            match &event {
                ImplEvent::ValueChanged { .. } => self.value_impl_changed(&event, ctx),
                ImplEvent::EnteredError { impl_id, .. } => self.impl_entered_error(*impl_id, ctx),
                ImplEvent::LeftError { .. } => {}
            }
            i += 1;
        }
    }

    /// Whether any capability stopped responding
    fn stopped_responding(&self) -> bool {
        self.impls().iter().any(|imp| imp.core().stopped_responding())
    }

    fn report(&self, out: &mut String, now: Instant) {
        let _ = writeln!(out, "Handler {}, {} capabilities", self.name(), self.impls().len());
        for imp in self.impls().iter() {
            imp.report(out, now);
        }
    }
}

/// Creates the capabilities for the classes a device info lists. Classes without a capability
/// are skipped.
pub(crate) fn build_impls(
    classes: &[crate::device_info::ClassInfo],
) -> Result<ImplSet, ConfigError> {
    let mut impls = ImplSet::default();
    for info in classes {
        let class = info.command_class()?;
        if let Some(mut imp) = CCImpl::for_class(class, info.endpoint_index()) {
            imp.configure(&info.extra)?;
            impls.adopt(imp);
        }
    }
    Ok(impls)
}
