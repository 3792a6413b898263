use super::{CCImplOps, HandleResult, ImplCore, ImplCtx};
use crate::controller::{EventKind, EventTrigger};
use crate::fields::{AccessFlags, FieldKind, FieldValue, WriteResult};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

/// A lock with a single locked/unlocked field
#[derive(Debug, Clone, PartialEq)]
pub struct DoorLockImpl {
    core: ImplCore,
    locked: Option<bool>,
    pending: Option<bool>,
}

pub(crate) fn lock_trigger(unit: &str, field: Option<&str>, locked: bool, source: &str) -> EventTrigger {
    let mut trigger = EventTrigger::new(EventKind::LockStatus, unit);
    if let Some(field) = field {
        trigger = trigger.with_field(field);
    }
    trigger
        .with_param(if locked { "locked" } else { "unlocked" })
        .with_param(source)
}

impl DoorLockImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::DoorLock, endpoint),
            locked: None,
            pending: None,
        }
    }

    pub fn locked(&self) -> Option<bool> {
        self.locked
    }

    /// Takes a lock state another class observed. Reported like a value of our own, but
    /// the other class already raised the lock trigger.
    pub fn observe_locked(&mut self, locked: bool, ctx: &mut ImplCtx) {
        self.core.report_value(
            &mut self.locked,
            locked,
            FieldValue::Bool(locked),
            0,
            ctx,
        );
    }
}

impl CCImplOps for DoorLockImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        "Locked"
    }

    fn field_kind(&self) -> Option<FieldKind> {
        Some(FieldKind::Bool)
    }

    fn writable(&self) -> bool {
        true
    }

    fn build_query(&self) -> Option<CC> {
        Some(DoorLockCCOperationGet::default().into())
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::DoorLockCCOperationReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        let Some(locked) = report.current_mode.is_locked() else {
            return HandleResult::Handled;
        };
        let changed = self.core.report_value(
            &mut self.locked,
            locked,
            FieldValue::Bool(locked),
            0,
            ctx,
        );
        if changed {
            ctx.triggers.push(lock_trigger(
                ctx.unit_name,
                self.core.field_name(),
                locked,
                "report",
            ));
        }
        HandleResult::ValueProduced
    }

    fn field_changed(&mut self, value: &FieldValue, ctx: &mut ImplCtx) -> WriteResult {
        if !self.core.access().contains(AccessFlags::WRITABLE) {
            return WriteResult::NotWritable;
        }
        let FieldValue::Bool(locked) = value else {
            return WriteResult::ValueRejected(format!("{} is not a lock state", value));
        };
        let set = DoorLockCCOperationSet::builder()
            .mode(DoorLockMode::from(*locked))
            .build();
        self.core.send_write(set.into(), ctx);
        self.pending = Some(*locked);
        WriteResult::Ok
    }

    fn write_sent(&mut self, ctx: &mut ImplCtx) {
        let Some(locked) = self.pending.take() else {
            return;
        };
        if self.core.access().contains(AccessFlags::READ_AFTER_WRITE) {
            if let Some(query) = self.build_query() {
                self.core.send_query(query, ctx);
            }
        } else {
            self.core
                .assume_value(&mut self.locked, locked, FieldValue::Bool(locked), ctx);
        }
    }

    fn value_text(&self) -> String {
        match self.locked {
            Some(true) => "locked".to_string(),
            Some(false) => "unlocked".to_string(),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::{CCImpl, ImplEvent};
    use std::time::Instant;

    fn report(mode: DoorLockMode) -> CC {
        DoorLockCCOperationReport::builder()
            .current_mode(mode)
            .build()
            .into()
    }

    #[test]
    fn test_report_and_trigger() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(DoorLockImpl::new(EndpointIndex::Root).into(), listener(), now);
        let mut ctx = impl_ctx(now, listener(), &log);

        assert_eq!(
            imp.handle_cc(&report(DoorLockMode::Unknown), &mut ctx),
            HandleResult::Handled
        );
        imp.handle_cc(&report(DoorLockMode::Secured), &mut ctx);
        imp.handle_cc(&report(DoorLockMode::InsideUnsecured), &mut ctx);
        // Left error with the first value, then two changes
        assert_eq!(ctx.events.len(), 3);
        assert_eq!(ctx.triggers.len(), 2);
        assert_eq!(ctx.triggers[1].params, vec!["unlocked", "report"]);
    }

    #[test]
    fn test_observed_state_has_no_trigger() {
        let now = Instant::now();
        let log = logger();
        let imp = prepared(DoorLockImpl::new(EndpointIndex::Root).into(), listener(), now);
        let CCImpl::DoorLockImpl(mut lock) = imp else {
            unreachable!();
        };
        let mut ctx = impl_ctx(now, listener(), &log);
        lock.observe_locked(true, &mut ctx);
        assert_eq!(lock.locked(), Some(true));
        assert!(matches!(
            ctx.events.last(),
            Some(ImplEvent::ValueChanged {
                value: FieldValue::Bool(true),
                ..
            })
        ));
        assert!(ctx.triggers.is_empty());

        // The report that follows confirms what we already know
        let events = ctx.events.len();
        lock.handle_cc(&report(DoorLockMode::Secured), &mut ctx);
        assert_eq!(ctx.events.len(), events);
        assert!(ctx.triggers.is_empty());
    }

    #[test]
    fn test_write() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(DoorLockImpl::new(EndpointIndex::Root).into(), listener(), now);
        let mut ctx = impl_ctx(now, listener(), &log);
        assert_eq!(
            imp.field_changed(&FieldValue::Bool(true), &mut ctx),
            WriteResult::Ok
        );
        assert_eq!(
            ctx.outbound[0].cc,
            CC::from(
                DoorLockCCOperationSet::builder()
                    .mode(DoorLockMode::Secured)
                    .build()
            )
        );
        imp.write_sent(&mut ctx);
        assert_eq!(imp.value_text(), "locked");
    }
}
