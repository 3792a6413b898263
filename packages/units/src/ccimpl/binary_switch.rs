use super::{CCImplOps, HandleResult, ImplCore, ImplCtx};
use crate::fields::{AccessFlags, FieldKind, FieldValue, WriteResult};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

/// An on/off switch
#[derive(Debug, Clone, PartialEq)]
pub struct BinarySwitchImpl {
    core: ImplCore,
    state: Option<bool>,
    pending: Option<bool>,
}

impl BinarySwitchImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::BinarySwitch, endpoint),
            state: None,
            pending: None,
        }
    }

    pub fn state(&self) -> Option<bool> {
        self.state
    }
}

impl CCImplOps for BinarySwitchImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        "Switch"
    }

    fn field_kind(&self) -> Option<FieldKind> {
        Some(FieldKind::Bool)
    }

    fn writable(&self) -> bool {
        true
    }

    fn build_query(&self) -> Option<CC> {
        Some(BinarySwitchCCGet::default().into())
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::BinarySwitchCCReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        let Some(state) = Option::<bool>::from(report.current_value) else {
            return HandleResult::Handled;
        };
        let aux = report
            .duration
            .and_then(|d| d.as_secs())
            .map_or(0, |secs| secs as i32);
        self.core
            .report_value(&mut self.state, state, FieldValue::Bool(state), aux, ctx);
        HandleResult::ValueProduced
    }

    fn field_changed(&mut self, value: &FieldValue, ctx: &mut ImplCtx) -> WriteResult {
        if !self.core.access().contains(AccessFlags::WRITABLE) {
            return WriteResult::NotWritable;
        }
        let FieldValue::Bool(on) = value else {
            return WriteResult::ValueRejected(format!("{} is not a switch state", value));
        };
        let set = BinarySwitchCCSet::builder()
            .target_value(BinarySet::from(*on))
            .build();
        self.core.send_write(set.into(), ctx);
        self.pending = Some(*on);
        WriteResult::Ok
    }

    fn write_sent(&mut self, ctx: &mut ImplCtx) {
        let Some(on) = self.pending.take() else {
            return;
        };
        if self.core.access().contains(AccessFlags::READ_AFTER_WRITE) {
            if let Some(query) = self.build_query() {
                self.core.send_query(query, ctx);
            }
        } else {
            self.core
                .assume_value(&mut self.state, on, FieldValue::Bool(on), ctx);
        }
    }

    fn value_text(&self) -> String {
        match self.state {
            Some(true) => "on".to_string(),
            Some(false) => "off".to_string(),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::{CCImpl, ExtraInfo, ImplEvent, PrepareCtx};
    use crate::fields::{FieldId, ValueSource};
    use std::time::Instant;

    fn report(value: BinaryReport) -> CC {
        BinarySwitchCCReport::builder().current_value(value).build().into()
    }

    #[test]
    fn test_report_then_silence() {
        let start = Instant::now();
        let log = logger();
        let mut imp = prepared(
            BinarySwitchImpl::new(EndpointIndex::Root).into(),
            listener(),
            start,
        );
        assert!(imp.core().access().contains(AccessFlags::READABLE));

        let mut ctx = impl_ctx(start, listener(), &log);
        assert_eq!(
            imp.handle_cc(&report(BinaryReport::On), &mut ctx),
            HandleResult::ValueProduced
        );
        assert!(!imp.core().in_error());
        assert_eq!(
            ctx.events,
            vec![
                ImplEvent::LeftError {
                    impl_id: crate::unit::ImplId(0),
                    field: Some(FieldId(1)),
                },
                ImplEvent::ValueChanged {
                    impl_id: crate::unit::ImplId(0),
                    field: Some(FieldId(1)),
                    value: FieldValue::Bool(true),
                    source: ValueSource::Notification,
                    aux: 0,
                },
            ]
        );
        let CCImpl::BinarySwitchImpl(switch) = &imp else {
            unreachable!();
        };
        assert_eq!(switch.state(), Some(true));

        // Nothing more arrives. Step past each poll interval.
        let mut queries = 0;
        let mut entered = 0;
        for _ in 0..3 {
            let next = imp.core().next_poll().unwrap();
            let mut ctx = impl_ctx(next, listener(), &log);
            imp.process(&mut ctx);
            queries += ctx.outbound.len();
            entered += ctx
                .events
                .iter()
                .filter(|e| matches!(e, ImplEvent::EnteredError { .. }))
                .count();
        }
        assert_eq!(queries, 3);
        assert_eq!(entered, 1);
        assert!(imp.core().in_error());

        // Further timeouts don't signal again
        let next = imp.core().next_poll().unwrap();
        let mut ctx = impl_ctx(next, listener(), &log);
        imp.process(&mut ctx);
        assert_eq!(ctx.outbound.len(), 1);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_not_due_yet() {
        let start = Instant::now();
        let log = logger();
        let mut imp = prepared(
            BinarySwitchImpl::new(EndpointIndex::Root).into(),
            listener(),
            start,
        );
        let mut ctx = impl_ctx(start, listener(), &log);
        imp.handle_cc(&report(BinaryReport::Off), &mut ctx);
        imp.process(&mut ctx);
        assert!(ctx.outbound.is_empty());
    }

    #[test]
    fn test_unchanged_value_is_quiet() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(
            BinarySwitchImpl::new(EndpointIndex::Root).into(),
            listener(),
            now,
        );
        let mut ctx = impl_ctx(now, listener(), &log);
        imp.handle_cc(&report(BinaryReport::On), &mut ctx);
        imp.handle_cc(&report(BinaryReport::On), &mut ctx);
        // The first value clears the error and changes the value, the second one is quiet
        assert_eq!(ctx.events.len(), 2);
        // Unknown is accepted, but carries no value
        assert_eq!(
            imp.handle_cc(&report(BinaryReport::Unknown), &mut ctx),
            HandleResult::Handled
        );
    }

    #[test]
    fn test_write_assumes_value() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(
            BinarySwitchImpl::new(EndpointIndex::Endpoint(1)).into(),
            listener(),
            now,
        );
        let mut ctx = impl_ctx(now, listener(), &log);
        assert_eq!(
            imp.field_changed(&FieldValue::Bool(true), &mut ctx),
            WriteResult::Ok
        );
        assert_eq!(ctx.outbound.len(), 1);
        assert_eq!(ctx.outbound[0].endpoint, EndpointIndex::Endpoint(1));
        assert_eq!(ctx.outbound[0].confirms, Some(crate::unit::ImplId(0)));
        assert!(ctx.events.is_empty());

        imp.write_sent(&mut ctx);
        assert!(matches!(
            ctx.events[0],
            ImplEvent::ValueChanged {
                source: ValueSource::Assumed,
                ..
            }
        ));

        assert!(matches!(
            imp.field_changed(&FieldValue::Card(1), &mut ctx),
            WriteResult::ValueRejected(_)
        ));
    }

    #[test]
    fn test_read_after_write() {
        let now = Instant::now();
        let log = logger();
        let mut imp: CCImpl = BinarySwitchImpl::new(EndpointIndex::Root).into();
        let extra: ExtraInfo = [("Access".to_string(), "RAW".to_string())].into();
        imp.configure(&extra).unwrap();
        imp.prepare(&PrepareCtx {
            now,
            caps: listener(),
            options: options(),
        })
        .unwrap();

        let mut ctx = impl_ctx(now, listener(), &log);
        imp.field_changed(&FieldValue::Bool(false), &mut ctx);
        imp.write_sent(&mut ctx);
        assert_eq!(ctx.outbound.len(), 2);
        assert_eq!(ctx.outbound[1].cc, CC::from(BinarySwitchCCGet::default()));
        assert!(ctx.events.is_empty());

        // The answer counts as a query result
        imp.handle_cc(&report(BinaryReport::Off), &mut ctx);
        assert!(matches!(
            ctx.events.last(),
            Some(ImplEvent::ValueChanged {
                source: ValueSource::Query,
                ..
            })
        ));
    }

    #[test]
    fn test_not_writable() {
        let now = Instant::now();
        let log = logger();
        let mut imp: CCImpl = BinarySwitchImpl::new(EndpointIndex::Root).into();
        let extra: ExtraInfo = [("Access".to_string(), "R".to_string())].into();
        imp.configure(&extra).unwrap();
        imp.prepare(&PrepareCtx {
            now,
            caps: listener(),
            options: options(),
        })
        .unwrap();
        let mut ctx = impl_ctx(now, listener(), &log);
        assert_eq!(
            imp.field_changed(&FieldValue::Bool(true), &mut ctx),
            WriteResult::NotWritable
        );
    }
}
