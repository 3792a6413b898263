use super::{CCImplOps, ExtraInfo, HandleResult, ImplCore, ImplCtx};
use crate::error::ConfigError;
use crate::fields::{AccessFlags, FieldKind, FieldValue, WriteResult};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

const LEVEL_MAX: u8 = 99;

/// A dimmer or anything else with a level from 0 to 99
#[derive(Debug, Clone, PartialEq)]
pub struct MultilevelSwitchImpl {
    core: ImplCore,
    level: Option<u8>,
    pending: Option<u8>,
    /// Transition duration sent with every level change
    duration: Option<u32>,
}

impl MultilevelSwitchImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::MultilevelSwitch, endpoint),
            level: None,
            pending: None,
            duration: None,
        }
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }
}

impl CCImplOps for MultilevelSwitchImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        "Level"
    }

    fn field_kind(&self) -> Option<FieldKind> {
        Some(FieldKind::Card {
            min: 0,
            max: LEVEL_MAX as u32,
        })
    }

    fn writable(&self) -> bool {
        true
    }

    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        if let Some(value) = extra.get("Duration") {
            let secs = value
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "Duration".to_string(),
                    value: value.clone(),
                })?;
            self.duration = Some(secs);
        }
        Ok(())
    }

    fn build_query(&self) -> Option<CC> {
        Some(MultilevelSwitchCCGet::default().into())
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::MultilevelSwitchCCReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        let LevelReport::Level(level) = report.current_value else {
            return HandleResult::Handled;
        };
        let aux = report
            .duration
            .and_then(|d| d.as_secs())
            .map_or(0, |secs| secs as i32);
        self.core.report_value(
            &mut self.level,
            level,
            FieldValue::Card(level as u32),
            aux,
            ctx,
        );
        HandleResult::ValueProduced
    }

    fn field_changed(&mut self, value: &FieldValue, ctx: &mut ImplCtx) -> WriteResult {
        if !self.core.access().contains(AccessFlags::WRITABLE) {
            return WriteResult::NotWritable;
        }
        let level = match value {
            FieldValue::Card(level) if *level <= LEVEL_MAX as u32 => *level as u8,
            _ => return WriteResult::ValueRejected(format!("{} is not a level from 0 to 99", value)),
        };
        let set = MultilevelSwitchCCSet::builder()
            .target_value(LevelSet::Level(level))
            .duration(self.duration.map(DurationSet::from_secs))
            .build();
        self.core.send_write(set.into(), ctx);
        self.pending = Some(level);
        WriteResult::Ok
    }

    fn write_sent(&mut self, ctx: &mut ImplCtx) {
        let Some(level) = self.pending.take() else {
            return;
        };
        if self.core.access().contains(AccessFlags::READ_AFTER_WRITE) {
            if let Some(query) = self.build_query() {
                self.core.send_query(query, ctx);
            }
        } else {
            self.core.assume_value(
                &mut self.level,
                level,
                FieldValue::Card(level as u32),
                ctx,
            );
        }
    }

    fn value_text(&self) -> String {
        self.level
            .map_or_else(|| "unknown".to_string(), |l| format!("{}%", l))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::{CCImpl, ImplEvent};
    use std::time::Instant;

    #[test]
    fn test_duration_extra() {
        let now = Instant::now();
        let log = logger();
        let mut imp: CCImpl = MultilevelSwitchImpl::new(EndpointIndex::Root).into();
        let extra: ExtraInfo = [("Duration".to_string(), "5".to_string())].into();
        imp.configure(&extra).unwrap();
        imp.prepare(&crate::ccimpl::PrepareCtx {
            now,
            caps: listener(),
            options: options(),
        })
        .unwrap();

        let mut ctx = impl_ctx(now, listener(), &log);
        assert_eq!(
            imp.field_changed(&FieldValue::Card(40), &mut ctx),
            WriteResult::Ok
        );
        let expected: CC = MultilevelSwitchCCSet::builder()
            .target_value(LevelSet::Level(40))
            .duration(DurationSet::from_secs(5))
            .build()
            .into();
        assert_eq!(ctx.outbound[0].cc, expected);
    }

    #[test]
    fn test_bad_duration() {
        let mut imp: CCImpl = MultilevelSwitchImpl::new(EndpointIndex::Root).into();
        let extra: ExtraInfo = [("Duration".to_string(), "soon".to_string())].into();
        assert!(imp.configure(&extra).is_err());
    }

    #[test]
    fn test_level_report() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(
            MultilevelSwitchImpl::new(EndpointIndex::Root).into(),
            listener(),
            now,
        );
        let mut defs = Vec::new();
        imp.query_field_defs(&mut defs);
        assert_eq!(defs[0].name, "Level");

        let mut ctx = impl_ctx(now, listener(), &log);
        let report: CC = MultilevelSwitchCCReport::builder()
            .current_value(LevelReport::Level(30))
            .duration(DurationReport::Seconds(3))
            .build()
            .into();
        assert_eq!(imp.handle_cc(&report, &mut ctx), HandleResult::ValueProduced);
        assert!(matches!(
            ctx.events.last(),
            Some(ImplEvent::ValueChanged {
                value: FieldValue::Card(30),
                aux: 3,
                ..
            })
        ));
        assert_eq!(imp.value_text(), "30%");
    }

    #[test]
    fn test_out_of_range_write() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(
            MultilevelSwitchImpl::new(EndpointIndex::Root).into(),
            listener(),
            now,
        );
        let mut ctx = impl_ctx(now, listener(), &log);
        assert!(matches!(
            imp.field_changed(&FieldValue::Card(100), &mut ctx),
            WriteResult::ValueRejected(_)
        ));
        assert!(ctx.outbound.is_empty());
    }
}
