use super::{CCImplOps, ExtraInfo, HandleResult, ImplCore, ImplCtx};
use crate::controller::{EventKind, EventTrigger};
use crate::error::ConfigError;
use crate::fields::{FieldKind, FieldValue};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

/// A contact, motion or other on/off sensor
#[derive(Debug, Clone, PartialEq)]
pub struct BinarySensorImpl {
    core: ImplCore,
    state: Option<bool>,
    /// Restricts the queries and reports to one sensor type of a multi-sensor
    sensor_type: Option<u8>,
}

impl BinarySensorImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::BinarySensor, endpoint),
            state: None,
            sensor_type: None,
        }
    }

    pub fn state(&self) -> Option<bool> {
        self.state
    }
}

impl CCImplOps for BinarySensorImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        "Sensor"
    }

    fn field_kind(&self) -> Option<FieldKind> {
        Some(FieldKind::Bool)
    }

    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        if let Some(value) = extra.get("SensorType") {
            let sensor_type = value.trim().parse::<u8>().map_err(|_| ConfigError::InvalidValue {
                key: "SensorType".to_string(),
                value: value.clone(),
            })?;
            self.sensor_type = Some(sensor_type);
        }
        Ok(())
    }

    fn build_query(&self) -> Option<CC> {
        Some(
            BinarySensorCCGet::builder()
                .sensor_type(self.sensor_type)
                .build()
                .into(),
        )
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::BinarySensorCCReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        if let (Some(wanted), Some(actual)) = (self.sensor_type, report.sensor_type) {
            if wanted != actual {
                return HandleResult::Unhandled;
            }
        }
        let changed = self.core.report_value(
            &mut self.state,
            report.value,
            FieldValue::Bool(report.value),
            0,
            ctx,
        );
        if changed {
            let mut trigger = EventTrigger::new(EventKind::SensorChange, ctx.unit_name);
            if let Some(field) = self.core.field_name() {
                trigger = trigger.with_field(field);
            }
            ctx.triggers
                .push(trigger.with_param(if report.value { "on" } else { "off" }));
        }
        HandleResult::ValueProduced
    }

    fn value_text(&self) -> String {
        match self.state {
            Some(true) => "triggered".to_string(),
            Some(false) => "idle".to_string(),
            None => "unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::CCImpl;
    use std::time::Instant;

    fn report(value: bool, sensor_type: Option<u8>) -> CC {
        BinarySensorCCReport::builder()
            .value(value)
            .sensor_type(sensor_type)
            .build()
            .into()
    }

    #[test]
    fn test_sensor_type_filter() {
        let now = Instant::now();
        let log = logger();
        let mut imp: CCImpl = BinarySensorImpl::new(EndpointIndex::Root).into();
        let extra: ExtraInfo = [("SensorType".to_string(), "12".to_string())].into();
        imp.configure(&extra).unwrap();
        assert_eq!(
            imp.build_query(),
            Some(CC::from(
                BinarySensorCCGet::builder().sensor_type(Some(12)).build()
            ))
        );

        let mut ctx = impl_ctx(now, listener(), &log);
        assert_eq!(
            imp.handle_cc(&report(true, Some(6)), &mut ctx),
            HandleResult::Unhandled
        );
        assert_eq!(
            imp.handle_cc(&report(true, Some(12)), &mut ctx),
            HandleResult::ValueProduced
        );
        // Reports without a type are taken as is
        assert_eq!(
            imp.handle_cc(&report(false, None), &mut ctx),
            HandleResult::ValueProduced
        );
    }

    #[test]
    fn test_change_raises_trigger() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(
            BinarySensorImpl::new(EndpointIndex::Endpoint(3)).into(),
            sleeper(),
            now,
        );
        let mut ctx = impl_ctx(now, sleeper(), &log);
        imp.handle_cc(&report(true, None), &mut ctx);
        imp.handle_cc(&report(true, None), &mut ctx);
        assert_eq!(ctx.triggers.len(), 1);
        assert_eq!(ctx.triggers[0].kind, EventKind::SensorChange);
        assert_eq!(ctx.triggers[0].field.as_deref(), Some("EP3_Sensor"));
        assert_eq!(ctx.triggers[0].params, vec!["on"]);
    }
}
