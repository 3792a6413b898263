use super::{CCImplOps, HandleResult, ImplCore, ImplCtx};
use crate::controller::{EventKind, EventTrigger};
use crate::fields::{AttrKind, FieldKind, FieldValue, UnitAttr};
use crate::unit_info::UnitOptions;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

pub const LOW_BATTERY_OPTION: &str = "LowBattery";
const DEFAULT_LOW_BATTERY: u32 = 20;

/// Battery charge in percent. Raises a low battery trigger when the charge drops below the
/// threshold set by the `LowBattery` unit option.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryImpl {
    core: ImplCore,
    percent: Option<u8>,
    low_threshold: u8,
}

impl BatteryImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::Battery, endpoint),
            percent: None,
            low_threshold: DEFAULT_LOW_BATTERY as u8,
        }
    }

    pub fn percent(&self) -> Option<u8> {
        self.percent
    }
}

impl CCImplOps for BatteryImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        "Battery"
    }

    fn field_kind(&self) -> Option<FieldKind> {
        Some(FieldKind::Card { min: 0, max: 100 })
    }

    fn build_query(&self) -> Option<CC> {
        Some(BatteryCCGet::default().into())
    }

    fn query_unit_attrs(&self, attrs: &mut Vec<UnitAttr>) {
        attrs.push(UnitAttr::new(
            LOW_BATTERY_OPTION,
            AttrKind::Card { min: 0, max: 100 },
            DEFAULT_LOW_BATTERY.to_string(),
            "Battery level in percent below which a low battery event is raised",
        ));
    }

    fn apply_options(&mut self, options: &UnitOptions) {
        self.core.apply_options(options);
        self.low_threshold = options
            .opt_card(LOW_BATTERY_OPTION, DEFAULT_LOW_BATTERY)
            .min(100) as u8;
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::BatteryCCReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        let percent = report.level.percent().min(100);
        let was_low = self.percent.is_some_and(|p| p < self.low_threshold);
        self.core.report_value(
            &mut self.percent,
            percent,
            FieldValue::Card(percent as u32),
            0,
            ctx,
        );

        if percent < self.low_threshold && !was_low {
            ctx.log.warn(format!("battery is low ({} %)", percent));
            let mut trigger = EventTrigger::new(EventKind::LowBattery, ctx.unit_name);
            if let Some(field) = self.core.field_name() {
                trigger = trigger.with_field(field);
            }
            ctx.triggers.push(trigger.with_param(percent));
        }
        HandleResult::ValueProduced
    }

    fn value_text(&self) -> String {
        self.percent
            .map_or_else(|| "unknown".to_string(), |p| format!("{}%", p))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::CCImpl;
    use crate::fields::AccessFlags;
    use std::time::Instant;

    fn report(level: BatteryLevel) -> CC {
        BatteryCCReport { level }.into()
    }

    #[test]
    fn test_sleeper_reads_on_wakeup() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(BatteryImpl::new(EndpointIndex::Root).into(), sleeper(), now);
        assert_eq!(
            imp.core().access(),
            AccessFlags::READABLE | AccessFlags::READ_ON_WAKEUP
        );
        assert_eq!(imp.core().poll_interval(), None);

        let mut ctx = impl_ctx(now, sleeper(), &log);
        imp.process(&mut ctx);
        assert!(ctx.outbound.is_empty());
        imp.on_wakeup(&mut ctx);
        assert_eq!(ctx.outbound.len(), 1);
        assert_eq!(ctx.outbound[0].cc, CC::from(BatteryCCGet::default()));
    }

    #[test]
    fn test_low_battery_fires_once() {
        let now = Instant::now();
        let log = logger();
        let mut imp = prepared(BatteryImpl::new(EndpointIndex::Root).into(), sleeper(), now);
        let mut options = UnitOptions::default();
        options.set(LOW_BATTERY_OPTION, "30");
        imp.apply_options(&options);

        let mut ctx = impl_ctx(now, sleeper(), &log);
        imp.handle_cc(&report(BatteryLevel::Percent(80)), &mut ctx);
        assert!(ctx.triggers.is_empty());
        imp.handle_cc(&report(BatteryLevel::Percent(25)), &mut ctx);
        imp.handle_cc(&report(BatteryLevel::Low), &mut ctx);
        assert_eq!(ctx.triggers.len(), 1);
        assert_eq!(ctx.triggers[0].kind, EventKind::LowBattery);
        assert_eq!(ctx.triggers[0].unit, "Test");
        assert_eq!(ctx.triggers[0].field.as_deref(), Some("Battery"));
        assert_eq!(ctx.triggers[0].params, vec!["25"]);

        // Recharged, then low again
        imp.handle_cc(&report(BatteryLevel::Percent(100)), &mut ctx);
        imp.handle_cc(&report(BatteryLevel::Percent(10)), &mut ctx);
        assert_eq!(ctx.triggers.len(), 2);

        let CCImpl::BatteryImpl(battery) = &imp else {
            unreachable!();
        };
        assert_eq!(battery.percent(), Some(10));
    }

    #[test]
    fn test_declares_option() {
        let imp: CCImpl = BatteryImpl::new(EndpointIndex::Root).into();
        let mut attrs = Vec::new();
        imp.query_unit_attrs(&mut attrs);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].key, LOW_BATTERY_OPTION);
        assert!(attrs[0].accepts(&attrs[0].default));
    }
}
