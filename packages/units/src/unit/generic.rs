use super::{ImplSet, UnitHandler};

/// One capability per supported class, no interplay between them
pub struct GenericUnit {
    impls: ImplSet,
}

impl GenericUnit {
    pub const NAME: &'static str = "Generic";

    pub fn new(impls: ImplSet) -> Self {
        Self { impls }
    }
}

impl UnitHandler for GenericUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn impls(&self) -> &ImplSet {
        &self.impls
    }

    fn impls_mut(&mut self) -> &mut ImplSet {
        &mut self.impls
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use crate::ccimpl::{BinarySwitchImpl, CCImplOps, HandleResult, MultilevelSwitchImpl, PrepareCtx};
    use crate::fields::{FieldId, FieldValue, WriteResult};
    use std::time::Instant;
    use zwave_cc::prelude::*;
    use zwave_core::prelude::*;
    use zwave_serial::message::InMsg;

    fn unit() -> GenericUnit {
        let mut impls = ImplSet::default();
        impls.adopt(BinarySwitchImpl::new(EndpointIndex::Endpoint(1)).into());
        impls.adopt(BinarySwitchImpl::new(EndpointIndex::Endpoint(2)).into());
        impls.adopt(MultilevelSwitchImpl::new(EndpointIndex::Root).into());
        let mut unit = GenericUnit::new(impls);
        unit.prepare(&PrepareCtx {
            now: Instant::now(),
            caps: listener(),
            options: options(),
        })
        .unwrap();
        unit.store_field_ids(&|name| match name {
            "EP1_Switch" => Some(FieldId(10)),
            "EP2_Switch" => Some(FieldId(11)),
            "Level" => Some(FieldId(12)),
            _ => None,
        });
        unit
    }

    fn from_endpoint(ep: u8, cc: CC) -> InMsg {
        let encap = MultiChannelCCCommandEncapsulation::builder()
            .source_endpoint(ep)
            .destination_endpoint(EndpointIndex::Root)
            .encapsulated(cc.as_raw())
            .build();
        let mut msg = InMsg::application_command(NodeId::new(5), &CC::from(encap).as_raw());
        msg.unwrap_endpoint().unwrap();
        msg
    }

    #[test]
    fn test_field_defs() {
        let unit = unit();
        let mut defs = Vec::new();
        unit.query_field_defs(&mut defs);
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["EP1_Switch", "EP2_Switch", "Level"]);
    }

    #[test]
    fn test_routes_by_endpoint() {
        let log = logger();
        let mut unit = unit();
        let mut ctx = impl_ctx(Instant::now(), listener(), &log);
        let report: CC = BinarySwitchCCReport::builder()
            .current_value(BinaryReport::On)
            .build()
            .into();
        let msg = from_endpoint(2, report.clone());
        assert_eq!(msg.source_endpoint(), EndpointIndex::Endpoint(2));
        assert_eq!(
            unit.handle_message(&msg, &report, &mut ctx),
            HandleResult::ValueProduced
        );
        assert_eq!(ctx.events.len(), 2);
        assert!(
            ctx.events
                .iter()
                .all(|e| e.impl_id() == crate::unit::ImplId(1))
        );

        // Nobody listens on end point 3
        let msg = from_endpoint(3, report.clone());
        assert_eq!(
            unit.handle_message(&msg, &report, &mut ctx),
            HandleResult::Unhandled
        );
    }

    #[test]
    fn test_field_write_goes_to_owner() {
        let log = logger();
        let mut unit = unit();
        let mut ctx = impl_ctx(Instant::now(), listener(), &log);
        assert_eq!(
            unit.field_changed(FieldId(12), &FieldValue::Card(50), &mut ctx),
            WriteResult::Ok
        );
        assert_eq!(ctx.outbound.len(), 1);
        assert!(matches!(ctx.outbound[0].cc, CC::MultilevelSwitchCCSet(_)));

        unit.write_sent(crate::unit::ImplId(2), &mut ctx);
        assert_eq!(ctx.events.len(), 1);
        let level = unit.impls().get(crate::unit::ImplId(2)).unwrap();
        assert_eq!(level.value_text(), "50%");
    }

    #[test]
    #[should_panic]
    fn test_unowned_field_panics() {
        let log = logger();
        let mut unit = unit();
        let mut ctx = impl_ctx(Instant::now(), listener(), &log);
        unit.field_changed(FieldId(99), &FieldValue::Bool(true), &mut ctx);
    }

    #[test]
    fn test_report() {
        let unit = unit();
        let mut out = String::new();
        unit.report(&mut out, Instant::now());
        assert!(out.starts_with("Handler Generic, 3 capabilities"));
        assert!(out.contains("EP2_Switch"));
    }
}
