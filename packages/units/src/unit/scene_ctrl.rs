use super::{ImplSet, UnitHandler};
use crate::ccimpl::{ExtraInfo, HandleResult, ImplCtx};
use crate::controller::{EventKind, EventTrigger};
use crate::error::ConfigError;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_serial::message::InMsg;

/// Remotes and wall controllers. They don't have a state to read, they only send commands
/// when a button is pressed. Each of those becomes a user action trigger. Everything else,
/// e.g. battery reports, goes to the capabilities.
pub struct SceneControllerUnit {
    impls: ImplSet,
    /// Scene numbers above this are ignored
    buttons: Option<u8>,
    last_sequence: Option<u8>,
}

impl SceneControllerUnit {
    pub const NAME: &'static str = "SceneController";

    pub fn new(impls: ImplSet) -> Self {
        Self {
            impls,
            buttons: None,
            last_sequence: None,
        }
    }

    fn trigger(&self, ctx: &mut ImplCtx, params: &[String]) {
        let trigger = params
            .iter()
            .fold(EventTrigger::new(EventKind::UserAction, ctx.unit_name), |t, p| {
                t.with_param(p)
            });
        ctx.log.info(format!("user action: {}", params.join(" ")));
        ctx.triggers.push(trigger);
    }

    fn scene_allowed(&self, scene: u8) -> bool {
        self.buttons.is_none_or(|buttons| scene <= buttons)
    }
}

impl UnitHandler for SceneControllerUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn impls(&self) -> &ImplSet {
        &self.impls
    }

    fn impls_mut(&mut self) -> &mut ImplSet {
        &mut self.impls
    }

    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        if let Some(value) = extra.get("Buttons") {
            let buttons = value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|b| *b > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "Buttons".to_string(),
                    value: value.clone(),
                })?;
            self.buttons = Some(buttons);
        }
        Ok(())
    }

    fn handle_message(&mut self, msg: &InMsg, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        // Buttons on end points are reported with their end point id last
        let endpoint = msg.source_endpoint();
        let mut params = Vec::new();
        if !endpoint.is_root() {
            params.push(format!("ep{}", endpoint.raw()));
        }

        match cc {
            CC::BasicCCSet(set) => {
                let level = match set.target_value {
                    LevelSet::Level(level) => level,
                    LevelSet::On => 0xff,
                };
                params.insert(0, "basic".to_string());
                params.insert(1, level.to_string());
            }
            CC::SceneActivationCCSet(set) => {
                if !self.scene_allowed(set.scene_id) {
                    return HandleResult::Handled;
                }
                params.insert(0, "scene".to_string());
                params.insert(1, set.scene_id.to_string());
            }
            CC::CentralSceneCCNotification(notification) => {
                // Retransmissions carry the same sequence number
                if self.last_sequence == Some(notification.sequence_number) {
                    return HandleResult::Handled;
                }
                self.last_sequence = Some(notification.sequence_number);
                if !self.scene_allowed(notification.scene_number) {
                    return HandleResult::Handled;
                }
                params.insert(0, "scene".to_string());
                params.insert(1, notification.scene_number.to_string());
                params.insert(2, notification.key_attribute.to_string());
            }
            _ => return self.dispatch_to_impls(msg, cc, ctx),
        }
        self.trigger(ctx, &params);
        HandleResult::Handled
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::CCImpl;
    use crate::ccimpl::test_util::*;
    use std::time::Instant;

    fn deliver(unit: &mut SceneControllerUnit, cc: CC, ctx: &mut ImplCtx) -> HandleResult {
        let msg = InMsg::application_command(NodeId::new(5), &cc.as_raw());
        unit.handle_message(&msg, &cc, ctx)
    }

    fn central_scene(sequence_number: u8, scene_number: u8) -> CC {
        CentralSceneCCNotification::builder()
            .sequence_number(sequence_number)
            .key_attribute(CentralSceneKeyAttribute::KeyPressed)
            .scene_number(scene_number)
            .build()
            .into()
    }

    #[test]
    fn test_basic_set() {
        let log = logger();
        let mut unit = SceneControllerUnit::new(ImplSet::default());
        let mut ctx = impl_ctx(Instant::now(), sleeper(), &log);
        let set: CC = BasicCCSet::builder()
            .target_value(LevelSet::Level(0))
            .build()
            .into();
        assert_eq!(deliver(&mut unit, set, &mut ctx), HandleResult::Handled);
        assert_eq!(ctx.triggers.len(), 1);
        assert_eq!(ctx.triggers[0].kind, EventKind::UserAction);
        assert_eq!(ctx.triggers[0].unit, "Test");
        assert_eq!(ctx.triggers[0].params, vec!["basic", "0"]);
    }

    #[test]
    fn test_central_scene_dedup() {
        let log = logger();
        let mut unit = SceneControllerUnit::new(ImplSet::default());
        let mut ctx = impl_ctx(Instant::now(), sleeper(), &log);
        deliver(&mut unit, central_scene(7, 2), &mut ctx);
        deliver(&mut unit, central_scene(7, 2), &mut ctx);
        deliver(&mut unit, central_scene(8, 2), &mut ctx);
        assert_eq!(ctx.triggers.len(), 2);
        assert_eq!(ctx.triggers[0].params, vec!["scene", "2", "KeyPressed"]);
    }

    #[test]
    fn test_button_limit() {
        let log = logger();
        let mut unit = SceneControllerUnit::new(ImplSet::default());
        let extra: ExtraInfo = [("Buttons".to_string(), "4".to_string())].into();
        unit.parse_extra_info(&extra).unwrap();
        let mut ctx = impl_ctx(Instant::now(), sleeper(), &log);
        let set: CC = SceneActivationCCSet::builder().scene_id(9).build().into();
        assert_eq!(deliver(&mut unit, set, &mut ctx), HandleResult::Handled);
        assert!(ctx.triggers.is_empty());

        let bad: ExtraInfo = [("Buttons".to_string(), "0".to_string())].into();
        assert!(unit.parse_extra_info(&bad).is_err());
    }

    #[test]
    fn test_other_traffic_is_unhandled() {
        let log = logger();
        let mut unit = SceneControllerUnit::new(ImplSet::default());
        let mut ctx = impl_ctx(Instant::now(), sleeper(), &log);
        let report: CC = BatteryCCReport {
            level: BatteryLevel::Percent(90),
        }
        .into();
        assert_eq!(deliver(&mut unit, report, &mut ctx), HandleResult::Unhandled);
        // No capabilities, nothing to declare
        let mut defs = Vec::new();
        unit.query_field_defs(&mut defs);
        assert!(defs.is_empty());
    }

    #[test]
    fn test_battery_goes_to_capability() {
        let log = logger();
        let mut impls = ImplSet::default();
        impls.adopt(CCImpl::for_class(CommandClasses::Battery, EndpointIndex::Root).unwrap());
        let mut unit = SceneControllerUnit::new(impls);
        let mut ctx = impl_ctx(Instant::now(), sleeper(), &log);
        let report: CC = BatteryCCReport {
            level: BatteryLevel::Percent(90),
        }
        .into();
        assert_eq!(deliver(&mut unit, report, &mut ctx), HandleResult::ValueProduced);
        assert!(ctx.triggers.is_empty());
    }
}
