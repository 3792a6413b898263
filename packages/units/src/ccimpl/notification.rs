use super::door_lock::lock_trigger;
use super::{CCImplOps, ExtraInfo, HandleResult, ImplCore, ImplCtx};
use crate::controller::{EventKind, EventTrigger, NodeCaps};
use crate::error::ConfigError;
use crate::fields::{AccessFlags, FieldKind, FieldValue};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;

/// What a notification capability watches, selected with the `NType` device info key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Lock and unlock events of the access control type
    AccessControl,
    /// Motion and intrusion events of the home security type
    Motion,
    /// Door open and closed events of the access control type
    Door,
    Smoke,
}

impl NotifyKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accesscontrol" | "lock" => Some(Self::AccessControl),
            "motion" => Some(Self::Motion),
            "door" => Some(Self::Door),
            "smoke" => Some(Self::Smoke),
            _ => None,
        }
    }

    fn notification_type(&self) -> NotificationType {
        match self {
            Self::AccessControl | Self::Door => NotificationType::AccessControl,
            Self::Motion => NotificationType::HomeSecurity,
            Self::Smoke => NotificationType::Smoke,
        }
    }

    fn default_name(&self) -> &'static str {
        match self {
            Self::AccessControl => "Locked",
            Self::Motion => "Motion",
            Self::Door => "DoorOpen",
            Self::Smoke => "Smoke",
        }
    }
}

/// Where an access control lock event came from
fn lock_event(event: u8) -> Option<(bool, &'static str)> {
    match event {
        events::ACCESS_MANUAL_LOCK => Some((true, "manual")),
        events::ACCESS_MANUAL_UNLOCK => Some((false, "manual")),
        events::ACCESS_RF_LOCK => Some((true, "rf")),
        events::ACCESS_RF_UNLOCK => Some((false, "rf")),
        events::ACCESS_KEYPAD_LOCK => Some((true, "keypad")),
        events::ACCESS_KEYPAD_UNLOCK => Some((false, "keypad")),
        events::ACCESS_AUTO_LOCK => Some((true, "auto")),
        _ => None,
    }
}

/// Turns notification events into a boolean state. Devices mostly send these on their own,
/// so by default the capability is not polled.
///
/// In observer mode it has no field of its own. A unit handler that designates another
/// capability as the owner of the state uses that to keep both in sync.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationImpl {
    core: ImplCore,
    kind: NotifyKind,
    observer: bool,
    state: Option<bool>,
}

impl NotificationImpl {
    pub fn new(endpoint: EndpointIndex) -> Self {
        Self {
            core: ImplCore::new(CommandClasses::Notification, endpoint),
            kind: NotifyKind::Motion,
            observer: false,
            state: None,
        }
    }

    pub fn kind(&self) -> NotifyKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: NotifyKind) {
        self.kind = kind;
    }

    pub fn set_observer(&mut self, observer: bool) {
        self.observer = observer;
    }

    pub fn state(&self) -> Option<bool> {
        self.state
    }

    /// Updates the state without telling anybody. Used to follow the capability that owns
    /// the state, so our next event for the same state isn't reported again.
    pub fn set_state_quietly(&mut self, state: bool) {
        self.state = Some(state);
    }

    /// Maps an event to the state it signals, and the source for lock events
    fn decode(&self, event: u8) -> Option<(bool, Option<&'static str>)> {
        match self.kind {
            NotifyKind::AccessControl => {
                lock_event(event).map(|(locked, source)| (locked, Some(source)))
            }
            NotifyKind::Door => match event {
                events::ACCESS_DOOR_OPEN => Some((true, None)),
                events::ACCESS_DOOR_CLOSED => Some((false, None)),
                _ => None,
            },
            NotifyKind::Motion => match event {
                events::HOME_SECURITY_MOTION | events::HOME_SECURITY_INTRUSION => {
                    Some((true, None))
                }
                events::IDLE => Some((false, None)),
                _ => None,
            },
            NotifyKind::Smoke => match event {
                events::SMOKE_DETECTED | events::SMOKE_DETECTED_UNKNOWN_LOCATION => {
                    Some((true, None))
                }
                events::IDLE => Some((false, None)),
                _ => None,
            },
        }
    }
}

impl CCImplOps for NotificationImpl {
    fn core(&self) -> &ImplCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ImplCore {
        &mut self.core
    }

    fn default_name(&self) -> &'static str {
        self.kind.default_name()
    }

    fn field_kind(&self) -> Option<FieldKind> {
        (!self.observer).then_some(FieldKind::Bool)
    }

    fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        if let Some(value) = extra.get("NType") {
            self.kind = NotifyKind::parse(value).ok_or_else(|| ConfigError::InvalidValue {
                key: "NType".to_string(),
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    fn default_access(&self, _caps: &NodeCaps) -> AccessFlags {
        AccessFlags::empty()
    }

    fn build_query(&self) -> Option<CC> {
        Some(
            NotificationCCGet::builder()
                .notification_type(self.kind.notification_type() as u8)
                .build()
                .into(),
        )
    }

    fn handle_cc(&mut self, cc: &CC, ctx: &mut ImplCtx) -> HandleResult {
        let CC::NotificationCCReport(report) = cc else {
            return HandleResult::Unhandled;
        };
        if report.known_type() != Some(self.kind.notification_type()) {
            // Other types, or a v1 alarm we can't interpret
            return HandleResult::Handled;
        }
        let Some((state, source)) = report.event.and_then(|e| self.decode(e)) else {
            return HandleResult::Handled;
        };

        let changed = self.core.report_value(
            &mut self.state,
            state,
            FieldValue::Bool(state),
            0,
            ctx,
        );
        let field = self.core.field_name();
        match source {
            // Every lock event is of interest, even if the state didn't change
            Some(source) => ctx
                .triggers
                .push(lock_trigger(ctx.unit_name, field, state, source)),
            None if changed => {
                let mut trigger = EventTrigger::new(EventKind::SensorChange, ctx.unit_name);
                if let Some(field) = field {
                    trigger = trigger.with_field(field);
                }
                ctx.triggers
                    .push(trigger.with_param(if state { "on" } else { "off" }));
            }
            None => {}
        }
        HandleResult::ValueProduced
    }

    fn value_text(&self) -> String {
        match (self.kind, self.state) {
            (_, None) => "unknown".to_string(),
            (NotifyKind::AccessControl, Some(true)) => "locked".to_string(),
            (NotifyKind::AccessControl, Some(false)) => "unlocked".to_string(),
            (NotifyKind::Door, Some(true)) => "open".to_string(),
            (NotifyKind::Door, Some(false)) => "closed".to_string(),
            (_, Some(true)) => "active".to_string(),
            (_, Some(false)) => "idle".to_string(),
        }
    }
}
