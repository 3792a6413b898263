use super::{ImplId, ImplSet, UnitHandler};
use crate::ccimpl::{CCImpl, CCImplOps, ImplCtx, ImplEvent, NotifyKind};
use crate::error::ConfigError;
use crate::fields::FieldValue;
use zwave_core::prelude::*;

/// A door lock that reports its state through two classes. The door lock class owns the
/// field. Access control notifications are forwarded into it, and its own reports are mirrored
/// into the notification capability, so each change is reported once.
pub struct LockUnit {
    impls: ImplSet,
    lock: ImplId,
    observer: Option<ImplId>,
}

impl LockUnit {
    pub const NAME: &'static str = "Lock";

    pub fn new(mut impls: ImplSet) -> Result<Self, ConfigError> {
        let lock = impls
            .iter()
            .find(|imp| imp.class() == CommandClasses::DoorLock)
            .map(|imp| imp.core().id())
            .ok_or(ConfigError::MissingClass {
                handler: Self::NAME,
                class: CommandClasses::DoorLock,
            })?;

        // Prefer a capability the device info declared for access control
        let notifications: Vec<ImplId> = impls
            .iter()
            .filter(|imp| imp.class() == CommandClasses::Notification)
            .map(|imp| imp.core().id())
            .collect();
        let observer = notifications
            .iter()
            .copied()
            .find(|id| {
                matches!(impls.get(*id), Some(CCImpl::NotificationImpl(n)) if n.kind() == NotifyKind::AccessControl)
            })
            .or(notifications.first().copied());
        if let Some(CCImpl::NotificationImpl(notification)) = observer.and_then(|id| impls.get_mut(id)) {
            notification.set_kind(NotifyKind::AccessControl);
            notification.set_observer(true);
        }

        Ok(Self {
            impls,
            lock,
            observer,
        })
    }
}

impl UnitHandler for LockUnit {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn impls(&self) -> &ImplSet {
        &self.impls
    }

    fn impls_mut(&mut self) -> &mut ImplSet {
        &mut self.impls
    }

    fn value_impl_changed(&mut self, event: &ImplEvent, ctx: &mut ImplCtx) {
        let ImplEvent::ValueChanged {
            impl_id,
            value: FieldValue::Bool(locked),
            ..
        } = event
        else {
            return;
        };

        if Some(*impl_id) == self.observer {
            if let Some(CCImpl::DoorLockImpl(lock)) = self.impls.get_mut(self.lock) {
                lock.observe_locked(*locked, ctx);
            }
        } else if *impl_id == self.lock {
            let observer = self.observer.and_then(|id| self.impls.get_mut(id));
            if let Some(CCImpl::NotificationImpl(notification)) = observer {
                notification.set_state_quietly(*locked);
            }
        }
    }
}
