use super::{ExtraInfo, ImplCtx, ImplEvent, Outbound, PrepareCtx};
use crate::error::ConfigError;
use crate::fields::{AccessFlags, FieldId, FieldValue, ValueSource};
use crate::unit::ImplId;
use crate::unit_info::UnitOptions;
use crate::util::{jitter, random_between};
use std::fmt::Write;
use std::time::{Duration, Instant};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_serial::message::MsgPriority;

/// State every capability carries: addressing, access, field binding and the poll state machine.
///
/// The poll state is the triple of error flag, timeout counter and next poll time. Every query
/// counts as a timeout until a value-bearing message arrives, which resets the counter.
/// The error flag is set until the first good value arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplCore {
    id: ImplId,
    class: CommandClasses,
    endpoint: EndpointIndex,
    see_all_endpoints: bool,
    access: AccessFlags,
    access_override: Option<AccessFlags>,
    name_override: Option<String>,
    field_name: Option<String>,
    field_id: Option<FieldId>,

    in_error: bool,
    /// Set when the error came from unanswered queries rather than a missing first value
    stopped_responding: bool,
    timeouts: u32,
    /// `None` if this capability is never polled
    poll_interval: Option<Duration>,
    poll_override: Option<Duration>,
    next_poll: Option<Instant>,
    query_outstanding: bool,
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

impl ImplCore {
    pub fn new(class: CommandClasses, endpoint: EndpointIndex) -> Self {
        Self {
            id: ImplId(0),
            class,
            endpoint,
            see_all_endpoints: false,
            access: AccessFlags::empty(),
            access_override: None,
            name_override: None,
            field_name: None,
            field_id: None,
            in_error: true,
            stopped_responding: false,
            timeouts: 0,
            poll_interval: None,
            poll_override: None,
            next_poll: None,
            query_outstanding: false,
        }
    }

    pub fn id(&self) -> ImplId {
        self.id
    }

    pub fn set_id(&mut self, id: ImplId) {
        self.id = id;
    }

    pub fn class(&self) -> CommandClasses {
        self.class
    }

    pub fn endpoint(&self) -> EndpointIndex {
        self.endpoint
    }

    pub fn sees_all_endpoints(&self) -> bool {
        self.see_all_endpoints
    }

    pub fn set_see_all_endpoints(&mut self, see_all: bool) {
        self.see_all_endpoints = see_all;
    }

    pub fn access(&self) -> AccessFlags {
        self.access
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    pub fn field_id(&self) -> Option<FieldId> {
        self.field_id
    }

    pub fn set_field_id(&mut self, field_id: Option<FieldId>) {
        self.field_id = field_id;
    }

    pub fn in_error(&self) -> bool {
        self.in_error
    }

    pub fn stopped_responding(&self) -> bool {
        self.stopped_responding
    }

    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }

    pub fn next_poll(&self) -> Option<Instant> {
        self.next_poll
    }

    pub fn query_outstanding(&self) -> bool {
        self.query_outstanding
    }

    /// Handles the device info keys every capability understands:
    /// `Name`, `Access`, `PollSecs` and `SeeAllEPs`
    pub fn parse_extra_info(&mut self, extra: &ExtraInfo) -> Result<(), ConfigError> {
        let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        for (key, value) in extra {
            match key.as_str() {
                "Name" => {
                    let name = value.trim();
                    if name.is_empty() {
                        return Err(invalid(key, value));
                    }
                    self.name_override = Some(name.to_string());
                }
                "Access" => {
                    let access = AccessFlags::from_letters(value).ok_or_else(|| invalid(key, value))?;
                    self.access_override = Some(access);
                }
                "PollSecs" => {
                    let secs = value
                        .trim()
                        .parse::<u64>()
                        .ok()
                        .filter(|s| *s > 0)
                        .ok_or_else(|| invalid(key, value))?;
                    self.poll_override = Some(Duration::from_secs(secs));
                }
                "SeeAllEPs" => self.see_all_endpoints = parse_bool(key, value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Settles access, field name and poll interval. A readable capability must be able to query.
    pub fn prepare(
        &mut self,
        ctx: &PrepareCtx,
        default_access: AccessFlags,
        can_query: bool,
        default_name: &str,
        has_field: bool,
    ) -> Result<(), ConfigError> {
        self.access = self.access_override.unwrap_or(default_access);
        if self.access.contains(AccessFlags::READABLE) && !can_query {
            return Err(ConfigError::NoQuery(self.class));
        }

        self.field_name = has_field.then(|| {
            let base = self.name_override.as_deref().unwrap_or(default_name);
            match self.endpoint {
                EndpointIndex::Endpoint(index) if index > 0 => format!("EP{}_{}", index, base),
                _ => base.to_string(),
            }
        });

        let options = ctx.options;
        self.poll_interval = if !self.access.contains(AccessFlags::READABLE) {
            None
        } else if ctx.caps.listener {
            Some(
                self.poll_override
                    .unwrap_or_else(|| jitter(options.poll_interval, options.poll_jitter_percent)),
            )
        } else if ctx.caps.frequent_listener {
            let (min, max) = options.frequent_poll_range;
            Some(self.poll_override.unwrap_or_else(|| random_between(min, max)))
        } else {
            // Sleeping nodes are read when they wake up
            None
        };
        self.next_poll = self.poll_interval.map(|_| ctx.now);
        self.timeouts = 0;
        self.in_error = true;
        self.stopped_responding = false;
        self.query_outstanding = false;
        Ok(())
    }

    /// A unit wide `PollSecs` option wins over the device info and the defaults
    pub fn apply_options(&mut self, options: &UnitOptions) {
        let secs = options.opt_card("PollSecs", 0);
        if secs > 0 && self.poll_interval.is_some() {
            self.poll_interval = Some(Duration::from_secs(secs as u64));
        }
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        self.next_poll.is_some_and(|next| now >= next)
    }

    /// Queues a value query. Until a value arrives, it counts as a timeout.
    pub fn send_query(&mut self, query: CC, ctx: &mut ImplCtx) {
        ctx.outbound.push(Outbound {
            cc: query,
            endpoint: self.endpoint,
            priority: MsgPriority::Low,
            confirms: None,
        });
        self.query_outstanding = true;
        self.timeouts = self.timeouts.saturating_add(1);
        if self.poll_interval.is_some() {
            self.next_poll = Some(ctx.now + ctx.options.poll_backoff(self.timeouts));
        }

        if self.timeouts >= ctx.options.error_threshold && !self.stopped_responding {
            self.in_error = true;
            self.stopped_responding = true;
            ctx.log.warn(format!(
                "{} stopped responding after {} queries",
                self.describe(),
                self.timeouts
            ));
            ctx.events.push(ImplEvent::EnteredError {
                impl_id: self.id,
                field: self.field_id,
            });
        }
    }

    /// Queues a command that changes the value. The capability hears back through `write_sent`.
    pub fn send_write(&self, cc: CC, ctx: &mut ImplCtx) {
        ctx.outbound.push(Outbound {
            cc,
            endpoint: self.endpoint,
            priority: MsgPriority::Command,
            confirms: Some(self.id),
        });
    }

    /// Resets the poll state for a value-bearing message and clears the error flag.
    /// Returns where the value came from and whether the capability had stopped responding.
    fn note_value(&mut self, ctx: &mut ImplCtx) -> (ValueSource, bool) {
        let source = if self.query_outstanding {
            ValueSource::Query
        } else {
            ValueSource::Notification
        };
        self.query_outstanding = false;
        self.timeouts = 0;
        if let Some(interval) = self.poll_interval {
            self.next_poll = Some(ctx.now + interval);
        }

        let recovered = self.stopped_responding;
        if recovered {
            ctx.log.info(format!("{} is responding again", self.describe()));
        }
        if self.in_error {
            self.in_error = false;
            self.stopped_responding = false;
            ctx.events.push(ImplEvent::LeftError {
                impl_id: self.id,
                field: self.field_id,
            });
        }
        (source, recovered)
    }

    /// Stores a reported value. The owner is told if it changed, or if it is the first value
    /// after the capability stopped responding. Returns whether the owner was told.
    pub fn report_value<T: PartialEq>(
        &mut self,
        slot: &mut Option<T>,
        value: T,
        field_value: FieldValue,
        aux: i32,
        ctx: &mut ImplCtx,
    ) -> bool {
        let (source, recovered) = self.note_value(ctx);
        let changed = slot.as_ref() != Some(&value);
        *slot = Some(value);
        if changed || recovered {
            self.value_changed(field_value, source, aux, ctx);
        }
        changed || recovered
    }

    /// Stores a value that was written but not read back
    pub fn assume_value<T: PartialEq>(
        &mut self,
        slot: &mut Option<T>,
        value: T,
        field_value: FieldValue,
        ctx: &mut ImplCtx,
    ) -> bool {
        let changed = slot.as_ref() != Some(&value);
        *slot = Some(value);
        if changed {
            self.value_changed(field_value, ValueSource::Assumed, 0, ctx);
        }
        changed
    }

    fn value_changed(&self, value: FieldValue, source: ValueSource, aux: i32, ctx: &mut ImplCtx) {
        ctx.log.debug(format!(
            "{} changed to {} ({:?})",
            self.describe(),
            value,
            source
        ));
        ctx.events.push(ImplEvent::ValueChanged {
            impl_id: self.id,
            field: self.field_id,
            value,
            source,
            aux,
        });
    }

    fn describe(&self) -> String {
        match self.endpoint {
            EndpointIndex::Root => self.class.to_string(),
            ep => format!("{} ({})", self.class, ep),
        }
    }

    /// One line of diagnostics
    pub fn report(&self, out: &mut String, value: &str, now: Instant) {
        let _ = write!(
            out,
            "  {}: field {}, access {}, value {}",
            self.describe(),
            self.field_name.as_deref().unwrap_or("-"),
            self.access.to_letters(),
            value
        );
        if self.stopped_responding {
            let _ = write!(out, ", IN ERROR");
        } else if self.in_error {
            let _ = write!(out, ", no value yet");
        }
        if self.timeouts > 0 {
            let _ = write!(out, ", {} timeouts", self.timeouts);
        }
        match self.next_poll {
            Some(next) => {
                let _ = writeln!(
                    out,
                    ", next poll in {}s",
                    next.saturating_duration_since(now).as_secs()
                );
            }
            None => {
                let _ = writeln!(out, ", not polled");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ccimpl::test_util::*;
    use std::sync::Arc;
    use zwave_logging::loggers::{CapturingLogger, UnitLogger};

    fn extra(pairs: &[(&str, &str)]) -> ExtraInfo {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn prepare(core: &mut ImplCore, caps: crate::controller::NodeCaps) -> Result<(), ConfigError> {
        prepare_at(core, caps, Instant::now())
    }

    fn prepare_at(
        core: &mut ImplCore,
        caps: crate::controller::NodeCaps,
        now: Instant,
    ) -> Result<(), ConfigError> {
        core.prepare(
            &PrepareCtx {
                now,
                caps,
                options: options(),
            },
            AccessFlags::defaults_for(&caps, true),
            true,
            "Switch",
            true,
        )
    }

    #[test]
    fn test_common_extra_info() {
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Endpoint(2));
        core.parse_extra_info(&extra(&[
            ("Name", "Pump"),
            ("Access", "RW"),
            ("PollSecs", "120"),
            ("SeeAllEPs", "yes"),
            ("Other", "ignored"),
        ]))
        .unwrap();
        prepare(&mut core, listener()).unwrap();

        assert_eq!(core.field_name(), Some("EP2_Pump"));
        assert_eq!(core.access(), AccessFlags::READABLE | AccessFlags::WRITABLE);
        assert_eq!(core.poll_interval(), Some(Duration::from_secs(120)));
        assert!(core.sees_all_endpoints());
    }

    #[test]
    fn test_invalid_extra_info() {
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        assert!(matches!(
            core.parse_extra_info(&extra(&[("Access", "RZ")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(core.parse_extra_info(&extra(&[("PollSecs", "0")])).is_err());
        assert!(core.parse_extra_info(&extra(&[("SeeAllEPs", "maybe")])).is_err());
    }

    #[test]
    fn test_readable_needs_query() {
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        let result = core.prepare(
            &PrepareCtx {
                now: Instant::now(),
                caps: listener(),
                options: options(),
            },
            AccessFlags::READABLE,
            false,
            "Switch",
            true,
        );
        assert_eq!(
            result,
            Err(ConfigError::NoQuery(CommandClasses::BinarySwitch))
        );
    }

    #[test]
    fn test_polling_depends_on_node() {
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        prepare(&mut core, listener()).unwrap();
        let interval = core.poll_interval().unwrap();
        assert!(interval >= Duration::from_secs(540) && interval <= Duration::from_secs(660));

        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        let frequent = crate::controller::NodeCaps {
            frequent_listener: true,
            ..Default::default()
        };
        prepare(&mut core, frequent).unwrap();
        let interval = core.poll_interval().unwrap();
        assert!(interval >= Duration::from_secs(1800) && interval <= Duration::from_secs(3600));

        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        prepare(&mut core, sleeper()).unwrap();
        assert_eq!(core.poll_interval(), None);
        assert!(!core.poll_due(Instant::now() + Duration::from_secs(86400)));
    }

    #[test]
    fn test_in_error_until_first_value() {
        let capture = Arc::new(CapturingLogger::default());
        let log = UnitLogger::new(capture.clone(), NodeId::new(5));
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        assert!(core.in_error());
        prepare(&mut core, listener()).unwrap();
        assert!(core.in_error());
        assert!(!core.stopped_responding());

        // The first good value clears it
        let mut ctx = impl_ctx(Instant::now(), listener(), &log);
        let mut slot = None;
        assert!(core.report_value(&mut slot, false, FieldValue::Bool(false), 0, &mut ctx));
        assert!(!core.in_error());
        assert!(matches!(ctx.events[0], ImplEvent::LeftError { .. }));
        assert!(matches!(ctx.events[1], ImplEvent::ValueChanged { .. }));
        assert!(!capture.contains("responding again"));

        // Preparing again starts over
        prepare(&mut core, listener()).unwrap();
        assert!(core.in_error());
    }

    #[test]
    fn test_unit_poll_option() {
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        prepare(&mut core, listener()).unwrap();
        let mut options = UnitOptions::default();
        options.set("PollSecs", "90");
        core.apply_options(&options);
        assert_eq!(core.poll_interval(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_backoff_and_recovery() {
        let start = Instant::now();
        let capture = Arc::new(CapturingLogger::default());
        let log = UnitLogger::new(capture.clone(), NodeId::new(5));
        let mut core = ImplCore::new(CommandClasses::BinarySwitch, EndpointIndex::Root);
        prepare_at(&mut core, listener(), start).unwrap();
        let interval = core.poll_interval().unwrap();

        let mut now = start;
        let mut delays = Vec::new();
        let mut entered = 0;
        for _ in 0..6 {
            let mut ctx = impl_ctx(now, listener(), &log);
            assert!(core.poll_due(now));
            core.send_query(CC::from(BinarySwitchCCGet::default()), &mut ctx);
            entered += ctx
                .events
                .iter()
                .filter(|e| matches!(e, ImplEvent::EnteredError { .. }))
                .count();
            let next = core.next_poll().unwrap();
            delays.push(next - now);
            now = next;
        }
        // Never shrinks, grows at least once and ends at the cap
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
        assert!(delays.windows(2).any(|w| w[0] < w[1]));
        assert_eq!(*delays.last().unwrap(), Duration::from_secs(300));
        assert_eq!(entered, 1);
        assert!(core.in_error());
        assert!(core.stopped_responding());

        let mut ctx = impl_ctx(now, listener(), &log);
        let mut slot = None;
        assert!(core.report_value(&mut slot, true, FieldValue::Bool(true), 0, &mut ctx));
        assert!(!core.in_error());
        assert!(!core.stopped_responding());
        assert!(capture.contains("responding again"));
        assert_eq!(core.timeouts(), 0);
        assert_eq!(core.next_poll(), Some(now + interval));
        assert!(matches!(ctx.events[0], ImplEvent::LeftError { .. }));
        assert!(matches!(
            ctx.events[1],
            ImplEvent::ValueChanged {
                source: ValueSource::Query,
                ..
            }
        ));
    }
}
