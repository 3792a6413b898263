use crate::{ImmutableLogger, LogInfo, Loglevel};
use std::{borrow::Cow, sync::Arc};
use zwave_core::log::{LogPayload, LogPayloadText};

const LABEL: &str = "DRIVER";

/// Logs engine-wide messages that don't belong to a specific unit
#[derive(Clone)]
pub struct DriverLogger {
    inner: Arc<dyn ImmutableLogger>,
}

impl DriverLogger {
    pub fn new(inner: Arc<dyn ImmutableLogger>) -> Self {
        Self { inner }
    }

    pub fn log_level(&self) -> Loglevel {
        self.inner.log_level()
    }

    pub fn set_log_level(&self, level: Loglevel) {
        self.inner.set_log_level(level);
    }

    pub fn message(&self, message: impl Into<Cow<'static, str>>, level: Loglevel) {
        self.payload(LogPayloadText::new(message).into(), level);
    }

    pub fn payload(&self, payload: LogPayload, level: Loglevel) {
        if !self.inner.enabled(level) {
            return;
        }
        let log = LogInfo::builder().label(LABEL).payload(payload).build();
        self.inner.log(log, level);
    }

    pub fn error(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Error);
    }

    pub fn warn(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Warn);
    }

    pub fn info(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Info);
    }

    pub fn verbose(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Verbose);
    }

    pub fn debug(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Debug);
    }
}
