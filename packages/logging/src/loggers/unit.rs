use crate::{ImmutableLogger, LogInfo, Loglevel};
use std::{borrow::Cow, sync::Arc};
use zwave_core::{
    definitions::{EndpointIndex, NodeId},
    log::{LogPayload, LogPayloadText},
};

const LABEL: &str = "UNIT";

/// Logs on behalf of one unit (node), optionally scoped to an end point
#[derive(Clone)]
pub struct UnitLogger {
    node_id: NodeId,
    endpoint: EndpointIndex,
    inner: Arc<dyn ImmutableLogger>,
}

impl UnitLogger {
    pub fn new(inner: Arc<dyn ImmutableLogger>, node_id: NodeId) -> Self {
        Self {
            inner,
            node_id,
            endpoint: EndpointIndex::Root,
        }
    }

    /// A logger for the same unit, tagged with the given end point
    pub fn with_endpoint(&self, endpoint: EndpointIndex) -> Self {
        Self {
            endpoint,
            ..self.clone()
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn tags(&self) -> Vec<Cow<'static, str>> {
        let mut ret = vec![format!("Unit {:0>3}", self.node_id.raw()).into()];
        if let EndpointIndex::Endpoint(index) = self.endpoint {
            ret.push(format!("EP {}", index).into());
        }
        ret
    }

    pub fn payload(&self, payload: LogPayload, level: Loglevel) {
        if !self.inner.enabled(level) {
            return;
        }
        let log = LogInfo::builder()
            .label(LABEL)
            .primary_tags(self.tags())
            .payload(payload)
            .build();
        self.inner.log(log, level);
    }

    pub fn message(&self, message: impl Into<Cow<'static, str>>, level: Loglevel) {
        self.payload(LogPayloadText::new(message).into(), level);
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

    pub fn silly(&self, message: impl Into<Cow<'static, str>>) {
        self.message(message, Loglevel::Silly);
    }
}
