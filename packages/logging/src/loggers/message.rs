use crate::{Direction, ImmutableLogger, LogInfo, Loglevel};
use std::sync::Arc;
use zwave_core::log::{LogPayload, LogPayloadDict, LogPayloadText, ToLogPayload};
use zwave_serial::{
    frame::SerialControlByte,
    message::{InMsg, OutMsg},
};

const LABEL: &str = "SERIAL";
const MESSAGE_LOGLEVEL: Loglevel = Loglevel::Debug;

/// Logs traffic between the engine and the controller
#[derive(Clone)]
pub struct MessageLogger {
    inner: Arc<dyn ImmutableLogger>,
}

fn hex_line(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

impl MessageLogger {
    pub fn new(inner: Arc<dyn ImmutableLogger>) -> Self {
        Self { inner }
    }

    pub fn data(&self, data: &[u8], direction: Direction) {
        if !self.inner.enabled(MESSAGE_LOGLEVEL) {
            return;
        }

        let log = LogInfo::builder()
            .label(LABEL)
            .direction(direction)
            .secondary_tag(format!("{} bytes", data.len()).into())
            .payload(LogPayloadText::new(hex_line(data)).into())
            .build();
        self.inner.log(log, MESSAGE_LOGLEVEL);
    }

    pub fn control_flow(&self, byte: SerialControlByte, direction: Direction) {
        if !self.inner.enabled(MESSAGE_LOGLEVEL) {
            return;
        }

        let log = LogInfo::builder()
            .label(LABEL)
            .direction(direction)
            .primary_tags(vec![format!("{:?}", byte).into()])
            .secondary_tag(format!("{:#04x}", byte as u8).into())
            .payload(LogPayload::empty())
            .build();
        self.inner.log(log, MESSAGE_LOGLEVEL);
    }

    /// Logs a decoded inbound message. Decrypted commands also show the ciphertext they came from.
    pub fn inbound(&self, msg: &InMsg) {
        if !self.inner.enabled(MESSAGE_LOGLEVEL) {
            return;
        }

        let mut payload = msg.to_log_payload();
        if let Some(original) = msg.encrypted_original() {
            payload = LogPayloadDict::new()
                .with_entry("encrypted", hex_line(original))
                .with_nested(payload)
                .into();
        }
        let mut tags = vec!["REQ".into()];
        if msg.is_secure() {
            tags.push("S0".into());
        }

        let log = LogInfo::builder()
            .label(LABEL)
            .direction(Direction::Inbound)
            .primary_tags(tags)
            .payload(payload)
            .build();
        self.inner.log(log, MESSAGE_LOGLEVEL);
    }

    /// Logs an outbound message. For encrypted messages, the plain command is shown next to the wire bytes.
    pub fn outbound(&self, msg: &OutMsg) {
        if !self.inner.enabled(MESSAGE_LOGLEVEL) {
            return;
        }

        let mut tags = vec![format!("{}", msg.priority()).to_uppercase().into()];
        if msg.is_secure() {
            tags.push("S0".into());
        }
        let mut payload = msg.to_log_payload();
        if msg.original().is_some() {
            if let Some(cc) = msg.cc_bytes() {
                payload = LogPayloadDict::new()
                    .with_entry("encrypted", hex_line(&cc))
                    .with_nested(payload)
                    .into();
            }
        }

        let log = LogInfo::builder()
            .label(LABEL)
            .direction(Direction::Outbound)
            .primary_tags(tags)
            .payload(payload)
            .build();
        self.inner.log(log, MESSAGE_LOGLEVEL);
    }

    /// Logs a message that could not be decoded and was dropped
    pub fn discarded(&self, data: &[u8], reason: &str) {
        let log = LogInfo::builder()
            .label(LABEL)
            .direction(Direction::Inbound)
            .primary_tags(vec!["DISCARDED".into()])
            .secondary_tag(format!("{} bytes", data.len()).into())
            .payload(
                LogPayloadDict::new()
                    .with_entry("reason", reason.to_owned())
                    .with_entry("data", hex_line(data))
                    .into(),
            )
            .build();
        self.inner.log(log, Loglevel::Warn);
    }
}
