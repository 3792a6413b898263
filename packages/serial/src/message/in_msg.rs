use crate::command_raw::CommandRaw;
use crate::error::{CodecError, Result};
use crate::frame::SerialFrame;
use bytes::{Bytes, BytesMut};
use std::time::Instant;
use zwave_cc::prelude::*;
use zwave_core::parse::{
    ParseError,
    bytes::{be_u8, rest, take},
};
use zwave_core::prelude::*;
use zwave_core::security::SharedSecurity;
use zwave_core::serialize;
use zwave_core::util::hex_fmt;

/// Status byte of an application update that carries a node information frame
pub const UPDATE_STATE_NODE_INFO_RECEIVED: u8 = 0x84;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InMsgType {
    Ack,
    Nak,
    Can,
    Request,
    Response,
}

/// Contents of a node information frame, received as an application update
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub node_id: NodeId,
    pub basic: u8,
    pub generic: u8,
    pub specific: u8,
    pub supported_classes: Vec<u8>,
}

/// A received message. Command class messages expose their CC bytes as a separate span,
/// which is replaced by the inner command once security and end point encapsulation are removed.
#[derive(custom_debug_derive::Debug, Clone, PartialEq)]
pub struct InMsg {
    msg_type: InMsgType,
    function_type: Option<FunctionType>,
    #[debug(with = "hex_fmt")]
    payload: Bytes,
    source: Option<NodeId>,
    #[debug(with = "debug_opt_hex")]
    cc: Option<Bytes>,
    source_endpoint: EndpointIndex,
    destination_endpoint: EndpointIndex,
    encapsulated: bool,
    secure: bool,
    /// The CC bytes as received, before decryption. Only kept for logging.
    #[debug(with = "debug_opt_hex")]
    encrypted_original: Option<Bytes>,
}

fn debug_opt_hex(data: &Option<Bytes>, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    match data {
        Some(data) => hex_fmt(data, f),
        None => write!(f, "None"),
    }
}

impl InMsg {
    fn control(msg_type: InMsgType) -> Self {
        Self {
            msg_type,
            function_type: None,
            payload: Bytes::new(),
            source: None,
            cc: None,
            source_endpoint: EndpointIndex::Root,
            destination_endpoint: EndpointIndex::Root,
            encapsulated: false,
            secure: false,
            encrypted_original: None,
        }
    }

    /// Interprets a checksummed data frame
    pub fn from_raw(raw: CommandRaw) -> Result<Self> {
        let msg_type = match raw.command_type {
            CommandType::Request => InMsgType::Request,
            CommandType::Response => InMsgType::Response,
        };
        let mut ret = Self {
            function_type: Some(raw.function_type),
            payload: raw.payload.clone(),
            ..Self::control(msg_type)
        };

        let mut i = raw.payload;
        match (raw.command_type, raw.function_type) {
            (CommandType::Request, FunctionType::ApplicationCommand) => {
                let (_rx_status, source) = (be_u8, NodeId::parse).parse(&mut i)?;
                let cc_len = be_u8(&mut i)?;
                let cc = take(cc_len).parse(&mut i)?;
                if cc.is_empty() {
                    return Err(ParseError::validation_failure("empty command class").into());
                }
                ret.source = Some(source);
                ret.cc = Some(cc);
            }
            (CommandType::Request, FunctionType::ApplicationUpdate) => {
                let (_status, source) = (be_u8, NodeId::parse).parse(&mut i)?;
                ret.source = Some(source);
            }
            _ => {}
        }

        Ok(ret)
    }

    /// Decodes a received frame completely: S0 decryption (if needed) and end point unwrapping
    pub fn decode(raw: CommandRaw, security: Option<&SharedSecurity>, now: Instant) -> Result<Self> {
        let mut ret = Self::from_raw(raw)?;
        if ret.is_secure_encapsulation() {
            let Some(security) = security else {
                return Err(CodecError::NoNetworkKey);
            };
            ret.decrypt(security, now)?;
        }
        ret.unwrap_endpoint()?;
        Ok(ret)
    }

    /// Builds an application command as the controller would report it. Used to inject traffic.
    pub fn application_command(source: NodeId, cc: &CCRaw) -> Self {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };
        let cc_bytes = cc.as_bytes();
        let payload = tuple((
            be_u8(0),
            source,
            be_u8(cc_bytes.len() as u8),
            slice(&cc_bytes),
        ))
        .as_bytes();
        Self {
            function_type: Some(FunctionType::ApplicationCommand),
            payload,
            source: Some(source),
            cc: Some(cc_bytes),
            ..Self::control(InMsgType::Request)
        }
    }

    /// Builds a node information update, as sent by a node when it wakes up or is asked for it
    pub fn node_info_update(node_id: NodeId, classes: &[u8]) -> Self {
        let mut payload = BytesMut::new();
        payload.extend_from_slice(&[
            UPDATE_STATE_NODE_INFO_RECEIVED,
            node_id.raw(),
            classes.len() as u8 + 3,
            0x04,
            0x10,
            0x01,
        ]);
        payload.extend_from_slice(classes);
        Self {
            function_type: Some(FunctionType::ApplicationUpdate),
            payload: payload.freeze(),
            source: Some(node_id),
            ..Self::control(InMsgType::Request)
        }
    }

    pub fn msg_type(&self) -> InMsgType {
        self.msg_type
    }

    pub fn is_control(&self) -> bool {
        matches!(
            self.msg_type,
            InMsgType::Ack | InMsgType::Nak | InMsgType::Can
        )
    }

    pub fn function_type(&self) -> Option<FunctionType> {
        self.function_type
    }

    /// Everything after the function id
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn source_node(&self) -> Option<NodeId> {
        self.source
    }

    pub fn is_cc_msg(&self) -> bool {
        self.cc.is_some()
    }

    /// The command class bytes: class id, command id and payload
    pub fn cc_span(&self) -> Result<&Bytes> {
        self.cc.as_ref().ok_or(CodecError::NotACcMessage)
    }

    fn expect_cc(&self) -> &Bytes {
        match &self.cc {
            Some(cc) => cc,
            None => panic!("tried to read command class bytes from a non-CC message: {:?}", self),
        }
    }

    /// The command class id. Panics if this is not a command class message.
    pub fn class_id(&self) -> u8 {
        self.expect_cc()[0]
    }

    /// The command id, or 0 for classes without commands. Panics if this is not a command class message.
    pub fn cmd_id(&self) -> u8 {
        self.expect_cc().get(1).copied().unwrap_or(0)
    }

    pub fn cc_raw(&self) -> Result<CCRaw> {
        Ok(CCRaw::try_from_bytes(self.cc_span()?.clone())?)
    }

    pub fn cc(&self) -> Result<CC> {
        Ok(CC::try_from_raw(self.cc_raw()?)?)
    }

    pub fn source_endpoint(&self) -> EndpointIndex {
        self.source_endpoint
    }

    pub fn destination_endpoint(&self) -> EndpointIndex {
        self.destination_endpoint
    }

    /// Whether the command was received inside a multi channel encapsulation
    pub fn is_encapsulated(&self) -> bool {
        self.encapsulated
    }

    /// Whether the command was received encrypted
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn encrypted_original(&self) -> Option<&Bytes> {
        self.encrypted_original.as_ref()
    }

    fn is_class_cmd(&self, class: CommandClasses, cmd: u8) -> bool {
        self.cc
            .as_ref()
            .is_some_and(|cc| cc.len() >= 2 && cc[0] == class as u8 && cc[1] == cmd)
    }

    pub fn is_secure_encapsulation(&self) -> bool {
        self.is_class_cmd(CommandClasses::Security, SecurityCCCommand::CommandEncapsulation as u8)
    }

    pub fn is_wakeup_notification(&self) -> bool {
        self.is_class_cmd(CommandClasses::WakeUp, WakeUpCCCommand::Notification as u8)
    }

    /// The node information frame, if this is a "node info received" application update
    pub fn node_info(&self) -> Option<NodeInfo> {
        if self.function_type != Some(FunctionType::ApplicationUpdate) {
            return None;
        }
        let mut i = self.payload.clone();
        let (status, node_id, len) = (be_u8, NodeId::parse, be_u8).parse(&mut i).ok()?;
        if status != UPDATE_STATE_NODE_INFO_RECEIVED {
            return None;
        }
        let mut info = take(len).parse(&mut i).ok()?;
        let (basic, generic, specific) = (be_u8, be_u8, be_u8).parse(&mut info).ok()?;
        let supported_classes = rest(&mut info).ok()?.to_vec();
        Some(NodeInfo {
            node_id,
            basic,
            generic,
            specific,
            supported_classes,
        })
    }

    /// Removes S0 encapsulation, using our own nonce the sender referenced
    pub fn decrypt(&mut self, security: &SharedSecurity, now: Instant) -> Result<()> {
        if !self.is_secure_encapsulation() {
            return Err(CodecError::InvalidState("not an S0 encapsulated message"));
        }
        let sender = self.source.ok_or(CodecError::NotACcMessage)?;
        let CC::SecurityCCCommandEncapsulation(encapsulation) = self.cc()? else {
            return Err(CodecError::InvalidState("not an S0 encapsulated message"));
        };

        let mut sec = security
            .lock()
            .map_err(|_| CodecError::InvalidState("security manager lock poisoned"))?;
        if !sec.has_network_key() {
            return Err(CodecError::NoNetworkKey);
        }
        let Some(nonce) = sec.try_get_own_nonce(encapsulation.receiver_nonce_id, now) else {
            return Err(CodecError::DecryptFailed(format!(
                "nonce {:#04x} expired or unknown",
                encapsulation.receiver_nonce_id
            )));
        };
        let own_node_id = sec.own_node_id();
        let (Some(auth_key), Some(enc_key)) = (sec.auth_key(), sec.enc_key()) else {
            return Err(CodecError::NoNetworkKey);
        };

        let inner = encapsulation
            .decrypt(&nonce, sender, own_node_id, auth_key, enc_key)
            .map_err(|e| CodecError::DecryptFailed(e.to_string()))?;
        drop(sec);

        self.encrypted_original = self.cc.take();
        self.cc = Some(inner.as_bytes());
        self.secure = true;
        Ok(())
    }

    /// Replaces a multi channel encapsulated command with the inner command and
    /// records the end points. Other messages are left untouched.
    pub fn unwrap_endpoint(&mut self) -> Result<()> {
        if !self.is_class_cmd(
            CommandClasses::MultiChannel,
            MultiChannelCCCommand::CommandEncapsulation as u8,
        ) {
            return Ok(());
        }
        let CC::MultiChannelCCCommandEncapsulation(encapsulation) = self.cc()? else {
            return Err(CodecError::InvalidState("not a multi channel encapsulation"));
        };
        self.source_endpoint = encapsulation.source_endpoint;
        self.destination_endpoint = encapsulation.destination_endpoint;
        self.cc = Some(encapsulation.encapsulated.as_bytes());
        self.encapsulated = true;
        Ok(())
    }
}

impl TryFrom<SerialFrame> for InMsg {
    type Error = CodecError;

    fn try_from(frame: SerialFrame) -> Result<Self> {
        match frame {
            SerialFrame::ACK => Ok(Self::control(InMsgType::Ack)),
            SerialFrame::NAK => Ok(Self::control(InMsgType::Nak)),
            SerialFrame::CAN => Ok(Self::control(InMsgType::Can)),
            SerialFrame::Data(data) => Self::from_raw(CommandRaw::try_from_bytes(data)?),
            SerialFrame::Garbage(_) => {
                Err(ParseError::recoverable("garbage is not a message").into())
            }
        }
    }
}

impl ToLogPayload for InMsg {
    fn to_log_payload(&self) -> LogPayload {
        let Some(function_type) = self.function_type else {
            return LogPayloadText::new(format!("{:?}", self.msg_type)).into();
        };
        let mut ret = LogPayloadDict::new()
            .with_entry("type", format!("{:?}", self.msg_type))
            .with_entry("function", function_type.to_string());
        if let Some(source) = self.source {
            ret = ret.with_entry("source", source.to_string());
        }
        if self.encapsulated {
            ret = ret.with_entry(
                "end points",
                format!("{} -> {}", self.source_endpoint, self.destination_endpoint),
            );
        }
        if self.secure {
            ret = ret.with_entry("secure", "true");
        }
        match self.cc() {
            Ok(cc) => ret = ret.with_nested(cc.to_log_payload()),
            Err(_) if self.cc.is_some() => {
                ret = ret.with_entry("cc", format!("0x{}", hex::encode(self.expect_cc())))
            }
            Err(_) => ret = ret.with_entry("payload", format!("0x{}", hex::encode(&self.payload))),
        }
        ret.into()
    }
}
