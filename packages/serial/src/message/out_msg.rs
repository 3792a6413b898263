use super::MsgPriority;
use crate::command_raw::CommandRaw;
use crate::error::{CodecError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Range;
use std::time::Instant;
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_core::security::{S0Nonce, SharedSecurity};
use zwave_core::wrapping_counter::WrappingCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutMsgState {
    /// Still being built
    Working,
    /// Finalized, but waiting for the receiver's nonce
    WaitEncrypt,
    ReadyToSend,
}

/// An outbound message. It is built byte by byte in the `Working` state and
/// becomes immutable once finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct OutMsg {
    state: OutMsgState,
    priority: MsgPriority,
    command_type: CommandType,
    function_type: FunctionType,
    target: Option<NodeId>,
    endpoint: Option<EndpointIndex>,
    secure: bool,
    buf: BytesMut,
    /// Positions of reserved length bytes for open counted regions
    counters: Vec<usize>,
    /// Where the command class bytes live in `buf`
    cc_range: Option<Range<usize>>,
    callback_id: Option<u8>,
    ack_id: Option<u32>,
    retries: u8,
    /// The command class bytes before encryption, kept for logging
    original: Option<Bytes>,
}

impl OutMsg {
    pub fn new(command_type: CommandType, function_type: FunctionType, priority: MsgPriority) -> Self {
        Self {
            state: OutMsgState::Working,
            priority,
            command_type,
            function_type,
            target: None,
            endpoint: None,
            secure: false,
            buf: BytesMut::new(),
            counters: Vec::new(),
            cc_range: None,
            callback_id: None,
            ack_id: None,
            retries: 0,
            original: None,
        }
    }

    /// A SendData request carrying the given command to the target node
    pub fn send_data(target: NodeId, cc: &CCRaw, priority: MsgPriority) -> Self {
        let mut ret = Self::new(CommandType::Request, FunctionType::SendData, priority);
        ret.target = Some(target);
        ret.append(&target);
        ret.start_count();
        let start = ret.buf.len();
        ret.append(cc);
        ret.cc_range = Some(start..ret.buf.len());
        ret.end_count();
        ret
    }

    /// Like [`OutMsg::send_data`], but addresses an end point of the target using multi channel encapsulation
    pub fn send_data_to_endpoint(
        target: NodeId,
        endpoint: EndpointIndex,
        cc: &CCRaw,
        priority: MsgPriority,
    ) -> Self {
        if endpoint.is_root() {
            return Self::send_data(target, cc, priority);
        }
        let encapsulation = MultiChannelCCCommandEncapsulation::to_endpoint(endpoint, cc.clone());
        let mut ret = Self::send_data(target, &CC::from(encapsulation).as_raw(), priority);
        ret.endpoint = Some(endpoint);
        ret
    }

    fn assert_working(&self) {
        assert_eq!(
            self.state,
            OutMsgState::Working,
            "cannot modify a message that was already finalized"
        );
    }

    pub fn append_u8(&mut self, value: u8) {
        self.assert_working();
        self.buf.put_u8(value);
    }

    pub fn append_bytes(&mut self, data: &[u8]) {
        self.assert_working();
        self.buf.extend_from_slice(data);
    }

    pub fn append(&mut self, value: &impl Serializable) {
        self.assert_working();
        value.serialize(&mut self.buf);
    }

    /// Reserves a length byte, to be filled by the matching [`OutMsg::end_count`]
    pub fn start_count(&mut self) {
        self.assert_working();
        self.counters.push(self.buf.len());
        self.buf.put_u8(0);
    }

    /// Fills the most recently reserved length byte with the number of bytes appended since.
    /// Panics without a matching [`OutMsg::start_count`].
    pub fn end_count(&mut self) {
        self.assert_working();
        let Some(pos) = self.counters.pop() else {
            panic!("end_count() called without a matching start_count()");
        };
        let count = self.buf.len() - pos - 1;
        self.buf[pos] = count as u8;
    }

    /// Marks the command to be sent S0 encrypted. Only valid for SendData.
    pub fn set_secure(&mut self, secure: bool) {
        self.assert_working();
        self.secure = secure && self.cc_range.is_some();
    }

    /// Completes the message. SendData gets its transmit options and a callback id.
    pub fn finalize(
        &mut self,
        transmit_options: TransmitOptions,
        callback_ids: &mut WrappingCounter<u8>,
    ) {
        self.assert_working();
        assert!(
            self.counters.is_empty(),
            "finalize() called with {} open counted regions",
            self.counters.len()
        );
        if self.function_type == FunctionType::SendData {
            let callback_id = callback_ids.increment();
            self.append(&transmit_options);
            self.append_u8(callback_id);
            self.callback_id = Some(callback_id);
        }
        self.state = if self.secure {
            OutMsgState::WaitEncrypt
        } else {
            OutMsgState::ReadyToSend
        };
    }

    /// Encrypts the command class bytes with the nonce the target sent us
    pub fn encrypt(
        &mut self,
        security: &SharedSecurity,
        receiver_nonce: &S0Nonce,
        _now: Instant,
    ) -> Result<()> {
        if self.state != OutMsgState::WaitEncrypt {
            return Err(CodecError::InvalidState("message is not waiting for encryption"));
        }
        let (Some(range), Some(target)) = (self.cc_range.clone(), self.target) else {
            return Err(CodecError::NotACcMessage);
        };
        let plaintext = Bytes::copy_from_slice(&self.buf[range.clone()]);
        let inner = CCRaw::try_from_bytes(plaintext.clone())?;

        let sec = security
            .lock()
            .map_err(|_| CodecError::InvalidState("security manager lock poisoned"))?;
        let (Some(auth_key), Some(enc_key)) = (sec.auth_key(), sec.enc_key()) else {
            return Err(CodecError::NoNetworkKey);
        };
        let sender_nonce =
            S0Nonce::random().map_err(|e| CodecError::EncryptFailed(e.to_string()))?;
        let encapsulation = SecurityCCCommandEncapsulation::encrypt(
            &inner,
            sender_nonce,
            receiver_nonce,
            sec.own_node_id(),
            target,
            auth_key,
            enc_key,
        );
        drop(sec);
        let encrypted = CC::from(encapsulation).as_raw().as_bytes();
        let len = u8::try_from(encrypted.len()).map_err(|_| {
            CodecError::EncryptFailed(format!(
                "encapsulated command is {} bytes long",
                encrypted.len()
            ))
        })?;

        // Splice the encrypted command in place of the plain one and fix the length byte
        let mut buf = BytesMut::with_capacity(self.buf.len() + encrypted.len());
        buf.extend_from_slice(&self.buf[..range.start - 1]);
        buf.put_u8(len);
        let start = buf.len();
        buf.extend_from_slice(&encrypted);
        self.cc_range = Some(start..buf.len());
        buf.extend_from_slice(&self.buf[range.end..]);

        self.buf = buf;
        self.original = Some(plaintext);
        self.state = OutMsgState::ReadyToSend;
        Ok(())
    }

    pub fn state(&self) -> OutMsgState {
        self.state
    }

    pub fn priority(&self) -> MsgPriority {
        self.priority
    }

    pub fn function_type(&self) -> FunctionType {
        self.function_type
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn endpoint(&self) -> Option<EndpointIndex> {
        self.endpoint
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn callback_id(&self) -> Option<u8> {
        self.callback_id
    }

    /// Correlation id for synchronous waits on this message
    pub fn ack_id(&self) -> Option<u32> {
        self.ack_id
    }

    pub fn set_ack_id(&mut self, ack_id: u32) {
        self.ack_id = Some(ack_id);
    }

    pub fn retries(&self) -> u8 {
        self.retries
    }

    pub fn note_retry(&mut self) {
        self.retries = self.retries.saturating_add(1);
    }

    /// The command class bytes as they go on the wire
    pub fn cc_bytes(&self) -> Option<Bytes> {
        self.cc_range
            .clone()
            .map(|range| Bytes::copy_from_slice(&self.buf[range]))
    }

    /// The command class bytes before encryption, if the message was encrypted
    pub fn original(&self) -> Option<&Bytes> {
        self.original.as_ref()
    }

    /// The class and command id of the (unencrypted) command
    pub fn class_cmd(&self) -> Option<(u8, u8)> {
        let cc = self.original.clone().or_else(|| self.cc_bytes())?;
        let inner = match (cc.first(), cc.get(1)) {
            (Some(&class), Some(&cmd)) => (class, cmd),
            (Some(&class), None) => (class, 0),
            _ => return None,
        };
        Some(inner)
    }

    pub fn payload(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    pub fn to_command_raw(&self) -> Result<CommandRaw> {
        if self.state != OutMsgState::ReadyToSend {
            return Err(CodecError::InvalidState("message is not ready to send"));
        }
        Ok(CommandRaw::new(
            self.command_type,
            self.function_type,
            self.payload(),
        ))
    }
}

impl ToLogPayload for OutMsg {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new()
            .with_entry("function", self.function_type.to_string())
            .with_entry("priority", self.priority.to_string());
        if let Some(target) = self.target {
            ret = ret.with_entry("target", target.to_string());
        }
        if let Some(endpoint) = self.endpoint {
            ret = ret.with_entry("end point", endpoint.to_string());
        }
        if let Some(callback_id) = self.callback_id {
            ret = ret.with_entry("callback id", callback_id.to_string());
        }
        let plain = self.original.clone().or_else(|| self.cc_bytes());
        if let Some(cc) = plain.and_then(|cc| CCRaw::try_from_bytes(cc).ok()) {
            if let Ok(cc) = CC::try_from_raw(cc) {
                ret = ret.with_nested(cc.to_log_payload());
            }
        } else {
            ret = ret.with_entry("payload", format!("0x{}", hex::encode(&self.buf)));
        }
        ret.into()
    }
}
