use crate::controller::ControllerInterface;
use crate::error::TransmitError;
use crate::options::EngineOptions;
use std::collections::VecDeque;
use std::sync::MutexGuard;
use std::time::{Duration, Instant};
use zwave_cc::prelude::*;
use zwave_core::prelude::*;
use zwave_core::security::{S0Nonce, SecurityManager, SharedSecurity};
use zwave_core::wrapping_counter::WrappingCounter;
use zwave_logging::loggers::MessageLogger;
use zwave_serial::error::CodecError;
use zwave_serial::message::{InMsg, MsgPriority, OutMsg, OutMsgState, ReplyMatch};

/// Outbound messages for reachable nodes, ordered by priority. Messages of the same priority
/// keep their order.
#[derive(Debug, Default)]
pub struct TransmitQueue {
    buckets: [VecDeque<OutMsg>; MsgPriority::ALL.len()],
}

impl TransmitQueue {
    pub fn push(&mut self, msg: OutMsg) {
        self.buckets[msg.priority().index()].push_back(msg);
    }

    /// Takes the most urgent message
    pub fn pop(&mut self) -> Option<OutMsg> {
        self.buckets.iter_mut().find_map(|b| b.pop_front())
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }

    /// Drops all messages for the given node
    pub fn remove_node(&mut self, node_id: NodeId) {
        for bucket in self.buckets.iter_mut() {
            bucket.retain(|m| m.target() != Some(node_id));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// Hand to the controller and continue
    Async,
    /// Wait for the transmit acknowledgement
    WaitAck,
}

/// Turns built messages into sendable ones: callback ids, S0 nonce exchange and encryption.
/// Owns the transmit queue for reachable nodes.
pub struct Transport {
    security: SharedSecurity,
    callback_ids: WrappingCounter<u8>,
    queue: TransmitQueue,
    ack_timeout: Duration,
    reply_timeout: Duration,
    log: MessageLogger,
}

fn lock(security: &SharedSecurity) -> Result<MutexGuard<'_, SecurityManager>, TransmitError> {
    security
        .lock()
        .map_err(|_| CodecError::InvalidState("security manager lock poisoned").into())
}

impl Transport {
    pub fn new(security: SharedSecurity, options: &EngineOptions, log: MessageLogger) -> Self {
        Self {
            security,
            callback_ids: WrappingCounter::new(),
            queue: TransmitQueue::default(),
            ack_timeout: options.ack_timeout,
            reply_timeout: options.reply_timeout,
            log,
        }
    }

    pub fn security(&self) -> &SharedSecurity {
        &self.security
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn log(&self) -> &MessageLogger {
        &self.log
    }

    pub fn queue(&mut self, msg: OutMsg) {
        self.queue.push(msg);
    }

    pub fn queued(&self) -> &TransmitQueue {
        &self.queue
    }

    pub fn queued_mut(&mut self) -> &mut TransmitQueue {
        &mut self.queue
    }

    /// Finalizes the message and, if it is secure, encrypts it with a fresh nonce from the target
    fn prepare(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        mut msg: OutMsg,
        now: Instant,
    ) -> Result<OutMsg, TransmitError> {
        if msg.state() == OutMsgState::Working {
            msg.finalize(TransmitOptions::default(), &mut self.callback_ids);
        }
        if msg.state() == OutMsgState::WaitEncrypt {
            let target = msg.target().ok_or(CodecError::NotACcMessage)?;
            if !lock(&self.security)?.has_network_key() {
                return Err(CodecError::NoNetworkKey.into());
            }
            let nonce = self.fetch_nonce(ctl, target, now)?;
            msg.encrypt(&self.security, &nonce, now)?;
        }
        Ok(msg)
    }

    /// Gets a nonce from the target: one it sent us earlier, or a new one requested now
    fn fetch_nonce(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        target: NodeId,
        now: Instant,
    ) -> Result<S0Nonce, TransmitError> {
        if let Some(nonce) = lock(&self.security)?.try_claim_nonce(target, now) {
            return Ok(nonce);
        }

        let get = CC::from(SecurityCCNonceGet::default()).as_raw();
        let mut request = OutMsg::send_data(target, &get, MsgPriority::Ping);
        request.finalize(TransmitOptions::default(), &mut self.callback_ids);
        self.log.outbound(&request);

        let reply = ReplyMatch::cc_reply(
            target,
            CommandClasses::Security,
            SecurityCCCommand::NonceReport as u8,
        );
        let response = ctl.send_wait_reply(&request, &reply, self.reply_timeout)?;
        match response.cc()? {
            CC::SecurityCCNonceReport(report) => Ok(report.nonce),
            _ => Err(TransmitError::NoReply),
        }
    }

    /// Sends a message now, bypassing the queue
    pub fn transmit(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        msg: OutMsg,
        mode: SendMode,
        now: Instant,
    ) -> Result<(), TransmitError> {
        let msg = self.prepare(ctl, msg, now)?;
        self.log.outbound(&msg);
        match mode {
            SendMode::Async => ctl.send(&msg),
            SendMode::WaitAck => ctl.send_wait_ack(&msg, self.ack_timeout),
        }
    }

    /// Sends a message and waits for the matching reply
    pub fn request(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        msg: OutMsg,
        reply: &ReplyMatch,
        now: Instant,
    ) -> Result<InMsg, TransmitError> {
        let msg = self.prepare(ctl, msg, now)?;
        self.log.outbound(&msg);
        let response = ctl.send_wait_reply(&msg, reply, self.reply_timeout)?;
        self.log.inbound(&response);
        Ok(response)
    }

    /// Sends everything in the transmit queue, most urgent first. Failed messages are returned.
    pub fn flush(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        now: Instant,
    ) -> Vec<(OutMsg, TransmitError)> {
        let mut failed = Vec::new();
        while let Some(msg) = self.queue.pop() {
            if let Err(e) = self.transmit(ctl, msg.clone(), SendMode::Async, now) {
                failed.push((msg, e));
            }
        }
        failed
    }

    /// Answers a node's nonce request with a nonce of our own
    pub fn answer_nonce_get(
        &mut self,
        ctl: &mut dyn ControllerInterface,
        from: NodeId,
        now: Instant,
    ) -> Result<(), TransmitError> {
        let nonce = lock(&self.security)?
            .generate_nonce(from, now)
            .map_err(|e| CodecError::EncryptFailed(e.to_string()))?;
        let report = CC::from(SecurityCCNonceReport { nonce }).as_raw();
        let msg = OutMsg::send_data(from, &report, MsgPriority::Ping);
        self.transmit(ctl, msg, SendMode::Async, now)
    }

    /// Remembers a nonce a node sent us without being asked, for the next secure message to it
    pub fn store_nonce(&mut self, from: NodeId, nonce: S0Nonce, now: Instant) {
        if let Ok(mut security) = lock(&self.security) {
            let own_node_id = security.own_node_id();
            security.set_nonce(from, own_node_id, nonce, true, now);
        }
    }
}
