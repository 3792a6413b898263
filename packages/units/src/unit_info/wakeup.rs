use std::collections::VecDeque;
use zwave_serial::message::OutMsg;

/// Messages for a sleeping node, sent in order when it wakes up
#[derive(Debug, Default)]
pub struct WakeupQueue {
    msgs: VecDeque<OutMsg>,
}

impl WakeupQueue {
    pub fn push(&mut self, msg: OutMsg) {
        self.msgs.push_back(msg);
    }

    /// Takes all queued messages, oldest first
    pub fn take_all(&mut self) -> Vec<OutMsg> {
        self.msgs.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.msgs.clear();
    }

    pub fn len(&self) -> usize {
        self.msgs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }
}
