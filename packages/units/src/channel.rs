use crate::awaited::AwaitedRegistry;
use crate::controller::{ControllerInterface, EventTrigger, NodeCaps};
use crate::error::TransmitError;
use crate::fields::{FieldId, FieldValue};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use zwave_core::prelude::*;
use zwave_serial::command_raw::CommandRaw;
use zwave_serial::message::{InMsg, OutMsg, ReplyMatch};

/// Requests from the engine to the host, which owns the serial port and the field registry
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Send(CommandRaw),
    WriteField(FieldId, FieldValue),
    SetFieldError(FieldId, bool),
    EventTrigger(EventTrigger),
}

#[derive(Default)]
struct Shared {
    nodes: RwLock<BTreeMap<NodeId, NodeCaps>>,
    fields: RwLock<BTreeMap<String, FieldId>>,
    replies: Arc<AwaitedRegistry<InMsg>>,
    acks: Arc<AwaitedRegistry<u8>>,
}

/// A [`ControllerInterface`] that forwards everything to the host over a channel.
/// Synchronous sends register the expected answer before the message goes out and then
/// block until the host's I/O side completes it through the [`HostHandle`].
pub struct ChannelController {
    own_node_id: NodeId,
    commands: Sender<HostCommand>,
    shared: Arc<Shared>,
}

/// The host's side of a [`ChannelController`]
#[derive(Clone)]
pub struct HostHandle {
    shared: Arc<Shared>,
}

/// Creates a connected controller/handle pair. The receiver yields everything the engine wants done.
pub fn channel(own_node_id: NodeId) -> (ChannelController, HostHandle, Receiver<HostCommand>) {
    let (tx, rx) = mpsc::channel();
    let shared = Arc::new(Shared::default());
    (
        ChannelController {
            own_node_id,
            commands: tx,
            shared: shared.clone(),
        },
        HostHandle { shared },
        rx,
    )
}

impl HostHandle {
    pub fn set_node_caps(&self, node_id: NodeId, caps: NodeCaps) {
        if let Ok(mut nodes) = self.shared.nodes.write() {
            nodes.insert(node_id, caps);
        }
    }

    pub fn remove_node(&self, node_id: NodeId) {
        if let Ok(mut nodes) = self.shared.nodes.write() {
            nodes.remove(&node_id);
        }
    }

    /// Makes a field known under the given id
    pub fn register_field(&self, name: impl Into<String>, id: FieldId) {
        if let Ok(mut fields) = self.shared.fields.write() {
            fields.insert(name.into(), id);
        }
    }

    /// Hands a received message to whoever waits for it. Returns the message if nobody does,
    /// in which case it should go to the engine's regular message handling.
    pub fn complete(&self, msg: InMsg) -> Option<InMsg> {
        self.shared.replies.complete(msg)
    }

    /// Reports the transmit acknowledgement for a callback id. Returns whether anybody waited for it.
    pub fn ack(&self, callback_id: u8) -> bool {
        self.shared.acks.complete(callback_id).is_none()
    }
}

impl ChannelController {
    fn dispatch(&self, command: HostCommand) -> Result<(), TransmitError> {
        self.commands
            .send(command)
            .map_err(|_| TransmitError::Disconnected)
    }
}

impl ControllerInterface for ChannelController {
    fn own_node_id(&self) -> NodeId {
        self.own_node_id
    }

    fn node_caps(&self, node_id: NodeId) -> Option<NodeCaps> {
        self.shared.nodes.read().ok()?.get(&node_id).copied()
    }

    fn node_list(&self) -> Vec<NodeId> {
        self.shared
            .nodes
            .read()
            .map(|nodes| nodes.keys().copied().collect())
            .unwrap_or_default()
    }

    fn send(&mut self, msg: &OutMsg) -> Result<(), TransmitError> {
        self.dispatch(HostCommand::Send(msg.to_command_raw()?))
    }

    fn send_wait_ack(&mut self, msg: &OutMsg, timeout: Duration) -> Result<(), TransmitError> {
        let raw = msg.to_command_raw()?;
        let Some(callback_id) = msg.callback_id() else {
            return self.dispatch(HostCommand::Send(raw));
        };
        let awaited = self
            .shared
            .acks
            .add(Box::new(move |id| *id == callback_id), timeout);
        self.dispatch(HostCommand::Send(raw))?;
        match awaited.wait() {
            Ok(_) => Ok(()),
            Err(TransmitError::Timeout) => Err(TransmitError::NoAck),
            Err(e) => Err(e),
        }
    }

    fn send_wait_reply(
        &mut self,
        msg: &OutMsg,
        reply: &ReplyMatch,
        timeout: Duration,
    ) -> Result<InMsg, TransmitError> {
        let raw = msg.to_command_raw()?;
        let reply = reply.clone();
        let awaited = self
            .shared
            .replies
            .add(Box::new(move |msg| reply.matches(msg)), timeout);
        self.dispatch(HostCommand::Send(raw))?;
        awaited.wait()
    }

    fn write_field(&mut self, field: FieldId, value: &FieldValue) {
        let _ = self.dispatch(HostCommand::WriteField(field, value.clone()));
    }

    fn field_id(&self, name: &str) -> Option<FieldId> {
        self.shared.fields.read().ok()?.get(name).copied()
    }

    fn set_field_error(&mut self, field: FieldId, error: bool) {
        let _ = self.dispatch(HostCommand::SetFieldError(field, error));
    }

    fn queue_event_trigger(&mut self, trigger: EventTrigger) {
        let _ = self.dispatch(HostCommand::EventTrigger(trigger));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;
    use zwave_cc::prelude::*;
    use zwave_core::wrapping_counter::WrappingCounter;
    use zwave_serial::message::MsgPriority;

    fn battery_get(target: u8) -> OutMsg {
        let mut msg = OutMsg::send_data(
            NodeId::new(target),
            &CC::from(BatteryCCGet::default()).as_raw(),
            MsgPriority::Command,
        );
        msg.finalize(TransmitOptions::default(), &mut WrappingCounter::new());
        msg
    }

    #[test]
    fn test_reply_from_io_thread() {
        let (mut ctl, host, rx) = channel(NodeId::new(1));

        let io = thread::spawn(move || {
            let Ok(HostCommand::Send(raw)) = rx.recv() else {
                panic!("expected a send");
            };
            assert_eq!(raw.function_type, FunctionType::SendData);
            // Unrelated traffic is not swallowed
            let other = InMsg::node_info_update(NodeId::new(9), &[0x25]);
            assert_eq!(host.complete(other.clone()), Some(other));

            let report = CC::from(BatteryCCReport {
                level: BatteryLevel::Percent(80),
            })
            .as_raw();
            assert_eq!(
                host.complete(InMsg::application_command(NodeId::new(4), &report)),
                None
            );
        });

        let reply = ReplyMatch::cc_reply(NodeId::new(4), CommandClasses::Battery, 0x03);
        let response = ctl
            .send_wait_reply(&battery_get(4), &reply, Duration::from_secs(5))
            .unwrap();
        assert_eq!(response.source_node(), Some(NodeId::new(4)));
        io.join().unwrap();
    }

    #[test]
    fn test_ack_timeout() {
        let (mut ctl, host, rx) = channel(NodeId::new(1));
        let result = ctl.send_wait_ack(&battery_get(4), Duration::from_millis(10));
        assert_eq!(result, Err(TransmitError::NoAck));
        assert!(matches!(rx.try_recv(), Ok(HostCommand::Send(_))));
        // Too late
        assert!(!host.ack(1));
    }

    #[test]
    fn test_ack() {
        let (mut ctl, host, rx) = channel(NodeId::new(1));
        let io = thread::spawn(move || {
            let _ = rx.recv();
            thread::sleep(Duration::from_millis(10));
            assert!(host.ack(1));
        });
        assert_eq!(
            ctl.send_wait_ack(&battery_get(4), Duration::from_secs(5)),
            Ok(())
        );
        io.join().unwrap();
    }

    #[test]
    fn test_disconnected() {
        let (mut ctl, _host, rx) = channel(NodeId::new(1));
        drop(rx);
        assert_eq!(ctl.send(&battery_get(4)), Err(TransmitError::Disconnected));
    }

    #[test]
    fn test_node_and_field_registry() {
        let (ctl, host, _rx) = channel(NodeId::new(1));
        host.set_node_caps(
            NodeId::new(4),
            NodeCaps {
                listener: true,
                ..Default::default()
            },
        );
        host.register_field("Kitchen_Switch", FieldId(12));
        assert_eq!(ctl.node_list(), vec![NodeId::new(4)]);
        assert!(ctl.node_caps(NodeId::new(4)).unwrap().listener);
        assert_eq!(ctl.field_id("Kitchen_Switch"), Some(FieldId(12)));
        assert_eq!(ctl.field_id("Nope"), None);
    }
}
