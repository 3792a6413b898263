use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::bytes::take;
use zwave_core::prelude::*;
use zwave_core::serialize;

/// The largest interval that fits the 24 bit field
pub const MAX_WAKEUP_INTERVAL: u32 = 0x00ff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum WakeUpCCCommand {
    IntervalSet = 0x04,
    IntervalGet = 0x05,
    IntervalReport = 0x06,
    Notification = 0x07,
    NoMoreInformation = 0x08,
}

fn parse_interval(i: &mut Bytes) -> ParseResult<u32> {
    let raw = take(3usize).parse(i)?;
    Ok(raw.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
}

fn serialize_interval(seconds: u32) -> impl Serializable {
    let bytes = seconds.min(MAX_WAKEUP_INTERVAL).to_be_bytes();
    serialize::bytes::slice(Bytes::copy_from_slice(&bytes[1..]))
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct WakeUpCCIntervalSet {
    pub wake_up_interval: u32,
    /// The node that is notified when the device wakes up
    pub controller_node_id: NodeId,
}

impl CCBase for WakeUpCCIntervalSet {}

impl CCId for WakeUpCCIntervalSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn cc_command(&self) -> Option<u8> {
        Some(WakeUpCCCommand::IntervalSet as _)
    }
}

impl CCParsable for WakeUpCCIntervalSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let wake_up_interval = parse_interval(i)?;
        let controller_node_id = NodeId::parse(i)?;
        Ok(Self {
            wake_up_interval,
            controller_node_id,
        })
    }
}

impl CCSerializable for WakeUpCCIntervalSet {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::sequence::tuple;
        tuple((
            serialize_interval(self.wake_up_interval),
            self.controller_node_id,
        ))
        .serialize(output)
    }
}

impl ToLogPayload for WakeUpCCIntervalSet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("interval", format!("{} seconds", self.wake_up_interval))
            .with_entry("controller node id", self.controller_node_id.to_string())
            .into()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct WakeUpCCIntervalGet {}

impl CCBase for WakeUpCCIntervalGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::WakeUpCCIntervalReport(_))
    }
}

impl CCId for WakeUpCCIntervalGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn cc_command(&self) -> Option<u8> {
        Some(WakeUpCCCommand::IntervalGet as _)
    }
}

impl CCParsable for WakeUpCCIntervalGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for WakeUpCCIntervalGet {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for WakeUpCCIntervalGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct WakeUpCCIntervalReport {
    pub wake_up_interval: u32,
    pub controller_node_id: NodeId,
}

impl CCBase for WakeUpCCIntervalReport {}

impl CCId for WakeUpCCIntervalReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn cc_command(&self) -> Option<u8> {
        Some(WakeUpCCCommand::IntervalReport as _)
    }
}

impl CCParsable for WakeUpCCIntervalReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let wake_up_interval = parse_interval(i)?;
        let controller_node_id = NodeId::parse(i)?;
        Ok(Self {
            wake_up_interval,
            controller_node_id,
        })
    }
}

impl CCSerializable for WakeUpCCIntervalReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::sequence::tuple;
        tuple((
            serialize_interval(self.wake_up_interval),
            self.controller_node_id,
        ))
        .serialize(output)
    }
}

impl ToLogPayload for WakeUpCCIntervalReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("interval", format!("{} seconds", self.wake_up_interval))
            .with_entry("controller node id", self.controller_node_id.to_string())
            .into()
    }
}

/// Sent unsolicited by a sleeping device when it wakes up
#[derive(Default, Debug, Clone, PartialEq)]
pub struct WakeUpCCNotification {}

impl CCBase for WakeUpCCNotification {}

impl CCId for WakeUpCCNotification {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn cc_command(&self) -> Option<u8> {
        Some(WakeUpCCCommand::Notification as _)
    }
}

impl CCParsable for WakeUpCCNotification {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for WakeUpCCNotification {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for WakeUpCCNotification {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

/// Tells the device it may go back to sleep
#[derive(Default, Debug, Clone, PartialEq)]
pub struct WakeUpCCNoMoreInformation {}

impl CCBase for WakeUpCCNoMoreInformation {}

impl CCId for WakeUpCCNoMoreInformation {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::WakeUp
    }

    fn cc_command(&self) -> Option<u8> {
        Some(WakeUpCCCommand::NoMoreInformation as _)
    }
}

impl CCParsable for WakeUpCCNoMoreInformation {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for WakeUpCCNoMoreInformation {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for WakeUpCCNoMoreInformation {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::hex_bytes;

    #[test]
    fn test_interval_set() {
        let cc = WakeUpCCIntervalSet::builder()
            .wake_up_interval(3600)
            .controller_node_id(NodeId::new(1))
            .build();
        assert_eq!(
            CC::from(cc).as_raw(),
            CCRaw::try_from_bytes(hex_bytes!("8404000e1001")).unwrap()
        );
    }

    #[test]
    fn test_interval_report() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("840601518001")).unwrap();
        let CC::WakeUpCCIntervalReport(report) = CC::try_from_raw(raw).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.wake_up_interval, 86400);
        assert_eq!(report.controller_node_id, 1);
    }

    #[test]
    fn test_notification() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("8407")).unwrap();
        assert_eq!(
            CC::try_from_raw(raw).unwrap(),
            CC::WakeUpCCNotification(WakeUpCCNotification {})
        );
    }
}
