use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use std::fmt::Display;
use typed_builder::TypedBuilder;
use zwave_core::parse::{
    bytes::{be_u8, rest},
    combinators::map_res,
};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum DoorLockCCCommand {
    OperationSet = 0x01,
    OperationGet = 0x02,
    OperationReport = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum DoorLockMode {
    Unsecured = 0x00,
    UnsecuredWithTimeout = 0x01,
    InsideUnsecured = 0x10,
    InsideUnsecuredWithTimeout = 0x11,
    OutsideUnsecured = 0x20,
    OutsideUnsecuredWithTimeout = 0x21,
    Unknown = 0xfe,
    Secured = 0xff,
}

impl DoorLockMode {
    /// Whether the bolt is thrown. `None` if the lock does not know.
    pub fn is_locked(&self) -> Option<bool> {
        match self {
            Self::Secured => Some(true),
            Self::Unknown => None,
            _ => Some(false),
        }
    }
}

impl From<bool> for DoorLockMode {
    fn from(locked: bool) -> Self {
        if locked { Self::Secured } else { Self::Unsecured }
    }
}

impl Display for DoorLockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Parsable for DoorLockMode {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        map_res(be_u8, |x| DoorLockMode::try_from(x).map_err(TryFromReprError::from)).parse(i)
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct DoorLockCCOperationSet {
    pub mode: DoorLockMode,
}

impl CCBase for DoorLockCCOperationSet {}

impl CCId for DoorLockCCOperationSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::DoorLock
    }

    fn cc_command(&self) -> Option<u8> {
        Some(DoorLockCCCommand::OperationSet as _)
    }
}

impl CCParsable for DoorLockCCOperationSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let mode = DoorLockMode::parse(i)?;
        Ok(Self { mode })
    }
}

impl CCSerializable for DoorLockCCOperationSet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.mode as u8).serialize(output)
    }
}

impl ToLogPayload for DoorLockCCOperationSet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("mode", self.mode.to_string())
            .into()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct DoorLockCCOperationGet {}

impl CCBase for DoorLockCCOperationGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::DoorLockCCOperationReport(_))
    }
}

impl CCId for DoorLockCCOperationGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::DoorLock
    }

    fn cc_command(&self) -> Option<u8> {
        Some(DoorLockCCCommand::OperationGet as _)
    }
}

impl CCParsable for DoorLockCCOperationGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for DoorLockCCOperationGet {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for DoorLockCCOperationGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct DoorLockCCOperationReport {
    pub current_mode: DoorLockMode,
    /// Handle modes, door condition and timeouts, which we pass through untouched
    #[builder(default)]
    pub details: Bytes,
}

impl CCBase for DoorLockCCOperationReport {}

impl CCId for DoorLockCCOperationReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::DoorLock
    }

    fn cc_command(&self) -> Option<u8> {
        Some(DoorLockCCCommand::OperationReport as _)
    }
}

impl CCParsable for DoorLockCCOperationReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let current_mode = DoorLockMode::parse(i)?;
        let details = rest(i)?;
        Ok(Self {
            current_mode,
            details,
        })
    }
}

impl CCSerializable for DoorLockCCOperationReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };
        tuple((be_u8(self.current_mode as u8), slice(&self.details))).serialize(output)
    }
}

impl ToLogPayload for DoorLockCCOperationReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("current mode", self.current_mode.to_string())
            .into()
    }
}

#[test]
fn test_operation_report() {
    use zwave_core::hex_bytes;
    let raw = CCRaw::try_from_bytes(hex_bytes!("6203ff00000000")).unwrap();
    let CC::DoorLockCCOperationReport(report) = CC::try_from_raw(raw.clone()).unwrap() else {
        panic!("expected an operation report");
    };
    assert_eq!(report.current_mode.is_locked(), Some(true));
    assert_eq!(CC::from(report).as_raw(), raw);

    let raw = CCRaw::try_from_bytes(hex_bytes!("620342")).unwrap();
    assert!(CC::try_from_raw(raw).is_err());
}
