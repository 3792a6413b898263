use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use std::fmt::Display;
use zwave_core::parse::{bytes::be_u8, validate};
use zwave_core::prelude::*;
use zwave_core::serialize;

const BATTERY_LOW: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum BatteryCCCommand {
    Get = 0x02,
    Report = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryLevel {
    /// Charge in percent
    Percent(u8),
    /// The device signals a low battery warning
    Low,
}

impl BatteryLevel {
    /// The charge in percent. A low battery warning counts as 0 %.
    pub fn percent(&self) -> u8 {
        match self {
            Self::Percent(p) => *p,
            Self::Low => 0,
        }
    }
}

impl Display for BatteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{} %", p),
            Self::Low => write!(f, "low battery warning"),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct BatteryCCGet {}

impl CCBase for BatteryCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::BatteryCCReport(_))
    }
}

impl CCId for BatteryCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Battery
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BatteryCCCommand::Get as _)
    }
}

impl CCParsable for BatteryCCGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for BatteryCCGet {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for BatteryCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatteryCCReport {
    pub level: BatteryLevel,
}

impl CCBase for BatteryCCReport {}

impl CCId for BatteryCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Battery
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BatteryCCCommand::Report as _)
    }
}

impl CCParsable for BatteryCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let raw = be_u8(i)?;
        let level = if raw == BATTERY_LOW {
            BatteryLevel::Low
        } else {
            validate(raw <= 100, format!("invalid battery level {}", raw))?;
            BatteryLevel::Percent(raw)
        };
        Ok(Self { level })
    }
}

impl CCSerializable for BatteryCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        let raw = match self.level {
            BatteryLevel::Percent(p) => p.min(100),
            BatteryLevel::Low => BATTERY_LOW,
        };
        serialize::bytes::be_u8(raw).serialize(output)
    }
}

impl ToLogPayload for BatteryCCReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("level", self.level.to_string())
            .into()
    }
}

#[test]
fn test_report() {
    use zwave_core::hex_bytes;
    let cc = CC::try_from_raw(CCRaw::try_from_bytes(hex_bytes!("800355")).unwrap()).unwrap();
    assert_eq!(
        cc,
        CC::BatteryCCReport(BatteryCCReport {
            level: BatteryLevel::Percent(85)
        })
    );
    let cc = CC::try_from_raw(CCRaw::try_from_bytes(hex_bytes!("8003ff")).unwrap()).unwrap();
    assert_eq!(
        cc,
        CC::BatteryCCReport(BatteryCCReport {
            level: BatteryLevel::Low
        })
    );
    assert!(CC::try_from_raw(CCRaw::try_from_bytes(hex_bytes!("800365")).unwrap()).is_err());
}
