use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::{bytes::be_u8, combinators::opt};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum BinarySensorCCCommand {
    Get = 0x02,
    Report = 0x03,
}

#[derive(Default, Debug, Clone, PartialEq, TypedBuilder)]
pub struct BinarySensorCCGet {
    /// Only for version 2
    #[builder(default, setter(into))]
    pub sensor_type: Option<u8>,
}

impl CCBase for BinarySensorCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        let CC::BinarySensorCCReport(report) = response else {
            return false;
        };
        self.sensor_type.is_none() || report.sensor_type == self.sensor_type
    }
}

impl CCId for BinarySensorCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::BinarySensor
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BinarySensorCCCommand::Get as _)
    }
}

impl CCParsable for BinarySensorCCGet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let sensor_type = opt(be_u8).parse(i)?;
        Ok(Self { sensor_type })
    }
}

impl CCSerializable for BinarySensorCCGet {
    fn serialize(&self, output: &mut BytesMut) {
        self.sensor_type
            .map(serialize::bytes::be_u8)
            .serialize(output)
    }
}

impl ToLogPayload for BinarySensorCCGet {
    fn to_log_payload(&self) -> LogPayload {
        match self.sensor_type {
            Some(t) => LogPayloadDict::new()
                .with_entry("sensor type", format!("{:#04x}", t))
                .into(),
            None => LogPayload::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct BinarySensorCCReport {
    pub value: bool,
    #[builder(default, setter(into))]
    pub sensor_type: Option<u8>,
}

impl CCBase for BinarySensorCCReport {}

impl CCId for BinarySensorCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::BinarySensor
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BinarySensorCCCommand::Report as _)
    }
}

impl CCParsable for BinarySensorCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        // Anything non-zero means "detected"
        let value = be_u8(i)? != 0;
        let sensor_type = opt(be_u8).parse(i)?;
        Ok(Self { value, sensor_type })
    }
}

impl CCSerializable for BinarySensorCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::bytes::be_u8;
        be_u8(if self.value { 0xff } else { 0x00 }).serialize(output);
        self.sensor_type.map(be_u8).serialize(output);
    }
}

impl ToLogPayload for BinarySensorCCReport {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new().with_entry("value", self.value.to_string());
        if let Some(t) = self.sensor_type {
            ret = ret.with_entry("sensor type", format!("{:#04x}", t));
        }
        ret.into()
    }
}

#[test]
fn test_report() {
    use zwave_core::hex_bytes;
    let raw = CCRaw::try_from_bytes(hex_bytes!("3003ff0c")).unwrap();
    let cc = CC::try_from_raw(raw.clone()).unwrap();
    assert_eq!(
        cc,
        CC::BinarySensorCCReport(BinarySensorCCReport {
            value: true,
            sensor_type: Some(0x0c)
        })
    );
    assert_eq!(cc.as_raw(), raw);
}
