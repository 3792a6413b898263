use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::combinators::{map, opt};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum BinarySwitchCCCommand {
    Set = 0x01,
    Get = 0x02,
    Report = 0x03,
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct BinarySwitchCCSet {
    pub target_value: BinarySet,
    #[builder(default, setter(into))]
    pub duration: Option<DurationSet>,
}

impl CCBase for BinarySwitchCCSet {}

impl CCId for BinarySwitchCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::BinarySwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BinarySwitchCCCommand::Set as _)
    }
}

impl CCParsable for BinarySwitchCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let target_value = BinarySet::parse(i)?;
        let duration = opt(DurationSet::parse).parse(i)?;

        Ok(Self {
            target_value,
            duration,
        })
    }
}

impl CCSerializable for BinarySwitchCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::sequence::tuple;
        tuple((self.target_value, self.duration)).serialize(output)
    }
}

impl ToLogPayload for BinarySwitchCCSet {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new().with_entry(
            "target value",
            if bool::from(self.target_value) { "on" } else { "off" },
        );

        if let Some(duration) = self.duration {
            ret = ret.with_entry("duration", duration.to_string());
        }

        ret.into()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct BinarySwitchCCGet {}

impl CCBase for BinarySwitchCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::BinarySwitchCCReport(_))
    }
}

impl CCId for BinarySwitchCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::BinarySwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BinarySwitchCCCommand::Get as _)
    }
}

impl CCParsable for BinarySwitchCCGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        // No payload
        Ok(Self {})
    }
}

impl CCSerializable for BinarySwitchCCGet {
    fn serialize(&self, _output: &mut BytesMut) {
        // No payload
    }
}

impl ToLogPayload for BinarySwitchCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct BinarySwitchCCReport {
    pub current_value: BinaryReport,
    #[builder(default, setter(into))]
    pub target_value: Option<BinaryReport>,
    #[builder(default, setter(into))]
    pub duration: Option<DurationReport>,
}

impl CCBase for BinarySwitchCCReport {}

impl CCId for BinarySwitchCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::BinarySwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BinarySwitchCCCommand::Report as _)
    }
}

impl CCParsable for BinarySwitchCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let current_value = BinaryReport::parse(i)?;
        let (target_value, duration) =
            map(opt((BinaryReport::parse, DurationReport::parse)), |x| {
                x.unzip()
            })
            .parse(i)?;

        Ok(Self {
            current_value,
            target_value,
            duration,
        })
    }
}

impl CCSerializable for BinarySwitchCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        self.current_value.serialize(output);

        if let Some(target_value) = self.target_value {
            target_value.serialize(output);
            self.duration.unwrap_or_default().serialize(output);
        }
    }
}

impl ToLogPayload for BinarySwitchCCReport {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret =
            LogPayloadDict::new().with_entry("current value", self.current_value.to_string());
        if let Some(target_value) = self.target_value {
            ret = ret.with_entry("target value", target_value.to_string());
        }
        if let Some(duration) = self.duration {
            ret = ret.with_entry("duration", duration.to_string());
        }

        ret.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::hex_bytes;

    #[test]
    fn test_set_with_duration() {
        let cc: CC = BinarySwitchCCSet::builder()
            .target_value(BinarySet::On)
            .duration(DurationSet::Seconds(3))
            .build()
            .into();
        assert_eq!(cc.as_raw().as_bytes(), hex_bytes!("2501ff03"));
    }

    #[test]
    fn test_report() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("2503ff")).unwrap();
        let cc = CC::try_from_raw(raw).unwrap();
        assert_eq!(
            cc,
            CC::BinarySwitchCCReport(
                BinarySwitchCCReport::builder()
                    .current_value(BinaryReport::On)
                    .build()
            )
        );
    }

    #[test]
    fn test_get_expects_report() {
        let get = BinarySwitchCCGet::default();
        assert!(get.expects_response());
        let report: CC = BinarySwitchCCReport::builder()
            .current_value(BinaryReport::Off)
            .build()
            .into();
        assert!(get.test_response(&report));
    }
}
