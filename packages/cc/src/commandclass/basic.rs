use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::combinators::{map, opt};
use zwave_core::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum BasicCCCommand {
    Set = 0x01,
    Get = 0x02,
    Report = 0x03,
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct BasicCCSet {
    pub target_value: LevelSet,
}

impl CCBase for BasicCCSet {}

impl CCId for BasicCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Basic
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BasicCCCommand::Set as _)
    }
}

impl CCParsable for BasicCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let target_value = LevelSet::parse(i)?;
        Ok(Self { target_value })
    }
}

impl CCSerializable for BasicCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        self.target_value.serialize(output)
    }
}

impl ToLogPayload for BasicCCSet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("target value", self.target_value.to_string())
            .into()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct BasicCCGet {}

impl CCBase for BasicCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::BasicCCReport(_))
    }
}

impl CCId for BasicCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Basic
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BasicCCCommand::Get as _)
    }
}

impl CCParsable for BasicCCGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        // No payload
        Ok(Self {})
    }
}

impl CCSerializable for BasicCCGet {
    fn serialize(&self, _output: &mut BytesMut) {
        // No payload
    }
}

impl ToLogPayload for BasicCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct BasicCCReport {
    pub current_value: LevelReport,
    #[builder(default, setter(into))]
    pub target_value: Option<LevelReport>,
    #[builder(default, setter(into))]
    pub duration: Option<DurationReport>,
}

impl CCBase for BasicCCReport {}

impl CCId for BasicCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Basic
    }

    fn cc_command(&self) -> Option<u8> {
        Some(BasicCCCommand::Report as _)
    }
}

impl CCParsable for BasicCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let current_value = LevelReport::parse(i)?;
        let (target_value, duration) =
            map(opt((LevelReport::parse, DurationReport::parse)), |x| {
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

impl CCSerializable for BasicCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        self.current_value.serialize(output);
        if let Some(target_value) = self.target_value {
            target_value.serialize(output);
            self.duration.unwrap_or_default().serialize(output);
        }
    }
}

impl ToLogPayload for BasicCCReport {
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
    fn test_report_v1_and_v2() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("200363")).unwrap();
        let cc = CC::try_from_raw(raw).unwrap();
        assert_eq!(
            cc,
            CC::BasicCCReport(BasicCCReport::builder().current_value(LevelReport::Level(99)).build())
        );

        let raw = CCRaw::try_from_bytes(hex_bytes!("2003001e05")).unwrap();
        let CC::BasicCCReport(report) = CC::try_from_raw(raw.clone()).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.target_value, Some(LevelReport::Level(30)));
        assert_eq!(report.duration, Some(DurationReport::Seconds(5)));
        assert_eq!(CC::from(report).as_raw(), raw);
    }

    #[test]
    fn test_set() {
        let cc: CC = BasicCCSet::builder()
            .target_value(LevelSet::On)
            .build()
            .into();
        assert_eq!(cc.as_raw().as_bytes(), hex_bytes!("2001ff"));
    }
}
