use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::combinators::{map, opt};
use zwave_core::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum MultilevelSwitchCCCommand {
    Set = 0x01,
    Get = 0x02,
    Report = 0x03,
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct MultilevelSwitchCCSet {
    pub target_value: LevelSet,
    #[builder(default, setter(into))]
    pub duration: Option<DurationSet>,
}

impl CCBase for MultilevelSwitchCCSet {}

impl CCId for MultilevelSwitchCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::MultilevelSwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(MultilevelSwitchCCCommand::Set as _)
    }
}

impl CCParsable for MultilevelSwitchCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let target_value = LevelSet::parse(i)?;
        let duration = opt(DurationSet::parse).parse(i)?;
        Ok(Self {
            target_value,
            duration,
        })
    }
}

impl CCSerializable for MultilevelSwitchCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        self.target_value.serialize(output);
        self.duration.serialize(output);
    }
}

impl ToLogPayload for MultilevelSwitchCCSet {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new().with_entry("target value", self.target_value.to_string());
        if let Some(duration) = self.duration {
            ret = ret.with_entry("duration", duration.to_string());
        }
        ret.into()
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct MultilevelSwitchCCGet {}

impl CCBase for MultilevelSwitchCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::MultilevelSwitchCCReport(_))
    }
}

impl CCId for MultilevelSwitchCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::MultilevelSwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(MultilevelSwitchCCCommand::Get as _)
    }
}

impl CCParsable for MultilevelSwitchCCGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        Ok(Self {})
    }
}

impl CCSerializable for MultilevelSwitchCCGet {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for MultilevelSwitchCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct MultilevelSwitchCCReport {
    pub current_value: LevelReport,
    #[builder(default, setter(into))]
    pub target_value: Option<LevelReport>,
    #[builder(default, setter(into))]
    pub duration: Option<DurationReport>,
}

impl CCBase for MultilevelSwitchCCReport {}

impl CCId for MultilevelSwitchCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::MultilevelSwitch
    }

    fn cc_command(&self) -> Option<u8> {
        Some(MultilevelSwitchCCCommand::Report as _)
    }
}

impl CCParsable for MultilevelSwitchCCReport {
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

impl CCSerializable for MultilevelSwitchCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        self.current_value.serialize(output);
        if let Some(target_value) = self.target_value {
            target_value.serialize(output);
            self.duration.unwrap_or_default().serialize(output);
        }
    }
}

impl ToLogPayload for MultilevelSwitchCCReport {
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
    fn test_set_without_duration() {
        let cc: CC = MultilevelSwitchCCSet::builder()
            .target_value(LevelSet::Level(42))
            .build()
            .into();
        assert_eq!(cc.as_raw().as_bytes(), hex_bytes!("26012a"));
    }

    #[test]
    fn test_report_with_transition() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("2603146381")).unwrap();
        let CC::MultilevelSwitchCCReport(report) = CC::try_from_raw(raw).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.current_value, LevelReport::Level(20));
        assert_eq!(report.target_value, Some(LevelReport::Level(99)));
        assert_eq!(report.duration, Some(DurationReport::Minutes(2)));
    }
}
