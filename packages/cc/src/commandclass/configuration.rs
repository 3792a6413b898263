use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::{
    bytes::{be_i16, be_i32, be_i8, be_u8},
    fail_validation,
};
use zwave_core::prelude::*;
use zwave_core::serialize;

const SIZE_MASK: u8 = 0b111;
const DEFAULT_FLAG: u8 = 0b1000_0000;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum ConfigurationCCCommand {
    Set = 0x04,
    Get = 0x05,
    Report = 0x06,
}

/// Reads a signed value whose width is given by `size`
fn parse_sized(size: u8, i: &mut Bytes) -> ParseResult<i32> {
    match size {
        1 => be_i8(i).map(i32::from),
        2 => be_i16(i).map(i32::from),
        4 => be_i32(i),
        _ => fail_validation(format!("invalid parameter size {}", size)),
    }
}

/// The smallest parameter size (1, 2 or 4 bytes) that can hold the value
pub fn size_for_value(value: i32) -> u8 {
    if i8::try_from(value).is_ok() {
        1
    } else if i16::try_from(value).is_ok() {
        2
    } else {
        4
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ConfigurationCCSet {
    pub parameter: u8,
    #[builder(default = 1)]
    pub size: u8,
    pub value: i32,
    /// Resets the parameter to its default instead of setting the value
    #[builder(default)]
    pub reset_to_default: bool,
}

impl CCBase for ConfigurationCCSet {}

impl CCId for ConfigurationCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Configuration
    }

    fn cc_command(&self) -> Option<u8> {
        Some(ConfigurationCCCommand::Set as _)
    }
}

impl CCParsable for ConfigurationCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (parameter, flags) = (be_u8, be_u8).parse(i)?;
        let size = flags & SIZE_MASK;
        let value = parse_sized(size, i)?;
        Ok(Self {
            parameter,
            size,
            value,
            reset_to_default: flags & DEFAULT_FLAG != 0,
        })
    }
}

impl CCSerializable for ConfigurationCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, sized_int},
            sequence::tuple,
        };
        let flags = (self.size & SIZE_MASK) | if self.reset_to_default { DEFAULT_FLAG } else { 0 };
        tuple((
            be_u8(self.parameter),
            be_u8(flags),
            sized_int(self.size, self.value),
        ))
        .serialize(output)
    }
}

impl ToLogPayload for ConfigurationCCSet {
    fn to_log_payload(&self) -> LogPayload {
        let ret = LogPayloadDict::new().with_entry("parameter", self.parameter.to_string());
        if self.reset_to_default {
            ret.with_entry("reset to default", "true").into()
        } else {
            ret.with_entry("size", self.size.to_string())
                .with_entry("value", self.value.to_string())
                .into()
        }
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ConfigurationCCGet {
    pub parameter: u8,
}

impl CCBase for ConfigurationCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::ConfigurationCCReport(report) if report.parameter == self.parameter)
    }
}

impl CCId for ConfigurationCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Configuration
    }

    fn cc_command(&self) -> Option<u8> {
        Some(ConfigurationCCCommand::Get as _)
    }
}

impl CCParsable for ConfigurationCCGet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let parameter = be_u8(i)?;
        Ok(Self { parameter })
    }
}

impl CCSerializable for ConfigurationCCGet {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.parameter).serialize(output)
    }
}

impl ToLogPayload for ConfigurationCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("parameter", self.parameter.to_string())
            .into()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ConfigurationCCReport {
    pub parameter: u8,
    pub size: u8,
    pub value: i32,
}

impl CCBase for ConfigurationCCReport {}

impl CCId for ConfigurationCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Configuration
    }

    fn cc_command(&self) -> Option<u8> {
        Some(ConfigurationCCCommand::Report as _)
    }
}

impl CCParsable for ConfigurationCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (parameter, flags) = (be_u8, be_u8).parse(i)?;
        let size = flags & SIZE_MASK;
        let value = parse_sized(size, i)?;
        Ok(Self {
            parameter,
            size,
            value,
        })
    }
}

impl CCSerializable for ConfigurationCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, sized_int},
            sequence::tuple,
        };
        tuple((
            be_u8(self.parameter),
            be_u8(self.size & SIZE_MASK),
            sized_int(self.size, self.value),
        ))
        .serialize(output)
    }
}

impl ToLogPayload for ConfigurationCCReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("parameter", self.parameter.to_string())
            .with_entry("size", self.size.to_string())
            .with_entry("value", self.value.to_string())
            .into()
    }
}
