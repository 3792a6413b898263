use crate::frame::SerialControlByte;
use bytes::{Bytes, BytesMut};
use custom_debug_derive::Debug;
use zwave_core::checksum::xor_sum;
use zwave_core::parse::{
    bytes::{be_u8, literal, skip, take},
    combinators::peek,
    validate,
};
use zwave_core::prelude::*;
use zwave_core::serialize;
use zwave_core::util::hex_fmt;

/// A checksummed data frame: `[SOF][Len][Type][FuncId][payload][Checksum]`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRaw {
    pub command_type: CommandType,
    pub function_type: FunctionType,
    #[debug(with = "hex_fmt")]
    pub payload: Bytes,
    #[debug(format = "{:#04x}")]
    pub checksum: u8,
}

/// The checksum covers everything between SOF and the checksum byte itself
fn compute_checksum(data: &[u8]) -> u8 {
    xor_sum(&data[1..data.len() - 1])
}

impl CommandRaw {
    pub fn new(command_type: CommandType, function_type: FunctionType, payload: impl Into<Bytes>) -> Self {
        let mut ret = Self {
            command_type,
            function_type,
            payload: payload.into(),
            checksum: 0,
        };
        let unchecked = ret.serialize_no_checksum().as_bytes();
        ret.checksum = compute_checksum(&unchecked);
        ret
    }

    fn serialize_no_checksum(&self) -> impl Serializable + '_ {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };

        let sof = be_u8(SerialControlByte::SOF as u8);
        let len = be_u8(self.payload.len() as u8 + 3);
        let payload = slice(&self.payload);
        let checksum = be_u8(0); // placeholder

        tuple((
            sof,
            len,
            self.command_type,
            self.function_type,
            payload,
            checksum,
        ))
    }
}

impl Parsable for CommandRaw {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        // Extract the length, while ensuring that the buffer...
        let (_, len, _) = peek((
            // ...starts with SOF
            literal(SerialControlByte::SOF as u8),
            // (read length)
            be_u8,
            // ...and contains at least 5 bytes
            take(3usize),
        ))
        .parse(i)?;
        validate(len >= 3, format!("invalid frame length {}", len))?;

        // Remember a copy of the command buffer for the checksum later
        let raw_data: Bytes = peek(take(len as usize + 2)).parse(i)?;

        // Skip the SOF and length bytes
        skip(2usize).parse(i)?;

        let command_type = CommandType::parse(i)?;
        let function_type = FunctionType::parse(i)?;
        let payload = take(len - 3).parse(i)?;
        let checksum = be_u8(i)?;

        let expected_checksum = compute_checksum(&raw_data);
        validate(
            checksum == expected_checksum,
            format!(
                "checksum mismatch: expected {:#04x}, got {:#04x}",
                expected_checksum, checksum
            ),
        )?;

        Ok(Self {
            command_type,
            function_type,
            payload,
            checksum,
        })
    }
}

impl Serializable for CommandRaw {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::bytes::slice;

        let mut buf = self.serialize_no_checksum().as_bytes_mut();
        let checksum = compute_checksum(&buf);
        // Then update the checksum in the buffer
        let len = buf.len();
        buf[len - 1] = checksum;

        slice(buf).serialize(output);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::hex_bytes;

    #[test]
    fn test_checksum() {
        // This is an actual message with a correct checksum
        let input = hex::decode("01030002fe").unwrap();
        assert_eq!(compute_checksum(&input), 0xfe);
    }

    #[test]
    fn test_parse_invalid_checksum() {
        // This is an actual message with a correct checksum
        let mut input = hex_bytes!("01030002fe");
        let result = CommandRaw::parse(&mut input);
        assert!(result.is_ok());

        // Now it is wrong
        let mut input = hex_bytes!("01030002ff");
        let result = CommandRaw::parse(&mut input);
        match result {
            Ok(_) => panic!("Expected an error"),
            Err(ParseError::Incomplete(_)) => panic!("Expected a parser error"),
            Err(_) => (),
        }
    }

    #[test]
    fn test_truncated() {
        let mut input = hex_bytes!("010900041005");
        assert!(matches!(
            CommandRaw::parse(&mut input),
            Err(ParseError::Incomplete(_))
        ));
    }

    #[test]
    fn test_serialize() {
        let cmd = CommandRaw::new(
            CommandType::Request,
            FunctionType::GetSerialApiInitData,
            Bytes::new(),
        );
        assert_eq!(cmd.checksum, 0xfe);
        assert_eq!(cmd.as_bytes(), hex_bytes!("01030002fe"));
    }

    #[test]
    fn test_round_trip_with_payload() {
        let cmd = CommandRaw::new(
            CommandType::Request,
            FunctionType::ApplicationCommand,
            hex_bytes!("000503250300"),
        );
        let parsed = CommandRaw::try_from_bytes(cmd.as_bytes()).unwrap();
        assert_eq!(parsed, cmd);
    }
}
