use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::*;
use zwave_core::parse::{
    ParseError,
    bytes::{be_u8, literal, take, take_while},
    combinators::peek,
};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum SerialControlByte {
    SOF = 0x01,
    ACK = 0x06,
    NAK = 0x15,
    CAN = 0x18,
}

/// One unit of traffic on the serial line
#[derive(Clone, Debug, PartialEq)]
pub enum SerialFrame {
    ACK,
    NAK,
    CAN,
    /// A complete data frame, starting with SOF and including the checksum
    Data(Bytes),
    /// Bytes that cannot be the start of a frame
    Garbage(Bytes),
}

fn consume_garbage(i: &mut Bytes) -> ParseResult<SerialFrame> {
    let garbage = take_while(|b| SerialControlByte::try_from(b).is_err()).parse(i)?;
    if garbage.is_empty() {
        Err(ParseError::recoverable("no garbage"))
    } else {
        Ok(SerialFrame::Garbage(garbage))
    }
}

fn parse_control(i: &mut Bytes) -> ParseResult<SerialFrame> {
    let Some(&first) = i.first() else {
        return Err(ParseError::needed(1));
    };
    let frame = match SerialControlByte::try_from(first) {
        Ok(SerialControlByte::ACK) => SerialFrame::ACK,
        Ok(SerialControlByte::NAK) => SerialFrame::NAK,
        Ok(SerialControlByte::CAN) => SerialFrame::CAN,
        _ => return Err(ParseError::recoverable("not a control byte")),
    };
    be_u8(i)?;
    Ok(frame)
}

fn parse_data(i: &mut Bytes) -> ParseResult<SerialFrame> {
    // Ensure that the buffer contains at least 5 bytes
    peek(take(5usize)).parse(i)?;

    // Ensure that it starts with a SOF byte and extract the length of the rest of the command
    let (_, len) = peek((literal(SerialControlByte::SOF as u8), be_u8)).parse(i)?;

    // Take the whole command
    let data = take(len as usize + 2).parse(i)?;
    Ok(SerialFrame::Data(data))
}

impl Parsable for SerialFrame {
    /// A serial frame is either a control byte, data starting with SOF, or skipped garbage.
    /// Returns [`ParseError::Incomplete`] when more bytes are needed.
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        for parser in [consume_garbage, parse_control, parse_data] {
            match parser.parse_peek(i) {
                Err(ParseError::Recoverable(_)) => continue,
                res => return res,
            }
        }
        Err(ParseError::recoverable("no serial frame"))
    }
}

impl Serializable for SerialFrame {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::bytes::{be_u8, slice};
        match self {
            SerialFrame::ACK => be_u8(SerialControlByte::ACK as u8).serialize(output),
            SerialFrame::NAK => be_u8(SerialControlByte::NAK as u8).serialize(output),
            SerialFrame::CAN => be_u8(SerialControlByte::CAN as u8).serialize(output),
            SerialFrame::Data(data) | SerialFrame::Garbage(data) => slice(data).serialize(output),
        }
    }
}
