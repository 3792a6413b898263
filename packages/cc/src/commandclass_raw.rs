use bytes::{Bytes, BytesMut};
use custom_debug_derive::Debug;
use zwave_core::parse::{
    bytes::{be_u8, rest},
    combinators::opt,
};
use zwave_core::prelude::*;
use zwave_core::serialize::{self, Serializable};
use zwave_core::util::hex_fmt;

/// A command class without any interpretation of its payload. The class id
/// is kept as a raw byte, so classes this crate does not know survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct CCRaw {
    #[debug(format = "{:#04x}")]
    pub cc_id: u8,
    pub cc_command: Option<u8>,
    #[debug(with = "hex_fmt")]
    pub payload: Bytes,
}

impl CCRaw {
    pub fn new(cc_id: impl Into<u8>, cc_command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            cc_id: cc_id.into(),
            cc_command: Some(cc_command),
            payload: payload.into(),
        }
    }

    /// The command class, if it is one we know
    pub fn class(&self) -> Option<CommandClasses> {
        CommandClasses::try_from(self.cc_id).ok()
    }

    /// Number of bytes this command class occupies on the wire
    pub fn wire_len(&self) -> usize {
        1 + self.cc_command.map_or(0, |_| 1) + self.payload.len()
    }
}

impl Parsable for CCRaw {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let cc_id = be_u8(i)?;
        // All CCs except NoOperation have a CC command
        let cc_command = if cc_id == CommandClasses::NoOperation as u8 {
            None
        } else {
            opt(be_u8).parse(i)?
        };
        let payload = rest(i)?;

        Ok(Self {
            cc_id,
            cc_command,
            payload,
        })
    }
}

impl Serializable for CCRaw {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };
        tuple((
            be_u8(self.cc_id),
            self.cc_command.map(be_u8),
            slice(&self.payload),
        ))
        .serialize(output)
    }
}
