use crate::parse::{
    Parsable, ParseResult, TryFromReprError,
    bytes::be_u8,
    combinators::{context, map_res},
};
use crate::prelude::Parser;
use crate::serialize::{self, Serializable};
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum CommandType {
    Request = 0x00,
    Response = 0x01,
}

impl Parsable for CommandType {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        context(
            "CommandType",
            map_res(be_u8, |x| {
                CommandType::try_from(x).map_err(TryFromReprError::from)
            }),
        )
        .parse(i)
    }
}

impl Serializable for CommandType {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(*self as u8).serialize(output)
    }
}
