use crate::parse::{
    Parsable, ParseResult, TryFromReprError,
    bytes::be_u8,
    combinators::{context, map_res},
};
use crate::prelude::Parser;
use crate::serialize::{self, Serializable};
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::*;
use std::fmt::Display;

/// Serial API function ids used by this engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum FunctionType {
    GetSerialApiInitData = 0x02,
    ApplicationCommand = 0x04,
    SendData = 0x13,
    GetControllerVersion = 0x15,
    MemoryGetId = 0x20,
    GetNodeProtocolInfo = 0x41,
    ApplicationUpdate = 0x49,
    RequestNodeInfo = 0x60,
}

impl FunctionType {
    /// Whether messages of this type carry a command class payload
    pub fn carries_cc(&self) -> bool {
        matches!(self, Self::ApplicationCommand | Self::SendData)
    }
}

impl Display for FunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Parsable for FunctionType {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        context(
            "FunctionType",
            map_res(be_u8, |x| {
                FunctionType::try_from(x).map_err(TryFromReprError::from)
            }),
        )
        .parse(i)
    }
}

impl Serializable for FunctionType {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(*self as u8).serialize(output)
    }
}

#[test]
fn test_unknown_function() {
    let mut raw = Bytes::from_static(&[0x99]);
    assert!(FunctionType::parse(&mut raw).is_err());
    let mut raw = Bytes::from_static(&[0x13]);
    assert_eq!(FunctionType::parse(&mut raw), Ok(FunctionType::SendData));
}
