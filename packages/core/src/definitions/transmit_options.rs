use crate::parse::{Parsable, ParseResult, bytes::be_u8};
use crate::serialize::{self, Serializable};
use bytes::{Bytes, BytesMut};
use std::fmt::Display;

const ACK: u8 = 0b0000_0001;
const AUTO_ROUTE: u8 = 0b0000_0100;
const NO_ROUTE: u8 = 0b0001_0000;
const EXPLORE: u8 = 0b0010_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitOptions {
    ack: bool,
    auto_route: bool,
    no_route: bool,
    explore: bool,
}

impl Default for TransmitOptions {
    fn default() -> Self {
        Self {
            ack: true,
            auto_route: true,
            no_route: false,
            explore: true,
        }
    }
}

impl Display for TransmitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ack {
            parts.push("request ACK");
        }
        if self.auto_route {
            parts.push("auto-route");
        }
        if self.no_route {
            parts.push("no routing");
        }
        if self.explore {
            parts.push("explorer frames");
        }
        write!(f, "{}", parts.join(", "))
    }
}

impl TransmitOptions {
    pub fn new() -> Self {
        Self {
            ack: false,
            auto_route: false,
            no_route: false,
            explore: false,
        }
    }

    pub fn ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    pub fn auto_route(mut self, auto_route: bool) -> Self {
        self.auto_route = auto_route;
        self
    }

    pub fn no_route(mut self, no_route: bool) -> Self {
        self.no_route = no_route;
        self
    }

    pub fn explore(mut self, explore: bool) -> Self {
        self.explore = explore;
        self
    }

    pub fn wants_ack(&self) -> bool {
        self.ack
    }
}

impl Parsable for TransmitOptions {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let raw = be_u8(i)?;
        Ok(Self::new()
            .ack(raw & ACK != 0)
            .auto_route(raw & AUTO_ROUTE != 0)
            .no_route(raw & NO_ROUTE != 0)
            .explore(raw & EXPLORE != 0))
    }
}

impl Serializable for TransmitOptions {
    fn serialize(&self, output: &mut BytesMut) {
        let mut raw = 0u8;
        for (flag, bit) in [
            (self.ack, ACK),
            (self.auto_route, AUTO_ROUTE),
            (self.no_route, NO_ROUTE),
            (self.explore, EXPLORE),
        ] {
            if flag {
                raw |= bit;
            }
        }
        serialize::bytes::be_u8(raw).serialize(output)
    }
}

#[test]
fn test_parse() {
    let mut raw = Bytes::copy_from_slice(&[0b1111_1111]);
    let opts = TransmitOptions::parse(&mut raw).unwrap();
    let expected = TransmitOptions::new()
        .ack(true)
        .auto_route(true)
        .no_route(true)
        .explore(true);
    assert_eq!(opts, expected);
}

#[test]
fn test_serialize() {
    let opts = TransmitOptions::default();
    assert_eq!(opts.as_bytes().as_ref(), &[0b0010_0101]);

    let opts = TransmitOptions::new().ack(true);
    assert_eq!(opts.as_bytes().as_ref(), &[0b0000_0001]);
}
