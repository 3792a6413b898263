use crate::parse::{Parsable, ParseResult, bytes::be_u8};
use crate::serialize::{self, Serializable};
use bytes::{Bytes, BytesMut};
use std::fmt::{Debug, Display};

/// Id of a node in a classic Z-Wave network (1..=232)
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u8);

pub const NODE_ID_UNSPECIFIED: NodeId = NodeId(0);
pub const NODE_ID_BROADCAST: NodeId = NodeId(0xff);
pub const MAX_NODES: u8 = 232;

impl NodeId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn broadcast() -> Self {
        NODE_ID_BROADCAST
    }

    pub fn unspecified() -> Self {
        NODE_ID_UNSPECIFIED
    }

    pub fn is_valid(&self) -> bool {
        (1..=MAX_NODES).contains(&self.0)
    }

    pub fn raw(&self) -> u8 {
        self.0
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0>3}", self.0)
    }
}

impl From<u8> for NodeId {
    fn from(val: u8) -> Self {
        Self(val)
    }
}

impl From<NodeId> for u8 {
    fn from(val: NodeId) -> Self {
        val.0
    }
}

impl PartialEq<u8> for NodeId {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

impl Parsable for NodeId {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        be_u8(i).map(Self)
    }
}

impl Serializable for NodeId {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::be_u8(self.0).serialize(output)
    }
}

#[test]
fn test_display() {
    assert_eq!(NodeId::new(7).to_string(), "007");
    assert_eq!(format!("{:?}", NodeId::new(7)), "7");
    assert!(!NodeId::unspecified().is_valid());
    assert!(!NodeId::broadcast().is_valid());
    assert!(NodeId::new(232).is_valid());
}
