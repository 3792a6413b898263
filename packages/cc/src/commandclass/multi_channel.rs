use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::bytes::be_u8;
use zwave_core::prelude::*;
use zwave_core::serialize;

const ENDPOINT_MASK: u8 = 0b0111_1111;
const BIT_ADDRESS_FLAG: u8 = 0b1000_0000;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum MultiChannelCCCommand {
    CommandEncapsulation = 0x0d,
}

/// A command addressed to or sent from a single endpoint of a device
#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct MultiChannelCCCommandEncapsulation {
    #[builder(default, setter(into))]
    pub source_endpoint: EndpointIndex,
    #[builder(setter(into))]
    pub destination_endpoint: EndpointIndex,
    /// The destination is a bit mask of endpoints rather than an index
    #[builder(default)]
    pub destination_is_bitmask: bool,
    pub encapsulated: CCRaw,
}

impl MultiChannelCCCommandEncapsulation {
    /// Wraps a command for the given endpoint of the receiving device
    pub fn to_endpoint(endpoint: EndpointIndex, encapsulated: CCRaw) -> Self {
        Self {
            source_endpoint: EndpointIndex::Root,
            destination_endpoint: endpoint,
            destination_is_bitmask: false,
            encapsulated,
        }
    }
}

impl CCBase for MultiChannelCCCommandEncapsulation {}

impl CCId for MultiChannelCCCommandEncapsulation {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::MultiChannel
    }

    fn cc_command(&self) -> Option<u8> {
        Some(MultiChannelCCCommand::CommandEncapsulation as _)
    }
}

impl CCParsable for MultiChannelCCCommandEncapsulation {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (source, destination) = (be_u8, be_u8).parse(i)?;
        let encapsulated = CCRaw::parse(i)?;
        Ok(Self {
            source_endpoint: EndpointIndex::from(source & ENDPOINT_MASK),
            destination_endpoint: EndpointIndex::from(destination & ENDPOINT_MASK),
            destination_is_bitmask: destination & BIT_ADDRESS_FLAG != 0,
            encapsulated,
        })
    }
}

impl CCSerializable for MultiChannelCCCommandEncapsulation {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{bytes::be_u8, sequence::tuple};
        let destination = (self.destination_endpoint.raw() & ENDPOINT_MASK)
            | if self.destination_is_bitmask {
                BIT_ADDRESS_FLAG
            } else {
                0
            };
        tuple((
            be_u8(self.source_endpoint.raw() & ENDPOINT_MASK),
            be_u8(destination),
        ))
        .serialize(output);
        self.encapsulated.serialize(output);
    }
}

impl ToLogPayload for MultiChannelCCCommandEncapsulation {
    fn to_log_payload(&self) -> LogPayload {
        let inner = match CC::try_from_raw(self.encapsulated.clone()) {
            Ok(cc) => cc.to_log_payload(),
            Err(_) => LogPayloadText::new(format!("{:?}", self.encapsulated)).into(),
        };
        LogPayloadDict::new()
            .with_entry("source", self.source_endpoint.to_string())
            .with_entry("destination", self.destination_endpoint.to_string())
            .with_nested(inner)
            .into()
    }
}
