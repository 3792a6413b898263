use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::bytes::be_u16;
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum ManufacturerSpecificCCCommand {
    Get = 0x04,
    Report = 0x05,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct ManufacturerSpecificCCGet {}

impl CCBase for ManufacturerSpecificCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::ManufacturerSpecificCCReport(_))
    }
}

impl CCId for ManufacturerSpecificCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::ManufacturerSpecific
    }

    fn cc_command(&self) -> Option<u8> {
        Some(ManufacturerSpecificCCCommand::Get as _)
    }
}

impl CCParsable for ManufacturerSpecificCCGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        // No payload
        Ok(Self {})
    }
}

impl CCSerializable for ManufacturerSpecificCCGet {
    fn serialize(&self, _output: &mut BytesMut) {}
}

impl ToLogPayload for ManufacturerSpecificCCGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct ManufacturerSpecificCCReport {
    pub manufacturer_id: u16,
    pub product_type: u16,
    pub product_id: u16,
}

impl ManufacturerSpecificCCReport {
    /// The three ids packed into one key, as used by the device catalog
    pub fn packed_ids(&self) -> u64 {
        ((self.manufacturer_id as u64) << 32)
            | ((self.product_type as u64) << 16)
            | self.product_id as u64
    }
}

impl CCBase for ManufacturerSpecificCCReport {}

impl CCId for ManufacturerSpecificCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::ManufacturerSpecific
    }

    fn cc_command(&self) -> Option<u8> {
        Some(ManufacturerSpecificCCCommand::Report as _)
    }
}

impl CCParsable for ManufacturerSpecificCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (manufacturer_id, product_type, product_id) = (be_u16, be_u16, be_u16).parse(i)?;
        Ok(Self {
            manufacturer_id,
            product_type,
            product_id,
        })
    }
}

impl CCSerializable for ManufacturerSpecificCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{bytes::be_u16, sequence::tuple};
        tuple((
            be_u16(self.manufacturer_id),
            be_u16(self.product_type),
            be_u16(self.product_id),
        ))
        .serialize(output)
    }
}

impl ToLogPayload for ManufacturerSpecificCCReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("manufacturer id", format!("{:#06x}", self.manufacturer_id))
            .with_entry("product type", format!("{:#06x}", self.product_type))
            .with_entry("product id", format!("{:#06x}", self.product_id))
            .into()
    }
}

#[test]
fn test_report() {
    use zwave_core::hex_bytes;
    let raw = CCRaw::try_from_bytes(hex_bytes!("7205008604020064")).unwrap();
    let CC::ManufacturerSpecificCCReport(report) = CC::try_from_raw(raw).unwrap() else {
        panic!("expected a report");
    };
    assert_eq!(report.manufacturer_id, 0x0086);
    assert_eq!(report.product_type, 0x0402);
    assert_eq!(report.product_id, 0x0064);
    assert_eq!(report.packed_ids(), 0x0086_0402_0064);
}
