use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use std::fmt::Display;
use typed_builder::TypedBuilder;
use zwave_core::parse::bytes::be_u8;
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum CentralSceneCCCommand {
    Notification = 0x03,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum CentralSceneKeyAttribute {
    KeyPressed = 0x00,
    KeyReleased = 0x01,
    KeyHeldDown = 0x02,
    KeyPressed2x = 0x03,
    KeyPressed3x = 0x04,
    KeyPressed4x = 0x05,
    KeyPressed5x = 0x06,
}

impl Display for CentralSceneKeyAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct CentralSceneCCNotification {
    pub sequence_number: u8,
    pub key_attribute: CentralSceneKeyAttribute,
    pub scene_number: u8,
    #[builder(default)]
    pub slow_refresh: bool,
}

impl CCBase for CentralSceneCCNotification {}

impl CCId for CentralSceneCCNotification {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::CentralScene
    }

    fn cc_command(&self) -> Option<u8> {
        Some(CentralSceneCCCommand::Notification as _)
    }
}

impl CCParsable for CentralSceneCCNotification {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let (sequence_number, attrs, scene_number) = (be_u8, be_u8, be_u8).parse(i)?;
        let key_attribute = CentralSceneKeyAttribute::try_from(attrs & 0b111)
            .map_err(TryFromReprError::from)?;
        Ok(Self {
            sequence_number,
            key_attribute,
            scene_number,
            slow_refresh: attrs & 0x80 != 0,
        })
    }
}

impl CCSerializable for CentralSceneCCNotification {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{bytes::be_u8, sequence::tuple};
        let attrs = (self.key_attribute as u8) | if self.slow_refresh { 0x80 } else { 0 };
        tuple((
            be_u8(self.sequence_number),
            be_u8(attrs),
            be_u8(self.scene_number),
        ))
        .serialize(output)
    }
}

impl ToLogPayload for CentralSceneCCNotification {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("sequence number", self.sequence_number.to_string())
            .with_entry("scene", self.scene_number.to_string())
            .with_entry("key attribute", self.key_attribute.to_string())
            .into()
    }
}

#[test]
fn test_notification() {
    use zwave_core::hex_bytes;
    let raw = CCRaw::try_from_bytes(hex_bytes!("5b03078202")).unwrap();
    let cc = CC::try_from_raw(raw.clone()).unwrap();
    assert_eq!(
        cc,
        CC::CentralSceneCCNotification(
            CentralSceneCCNotification::builder()
                .sequence_number(7)
                .key_attribute(CentralSceneKeyAttribute::KeyHeldDown)
                .scene_number(2)
                .slow_refresh(true)
                .build()
        )
    );
    assert_eq!(cc.as_raw(), raw);
}
