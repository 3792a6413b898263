use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::{bytes::be_u8, combinators::opt};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum SceneActivationCCCommand {
    Set = 0x01,
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct SceneActivationCCSet {
    pub scene_id: u8,
    #[builder(default, setter(into))]
    pub dimming_duration: Option<DurationSet>,
}

impl CCBase for SceneActivationCCSet {}

impl CCId for SceneActivationCCSet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::SceneActivation
    }

    fn cc_command(&self) -> Option<u8> {
        Some(SceneActivationCCCommand::Set as _)
    }
}

impl CCParsable for SceneActivationCCSet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let scene_id = be_u8(i)?;
        let dimming_duration = opt(DurationSet::parse).parse(i)?;
        Ok(Self {
            scene_id,
            dimming_duration,
        })
    }
}

impl CCSerializable for SceneActivationCCSet {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{bytes::be_u8, sequence::tuple};
        tuple((be_u8(self.scene_id), self.dimming_duration)).serialize(output)
    }
}

impl ToLogPayload for SceneActivationCCSet {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new().with_entry("scene id", self.scene_id.to_string());
        if let Some(duration) = self.dimming_duration {
            ret = ret.with_entry("dimming duration", duration.to_string());
        }
        ret.into()
    }
}

#[test]
fn test_set() {
    use zwave_core::hex_bytes;
    let raw = CCRaw::try_from_bytes(hex_bytes!("2b0105")).unwrap();
    let cc = CC::try_from_raw(raw.clone()).unwrap();
    assert_eq!(
        cc,
        CC::SceneActivationCCSet(SceneActivationCCSet::builder().scene_id(5).build())
    );
    assert_eq!(cc.as_raw(), raw);
}
