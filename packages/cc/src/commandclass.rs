use crate::commandclass_raw::CCRaw;
use bytes::{Bytes, BytesMut};
use enum_dispatch::enum_dispatch;
use zwave_core::parse::combinators::complete;
use zwave_core::prelude::*;
use zwave_core::submodule;

submodule!(association);
submodule!(basic);
submodule!(battery);
submodule!(binary_sensor);
submodule!(binary_switch);
submodule!(central_scene);
submodule!(configuration);
submodule!(door_lock);
submodule!(manufacturer_specific);
submodule!(multi_channel);
submodule!(multilevel_switch);
submodule!(notification);
submodule!(scene_activation);
submodule!(security);
submodule!(wake_up);

pub trait CCParsable
where
    Self: Sized + CCBase,
{
    /// Parses the payload of the command, i.e. everything after the command byte
    fn parse(i: &mut Bytes) -> ParseResult<Self>;
}

#[enum_dispatch(CC)]
/// Identifies a command class and its commands
pub trait CCId {
    /// The command class identifier
    fn cc_id(&self) -> CommandClasses;

    /// The subcommand identifier, if applicable
    fn cc_command(&self) -> Option<u8>;
}

#[enum_dispatch(CC)]
/// Writes the payload of the command, i.e. everything after the command byte
pub trait CCSerializable {
    fn serialize(&self, output: &mut BytesMut);
}

#[enum_dispatch(CC)]
/// Command-specific functionality that may need to be implemented for each command
pub trait CCBase: CCId + CCSerializable + ToLogPayload + std::fmt::Debug + Clone + PartialEq {
    /// Whether this CC expects a response
    fn expects_response(&self) -> bool {
        false
    }

    /// If this CC expects a response, this function can be used to test whether
    /// the response is the expected one.
    fn test_response(&self, response: &CC) -> bool {
        let _ = response;
        false
    }
}

#[enum_dispatch]
#[derive(Debug, Clone, PartialEq)]
pub enum CC {
    AssociationCCSet(AssociationCCSet),
    AssociationCCGet(AssociationCCGet),
    AssociationCCReport(AssociationCCReport),
    AssociationCCRemove(AssociationCCRemove),
    BasicCCSet(BasicCCSet),
    BasicCCGet(BasicCCGet),
    BasicCCReport(BasicCCReport),
    BatteryCCGet(BatteryCCGet),
    BatteryCCReport(BatteryCCReport),
    BinarySensorCCGet(BinarySensorCCGet),
    BinarySensorCCReport(BinarySensorCCReport),
    BinarySwitchCCSet(BinarySwitchCCSet),
    BinarySwitchCCGet(BinarySwitchCCGet),
    BinarySwitchCCReport(BinarySwitchCCReport),
    CentralSceneCCNotification(CentralSceneCCNotification),
    ConfigurationCCSet(ConfigurationCCSet),
    ConfigurationCCGet(ConfigurationCCGet),
    ConfigurationCCReport(ConfigurationCCReport),
    DoorLockCCOperationSet(DoorLockCCOperationSet),
    DoorLockCCOperationGet(DoorLockCCOperationGet),
    DoorLockCCOperationReport(DoorLockCCOperationReport),
    ManufacturerSpecificCCGet(ManufacturerSpecificCCGet),
    ManufacturerSpecificCCReport(ManufacturerSpecificCCReport),
    MultiChannelCCCommandEncapsulation(MultiChannelCCCommandEncapsulation),
    MultilevelSwitchCCSet(MultilevelSwitchCCSet),
    MultilevelSwitchCCGet(MultilevelSwitchCCGet),
    MultilevelSwitchCCReport(MultilevelSwitchCCReport),
    NotificationCCGet(NotificationCCGet),
    NotificationCCReport(NotificationCCReport),
    SceneActivationCCSet(SceneActivationCCSet),
    SecurityCCNonceGet(SecurityCCNonceGet),
    SecurityCCNonceReport(SecurityCCNonceReport),
    SecurityCCCommandEncapsulation(SecurityCCCommandEncapsulation),
    WakeUpCCIntervalSet(WakeUpCCIntervalSet),
    WakeUpCCIntervalGet(WakeUpCCIntervalGet),
    WakeUpCCIntervalReport(WakeUpCCIntervalReport),
    WakeUpCCNotification(WakeUpCCNotification),
    WakeUpCCNoMoreInformation(WakeUpCCNoMoreInformation),
    NotImplemented(NotImplemented),
}

macro_rules! impl_log_payload {
    ($($variant:ident),+ $(,)?) => {
        impl ToLogPayload for CC {
            fn to_log_payload(&self) -> LogPayload {
                match self {
                    $(CC::$variant(cc) => cc.to_log_payload(),)+
                }
            }
        }
    };
}

impl_log_payload!(
    AssociationCCSet,
    AssociationCCGet,
    AssociationCCReport,
    AssociationCCRemove,
    BasicCCSet,
    BasicCCGet,
    BasicCCReport,
    BatteryCCGet,
    BatteryCCReport,
    BinarySensorCCGet,
    BinarySensorCCReport,
    BinarySwitchCCSet,
    BinarySwitchCCGet,
    BinarySwitchCCReport,
    CentralSceneCCNotification,
    ConfigurationCCSet,
    ConfigurationCCGet,
    ConfigurationCCReport,
    DoorLockCCOperationSet,
    DoorLockCCOperationGet,
    DoorLockCCOperationReport,
    ManufacturerSpecificCCGet,
    ManufacturerSpecificCCReport,
    MultiChannelCCCommandEncapsulation,
    MultilevelSwitchCCSet,
    MultilevelSwitchCCGet,
    MultilevelSwitchCCReport,
    NotificationCCGet,
    NotificationCCReport,
    SceneActivationCCSet,
    SecurityCCNonceGet,
    SecurityCCNonceReport,
    SecurityCCCommandEncapsulation,
    WakeUpCCIntervalSet,
    WakeUpCCIntervalGet,
    WakeUpCCIntervalReport,
    WakeUpCCNotification,
    WakeUpCCNoMoreInformation,
    NotImplemented,
);

fn parse_as<T>(payload: &mut Bytes) -> ParseResult<CC>
where
    T: CCParsable + Into<CC>,
{
    complete(T::parse).parse(payload).map(Into::into)
}

impl CC {
    /// Interprets a raw command class. Known classes with unknown commands become
    /// [`NotImplemented`], unknown classes are an error.
    pub fn try_from_raw(raw: CCRaw) -> ParseResult<Self> {
        let Some(cc_id) = raw.class() else {
            return zwave_core::parse::parser_not_implemented(format!(
                "command class {:#04x} is not supported",
                raw.cc_id
            ));
        };
        let mut payload = raw.payload.clone();
        let i = &mut payload;

        use CommandClasses as C;
        match (cc_id, raw.cc_command) {
            (C::Association, Some(0x01)) => parse_as::<AssociationCCSet>(i),
            (C::Association, Some(0x02)) => parse_as::<AssociationCCGet>(i),
            (C::Association, Some(0x03)) => parse_as::<AssociationCCReport>(i),
            (C::Association, Some(0x04)) => parse_as::<AssociationCCRemove>(i),
            (C::Basic, Some(0x01)) => parse_as::<BasicCCSet>(i),
            (C::Basic, Some(0x02)) => parse_as::<BasicCCGet>(i),
            (C::Basic, Some(0x03)) => parse_as::<BasicCCReport>(i),
            (C::Battery, Some(0x02)) => parse_as::<BatteryCCGet>(i),
            (C::Battery, Some(0x03)) => parse_as::<BatteryCCReport>(i),
            (C::BinarySensor, Some(0x02)) => parse_as::<BinarySensorCCGet>(i),
            (C::BinarySensor, Some(0x03)) => parse_as::<BinarySensorCCReport>(i),
            (C::BinarySwitch, Some(0x01)) => parse_as::<BinarySwitchCCSet>(i),
            (C::BinarySwitch, Some(0x02)) => parse_as::<BinarySwitchCCGet>(i),
            (C::BinarySwitch, Some(0x03)) => parse_as::<BinarySwitchCCReport>(i),
            (C::CentralScene, Some(0x03)) => parse_as::<CentralSceneCCNotification>(i),
            (C::Configuration, Some(0x04)) => parse_as::<ConfigurationCCSet>(i),
            (C::Configuration, Some(0x05)) => parse_as::<ConfigurationCCGet>(i),
            (C::Configuration, Some(0x06)) => parse_as::<ConfigurationCCReport>(i),
            (C::DoorLock, Some(0x01)) => parse_as::<DoorLockCCOperationSet>(i),
            (C::DoorLock, Some(0x02)) => parse_as::<DoorLockCCOperationGet>(i),
            (C::DoorLock, Some(0x03)) => parse_as::<DoorLockCCOperationReport>(i),
            (C::ManufacturerSpecific, Some(0x04)) => parse_as::<ManufacturerSpecificCCGet>(i),
            (C::ManufacturerSpecific, Some(0x05)) => parse_as::<ManufacturerSpecificCCReport>(i),
            (C::MultiChannel, Some(0x0d)) => parse_as::<MultiChannelCCCommandEncapsulation>(i),
            (C::MultilevelSwitch, Some(0x01)) => parse_as::<MultilevelSwitchCCSet>(i),
            (C::MultilevelSwitch, Some(0x02)) => parse_as::<MultilevelSwitchCCGet>(i),
            (C::MultilevelSwitch, Some(0x03)) => parse_as::<MultilevelSwitchCCReport>(i),
            (C::Notification, Some(0x04)) => parse_as::<NotificationCCGet>(i),
            (C::Notification, Some(0x05)) => parse_as::<NotificationCCReport>(i),
            (C::SceneActivation, Some(0x01)) => parse_as::<SceneActivationCCSet>(i),
            (C::Security, Some(0x40)) => parse_as::<SecurityCCNonceGet>(i),
            (C::Security, Some(0x80)) => parse_as::<SecurityCCNonceReport>(i),
            (C::Security, Some(0x81)) => parse_as::<SecurityCCCommandEncapsulation>(i),
            (C::WakeUp, Some(0x04)) => parse_as::<WakeUpCCIntervalSet>(i),
            (C::WakeUp, Some(0x05)) => parse_as::<WakeUpCCIntervalGet>(i),
            (C::WakeUp, Some(0x06)) => parse_as::<WakeUpCCIntervalReport>(i),
            (C::WakeUp, Some(0x07)) => parse_as::<WakeUpCCNotification>(i),
            (C::WakeUp, Some(0x08)) => parse_as::<WakeUpCCNoMoreInformation>(i),
            (cc_id, cc_command) => Ok(CC::NotImplemented(NotImplemented {
                cc_id,
                cc_command,
                payload: raw.payload,
            })),
        }
    }

    pub fn as_raw(&self) -> CCRaw {
        let mut payload = BytesMut::new();
        CCSerializable::serialize(self, &mut payload);
        CCRaw {
            cc_id: self.cc_id() as u8,
            cc_command: self.cc_command(),
            payload: payload.freeze(),
        }
    }
}

impl Serializable for CC {
    fn serialize(&self, output: &mut BytesMut) {
        self.as_raw().serialize(output)
    }
}

/// A command of a known class that is not modelled here
#[derive(Debug, Clone, PartialEq)]
pub struct NotImplemented {
    pub cc_id: CommandClasses,
    pub cc_command: Option<u8>,
    pub payload: Bytes,
}

impl CCBase for NotImplemented {}

impl CCId for NotImplemented {
    fn cc_id(&self) -> CommandClasses {
        self.cc_id
    }

    fn cc_command(&self) -> Option<u8> {
        self.cc_command
    }
}

impl CCSerializable for NotImplemented {
    fn serialize(&self, output: &mut BytesMut) {
        zwave_core::serialize::bytes::slice(&self.payload).serialize(output)
    }
}

impl ToLogPayload for NotImplemented {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("payload", format!("0x{}", hex::encode(&self.payload)))
            .into()
    }
}
