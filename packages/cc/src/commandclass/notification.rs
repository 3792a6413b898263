use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::{
    bytes::{be_u8, take},
    combinators::opt,
};
use zwave_core::prelude::*;
use zwave_core::serialize;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum NotificationCCCommand {
    Get = 0x04,
    Report = 0x05,
}

/// The notification types this crate gives names to
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum NotificationType {
    Smoke = 0x01,
    AccessControl = 0x06,
    HomeSecurity = 0x07,
}

pub mod events {
    pub const SMOKE_DETECTED: u8 = 0x01;
    pub const SMOKE_DETECTED_UNKNOWN_LOCATION: u8 = 0x02;

    pub const ACCESS_MANUAL_LOCK: u8 = 0x01;
    pub const ACCESS_MANUAL_UNLOCK: u8 = 0x02;
    pub const ACCESS_RF_LOCK: u8 = 0x03;
    pub const ACCESS_RF_UNLOCK: u8 = 0x04;
    pub const ACCESS_KEYPAD_LOCK: u8 = 0x05;
    pub const ACCESS_KEYPAD_UNLOCK: u8 = 0x06;
    pub const ACCESS_AUTO_LOCK: u8 = 0x09;
    pub const ACCESS_DOOR_OPEN: u8 = 0x16;
    pub const ACCESS_DOOR_CLOSED: u8 = 0x17;

    pub const HOME_SECURITY_INTRUSION: u8 = 0x02;
    pub const HOME_SECURITY_MOTION: u8 = 0x08;

    /// "Idle", i.e. the previous event is no longer active
    pub const IDLE: u8 = 0x00;
}

#[derive(Default, Debug, Clone, PartialEq, TypedBuilder)]
pub struct NotificationCCGet {
    #[builder(default)]
    pub alarm_type: u8,
    #[builder(default, setter(into))]
    pub notification_type: Option<u8>,
    #[builder(default, setter(into))]
    pub event: Option<u8>,
}

impl CCBase for NotificationCCGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        let CC::NotificationCCReport(report) = response else {
            return false;
        };
        self.notification_type.is_none()
            || report.notification_type.is_none()
            || report.notification_type == self.notification_type
    }
}

impl CCId for NotificationCCGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Notification
    }

    fn cc_command(&self) -> Option<u8> {
        Some(NotificationCCCommand::Get as _)
    }
}

impl CCParsable for NotificationCCGet {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let alarm_type = be_u8(i)?;
        let notification_type = opt(be_u8).parse(i)?;
        let event = opt(be_u8).parse(i)?;
        Ok(Self {
            alarm_type,
            notification_type,
            event,
        })
    }
}

impl CCSerializable for NotificationCCGet {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::bytes::be_u8;
        be_u8(self.alarm_type).serialize(output);
        if let Some(notification_type) = self.notification_type {
            be_u8(notification_type).serialize(output);
            be_u8(self.event.unwrap_or(0)).serialize(output);
        }
    }
}

impl ToLogPayload for NotificationCCGet {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new();
        if let Some(t) = self.notification_type {
            ret = ret.with_entry("notification type", format!("{:#04x}", t));
        }
        if let Some(e) = self.event {
            ret = ret.with_entry("event", format!("{:#04x}", e));
        }
        ret.into()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct NotificationCCReport {
    #[builder(default)]
    pub alarm_type: u8,
    #[builder(default)]
    pub alarm_level: u8,
    #[builder(default, setter(into))]
    pub notification_status: Option<u8>,
    #[builder(default, setter(into))]
    pub notification_type: Option<u8>,
    #[builder(default, setter(into))]
    pub event: Option<u8>,
    #[builder(default)]
    pub event_parameters: Bytes,
}

impl NotificationCCReport {
    /// The well-known notification type, if any
    pub fn known_type(&self) -> Option<NotificationType> {
        self.notification_type
            .and_then(|t| NotificationType::try_from(t).ok())
    }
}

impl CCBase for NotificationCCReport {}

impl CCId for NotificationCCReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Notification
    }

    fn cc_command(&self) -> Option<u8> {
        Some(NotificationCCCommand::Report as _)
    }
}

impl CCParsable for NotificationCCReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let alarm_type = be_u8(i)?;
        let alarm_level = be_u8(i)?;
        // Version 2+ extends the report
        let extended = opt((be_u8, be_u8, be_u8, be_u8)).parse(i)?;
        let Some((_reserved, status, notification_type, event)) = extended else {
            return Ok(Self {
                alarm_type,
                alarm_level,
                notification_status: None,
                notification_type: None,
                event: None,
                event_parameters: Bytes::new(),
            });
        };
        let params_len = opt(be_u8).parse(i)?.unwrap_or(0) & 0b1_1111;
        let event_parameters = take(params_len).parse(i)?;

        Ok(Self {
            alarm_type,
            alarm_level,
            notification_status: Some(status),
            notification_type: Some(notification_type),
            event: Some(event),
            event_parameters,
        })
    }
}

impl CCSerializable for NotificationCCReport {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };
        tuple((be_u8(self.alarm_type), be_u8(self.alarm_level))).serialize(output);
        if let Some(notification_type) = self.notification_type {
            tuple((
                be_u8(0),
                be_u8(self.notification_status.unwrap_or(0xff)),
                be_u8(notification_type),
                be_u8(self.event.unwrap_or(0)),
                be_u8(self.event_parameters.len() as u8),
                slice(&self.event_parameters),
            ))
            .serialize(output);
        }
    }
}

impl ToLogPayload for NotificationCCReport {
    fn to_log_payload(&self) -> LogPayload {
        let mut ret = LogPayloadDict::new();
        if self.notification_type.is_none() || self.alarm_type != 0 {
            ret = ret
                .with_entry("alarm type", self.alarm_type.to_string())
                .with_entry("alarm level", self.alarm_level.to_string());
        }
        if let Some(t) = self.notification_type {
            let name = match self.known_type() {
                Some(known) => format!("{:?}", known),
                None => format!("{:#04x}", t),
            };
            ret = ret.with_entry("notification type", name);
        }
        if let Some(e) = self.event {
            ret = ret.with_entry("event", format!("{:#04x}", e));
        }
        if !self.event_parameters.is_empty() {
            ret = ret.with_entry(
                "event parameters",
                format!("0x{}", hex::encode(&self.event_parameters)),
            );
        }
        ret.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zwave_core::hex_bytes;

    #[test]
    fn test_v1_report() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("71051501")).unwrap();
        let CC::NotificationCCReport(report) = CC::try_from_raw(raw).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.alarm_type, 0x15);
        assert_eq!(report.alarm_level, 0x01);
        assert_eq!(report.notification_type, None);
    }

    #[test]
    fn test_access_control_report() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("7105000000ff060300")).unwrap();
        let CC::NotificationCCReport(report) = CC::try_from_raw(raw.clone()).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.known_type(), Some(NotificationType::AccessControl));
        assert_eq!(report.event, Some(events::ACCESS_RF_LOCK));
        assert!(report.event_parameters.is_empty());
        assert_eq!(CC::from(report).as_raw(), raw);
    }

    #[test]
    fn test_report_with_parameters() {
        let raw = CCRaw::try_from_bytes(hex_bytes!("7105000000ff0606010a")).unwrap();
        let CC::NotificationCCReport(report) = CC::try_from_raw(raw).unwrap() else {
            panic!("expected a report");
        };
        assert_eq!(report.event, Some(events::ACCESS_KEYPAD_UNLOCK));
        assert_eq!(report.event_parameters, hex_bytes!("0a"));
    }
}
