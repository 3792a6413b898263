use crate::prelude::*;
use bytes::{Bytes, BytesMut};
use derive_try_from_primitive::TryFromPrimitive;
use typed_builder::TypedBuilder;
use zwave_core::parse::{
    bytes::{be_u8, take},
    fail_validation, parser_not_implemented, validate,
};
use zwave_core::prelude::*;
use zwave_core::security::{
    MAC_SIZE, S0_HALF_NONCE_SIZE, S0Nonce, compute_mac, decrypt_aes_ofb, encrypt_aes_ofb,
};
use zwave_core::serialize;
use zwave_core::util::hex_fmt;

/// Frame control byte of an unsequenced S0 payload
const FRAME_CONTROL_UNSEQUENCED: u8 = 0x00;

/// Sender nonce, frame control, at least one CC byte, nonce id and MAC
const MIN_ENCAPSULATION_LEN: usize = S0_HALF_NONCE_SIZE + 1 + 1 + 1 + MAC_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum SecurityCCCommand {
    NonceGet = 0x40,
    NonceReport = 0x80,
    CommandEncapsulation = 0x81,
}

struct S0AuthData<'a> {
    sender_nonce: &'a [u8],
    receiver_nonce: &'a [u8],
    sending_node_id: NodeId,
    receiving_node_id: NodeId,
    ciphertext: &'a [u8],
}

impl Serializable for S0AuthData<'_> {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::bytes::{be_u8, slice};

        slice(self.sender_nonce).serialize(output);
        slice(self.receiver_nonce).serialize(output);
        be_u8(SecurityCCCommand::CommandEncapsulation as u8).serialize(output);
        self.sending_node_id.serialize(output);
        self.receiving_node_id.serialize(output);
        be_u8(self.ciphertext.len() as u8).serialize(output);
        slice(self.ciphertext).serialize(output);
    }
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct SecurityCCNonceGet {}

impl CCBase for SecurityCCNonceGet {
    fn expects_response(&self) -> bool {
        true
    }

    fn test_response(&self, response: &CC) -> bool {
        matches!(response, CC::SecurityCCNonceReport(_))
    }
}

impl CCId for SecurityCCNonceGet {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Security
    }

    fn cc_command(&self) -> Option<u8> {
        Some(SecurityCCCommand::NonceGet as _)
    }
}

impl CCParsable for SecurityCCNonceGet {
    fn parse(_i: &mut Bytes) -> ParseResult<Self> {
        // No payload
        Ok(Self {})
    }
}

impl CCSerializable for SecurityCCNonceGet {
    fn serialize(&self, _output: &mut BytesMut) {
        // No payload
    }
}

impl ToLogPayload for SecurityCCNonceGet {
    fn to_log_payload(&self) -> LogPayload {
        LogPayload::empty()
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct SecurityCCNonceReport {
    pub nonce: S0Nonce,
}

impl CCBase for SecurityCCNonceReport {}

impl CCId for SecurityCCNonceReport {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Security
    }

    fn cc_command(&self) -> Option<u8> {
        Some(SecurityCCCommand::NonceReport as _)
    }
}

impl CCParsable for SecurityCCNonceReport {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        let nonce = take(S0_HALF_NONCE_SIZE).parse(i)?;
        let Ok(nonce) = S0Nonce::try_from(nonce.as_ref()) else {
            return fail_validation("invalid nonce length");
        };
        Ok(Self { nonce })
    }
}

impl CCSerializable for SecurityCCNonceReport {
    fn serialize(&self, output: &mut BytesMut) {
        serialize::bytes::slice(self.nonce.clone()).serialize(output);
    }
}

impl ToLogPayload for SecurityCCNonceReport {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("nonce", self.nonce.to_string())
            .into()
    }
}

/// An S0 encrypted command. The contents can only be read with the network key
/// and the receiver's nonce, see [`SecurityCCCommandEncapsulation::decrypt`].
#[derive(custom_debug_derive::Debug, Clone, PartialEq, TypedBuilder)]
pub struct SecurityCCCommandEncapsulation {
    pub sender_nonce: S0Nonce,
    #[debug(with = "hex_fmt")]
    pub ciphertext: Bytes,
    /// Id of the receiver's nonce that was used for encryption
    pub receiver_nonce_id: u8,
    #[debug(with = "hex_fmt")]
    pub mac: Bytes,
}

impl SecurityCCCommandEncapsulation {
    /// Encrypts a command for the receiver, using the nonce the receiver handed out
    #[allow(clippy::too_many_arguments)]
    pub fn encrypt(
        inner: &CCRaw,
        sender_nonce: S0Nonce,
        receiver_nonce: &S0Nonce,
        sending_node_id: NodeId,
        receiving_node_id: NodeId,
        auth_key: &[u8],
        enc_key: &[u8],
    ) -> Self {
        let mut plaintext = BytesMut::new();
        serialize::bytes::be_u8(FRAME_CONTROL_UNSEQUENCED).serialize(&mut plaintext);
        inner.serialize(&mut plaintext);

        let iv = [sender_nonce.as_ref(), receiver_nonce.as_ref()].concat();
        let ciphertext = Bytes::from(encrypt_aes_ofb(&plaintext, enc_key, &iv));

        let auth_data = S0AuthData {
            sender_nonce: &sender_nonce,
            receiver_nonce,
            sending_node_id,
            receiving_node_id,
            ciphertext: &ciphertext,
        }
        .as_bytes();
        let mac = Bytes::from(compute_mac(&auth_data, auth_key));

        Self {
            sender_nonce,
            ciphertext,
            receiver_nonce_id: receiver_nonce.id(),
            mac,
        }
    }

    /// Checks the authentication code and returns the decrypted command
    pub fn decrypt(
        &self,
        receiver_nonce: &S0Nonce,
        sending_node_id: NodeId,
        receiving_node_id: NodeId,
        auth_key: &[u8],
        enc_key: &[u8],
    ) -> ParseResult<CCRaw> {
        validate(
            receiver_nonce.id() == self.receiver_nonce_id,
            format!(
                "nonce id mismatch, expected {:#04x}, got {:#04x}",
                self.receiver_nonce_id,
                receiver_nonce.id()
            ),
        )?;

        let auth_data = S0AuthData {
            sender_nonce: &self.sender_nonce,
            receiver_nonce,
            sending_node_id,
            receiving_node_id,
            ciphertext: &self.ciphertext,
        }
        .as_bytes();
        let expected_mac = compute_mac(&auth_data, auth_key);
        validate(
            self.mac.as_ref() == expected_mac.as_slice(),
            "command authentication failed",
        )?;

        let iv = [self.sender_nonce.as_ref(), receiver_nonce.as_ref()].concat();
        let mut plaintext = Bytes::from(decrypt_aes_ofb(&self.ciphertext, enc_key, &iv));

        let frame_control = be_u8(&mut plaintext)?;
        if frame_control != FRAME_CONTROL_UNSEQUENCED {
            return parser_not_implemented(format!(
                "sequenced S0 frames are not supported (frame control {:#04x})",
                frame_control
            ));
        }
        CCRaw::parse(&mut plaintext)
    }
}

impl CCBase for SecurityCCCommandEncapsulation {}

impl CCId for SecurityCCCommandEncapsulation {
    fn cc_id(&self) -> CommandClasses {
        CommandClasses::Security
    }

    fn cc_command(&self) -> Option<u8> {
        Some(SecurityCCCommand::CommandEncapsulation as _)
    }
}

impl CCParsable for SecurityCCCommandEncapsulation {
    fn parse(i: &mut Bytes) -> ParseResult<Self> {
        validate(
            i.len() >= MIN_ENCAPSULATION_LEN,
            "incomplete S0 encapsulation",
        )?;
        let ciphertext_len = i.len() - S0_HALF_NONCE_SIZE - 1 - MAC_SIZE;

        let (sender_nonce, ciphertext, receiver_nonce_id, mac) = (
            take(S0_HALF_NONCE_SIZE),
            take(ciphertext_len),
            be_u8,
            take(MAC_SIZE),
        )
            .parse(i)?;
        let Ok(sender_nonce) = S0Nonce::try_from(sender_nonce.as_ref()) else {
            return fail_validation("invalid nonce length");
        };

        Ok(Self {
            sender_nonce,
            ciphertext,
            receiver_nonce_id,
            mac,
        })
    }
}

impl CCSerializable for SecurityCCCommandEncapsulation {
    fn serialize(&self, output: &mut BytesMut) {
        use serialize::{
            bytes::{be_u8, slice},
            sequence::tuple,
        };
        tuple((
            slice(self.sender_nonce.clone()),
            slice(&self.ciphertext),
            be_u8(self.receiver_nonce_id),
            slice(&self.mac),
        ))
        .serialize(output)
    }
}

impl ToLogPayload for SecurityCCCommandEncapsulation {
    fn to_log_payload(&self) -> LogPayload {
        LogPayloadDict::new()
            .with_entry("sender nonce", self.sender_nonce.to_string())
            .with_entry("receiver nonce id", format!("{:#04x}", self.receiver_nonce_id))
            .with_entry("ciphertext", format!("{} bytes", self.ciphertext.len()))
            .into()
    }
}
