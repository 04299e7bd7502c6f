use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    codec::decode_u8,
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, AUTHENTICATION_DATA_IDENTIFIER,
            AUTHENTICATION_METHOD_IDENTIFIER, REASON_STRING_IDENTIFIER, USER_PROPERTY_IDENTIFIER,
        },
        reason_code::{decode_reason_code, ensure_reason_code, ReasonCode, AUTH_REASON_CODES},
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const AUTH_PROPERTIES: &[u8] = &[
    AUTHENTICATION_METHOD_IDENTIFIER,
    AUTHENTICATION_DATA_IDENTIFIER,
    REASON_STRING_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
];

/// An AUTH packet is sent from Client to Server or Server to Client as part of an extended authentication exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPacket {
    /// One of `Success`, `ContinueAuthentication` or `ReAuthenticate`.
    reason_code: ReasonCode,

    properties: AuthProperties,
}

impl AuthPacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `reason_code` is not an AUTH reason code or the
    ///   authentication method is empty.
    pub fn new(reason_code: ReasonCode, properties: AuthProperties) -> Result<Self, PacketError> {
        ensure_reason_code(reason_code, PacketType::Auth, AUTH_REASON_CODES)?;

        if properties.authentication_method.is_empty() {
            return Err(PacketError::invalid("Authentication Method must not be empty"));
        }

        Ok(Self { reason_code, properties })
    }

    pub fn reason_code(&self) -> ReasonCode {
        self.reason_code
    }

    pub fn properties(&self) -> &AuthProperties {
        &self.properties
    }
}

impl ControlPacket for AuthPacket {
    const PACKET_TYPE: PacketType = PacketType::Auth;
}

impl EncodablePacket for AuthPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u8(self.reason_code.code());
        self.properties.to_properties().write(buf)
    }
}

impl DecodablePacket for AuthPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let reason_code = decode_reason_code(
            decode_u8(cursor).map_err(|_| PacketError::malformed("AUTH requires a reason code"))?,
            ReasonCode::Success,
            PacketType::Auth,
            AUTH_REASON_CODES,
        )?;

        let properties = AuthProperties::from_properties(&Properties::decode(cursor)?)?;

        Ok(Self { reason_code, properties })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthProperties {
    /// Name of the authentication method. Required.
    pub authentication_method: String,

    /// Method specific authentication data.
    pub authentication_data: Option<Bytes>,

    pub reason_string: Option<String>,
    pub user_properties: Vec<UserProperty>,
}

impl AuthProperties {
    pub fn new(authentication_method: impl Into<String>) -> Self {
        Self { authentication_method: authentication_method.into(), ..Self::default() }
    }

    fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push(Property::AuthenticationMethod(self.authentication_method.clone()));
        properties.push_some(self.authentication_data.clone().map(Property::AuthenticationData));
        properties.push_some(self.reason_string.clone().map(Property::ReasonString));
        properties.extend_user_properties(&self.user_properties);

        properties
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Auth, AUTH_PROPERTIES)?;

        let authentication_method = match properties.single(AUTHENTICATION_METHOD_IDENTIFIER)? {
            Property::AuthenticationMethod(method) => method.clone(),
            other => {
                return Err(PacketError::malformed(format!(
                    "Property {} is not an authentication method",
                    other.name()
                )))
            }
        };

        Ok(Self {
            authentication_method,
            authentication_data: properties.binary_value(AUTHENTICATION_DATA_IDENTIFIER)?,
            reason_string: properties.string_value(REASON_STRING_IDENTIFIER)?,
            user_properties: properties.user_properties(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_body(bytes: &[u8]) -> Result<AuthPacket, PacketError> {
        let mut cursor = Cursor::new(bytes);
        AuthPacket::decode(&mut cursor, 0)
    }

    #[test]
    fn continue_authentication_round_trip() {
        let mut properties = AuthProperties::new("SCRAM-SHA-256");
        properties.authentication_data = Some(Bytes::from_static(b"client-first"));
        properties.reason_string = Some("step 1".to_string());
        properties.user_properties.push(UserProperty::new("n", "v"));

        let packet = AuthPacket::new(ReasonCode::ContinueAuthentication, properties).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(buf[0], 0x18);
        assert_eq!(decode_body(&buf).unwrap(), packet);
    }

    #[test]
    fn minimal_layout() {
        let packet = AuthPacket::new(ReasonCode::ReAuthenticate, AuthProperties::new("X")).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x19, 0x04, 0x15, 0x00, 0x01, b'X']);
    }

    #[test]
    fn invalid_reason_code_is_rejected() {
        assert!(matches!(
            AuthPacket::new(ReasonCode::NotAuthorized, AuthProperties::new("X")),
            Err(PacketError::InvalidArgument(_))
        ));
        assert!(decode_body(&[0x87, 0x04, 0x15, 0x00, 0x01, b'X']).is_err());
    }

    #[test]
    fn authentication_method_is_required() {
        assert!(AuthPacket::new(ReasonCode::Success, AuthProperties::default()).is_err());
        assert!(decode_body(&[0x00, 0x00]).is_err());
        assert!(decode_body(&[]).is_err());
    }
}
