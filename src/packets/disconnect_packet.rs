use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};

use crate::{
    codec::decode_u8,
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, REASON_STRING_IDENTIFIER,
            SERVER_REFERENCE_IDENTIFIER, SESSION_EXPIRY_INTERVAL_IDENTIFIER,
            USER_PROPERTY_IDENTIFIER,
        },
        reason_code::{decode_reason_code, ensure_reason_code, ReasonCode, DISCONNECT_REASON_CODES},
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const DISCONNECT_PROPERTIES: &[u8] = &[
    SESSION_EXPIRY_INTERVAL_IDENTIFIER,
    REASON_STRING_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
    SERVER_REFERENCE_IDENTIFIER,
];

/// The DISCONNECT packet is the final MQTT Control Packet sent from the Client or the Server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectPacket {
    /// The Reason Code indicating why the DISCONNECT is occurring.
    reason_code: ReasonCode,

    properties: DisconnectProperties,
}

impl DisconnectPacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `reason_code` is not a DISCONNECT reason code.
    ///   `Success` and `GrantedQoS0` are rejected; a successful disconnect is `NormalDisconnection`.
    pub fn new(reason_code: ReasonCode) -> Result<Self, PacketError> {
        ensure_reason_code(reason_code, PacketType::Disconnect, DISCONNECT_REASON_CODES)?;

        Ok(Self { reason_code, properties: DisconnectProperties::default() })
    }

    pub fn builder() -> DisconnectPacketBuilder<NeedsReasonCode> {
        DisconnectPacketBuilder(NeedsReasonCode(()))
    }

    pub fn reason_code(&self) -> ReasonCode {
        self.reason_code
    }

    pub fn properties(&self) -> &DisconnectProperties {
        &self.properties
    }
}

impl Default for DisconnectPacket {
    fn default() -> Self {
        Self {
            reason_code: ReasonCode::NormalDisconnection,
            properties: DisconnectProperties::default(),
        }
    }
}

impl ControlPacket for DisconnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Disconnect;
}

impl EncodablePacket for DisconnectPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        let properties = self.properties.to_properties();

        // If reason code is NormalDisconnection (0x00) and no properties, we can omit Reason Code and Property Length.
        if self.reason_code == ReasonCode::NormalDisconnection && properties.is_empty() {
            return Ok(());
        }

        buf.put_u8(self.reason_code.code());

        if properties.is_empty() {
            return Ok(());
        }

        properties.write(buf)
    }
}

impl DecodablePacket for DisconnectPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        // If the remaining length is less than 1, normal disconnection can be assumed
        if !cursor.has_remaining() {
            return Ok(Self::default());
        }

        let reason_code = decode_reason_code(
            decode_u8(cursor)?,
            ReasonCode::NormalDisconnection,
            PacketType::Disconnect,
            DISCONNECT_REASON_CODES,
        )?;

        let properties = if cursor.has_remaining() {
            DisconnectProperties::from_properties(&Properties::decode(cursor)?)?
        } else {
            DisconnectProperties::default()
        };

        Ok(Self { reason_code, properties })
    }
}

/// Typestate builder: a reason code must be chosen before properties are added.
pub struct DisconnectPacketBuilder<State>(State);

pub struct NeedsReasonCode(());

pub struct ReadyToBuild {
    reason_code: ReasonCode,
    properties: DisconnectProperties,
}

impl DisconnectPacketBuilder<NeedsReasonCode> {
    pub fn reason_code(self, reason_code: ReasonCode) -> DisconnectPacketBuilder<ReadyToBuild> {
        DisconnectPacketBuilder(ReadyToBuild {
            reason_code,
            properties: DisconnectProperties::default(),
        })
    }
}

impl DisconnectPacketBuilder<ReadyToBuild> {
    pub fn session_expiry_interval(mut self, session_expiry_interval: u32) -> Self {
        self.0.properties.session_expiry_interval = Some(session_expiry_interval);
        self
    }

    pub fn reason_string(mut self, reason_string: impl Into<String>) -> Self {
        self.0.properties.reason_string = Some(reason_string.into());
        self
    }

    pub fn user_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.properties.user_properties.push(UserProperty::new(name, value));
        self
    }

    pub fn server_reference(mut self, server_reference: impl Into<String>) -> Self {
        self.0.properties.server_reference = Some(server_reference.into());
        self
    }

    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if the reason code is not a DISCONNECT reason code.
    pub fn build(self) -> Result<DisconnectPacket, PacketError> {
        let ReadyToBuild { reason_code, properties } = self.0;
        ensure_reason_code(reason_code, PacketType::Disconnect, DISCONNECT_REASON_CODES)?;

        Ok(DisconnectPacket { reason_code, properties })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisconnectProperties {
    /// Represents the Session Expiry Interval in seconds.
    /// The Session Expiry Interval MUST NOT be sent on a DISCONNECT by the Server.
    pub session_expiry_interval: Option<u32>,

    /// A human-readable reason string for diagnostic purposes. Should NOT be parsed programmatically.
    pub reason_string: Option<String>,

    pub user_properties: Vec<UserProperty>,

    /// Encoded String which can be used by the Client to identify another Server to use.
    pub server_reference: Option<String>,
}

impl DisconnectProperties {
    fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push_some(self.session_expiry_interval.map(Property::SessionExpiryInterval));
        properties.push_some(self.server_reference.clone().map(Property::ServerReference));
        properties.push_some(self.reason_string.clone().map(Property::ReasonString));
        properties.extend_user_properties(&self.user_properties);

        properties
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Disconnect, DISCONNECT_PROPERTIES)?;

        Ok(Self {
            session_expiry_interval: properties.u32_value(SESSION_EXPIRY_INTERVAL_IDENTIFIER)?,
            reason_string: properties.string_value(REASON_STRING_IDENTIFIER)?,
            user_properties: properties.user_properties(),
            server_reference: properties.string_value(SERVER_REFERENCE_IDENTIFIER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_body(packet: &DisconnectPacket) -> BytesMut {
        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        buf
    }

    fn decode_body(bytes: &[u8]) -> Result<DisconnectPacket, PacketError> {
        let mut cursor = Cursor::new(bytes);
        DisconnectPacket::decode(&mut cursor, 0)
    }

    #[test]
    fn empty_body_is_normal_disconnection() {
        let packet = decode_body(&[]).unwrap();
        assert_eq!(packet.reason_code(), ReasonCode::NormalDisconnection);
        assert!(encode_body(&packet).is_empty());
    }

    #[test]
    fn zero_reason_byte_is_normal_disconnection() {
        let packet = decode_body(&[0x00]).unwrap();
        assert_eq!(packet.reason_code(), ReasonCode::NormalDisconnection);
    }

    #[test]
    fn reason_only_body() {
        let packet = DisconnectPacket::new(ReasonCode::DisconnectWithWillMessage).unwrap();
        assert_eq!(&encode_body(&packet)[..], &[0x04]);
        assert_eq!(decode_body(&[0x04]).unwrap(), packet);
    }

    #[test]
    fn properties_round_trip() {
        let packet = DisconnectPacket::builder()
            .reason_code(ReasonCode::ServerMoved)
            .session_expiry_interval(0)
            .reason_string("moving")
            .user_property("k", "v")
            .server_reference("backup:1883")
            .build()
            .unwrap();

        assert_eq!(decode_body(&encode_body(&packet)).unwrap(), packet);
    }

    #[test]
    fn success_and_granted_qos_are_rejected() {
        assert!(matches!(
            DisconnectPacket::new(ReasonCode::Success),
            Err(PacketError::InvalidArgument(_))
        ));
        assert!(DisconnectPacket::new(ReasonCode::GrantedQoS0).is_err());
        assert!(DisconnectPacket::builder().reason_code(ReasonCode::Success).build().is_err());
    }

    #[test]
    fn unknown_reason_is_malformed() {
        assert!(matches!(decode_body(&[0x03]), Err(PacketError::MalformedPacket(_))));
        assert!(decode_body(&[0x92]).is_err());
    }
}
