use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

use crate::{
    codec::decode_u8,
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, ASSIGNED_CLIENT_IDENTIFIER,
            AUTHENTICATION_DATA_IDENTIFIER, AUTHENTICATION_METHOD_IDENTIFIER,
            MAXIMUM_PACKET_SIZE_IDENTIFIER, MAXIMUM_QOS_IDENTIFIER, REASON_STRING_IDENTIFIER,
            RECEIVE_MAXIMUM_IDENTIFIER, RESPONSE_INFORMATION_IDENTIFIER,
            RETAIN_AVAILABLE_IDENTIFIER, SERVER_KEEP_ALIVE_IDENTIFIER,
            SERVER_REFERENCE_IDENTIFIER, SESSION_EXPIRY_INTERVAL_IDENTIFIER,
            SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER, SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER,
            TOPIC_ALIAS_MAXIMUM_IDENTIFIER, USER_PROPERTY_IDENTIFIER,
            WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER,
        },
        qos::QoS,
        reason_code::{decode_reason_code, ensure_reason_code, ReasonCode, CONNACK_REASON_CODES},
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const CONNACK_PROPERTIES: &[u8] = &[
    SESSION_EXPIRY_INTERVAL_IDENTIFIER,
    RECEIVE_MAXIMUM_IDENTIFIER,
    MAXIMUM_QOS_IDENTIFIER,
    RETAIN_AVAILABLE_IDENTIFIER,
    MAXIMUM_PACKET_SIZE_IDENTIFIER,
    ASSIGNED_CLIENT_IDENTIFIER,
    TOPIC_ALIAS_MAXIMUM_IDENTIFIER,
    REASON_STRING_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
    WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER,
    SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER,
    SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER,
    SERVER_KEEP_ALIVE_IDENTIFIER,
    RESPONSE_INFORMATION_IDENTIFIER,
    SERVER_REFERENCE_IDENTIFIER,
    AUTHENTICATION_METHOD_IDENTIFIER,
    AUTHENTICATION_DATA_IDENTIFIER,
];

/// The CONNACK packet is the packet sent by the Server in response to a CONNECT packet received from a Client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnAckPacket {
    /// The Session Present flag informs the Client whether the Server is using Session State from a previous connection for this `ClientID`.
    pub session_present: bool,

    /// If a Server sends a CONNACK packet containing a Reason code of 128 or greater it MUST then close the Network Connection.
    reason_code: ReasonCode,

    pub properties: ConnAckProperties,
}

impl ConnAckPacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `reason_code` is not a CONNACK reason code.
    pub fn new(session_present: bool, reason_code: ReasonCode) -> Result<Self, PacketError> {
        ensure_reason_code(reason_code, PacketType::ConnAck, CONNACK_REASON_CODES)?;

        Ok(Self { session_present, reason_code, properties: ConnAckProperties::default() })
    }

    pub fn with_properties(mut self, properties: ConnAckProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn reason_code(&self) -> ReasonCode {
        self.reason_code
    }

    /// `true` when the connection was accepted.
    pub fn is_success(&self) -> bool {
        self.reason_code == ReasonCode::Success
    }
}

impl ControlPacket for ConnAckPacket {
    const PACKET_TYPE: PacketType = PacketType::ConnAck;
}

impl EncodablePacket for ConnAckPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u8(u8::from(self.session_present));
        buf.put_u8(self.reason_code.code());
        self.properties.to_properties()?.write(buf)
    }
}

impl DecodablePacket for ConnAckPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let acknowledge_flags = decode_u8(cursor)?;
        trace!("acknowledge_flags: {acknowledge_flags:#010b}");

        // Bits 7-1 are reserved and must be set to 0
        if acknowledge_flags & 0b1111_1110 != 0 {
            return Err(PacketError::malformed("Connect acknowledge flags are reserved"));
        }

        let reason_code = decode_reason_code(
            decode_u8(cursor)?,
            ReasonCode::Success,
            PacketType::ConnAck,
            CONNACK_REASON_CODES,
        )?;

        let properties = ConnAckProperties::from_properties(&Properties::decode(cursor)?)?;

        Ok(Self { session_present: acknowledge_flags == 1, reason_code, properties })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnAckProperties {
    /// Session Expiry Interval in seconds.
    pub session_expiry_interval: Option<u32>,

    /// The Server uses this value to limit the number of `QoS` 1 and `QoS` 2 publications that it is willing to process concurrently for the Client.
    pub receive_maximum: Option<u16>,

    /// The highest `QoS` the Server supports. Only `QoS` 0 and 1 may be sent.
    pub maximum_qos: Option<QoS>,

    /// Declares whether the Server supports retained messages. If not present, then retained messages are supported.
    pub retain_available: Option<bool>,

    /// The Maximum Packet Size the Server is willing to accept.
    pub maximum_packet_size: Option<u32>,

    /// The Client Identifier which was assigned by the Server because a zero length Client Identifier was found in the CONNECT packet.
    pub assigned_client_identifier: Option<String>,

    /// This value indicates the highest value that the Server will accept as a Topic Alias sent by the Client.
    pub topic_alias_maximum: Option<u16>,

    /// Human readable string designed for diagnostics and SHOULD NOT be parsed by the Client.
    pub reason_string: Option<String>,

    pub user_properties: Vec<UserProperty>,

    /// Declares whether the Server supports Wildcard Subscriptions. If not present, then Wildcard Subscriptions are supported.
    pub wildcard_subscription_available: Option<bool>,

    /// Declares whether the Server supports Subscription Identifiers. If not present, then Subscription Identifiers are supported.
    pub subscription_identifiers_available: Option<bool>,

    /// Declares whether the Server supports Shared Subscriptions. If not present, then Shared Subscriptions are supported.
    pub shared_subscription_available: Option<bool>,

    /// Keep Alive time assigned by the Server, overriding the one the Client sent.
    pub server_keep_alive: Option<u16>,

    /// Basis for creating a Response Topic.
    pub response_information: Option<String>,

    /// Another Server the Client can use.
    pub server_reference: Option<String>,

    pub authentication_method: Option<String>,
    pub authentication_data: Option<Bytes>,
}

impl ConnAckProperties {
    fn to_properties(&self) -> Result<Properties, PacketError> {
        if self.maximum_qos == Some(QoS::ExactlyOnce) {
            return Err(PacketError::invalid("Maximum QoS must be 0 or 1"));
        }

        let mut properties = Properties::new();
        properties.push_some(self.session_expiry_interval.map(Property::SessionExpiryInterval));
        properties.push_some(self.receive_maximum.map(Property::ReceiveMaximum));
        properties.push_some(self.maximum_qos.map(|qos| Property::MaximumQoS(qos.to_u8())));
        properties.push_some(
            self.retain_available.map(|value| Property::RetainAvailable(u8::from(value))),
        );
        properties.push_some(self.maximum_packet_size.map(Property::MaximumPacketSize));
        properties.push_some(
            self.assigned_client_identifier.clone().map(Property::AssignedClientIdentifier),
        );
        properties.push_some(self.topic_alias_maximum.map(Property::TopicAliasMaximum));
        properties.push_some(self.reason_string.clone().map(Property::ReasonString));
        properties.extend_user_properties(&self.user_properties);
        properties.push_some(
            self.wildcard_subscription_available
                .map(|value| Property::WildcardSubscriptionAvailable(u8::from(value))),
        );
        properties.push_some(
            self.subscription_identifiers_available
                .map(|value| Property::SubscriptionIdentifiersAvailable(u8::from(value))),
        );
        properties.push_some(
            self.shared_subscription_available
                .map(|value| Property::SharedSubscriptionAvailable(u8::from(value))),
        );
        properties.push_some(self.server_keep_alive.map(Property::ServerKeepAlive));
        properties.push_some(self.response_information.clone().map(Property::ResponseInformation));
        properties.push_some(self.server_reference.clone().map(Property::ServerReference));
        properties.push_some(self.authentication_method.clone().map(Property::AuthenticationMethod));
        properties.push_some(self.authentication_data.clone().map(Property::AuthenticationData));

        Ok(properties)
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::ConnAck, CONNACK_PROPERTIES)?;

        let maximum_qos = match properties.u8_value(MAXIMUM_QOS_IDENTIFIER)? {
            Some(0) => Some(QoS::AtMostOnce),
            Some(1) => Some(QoS::AtLeastOnce),
            Some(value) => {
                return Err(PacketError::malformed(format!("Maximum QoS must be 0 or 1, got {value}")))
            }
            None => None,
        };

        Ok(Self {
            session_expiry_interval: properties.u32_value(SESSION_EXPIRY_INTERVAL_IDENTIFIER)?,
            receive_maximum: properties.u16_value(RECEIVE_MAXIMUM_IDENTIFIER)?,
            maximum_qos,
            retain_available: properties.bool_value(RETAIN_AVAILABLE_IDENTIFIER)?,
            maximum_packet_size: properties.u32_value(MAXIMUM_PACKET_SIZE_IDENTIFIER)?,
            assigned_client_identifier: properties.string_value(ASSIGNED_CLIENT_IDENTIFIER)?,
            topic_alias_maximum: properties.u16_value(TOPIC_ALIAS_MAXIMUM_IDENTIFIER)?,
            reason_string: properties.string_value(REASON_STRING_IDENTIFIER)?,
            user_properties: properties.user_properties(),
            wildcard_subscription_available: properties
                .bool_value(WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER)?,
            subscription_identifiers_available: properties
                .bool_value(SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER)?,
            shared_subscription_available: properties
                .bool_value(SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER)?,
            server_keep_alive: properties.u16_value(SERVER_KEEP_ALIVE_IDENTIFIER)?,
            response_information: properties.string_value(RESPONSE_INFORMATION_IDENTIFIER)?,
            server_reference: properties.string_value(SERVER_REFERENCE_IDENTIFIER)?,
            authentication_method: properties.string_value(AUTHENTICATION_METHOD_IDENTIFIER)?,
            authentication_data: properties.binary_value(AUTHENTICATION_DATA_IDENTIFIER)?,
        })
    }
}
