use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};
use log::trace;

use crate::{
    codec::{decode_binary_data, decode_u16, decode_u8, decode_utf8_string, write_binary_data, write_utf8_string},
    constants::{DEFAULT_KEEP_ALIVE, PROTOCOL_NAME, PROTOCOL_VERSION},
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, AUTHENTICATION_DATA_IDENTIFIER,
            AUTHENTICATION_METHOD_IDENTIFIER, CONTENT_TYPE_IDENTIFIER, CORRELATION_DATA_IDENTIFIER,
            MAXIMUM_PACKET_SIZE_IDENTIFIER, MESSAGE_EXPIRY_INTERVAL_IDENTIFIER,
            PAYLOAD_FORMAT_INDICATOR_IDENTIFIER, RECEIVE_MAXIMUM_IDENTIFIER,
            REQUEST_PROBLEM_INFORMATION_IDENTIFIER, REQUEST_RESPONSE_INFORMATION_IDENTIFIER,
            RESPONSE_TOPIC_IDENTIFIER, SESSION_EXPIRY_INTERVAL_IDENTIFIER,
            TOPIC_ALIAS_MAXIMUM_IDENTIFIER, USER_PROPERTY_IDENTIFIER, WILL_DELAY_INTERVAL_IDENTIFIER,
        },
        qos::QoS,
        topic::validate_topic_name,
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const CONNECT_PROPERTIES: &[u8] = &[
    SESSION_EXPIRY_INTERVAL_IDENTIFIER,
    RECEIVE_MAXIMUM_IDENTIFIER,
    MAXIMUM_PACKET_SIZE_IDENTIFIER,
    TOPIC_ALIAS_MAXIMUM_IDENTIFIER,
    REQUEST_RESPONSE_INFORMATION_IDENTIFIER,
    REQUEST_PROBLEM_INFORMATION_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
    AUTHENTICATION_METHOD_IDENTIFIER,
    AUTHENTICATION_DATA_IDENTIFIER,
];

const WILL_PROPERTIES: &[u8] = &[
    WILL_DELAY_INTERVAL_IDENTIFIER,
    PAYLOAD_FORMAT_INDICATOR_IDENTIFIER,
    MESSAGE_EXPIRY_INTERVAL_IDENTIFIER,
    CONTENT_TYPE_IDENTIFIER,
    RESPONSE_TOPIC_IDENTIFIER,
    CORRELATION_DATA_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
];

/// MQTT CONNECT packet, the first packet a Client sends after the network connection is established.
///
/// The Connect Flags byte is derived from the packet contents when encoding:
///
/// | Bit | 7             | 6             | 5           | 4 3      | 2         | 1           | 0        |
/// |-----|---------------|---------------|-------------|----------|-----------|-------------|----------|
/// |     | User Name     | Password      | Will Retain | Will QoS | Will Flag | Clean Start | Reserved |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectPacket {
    /// Specifies whether the connection starts a new session or is a continuation of an existing session.
    pub clean_start: bool,

    /// It is the maximum time interval in seconds that is permitted to elapse between the point at which the Client finishes transmitting one MQTT Control Packet and the point it starts sending the next.
    pub keep_alive: u16,

    /// Connect properties.
    pub properties: ConnectProperties,

    /// The Client Identifier identifies the Client to the Server. May be empty.
    pub client_id: String,

    /// Message published by the Server when the network connection is closed abnormally.
    pub will: Option<WillMessage>,

    /// It can be used by the Server for authentication and authorization.
    pub username: Option<String>,

    /// Although this field is called Password, it can be used to carry any credential information.
    pub password: Option<Bytes>,
}

impl ConnectPacket {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            clean_start: true,
            keep_alive: DEFAULT_KEEP_ALIVE,
            properties: ConnectProperties::default(),
            client_id: client_id.into(),
            will: None,
            username: None,
            password: None,
        }
    }

    fn connect_flags(&self) -> u8 {
        let mut flags = u8::from(self.clean_start) << 1;

        if let Some(will) = &self.will {
            flags |= 1 << 2;
            flags |= will.qos.to_u8() << 3;
            flags |= u8::from(will.retain) << 5;
        }

        flags |= u8::from(self.password.is_some()) << 6;
        flags |= u8::from(self.username.is_some()) << 7;

        flags
    }
}

impl ControlPacket for ConnectPacket {
    const PACKET_TYPE: PacketType = PacketType::Connect;
}

impl EncodablePacket for ConnectPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        write_utf8_string(buf, PROTOCOL_NAME)?;
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.connect_flags());
        buf.put_u16(self.keep_alive);
        self.properties.to_properties()?.write(buf)?;

        write_utf8_string(buf, &self.client_id)?;

        if let Some(will) = &self.will {
            validate_topic_name(&will.topic).map_err(PacketError::InvalidArgument)?;
            if will.topic.is_empty() {
                return Err(PacketError::invalid("Will topic must not be empty"));
            }

            will.properties.to_properties().write(buf)?;
            write_utf8_string(buf, &will.topic)?;
            write_binary_data(buf, &will.payload)?;
        }

        if let Some(username) = &self.username {
            write_utf8_string(buf, username)?;
        }

        if let Some(password) = &self.password {
            write_binary_data(buf, password)?;
        }

        Ok(())
    }
}

impl DecodablePacket for ConnectPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let protocol_name = decode_utf8_string(cursor)?;
        if protocol_name != PROTOCOL_NAME {
            return Err(PacketError::malformed(format!(
                "Unsupported protocol name: {protocol_name}"
            )));
        }

        let protocol_version = decode_u8(cursor)?;
        if protocol_version != PROTOCOL_VERSION {
            return Err(PacketError::malformed(format!(
                "Unsupported protocol version: {protocol_version}"
            )));
        }

        let connect_flags = decode_u8(cursor)?;
        trace!("connect_flags: {connect_flags:#010b}");

        // Reserved connect flag (last bit) must be set to 0
        if connect_flags & 0x1 != 0x0 {
            return Err(PacketError::malformed("Connect flags are reserved"));
        }

        let clean_start = connect_flags >> 1 & 1 == 1;
        let will_flag = connect_flags >> 2 & 1 == 1;
        let will_qos = connect_flags >> 3 & 0b0000_0011;
        let will_retain = connect_flags >> 5 & 1 == 1;
        let password_flag = connect_flags >> 6 & 1 == 1;
        let username_flag = connect_flags >> 7 & 1 == 1;

        if !will_flag && will_retain {
            return Err(PacketError::malformed("Will retain must be 0 if will flag is 0"));
        }

        if !will_flag && will_qos != 0 {
            return Err(PacketError::malformed("Will QoS must be 0 if will flag is 0"));
        }

        let will_qos = QoS::from_u8(will_qos)?;

        let keep_alive = decode_u16(cursor)?;

        let properties = ConnectProperties::from_properties(&Properties::decode(cursor)?)?;

        let client_id = decode_utf8_string(cursor)?;

        let will = if will_flag {
            let properties = WillProperties::from_properties(&Properties::decode(cursor)?)?;

            let topic = decode_utf8_string(cursor)?;
            validate_topic_name(&topic).map_err(PacketError::MalformedPacket)?;
            if topic.is_empty() {
                return Err(PacketError::malformed("Will topic must not be empty"));
            }

            let payload = decode_binary_data(cursor)?;

            Some(WillMessage { topic, payload, qos: will_qos, retain: will_retain, properties })
        } else {
            None
        };

        let username = if username_flag { Some(decode_utf8_string(cursor)?) } else { None };

        let password = if password_flag { Some(decode_binary_data(cursor)?) } else { None };

        Ok(Self { clean_start, keep_alive, properties, client_id, will, username, password })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectProperties {
    /// Session Expiry Interval in seconds.
    /// If the Session Expiry Interval is 0xFFFFFFFF (`UINT_MAX`), the Session does not expire.
    pub session_expiry_interval: Option<u32>,

    /// The Client uses this value to limit the number of `QoS` 1 and `QoS` 2 publications that it is willing to process concurrently.
    /// If the Receive Maximum value is absent then its value defaults to 65,535.
    pub receive_maximum: Option<u16>,

    /// Represents the Maximum Packet Size the Client is willing to accept.
    pub maximum_packet_size: Option<u32>,

    /// This value indicates the highest value that the Client will accept as a Topic Alias sent by the Server.
    pub topic_alias_maximum: Option<u16>,

    /// The Client uses this value to request the Server to return Response Information in the CONNACK.
    pub request_response_information: Option<bool>,

    /// The Client uses this value to indicate whether the Reason String or User Properties are sent in the case of failures.
    pub request_problem_information: Option<bool>,

    pub user_properties: Vec<UserProperty>,

    /// Contains the name of the authentication method used for extended authentication.
    pub authentication_method: Option<String>,

    /// The data used to authenticate.
    pub authentication_data: Option<Bytes>,
}

impl ConnectProperties {
    fn to_properties(&self) -> Result<Properties, PacketError> {
        if self.receive_maximum == Some(0) {
            return Err(PacketError::invalid("Receive Maximum must be greater than 0"));
        }
        if self.maximum_packet_size == Some(0) {
            return Err(PacketError::invalid("Maximum Packet Size must be greater than 0"));
        }
        if self.authentication_data.is_some() && self.authentication_method.is_none() {
            return Err(PacketError::invalid(
                "Authentication Data requires an Authentication Method",
            ));
        }

        let mut properties = Properties::new();
        properties.push_some(self.session_expiry_interval.map(Property::SessionExpiryInterval));
        properties.push_some(self.receive_maximum.map(Property::ReceiveMaximum));
        properties.push_some(self.maximum_packet_size.map(Property::MaximumPacketSize));
        properties.push_some(self.topic_alias_maximum.map(Property::TopicAliasMaximum));
        properties.push_some(
            self.request_response_information
                .map(|value| Property::RequestResponseInformation(u8::from(value))),
        );
        properties.push_some(
            self.request_problem_information
                .map(|value| Property::RequestProblemInformation(u8::from(value))),
        );
        properties.extend_user_properties(&self.user_properties);
        properties.push_some(self.authentication_method.clone().map(Property::AuthenticationMethod));
        properties.push_some(self.authentication_data.clone().map(Property::AuthenticationData));

        Ok(properties)
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Connect, CONNECT_PROPERTIES)?;

        let connect_properties = Self {
            session_expiry_interval: properties.u32_value(SESSION_EXPIRY_INTERVAL_IDENTIFIER)?,
            receive_maximum: properties.u16_value(RECEIVE_MAXIMUM_IDENTIFIER)?,
            maximum_packet_size: properties.u32_value(MAXIMUM_PACKET_SIZE_IDENTIFIER)?,
            topic_alias_maximum: properties.u16_value(TOPIC_ALIAS_MAXIMUM_IDENTIFIER)?,
            request_response_information: properties
                .bool_value(REQUEST_RESPONSE_INFORMATION_IDENTIFIER)?,
            request_problem_information: properties
                .bool_value(REQUEST_PROBLEM_INFORMATION_IDENTIFIER)?,
            user_properties: properties.user_properties(),
            authentication_method: properties.string_value(AUTHENTICATION_METHOD_IDENTIFIER)?,
            authentication_data: properties.binary_value(AUTHENTICATION_DATA_IDENTIFIER)?,
        };

        if connect_properties.receive_maximum == Some(0) {
            return Err(PacketError::malformed("Receive Maximum must be greater than 0"));
        }
        if connect_properties.maximum_packet_size == Some(0) {
            return Err(PacketError::malformed("Maximum Packet Size must be greater than 0"));
        }
        if connect_properties.authentication_data.is_some()
            && connect_properties.authentication_method.is_none()
        {
            return Err(PacketError::malformed(
                "Authentication Data requires an Authentication Method",
            ));
        }

        Ok(connect_properties)
    }
}

/// The Will Message carried in the CONNECT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WillMessage {
    pub topic: String,
    pub payload: Bytes,

    /// Specifies the `QoS` level to be used when publishing the will message.
    pub qos: QoS,

    /// Specifies if the will message is to be retained when it is published.
    pub retain: bool,

    pub properties: WillProperties,
}

impl WillMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtMostOnce,
            retain: false,
            properties: WillProperties::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WillProperties {
    /// Delay in seconds before the Server publishes the Will Message.
    pub will_delay_interval: Option<u32>,

    /// `true` if the Will payload is UTF-8 encoded character data.
    pub payload_format_indicator: Option<bool>,

    pub message_expiry_interval: Option<u32>,
    pub content_type: Option<String>,
    pub response_topic: Option<String>,
    pub correlation_data: Option<Bytes>,
    pub user_properties: Vec<UserProperty>,
}

impl WillProperties {
    fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push_some(self.will_delay_interval.map(Property::WillDelayInterval));
        properties.push_some(
            self.payload_format_indicator
                .map(|value| Property::PayloadFormatIndicator(u8::from(value))),
        );
        properties.push_some(self.message_expiry_interval.map(Property::MessageExpiryInterval));
        properties.push_some(self.content_type.clone().map(Property::ContentType));
        properties.push_some(self.response_topic.clone().map(Property::ResponseTopic));
        properties.push_some(self.correlation_data.clone().map(Property::CorrelationData));
        properties.extend_user_properties(&self.user_properties);

        properties
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Connect, WILL_PROPERTIES)?;

        Ok(Self {
            will_delay_interval: properties.u32_value(WILL_DELAY_INTERVAL_IDENTIFIER)?,
            payload_format_indicator: properties.bool_value(PAYLOAD_FORMAT_INDICATOR_IDENTIFIER)?,
            message_expiry_interval: properties.u32_value(MESSAGE_EXPIRY_INTERVAL_IDENTIFIER)?,
            content_type: properties.string_value(CONTENT_TYPE_IDENTIFIER)?,
            response_topic: properties.string_value(RESPONSE_TOPIC_IDENTIFIER)?,
            correlation_data: properties.binary_value(CORRELATION_DATA_IDENTIFIER)?,
            user_properties: properties.user_properties(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_body(bytes: &[u8]) -> Result<ConnectPacket, PacketError> {
        let mut cursor = Cursor::new(bytes);
        ConnectPacket::decode(&mut cursor, 0)
    }

    fn encode_body(packet: &ConnectPacket) -> BytesMut {
        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        buf
    }

    #[test]
    fn minimal_connect_layout() {
        let mut packet = ConnectPacket::new("c1");
        packet.keep_alive = 10;

        let body = encode_body(&packet);
        assert_eq!(
            &body[..],
            &[0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x02, b'c', b'1']
        );
        assert_eq!(decode_body(&body).unwrap(), packet);
    }

    #[test]
    fn connect_flags_are_derived() {
        let mut will = WillMessage::new("last/will", &b"bye"[..]);
        will.qos = QoS::ExactlyOnce;
        will.retain = true;

        let mut packet = ConnectPacket::new("client");
        packet.clean_start = false;
        packet.will = Some(will);
        packet.username = Some("user".to_string());
        packet.password = Some(Bytes::from_static(b"secret"));

        assert_eq!(packet.connect_flags(), 0b1111_0100);
    }

    #[test]
    fn full_connect_round_trip() {
        let mut will = WillMessage::new("status/client", &b"offline"[..]);
        will.qos = QoS::AtLeastOnce;
        will.properties = WillProperties {
            will_delay_interval: Some(30),
            payload_format_indicator: Some(true),
            message_expiry_interval: Some(3600),
            content_type: Some("text/plain".to_string()),
            response_topic: Some("status/reply".to_string()),
            correlation_data: Some(Bytes::from_static(&[1, 2, 3])),
            user_properties: vec![UserProperty::new("k", "v")],
        };

        let mut packet = ConnectPacket::new("client-42");
        packet.properties = ConnectProperties {
            session_expiry_interval: Some(120),
            receive_maximum: Some(20),
            maximum_packet_size: Some(1024),
            topic_alias_maximum: Some(10),
            request_response_information: Some(true),
            request_problem_information: Some(false),
            user_properties: vec![UserProperty::new("a", "1"), UserProperty::new("a", "2")],
            authentication_method: Some("SCRAM-SHA-1".to_string()),
            authentication_data: Some(Bytes::from_static(b"challenge")),
        };
        packet.will = Some(will);
        packet.username = Some("user".to_string());
        packet.password = Some(Bytes::from_static(b"pass"));

        assert_eq!(decode_body(&encode_body(&packet)).unwrap(), packet);
    }

    #[test]
    fn password_without_username_is_allowed() {
        let mut packet = ConnectPacket::new("");
        packet.password = Some(Bytes::from_static(b"token"));

        assert_eq!(decode_body(&encode_body(&packet)).unwrap(), packet);
    }

    #[test]
    fn wrong_protocol_name_is_malformed() {
        let body = [0x00, 0x04, b'M', b'Q', b'I', b'P', 0x05, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x00];
        assert!(matches!(decode_body(&body), Err(PacketError::MalformedPacket(_))));
    }

    #[test]
    fn wrong_protocol_version_is_malformed() {
        let body = [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x0A, 0x00, 0x00, 0x00];
        assert!(matches!(decode_body(&body), Err(PacketError::MalformedPacket(_))));
    }

    #[test]
    fn reserved_connect_flag_is_malformed() {
        let body = [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x03, 0x00, 0x0A, 0x00, 0x00, 0x00];
        assert!(decode_body(&body).is_err());
    }

    #[test]
    fn will_qos_without_will_is_malformed() {
        let body = [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x0A, 0x00, 0x0A, 0x00, 0x00, 0x00];
        assert!(decode_body(&body).is_err());
    }

    #[test]
    fn will_retain_without_will_is_malformed() {
        let body = [0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x22, 0x00, 0x0A, 0x00, 0x00, 0x00];
        assert!(decode_body(&body).is_err());
    }

    #[test]
    fn will_qos_three_is_malformed() {
        let mut packet = ConnectPacket::new("c");
        packet.will = Some(WillMessage::new("t", Bytes::new()));
        let mut body = encode_body(&packet);
        body[7] |= 0b0001_1000;

        assert!(decode_body(&body).is_err());
    }

    #[test]
    fn disallowed_property_is_malformed() {
        // CONNECT with a Topic Alias property.
        let body = [
            0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x02, 0x00, 0x0A, 0x03, 0x23, 0x00, 0x01,
            0x00, 0x00,
        ];
        assert!(decode_body(&body).is_err());
    }

    #[test]
    fn zero_receive_maximum_is_rejected() {
        let mut packet = ConnectPacket::new("c");
        packet.properties.receive_maximum = Some(0);

        assert!(matches!(
            packet.encode_body(&mut BytesMut::new()),
            Err(PacketError::InvalidArgument(_))
        ));
    }

    #[test]
    fn wildcard_will_topic_is_rejected() {
        let mut packet = ConnectPacket::new("c");
        packet.will = Some(WillMessage::new("status/#", Bytes::new()));

        assert!(matches!(
            packet.encode_body(&mut BytesMut::new()),
            Err(PacketError::InvalidArgument(_))
        ));
    }
}
