use std::{io::Cursor, time::Duration};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;

use crate::{
    codec::{decode_packet_identifier, decode_utf8_string, write_utf8_string},
    constants::MAX_VARIABLE_BYTE_INT,
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, CONTENT_TYPE_IDENTIFIER, CORRELATION_DATA_IDENTIFIER,
            MESSAGE_EXPIRY_INTERVAL_IDENTIFIER, PAYLOAD_FORMAT_INDICATOR_IDENTIFIER,
            RESPONSE_TOPIC_IDENTIFIER, SUBSCRIPTION_IDENTIFIER, TOPIC_ALIAS_IDENTIFIER,
            USER_PROPERTY_IDENTIFIER,
        },
        qos::QoS,
        topic::validate_topic_name,
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const PUBLISH_PROPERTIES: &[u8] = &[
    PAYLOAD_FORMAT_INDICATOR_IDENTIFIER,
    MESSAGE_EXPIRY_INTERVAL_IDENTIFIER,
    TOPIC_ALIAS_IDENTIFIER,
    RESPONSE_TOPIC_IDENTIFIER,
    CORRELATION_DATA_IDENTIFIER,
    USER_PROPERTY_IDENTIFIER,
    SUBSCRIPTION_IDENTIFIER,
    CONTENT_TYPE_IDENTIFIER,
];

/// A PUBLISH packet is sent from a Client to a Server or from a Server to a Client to transport an Application Message.
///
/// Fixed header flags:
///
/// | Bit | 3        | 2 1       | 0      |
/// |-----|----------|-----------|--------|
/// |     | DUP flag | QoS level | RETAIN |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPacket {
    /// Set when this might be a re-delivery of an earlier attempt to send the packet.
    dup: bool,

    qos: QoS,

    /// Set when the Server must store the Application Message as the retained message for the topic.
    retain: bool,

    /// May be empty when a Topic Alias is present.
    topic: String,

    /// Present if and only if `QoS` is 1 or 2.
    packet_identifier: Option<u16>,

    properties: PublishProperties,

    /// The Application Message, bounded by the remaining length.
    payload: Bytes,
}

impl PublishPacket {
    pub fn builder(topic: impl Into<String>) -> PublishPacketBuilder {
        PublishPacketBuilder::new(topic)
    }

    pub fn dup(&self) -> bool {
        self.dup
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn retain(&self) -> bool {
        self.retain
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn packet_identifier(&self) -> Option<u16> {
        self.packet_identifier
    }

    pub fn properties(&self) -> &PublishProperties {
        &self.properties
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Lifetime of the Application Message, if it has one.
    pub fn message_expiry_interval(&self) -> Option<Duration> {
        self.properties.message_expiry_interval.map(|secs| Duration::from_secs(u64::from(secs)))
    }

    /// A copy flagged as a re-delivery. `QoS` 0 messages are never re-delivered, so their DUP stays 0.
    pub fn as_duplicate(&self) -> Self {
        Self { dup: self.qos != QoS::AtMostOnce, ..self.clone() }
    }

    fn validate(&self) -> Result<(), String> {
        validate_topic_name(&self.topic)?;

        if self.topic.is_empty() && self.properties.topic_alias.is_none() {
            return Err("Topic name must not be empty without a Topic Alias".to_string());
        }

        if self.properties.topic_alias == Some(0) {
            return Err("Topic Alias must be greater than 0".to_string());
        }

        match (self.qos, self.packet_identifier) {
            (QoS::AtMostOnce, Some(packet_identifier)) => {
                return Err(format!(
                    "QoS 0 PUBLISH must not carry a packet identifier, got {packet_identifier}"
                ));
            }
            (QoS::AtLeastOnce | QoS::ExactlyOnce, None) => {
                return Err(format!("{} PUBLISH requires a packet identifier", self.qos));
            }
            (_, Some(0)) => return Err("Packet identifier must be non-zero".to_string()),
            _ => {}
        }

        if self.dup && self.qos == QoS::AtMostOnce {
            return Err("DUP flag must be 0 for QoS 0 messages".to_string());
        }

        if let Some(response_topic) = &self.properties.response_topic {
            validate_topic_name(response_topic)?;
        }

        for &subscription_identifier in &self.properties.subscription_identifiers {
            if subscription_identifier == 0 || subscription_identifier > MAX_VARIABLE_BYTE_INT {
                return Err(format!("Invalid subscription identifier: {subscription_identifier}"));
            }
        }

        Ok(())
    }
}

impl ControlPacket for PublishPacket {
    const PACKET_TYPE: PacketType = PacketType::Publish;
}

impl EncodablePacket for PublishPacket {
    fn flags(&self) -> u8 {
        u8::from(self.dup) << 3 | self.qos.to_u8() << 1 | u8::from(self.retain)
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        write_utf8_string(buf, &self.topic)?;

        if let Some(packet_identifier) = self.packet_identifier {
            buf.put_u16(packet_identifier);
        }

        self.properties.to_properties().write(buf)?;
        buf.put_slice(&self.payload);

        Ok(())
    }
}

impl DecodablePacket for PublishPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, flags: u8) -> Result<Self, PacketError> {
        trace!("publish_flags: {flags:#06b}");

        let retain = flags & 1 == 1;
        let qos = QoS::from_u8(flags >> 1 & 0b0000_0011)?;
        let dup = flags >> 3 & 1 == 1;

        let topic = decode_utf8_string(cursor)?;

        let packet_identifier = match qos {
            QoS::AtMostOnce => None,
            QoS::AtLeastOnce | QoS::ExactlyOnce => Some(decode_packet_identifier(cursor)?),
        };

        let properties = PublishProperties::from_properties(&Properties::decode(cursor)?)?;

        let payload = cursor.copy_to_bytes(cursor.remaining());
        trace!("payload_len: {}", payload.len());

        let packet = Self { dup, qos, retain, topic, packet_identifier, properties, payload };
        packet.validate().map_err(PacketError::MalformedPacket)?;

        Ok(packet)
    }
}

/// Builds a [`PublishPacket`], checking its invariants once at the end.
#[derive(Debug, Clone)]
pub struct PublishPacketBuilder {
    packet: PublishPacket,
}

impl PublishPacketBuilder {
    fn new(topic: impl Into<String>) -> Self {
        Self {
            packet: PublishPacket {
                dup: false,
                qos: QoS::AtMostOnce,
                retain: false,
                topic: topic.into(),
                packet_identifier: None,
                properties: PublishProperties::default(),
                payload: Bytes::new(),
            },
        }
    }

    pub fn dup(mut self, dup: bool) -> Self {
        self.packet.dup = dup;
        self
    }

    pub fn qos(mut self, qos: QoS) -> Self {
        self.packet.qos = qos;
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.packet.retain = retain;
        self
    }

    pub fn packet_identifier(mut self, packet_identifier: u16) -> Self {
        self.packet.packet_identifier = Some(packet_identifier);
        self
    }

    pub fn properties(mut self, properties: PublishProperties) -> Self {
        self.packet.properties = properties;
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.packet.payload = payload.into();
        self
    }

    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if the topic is invalid, the packet identifier
    ///   does not match the `QoS`, or a property is out of range.
    pub fn build(self) -> Result<PublishPacket, PacketError> {
        self.packet.validate().map_err(PacketError::InvalidArgument)?;
        Ok(self.packet)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishProperties {
    /// `true` if the payload is UTF-8 encoded character data.
    pub payload_format_indicator: Option<bool>,

    /// Lifetime of the Application Message in seconds.
    pub message_expiry_interval: Option<u32>,

    /// Identifies the Topic instead of using the Topic Name.
    pub topic_alias: Option<u16>,

    /// Topic Name for a response message.
    pub response_topic: Option<String>,

    /// Used by the sender of the Request Message to identify which request the Response Message is for.
    pub correlation_data: Option<Bytes>,

    pub user_properties: Vec<UserProperty>,

    /// One identifier per matching subscription, sent by the Server.
    pub subscription_identifiers: Vec<u32>,

    pub content_type: Option<String>,
}

impl PublishProperties {
    fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push_some(
            self.payload_format_indicator
                .map(|value| Property::PayloadFormatIndicator(u8::from(value))),
        );
        properties.push_some(self.message_expiry_interval.map(Property::MessageExpiryInterval));
        properties.push_some(self.topic_alias.map(Property::TopicAlias));
        properties.push_some(self.response_topic.clone().map(Property::ResponseTopic));
        properties.push_some(self.correlation_data.clone().map(Property::CorrelationData));
        properties.extend_user_properties(&self.user_properties);
        for &subscription_identifier in &self.subscription_identifiers {
            properties.push(Property::SubscriptionIdentifier(subscription_identifier));
        }
        properties.push_some(self.content_type.clone().map(Property::ContentType));

        properties
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Publish, PUBLISH_PROPERTIES)?;

        let subscription_identifiers = properties
            .all(SUBSCRIPTION_IDENTIFIER)
            .filter_map(|property| match property {
                Property::SubscriptionIdentifier(value) => Some(*value),
                _ => None,
            })
            .collect();

        Ok(Self {
            payload_format_indicator: properties.bool_value(PAYLOAD_FORMAT_INDICATOR_IDENTIFIER)?,
            message_expiry_interval: properties.u32_value(MESSAGE_EXPIRY_INTERVAL_IDENTIFIER)?,
            topic_alias: properties.u16_value(TOPIC_ALIAS_IDENTIFIER)?,
            response_topic: properties.string_value(RESPONSE_TOPIC_IDENTIFIER)?,
            correlation_data: properties.binary_value(CORRELATION_DATA_IDENTIFIER)?,
            user_properties: properties.user_properties(),
            subscription_identifiers,
            content_type: properties.string_value(CONTENT_TYPE_IDENTIFIER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(packet: &PublishPacket) -> PublishPacket {
        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();

        let mut cursor = Cursor::new(&buf[..]);
        PublishPacket::decode(&mut cursor, packet.flags()).unwrap()
    }

    #[test]
    fn qos_two_retained_duplicate_round_trip() {
        let packet = PublishPacket::builder("test/topic")
            .dup(true)
            .qos(QoS::ExactlyOnce)
            .retain(true)
            .packet_identifier(74)
            .payload(&b"payload"[..])
            .build()
            .unwrap();

        assert_eq!(packet.flags(), 0b1101);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn qos_zero_has_no_packet_identifier_on_the_wire() {
        let packet = PublishPacket::builder("a/b").payload(&b"hi"[..]).build().unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x03, b'a', b'/', b'b', 0x00, b'h', b'i']);
        assert_eq!(round_trip(&packet), packet);
    }

    #[test]
    fn every_property_round_trips() {
        let packet = PublishPacket::builder("sensors/1")
            .qos(QoS::AtLeastOnce)
            .packet_identifier(9)
            .properties(PublishProperties {
                payload_format_indicator: Some(true),
                message_expiry_interval: Some(60),
                topic_alias: Some(3),
                response_topic: Some("sensors/1/reply".to_string()),
                correlation_data: Some(Bytes::from_static(b"req-1")),
                user_properties: vec![UserProperty::new("unit", "C"), UserProperty::new("unit", "F")],
                subscription_identifiers: vec![1, 268_435_455],
                content_type: Some("application/json".to_string()),
            })
            .payload(&b"{\"t\":21}"[..])
            .build()
            .unwrap();

        assert_eq!(round_trip(&packet), packet);
        assert_eq!(packet.message_expiry_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn empty_topic_requires_topic_alias() {
        assert!(matches!(
            PublishPacket::builder("").build(),
            Err(PacketError::InvalidArgument(_))
        ));

        let aliased = PublishPacket::builder("")
            .properties(PublishProperties { topic_alias: Some(1), ..PublishProperties::default() })
            .build()
            .unwrap();
        assert_eq!(round_trip(&aliased), aliased);
    }

    #[test]
    fn packet_identifier_must_match_qos() {
        assert!(PublishPacket::builder("t").qos(QoS::AtLeastOnce).build().is_err());
        assert!(PublishPacket::builder("t").packet_identifier(1).build().is_err());
        assert!(PublishPacket::builder("t").qos(QoS::AtLeastOnce).packet_identifier(0).build().is_err());
    }

    #[test]
    fn wildcards_in_topic_are_rejected() {
        assert!(PublishPacket::builder("a/+").build().is_err());

        let mut cursor = Cursor::new(&[0x00, 0x03, b'a', b'/', b'#', 0x00][..]);
        assert!(matches!(
            PublishPacket::decode(&mut cursor, 0),
            Err(PacketError::MalformedPacket(_))
        ));
    }

    #[test]
    fn qos_three_is_malformed() {
        let mut cursor = Cursor::new(&[0x00, 0x01, b't', 0x00, 0x01, 0x00][..]);
        assert!(PublishPacket::decode(&mut cursor, 0b0110).is_err());
    }

    #[test]
    fn zero_packet_identifier_is_malformed() {
        let mut cursor = Cursor::new(&[0x00, 0x01, b't', 0x00, 0x00, 0x00][..]);
        assert!(PublishPacket::decode(&mut cursor, 0b0010).is_err());
    }

    #[test]
    fn duplicate_topic_alias_is_malformed() {
        let body = [0x00, 0x00, 0x06, 0x23, 0x00, 0x01, 0x23, 0x00, 0x02];
        let mut cursor = Cursor::new(&body[..]);
        assert!(PublishPacket::decode(&mut cursor, 0).is_err());
    }

    #[test]
    fn as_duplicate_only_flags_acknowledged_qos() {
        let qos1 = PublishPacket::builder("t")
            .qos(QoS::AtLeastOnce)
            .packet_identifier(5)
            .build()
            .unwrap();
        assert!(qos1.as_duplicate().dup());

        let qos0 = PublishPacket::builder("t").build().unwrap();
        assert!(!qos0.as_duplicate().dup());
    }
}
