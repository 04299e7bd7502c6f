use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use log::trace;

use crate::{
    codec::{decode_packet_identifier, decode_u8, decode_utf8_string, write_utf8_string},
    constants::MAX_VARIABLE_BYTE_INT,
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{Properties, Property, UserProperty, SUBSCRIPTION_IDENTIFIER, USER_PROPERTY_IDENTIFIER},
        topic::{SubscriptionOptions, TopicFilter},
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const SUBSCRIBE_PROPERTIES: &[u8] = &[SUBSCRIPTION_IDENTIFIER, USER_PROPERTY_IDENTIFIER];

/// The SUBSCRIBE packet is sent from the Client to the Server to create one or more Subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribePacket {
    packet_identifier: u16,
    properties: SubscribeProperties,

    /// At least one Topic Filter, each followed by its Subscription Options byte.
    topic_filters: Vec<TopicFilter>,
}

impl SubscribePacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0 or `topic_filters` is empty.
    pub fn new(packet_identifier: u16, topic_filters: Vec<TopicFilter>) -> Result<Self, PacketError> {
        if packet_identifier == 0 {
            return Err(PacketError::invalid("Packet identifier must be non-zero"));
        }

        if topic_filters.is_empty() {
            return Err(PacketError::invalid("SUBSCRIBE must contain at least one topic filter"));
        }

        Ok(Self { packet_identifier, properties: SubscribeProperties::default(), topic_filters })
    }

    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if the subscription identifier is out of range.
    pub fn with_properties(mut self, properties: SubscribeProperties) -> Result<Self, PacketError> {
        properties.validate().map_err(PacketError::InvalidArgument)?;
        self.properties = properties;

        Ok(self)
    }

    pub fn packet_identifier(&self) -> u16 {
        self.packet_identifier
    }

    pub fn properties(&self) -> &SubscribeProperties {
        &self.properties
    }

    pub fn topic_filters(&self) -> &[TopicFilter] {
        &self.topic_filters
    }
}

impl ControlPacket for SubscribePacket {
    const PACKET_TYPE: PacketType = PacketType::Subscribe;
}

impl EncodablePacket for SubscribePacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u16(self.packet_identifier);
        self.properties.to_properties().write(buf)?;

        for topic_filter in &self.topic_filters {
            write_utf8_string(buf, topic_filter.filter())?;
            buf.put_u8(topic_filter.options().to_u8());
        }

        Ok(())
    }
}

impl DecodablePacket for SubscribePacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let packet_identifier = decode_packet_identifier(cursor)?;

        let properties = SubscribeProperties::from_properties(&Properties::decode(cursor)?)?;

        let mut topic_filters = Vec::new();
        while cursor.has_remaining() {
            let filter = decode_utf8_string(cursor)?;
            let options = SubscriptionOptions::from_u8(decode_u8(cursor)?)?;
            trace!("topic_filter: {filter} options: {options:?}");

            topic_filters.push(TopicFilter::decoded(filter, options)?);
        }

        if topic_filters.is_empty() {
            return Err(PacketError::malformed("SUBSCRIBE must contain at least one topic filter"));
        }

        Ok(Self { packet_identifier, properties, topic_filters })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeProperties {
    /// Identifier attached to every message delivered through this subscription, 1 to 268,435,455.
    pub subscription_identifier: Option<u32>,

    pub user_properties: Vec<UserProperty>,
}

impl SubscribeProperties {
    fn validate(&self) -> Result<(), String> {
        match self.subscription_identifier {
            Some(value) if value == 0 || value > MAX_VARIABLE_BYTE_INT => {
                Err(format!("Invalid subscription identifier: {value}"))
            }
            _ => Ok(()),
        }
    }

    fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push_some(self.subscription_identifier.map(Property::SubscriptionIdentifier));
        properties.extend_user_properties(&self.user_properties);

        properties
    }

    fn from_properties(properties: &Properties) -> Result<Self, PacketError> {
        properties.ensure_allowed(PacketType::Subscribe, SUBSCRIBE_PROPERTIES)?;

        Ok(Self {
            subscription_identifier: properties.u32_value(SUBSCRIPTION_IDENTIFIER)?,
            user_properties: properties.user_properties(),
        })
    }
}
