use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use log::trace;

use crate::{
    codec::{decode_packet_identifier, decode_utf8_string, write_utf8_string},
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{Properties, UserProperty, USER_PROPERTY_IDENTIFIER},
        topic::validate_topic_filter,
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const UNSUBSCRIBE_PROPERTIES: &[u8] = &[USER_PROPERTY_IDENTIFIER];

/// An UNSUBSCRIBE packet is sent by the Client to the Server, to unsubscribe from topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubscribePacket {
    packet_identifier: u16,
    user_properties: Vec<UserProperty>,

    /// At least one Topic Filter.
    topic_filters: Vec<String>,
}

impl UnsubscribePacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0, `topic_filters` is
    ///   empty, or one of them is not a valid Topic Filter.
    pub fn new(packet_identifier: u16, topic_filters: Vec<String>) -> Result<Self, PacketError> {
        if packet_identifier == 0 {
            return Err(PacketError::invalid("Packet identifier must be non-zero"));
        }

        if topic_filters.is_empty() {
            return Err(PacketError::invalid("UNSUBSCRIBE must contain at least one topic filter"));
        }

        for topic_filter in &topic_filters {
            validate_topic_filter(topic_filter).map_err(PacketError::InvalidArgument)?;
        }

        Ok(Self { packet_identifier, user_properties: Vec::new(), topic_filters })
    }

    pub fn with_user_properties(mut self, user_properties: Vec<UserProperty>) -> Self {
        self.user_properties = user_properties;
        self
    }

    pub fn packet_identifier(&self) -> u16 {
        self.packet_identifier
    }

    pub fn user_properties(&self) -> &[UserProperty] {
        &self.user_properties
    }

    pub fn topic_filters(&self) -> &[String] {
        &self.topic_filters
    }
}

impl ControlPacket for UnsubscribePacket {
    const PACKET_TYPE: PacketType = PacketType::Unsubscribe;
}

impl EncodablePacket for UnsubscribePacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u16(self.packet_identifier);

        let mut properties = Properties::new();
        properties.extend_user_properties(&self.user_properties);
        properties.write(buf)?;

        for topic_filter in &self.topic_filters {
            write_utf8_string(buf, topic_filter)?;
        }

        Ok(())
    }
}

impl DecodablePacket for UnsubscribePacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let packet_identifier = decode_packet_identifier(cursor)?;

        let properties = Properties::decode(cursor)?;
        properties.ensure_allowed(PacketType::Unsubscribe, UNSUBSCRIBE_PROPERTIES)?;

        let mut topic_filters = Vec::new();
        while cursor.has_remaining() {
            let topic_filter = decode_utf8_string(cursor)?;
            trace!("topic_filter: {topic_filter}");

            validate_topic_filter(&topic_filter).map_err(PacketError::MalformedPacket)?;
            topic_filters.push(topic_filter);
        }

        if topic_filters.is_empty() {
            return Err(PacketError::malformed("UNSUBSCRIBE must contain at least one topic filter"));
        }

        Ok(Self { packet_identifier, user_properties: properties.user_properties(), topic_filters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_body(bytes: &[u8]) -> Result<UnsubscribePacket, PacketError> {
        let mut cursor = Cursor::new(bytes);
        UnsubscribePacket::decode(&mut cursor, 2)
    }

    #[test]
    fn topic_filters_round_trip() {
        let packet = UnsubscribePacket::new(8, vec!["a/b".to_string(), "c/#".to_string()])
            .unwrap()
            .with_user_properties(vec![UserProperty::new("why", "done")]);

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(decode_body(&buf).unwrap(), packet);
    }

    #[test]
    fn layout_without_properties() {
        let packet = UnsubscribePacket::new(1, vec!["x".to_string()]).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x01, 0x00, 0x00, 0x01, b'x']);
    }

    #[test]
    fn empty_filter_list_is_rejected() {
        assert!(UnsubscribePacket::new(1, vec![]).is_err());
        assert!(matches!(decode_body(&[0x00, 0x01, 0x00]), Err(PacketError::MalformedPacket(_))));
    }

    #[test]
    fn invalid_filter_is_rejected() {
        assert!(UnsubscribePacket::new(1, vec!["a/#/b".to_string()]).is_err());
        assert!(decode_body(&[0x00, 0x01, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn reason_string_is_not_allowed() {
        let body = [0x00, 0x01, 0x04, 0x1F, 0x00, 0x01, b'r', 0x00, 0x01, b'x'];
        assert!(decode_body(&body).is_err());
    }
}
