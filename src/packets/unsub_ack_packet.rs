use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};

use crate::{
    codec::{decode_packet_identifier, decode_u8},
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::Properties,
        reason_code::{decode_reason_code, ensure_reason_code, ReasonCode, UNSUBACK_REASON_CODES},
    },
};

use super::{pub_ack_packet::AckProperties, ControlPacket, DecodablePacket, EncodablePacket};

/// Sent by the Server to the Client to confirm receipt of an UNSUBSCRIBE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsubAckPacket {
    packet_identifier: u16,
    properties: AckProperties,

    /// One per Topic Filter in the UNSUBSCRIBE, in the same order.
    reason_codes: Vec<ReasonCode>,
}

impl UnsubAckPacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0, `reason_codes` is
    ///   empty, or one of them is not an UNSUBACK reason code.
    pub fn new(packet_identifier: u16, reason_codes: Vec<ReasonCode>) -> Result<Self, PacketError> {
        if packet_identifier == 0 {
            return Err(PacketError::invalid("Packet identifier must be non-zero"));
        }

        if reason_codes.is_empty() {
            return Err(PacketError::invalid("UNSUBACK must contain at least one reason code"));
        }

        for &reason_code in &reason_codes {
            ensure_reason_code(reason_code, PacketType::UnsubAck, UNSUBACK_REASON_CODES)?;
        }

        Ok(Self { packet_identifier, properties: AckProperties::default(), reason_codes })
    }

    pub fn with_properties(mut self, properties: AckProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn packet_identifier(&self) -> u16 {
        self.packet_identifier
    }

    pub fn properties(&self) -> &AckProperties {
        &self.properties
    }

    pub fn reason_codes(&self) -> &[ReasonCode] {
        &self.reason_codes
    }
}

impl ControlPacket for UnsubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::UnsubAck;
}

impl EncodablePacket for UnsubAckPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u16(self.packet_identifier);
        self.properties.to_properties().write(buf)?;

        for reason_code in &self.reason_codes {
            buf.put_u8(reason_code.code());
        }

        Ok(())
    }
}

impl DecodablePacket for UnsubAckPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let packet_identifier = decode_packet_identifier(cursor)?;

        let properties =
            AckProperties::from_properties(&Properties::decode(cursor)?, PacketType::UnsubAck)?;

        let mut reason_codes = Vec::with_capacity(cursor.remaining());
        while cursor.has_remaining() {
            reason_codes.push(decode_reason_code(
                decode_u8(cursor)?,
                ReasonCode::Success,
                PacketType::UnsubAck,
                UNSUBACK_REASON_CODES,
            )?);
        }

        if reason_codes.is_empty() {
            return Err(PacketError::malformed("UNSUBACK must contain at least one reason code"));
        }

        Ok(Self { packet_identifier, properties, reason_codes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_body(bytes: &[u8]) -> Result<UnsubAckPacket, PacketError> {
        let mut cursor = Cursor::new(bytes);
        UnsubAckPacket::decode(&mut cursor, 0)
    }

    #[test]
    fn reason_codes_round_trip() {
        let packet =
            UnsubAckPacket::new(4, vec![ReasonCode::Success, ReasonCode::NoSubscriptionExisted])
                .unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x04, 0x00, 0x00, 0x11]);
        assert_eq!(decode_body(&buf).unwrap(), packet);
    }

    #[test]
    fn zero_byte_decodes_as_success() {
        let packet = decode_body(&[0x00, 0x01, 0x00, 0x00]).unwrap();
        assert_eq!(packet.reason_codes(), &[ReasonCode::Success]);
    }

    #[test]
    fn granted_qos_is_not_an_unsuback_code() {
        assert!(UnsubAckPacket::new(1, vec![ReasonCode::GrantedQoS1]).is_err());
        assert!(decode_body(&[0x00, 0x01, 0x00, 0x01]).is_err());
    }

    #[test]
    fn empty_reason_list_is_rejected() {
        assert!(UnsubAckPacket::new(1, vec![]).is_err());
        assert!(decode_body(&[0x00, 0x01, 0x00]).is_err());
    }
}
