use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};

use crate::{
    codec::{decode_packet_identifier, decode_u8},
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::Properties,
        reason_code::{decode_reason_code, ensure_reason_code, ReasonCode, SUBACK_REASON_CODES},
    },
};

use super::{pub_ack_packet::AckProperties, ControlPacket, DecodablePacket, EncodablePacket};

/// Sent by the Server to confirm receipt and processing of a SUBSCRIBE packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAckPacket {
    packet_identifier: u16,
    properties: AckProperties,

    /// One per Topic Filter in the SUBSCRIBE, in the same order.
    reason_codes: Vec<ReasonCode>,
}

impl SubAckPacket {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0, `reason_codes` is
    ///   empty, or one of them is not a SUBACK reason code.
    pub fn new(packet_identifier: u16, reason_codes: Vec<ReasonCode>) -> Result<Self, PacketError> {
        if packet_identifier == 0 {
            return Err(PacketError::invalid("Packet identifier must be non-zero"));
        }

        if reason_codes.is_empty() {
            return Err(PacketError::invalid("SUBACK must contain at least one reason code"));
        }

        for &reason_code in &reason_codes {
            ensure_reason_code(reason_code, PacketType::SubAck, SUBACK_REASON_CODES)?;
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

impl ControlPacket for SubAckPacket {
    const PACKET_TYPE: PacketType = PacketType::SubAck;
}

impl EncodablePacket for SubAckPacket {
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u16(self.packet_identifier);
        self.properties.to_properties().write(buf)?;

        for reason_code in &self.reason_codes {
            buf.put_u8(reason_code.code());
        }

        Ok(())
    }
}

impl DecodablePacket for SubAckPacket {
    fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        let packet_identifier = decode_packet_identifier(cursor)?;

        let properties = AckProperties::from_properties(&Properties::decode(cursor)?, PacketType::SubAck)?;

        let mut reason_codes = Vec::with_capacity(cursor.remaining());
        while cursor.has_remaining() {
            reason_codes.push(decode_reason_code(
                decode_u8(cursor)?,
                ReasonCode::GrantedQoS0,
                PacketType::SubAck,
                SUBACK_REASON_CODES,
            )?);
        }

        if reason_codes.is_empty() {
            return Err(PacketError::malformed("SUBACK must contain at least one reason code"));
        }

        Ok(Self { packet_identifier, properties, reason_codes })
    }
}
