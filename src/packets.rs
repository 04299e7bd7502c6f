use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use log::{debug, trace};

use crate::{
    codec::{decode_u8, decode_variable_byte_int, variable_byte_int_size, write_usize_as_var_int},
    constants::{FIXED_HEADER_FLAGS_MASK, MAX_PACKET_SIZE},
    error::PacketError,
    protocol::packet_type::PacketType,
};

pub mod auth_packet;
pub mod conn_ack_packet;
pub mod connect_packet;
pub mod disconnect_packet;
pub mod ping_req_packet;
pub mod ping_resp_packet;
pub mod pub_ack_packet;
pub mod publish_packet;
pub mod sub_ack_packet;
pub mod subscribe_packet;
pub mod unsub_ack_packet;
pub mod unsubscribe_packet;

use auth_packet::AuthPacket;
use conn_ack_packet::ConnAckPacket;
use connect_packet::ConnectPacket;
use disconnect_packet::DisconnectPacket;
use ping_req_packet::PingReqPacket;
use ping_resp_packet::PingRespPacket;
use pub_ack_packet::{PubAckPacket, PubCompPacket, PubRecPacket, PubRelPacket};
use publish_packet::PublishPacket;
use sub_ack_packet::SubAckPacket;
use subscribe_packet::SubscribePacket;
use unsub_ack_packet::UnsubAckPacket;
use unsubscribe_packet::UnsubscribePacket;

/// A control packet kind with a fixed packet type code.
pub trait ControlPacket {
    const PACKET_TYPE: PacketType;
}

/// Decodes the bytes that follow the fixed header.
pub trait DecodablePacket: ControlPacket + Sized {
    /// `cursor` holds exactly the remaining length bytes of the packet. `flags` are the
    /// 4 least significant bits of the fixed header, already checked against the reserved value.
    fn decode(cursor: &mut Cursor<&[u8]>, flags: u8) -> Result<Self, PacketError>;
}

/// Encodes a packet, fixed header included.
pub trait EncodablePacket: ControlPacket {
    /// Fixed header flags.
    fn flags(&self) -> u8 {
        Self::PACKET_TYPE.fixed_flags().unwrap_or(0)
    }

    /// Writes the variable header and payload.
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError>;

    fn encode(&self) -> Result<BytesMut, PacketError> {
        let mut body = BytesMut::new();
        self.encode_body(&mut body)?;

        let header = FixedHeader {
            packet_type: Self::PACKET_TYPE,
            flags: self.flags(),
            remaining_len: body.len(),
        };

        let mut buf = BytesMut::with_capacity(header.encoded_len() + body.len());
        header.write(&mut buf)?;
        buf.put(body);

        trace!("Encoded {}: {}", Self::PACKET_TYPE, hex::encode(&buf));

        Ok(buf)
    }
}

/// The MQTT fixed header: control byte followed by the remaining length.
///
/// | Bit       | 7   | 6   | 5   | 4   | 3   | 2   | 1   | 0   |
/// |-----------|-----|-----|-----|-----|-----|-----|-----|-----|
/// | Byte 1    | Packet type           | Packet flags          |
/// | Byte 2..  | Remaining Length                              |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_len: usize,
}

impl FixedHeader {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if the flags are invalid for the type.
    /// - Returns `PacketError::PacketTooLarge` if the remaining length exceeds `MAX_PACKET_SIZE`.
    pub fn write(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        if self.remaining_len > MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge {
                size: self.remaining_len,
                maximum: MAX_PACKET_SIZE,
            });
        }

        buf.put_u8(self.packet_type.control_byte(self.flags)?);
        write_usize_as_var_int(buf, self.remaining_len)
    }

    /// # Errors
    /// - Returns `PacketError::MalformedPacket` for an unknown type or a malformed remaining length.
    pub fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self, PacketError> {
        let control_byte = decode_u8(cursor)
            .map_err(|_| PacketError::malformed("Failed to read fixed header"))?;

        let packet_type = PacketType::from_fixed_header(control_byte)?;
        let flags = control_byte & FIXED_HEADER_FLAGS_MASK;
        let remaining_len = decode_variable_byte_int(cursor)? as usize;

        Ok(Self { packet_type, flags, remaining_len })
    }

    pub fn encoded_len(&self) -> usize {
        1 + variable_byte_int_size(u32::try_from(self.remaining_len).unwrap_or(u32::MAX))
    }
}

/// Any MQTT v5 control packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Connect(ConnectPacket),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket),
    SubAck(SubAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubAck(UnsubAckPacket),
    PingReq(PingReqPacket),
    PingResp(PingRespPacket),
    Disconnect(DisconnectPacket),
    Auth(AuthPacket),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect(_) => PacketType::Connect,
            Self::ConnAck(_) => PacketType::ConnAck,
            Self::Publish(_) => PacketType::Publish,
            Self::PubAck(_) => PacketType::PubAck,
            Self::PubRec(_) => PacketType::PubRec,
            Self::PubRel(_) => PacketType::PubRel,
            Self::PubComp(_) => PacketType::PubComp,
            Self::Subscribe(_) => PacketType::Subscribe,
            Self::SubAck(_) => PacketType::SubAck,
            Self::Unsubscribe(_) => PacketType::Unsubscribe,
            Self::UnsubAck(_) => PacketType::UnsubAck,
            Self::PingReq(_) => PacketType::PingReq,
            Self::PingResp(_) => PacketType::PingResp,
            Self::Disconnect(_) => PacketType::Disconnect,
            Self::Auth(_) => PacketType::Auth,
        }
    }

    /// The packet identifier, for packets that correlate with an acknowledgement.
    pub fn packet_identifier(&self) -> Option<u16> {
        match self {
            Self::Publish(packet) => packet.packet_identifier(),
            Self::PubAck(packet) => Some(packet.packet_identifier()),
            Self::PubRec(packet) => Some(packet.packet_identifier()),
            Self::PubRel(packet) => Some(packet.packet_identifier()),
            Self::PubComp(packet) => Some(packet.packet_identifier()),
            Self::Subscribe(packet) => Some(packet.packet_identifier()),
            Self::SubAck(packet) => Some(packet.packet_identifier()),
            Self::Unsubscribe(packet) => Some(packet.packet_identifier()),
            Self::UnsubAck(packet) => Some(packet.packet_identifier()),
            Self::Connect(_)
            | Self::ConnAck(_)
            | Self::PingReq(_)
            | Self::PingResp(_)
            | Self::Disconnect(_)
            | Self::Auth(_) => None,
        }
    }

    /// Encodes the packet including its fixed header.
    pub fn encode(&self) -> Result<BytesMut, PacketError> {
        match self {
            Self::Connect(packet) => packet.encode(),
            Self::ConnAck(packet) => packet.encode(),
            Self::Publish(packet) => packet.encode(),
            Self::PubAck(packet) => packet.encode(),
            Self::PubRec(packet) => packet.encode(),
            Self::PubRel(packet) => packet.encode(),
            Self::PubComp(packet) => packet.encode(),
            Self::Subscribe(packet) => packet.encode(),
            Self::SubAck(packet) => packet.encode(),
            Self::Unsubscribe(packet) => packet.encode(),
            Self::UnsubAck(packet) => packet.encode(),
            Self::PingReq(packet) => packet.encode(),
            Self::PingResp(packet) => packet.encode(),
            Self::Disconnect(packet) => packet.encode(),
            Self::Auth(packet) => packet.encode(),
        }
    }

    /// Decodes one complete packet, fixed header included.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if `bytes` holds more or fewer bytes than the
    ///   remaining length announces, or if the body is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let mut cursor = Cursor::new(bytes);
        let header = FixedHeader::decode(&mut cursor)?;

        let available = cursor.remaining();
        if available < header.remaining_len {
            return Err(PacketError::malformed(format!(
                "Remaining length {} exceeds the {available} bytes available",
                header.remaining_len
            )));
        }
        if available > header.remaining_len {
            return Err(PacketError::malformed(format!(
                "{} trailing bytes after {} packet",
                available - header.remaining_len,
                header.packet_type
            )));
        }

        let start = cursor.position() as usize;
        Self::decode_body(header.packet_type, header.flags, &bytes[start..])
    }

    /// Decodes the bytes that follow a fixed header of the given type and flags.
    ///
    /// `body` must be exactly the remaining length bytes.
    pub fn decode_body(packet_type: PacketType, flags: u8, body: &[u8]) -> Result<Self, PacketError> {
        validate_flags(packet_type, flags)?;

        let mut cursor = Cursor::new(body);
        let packet = match packet_type {
            PacketType::Connect => Self::Connect(ConnectPacket::decode(&mut cursor, flags)?),
            PacketType::ConnAck => Self::ConnAck(ConnAckPacket::decode(&mut cursor, flags)?),
            PacketType::Publish => Self::Publish(PublishPacket::decode(&mut cursor, flags)?),
            PacketType::PubAck => Self::PubAck(PubAckPacket::decode(&mut cursor, flags)?),
            PacketType::PubRec => Self::PubRec(PubRecPacket::decode(&mut cursor, flags)?),
            PacketType::PubRel => Self::PubRel(PubRelPacket::decode(&mut cursor, flags)?),
            PacketType::PubComp => Self::PubComp(PubCompPacket::decode(&mut cursor, flags)?),
            PacketType::Subscribe => Self::Subscribe(SubscribePacket::decode(&mut cursor, flags)?),
            PacketType::SubAck => Self::SubAck(SubAckPacket::decode(&mut cursor, flags)?),
            PacketType::Unsubscribe => {
                Self::Unsubscribe(UnsubscribePacket::decode(&mut cursor, flags)?)
            }
            PacketType::UnsubAck => Self::UnsubAck(UnsubAckPacket::decode(&mut cursor, flags)?),
            PacketType::PingReq => Self::PingReq(PingReqPacket::decode(&mut cursor, flags)?),
            PacketType::PingResp => Self::PingResp(PingRespPacket::decode(&mut cursor, flags)?),
            PacketType::Disconnect => {
                Self::Disconnect(DisconnectPacket::decode(&mut cursor, flags)?)
            }
            PacketType::Auth => Self::Auth(AuthPacket::decode(&mut cursor, flags)?),
        };

        if cursor.has_remaining() {
            return Err(PacketError::malformed(format!(
                "{} unexpected trailing bytes in {packet_type}",
                cursor.remaining()
            )));
        }

        debug!("Decoded {packet_type} ({} bytes)", body.len());

        Ok(packet)
    }
}

/// Rejects header flags that do not fit in 4 bits or differ from the reserved value.
fn validate_flags(packet_type: PacketType, flags: u8) -> Result<(), PacketError> {
    if flags >= 16 {
        return Err(PacketError::malformed(format!("Flags {flags:#06b} do not fit in 4 bits")));
    }

    match packet_type.fixed_flags() {
        Some(expected) if flags != expected => Err(PacketError::malformed(format!(
            "Fixed header flags of {packet_type} are reserved: expected {expected:#06b}, got {flags:#06b}"
        ))),
        _ => Ok(()),
    }
}

/// Wraps every concrete packet into [`Packet`].
macro_rules! impl_from_packet {
    ($($variant:ident($packet:ty)),* $(,)?) => {
        $(
            impl From<$packet> for Packet {
                fn from(packet: $packet) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

impl_from_packet!(
    Connect(ConnectPacket),
    ConnAck(ConnAckPacket),
    Publish(PublishPacket),
    PubAck(PubAckPacket),
    PubRec(PubRecPacket),
    PubRel(PubRelPacket),
    PubComp(PubCompPacket),
    Subscribe(SubscribePacket),
    SubAck(SubAckPacket),
    Unsubscribe(UnsubscribePacket),
    UnsubAck(UnsubAckPacket),
    PingReq(PingReqPacket),
    PingResp(PingRespPacket),
    Disconnect(DisconnectPacket),
    Auth(AuthPacket),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_header_round_trip() {
        let header = FixedHeader { packet_type: PacketType::Subscribe, flags: 2, remaining_len: 321 };

        let mut buf = BytesMut::new();
        header.write(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x82, 0xC1, 0x02]);
        assert_eq!(header.encoded_len(), 3);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(FixedHeader::decode(&mut cursor).unwrap(), header);
    }

    #[test]
    fn fixed_header_rejects_wrong_reserved_flags() {
        let header = FixedHeader { packet_type: PacketType::Unsubscribe, flags: 0, remaining_len: 0 };
        assert!(matches!(header.write(&mut BytesMut::new()), Err(PacketError::InvalidArgument(_))));
    }

    #[test]
    fn fixed_header_rejects_oversized_remaining_length() {
        let header = FixedHeader {
            packet_type: PacketType::Publish,
            flags: 0,
            remaining_len: MAX_PACKET_SIZE + 1,
        };
        assert!(matches!(
            header.write(&mut BytesMut::new()),
            Err(PacketError::PacketTooLarge { .. })
        ));
    }

    #[test]
    fn decode_body_rejects_reserved_flag_mismatch() {
        assert!(Packet::decode_body(PacketType::PingReq, 1, &[]).is_err());
        assert!(Packet::decode_body(PacketType::PubRel, 0, &[0x00, 0x01]).is_err());
        assert!(Packet::decode_body(PacketType::PingReq, 0, &[]).is_ok());
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        assert!(Packet::decode(&[0xC0, 0x01]).is_err());
        assert!(Packet::decode(&[0xC0, 0x00, 0x00]).is_err());
        assert!(Packet::decode(&[]).is_err());
        assert!(Packet::decode(&[0x00, 0x00]).is_err());
    }

    #[test]
    fn ping_frames() {
        assert_eq!(Packet::decode(&[0xC0, 0x00]).unwrap(), Packet::PingReq(PingReqPacket));
        assert_eq!(Packet::decode(&[0xD0, 0x00]).unwrap(), Packet::PingResp(PingRespPacket));
        assert_eq!(&Packet::PingReq(PingReqPacket).encode().unwrap()[..], &[0xC0, 0x00]);
    }
}
