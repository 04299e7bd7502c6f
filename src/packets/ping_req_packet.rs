use std::io::Cursor;

use bytes::BytesMut;

use crate::{error::PacketError, protocol::packet_type::PacketType};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

/// Sent by the Client to keep the connection alive. Fixed header only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingReqPacket;

impl ControlPacket for PingReqPacket {
    const PACKET_TYPE: PacketType = PacketType::PingReq;
}

impl EncodablePacket for PingReqPacket {
    fn encode_body(&self, _buf: &mut BytesMut) -> Result<(), PacketError> {
        Ok(())
    }
}

impl DecodablePacket for PingReqPacket {
    fn decode(_cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        Ok(Self)
    }
}
