use std::io::Cursor;

use bytes::BytesMut;

use crate::{error::PacketError, protocol::packet_type::PacketType};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

/// The Server's answer to a PINGREQ. Fixed header only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingRespPacket;

impl ControlPacket for PingRespPacket {
    const PACKET_TYPE: PacketType = PacketType::PingResp;
}

impl EncodablePacket for PingRespPacket {
    fn encode_body(&self, _buf: &mut BytesMut) -> Result<(), PacketError> {
        Ok(())
    }
}

impl DecodablePacket for PingRespPacket {
    fn decode(_cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fixed_header_only() {
        assert_eq!(&PingRespPacket.encode().unwrap()[..], &[0xD0, 0x00]);
    }
}
