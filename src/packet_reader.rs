use bytes::BytesMut;
use log::{trace, warn};

use crate::{
    codec::peek_variable_byte_int,
    constants::{FIXED_HEADER_FLAGS_MASK, MAX_PACKET_SIZE, READ_BUFFER_CAPACITY},
    error::PacketError,
    packets::Packet,
    protocol::packet_type::PacketType,
};

/// Splits a byte stream into MQTT packets.
///
/// Bytes read from the transport are appended with [`PacketReader::extend`]; each call to
/// [`PacketReader::next_packet`] yields at most one packet once its whole frame is buffered.
#[derive(Debug)]
pub struct PacketReader {
    buffer: BytesMut,
    max_packet_size: usize,
}

impl PacketReader {
    pub fn new() -> Self {
        Self::with_max_packet_size(MAX_PACKET_SIZE)
    }

    /// Rejects frames whose total size, fixed header included, exceeds `max_packet_size`.
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY), max_packet_size }
    }

    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Appends bytes received from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes not yet consumed by a packet.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Decodes the next buffered packet.
    ///
    /// Returns `Ok(None)` until a complete frame is available. A frame that fails to decode is
    /// consumed before the error is returned, so reading can resume at the next frame.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` for an unknown packet type, a malformed remaining
    ///   length or a malformed body.
    /// - Returns `PacketError::PacketTooLarge` if the announced frame exceeds the maximum packet size.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, PacketError> {
        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let control_byte = self.buffer[0];
        let packet_type = PacketType::from_fixed_header(control_byte).inspect_err(|e| {
            warn!("Rejecting frame: {e}");
        })?;

        let Some((remaining_len, len_size)) =
            peek_variable_byte_int(&self.buffer[1..]).inspect_err(|e| {
                warn!("Rejecting {packet_type} frame: {e}");
            })?
        else {
            return Ok(None);
        };

        let frame_len = 1 + len_size + remaining_len as usize;
        if frame_len > self.max_packet_size {
            warn!("Rejecting {packet_type} frame of {frame_len} bytes");
            return Err(PacketError::PacketTooLarge { size: frame_len, maximum: self.max_packet_size });
        }

        if self.buffer.len() < frame_len {
            trace!("{packet_type} frame incomplete: {} of {frame_len} bytes", self.buffer.len());
            return Ok(None);
        }

        let frame = self.buffer.split_to(frame_len);
        trace!("Frame: {}", hex::encode(&frame));

        Packet::decode_body(packet_type, control_byte & FIXED_HEADER_FLAGS_MASK, &frame[1 + len_size..])
            .map(Some)
            .inspect_err(|e| {
                warn!("Rejecting {packet_type} frame: {e}");
            })
    }
}

impl Default for PacketReader {
    fn default() -> Self {
        Self::new()
    }
}
