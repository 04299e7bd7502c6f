use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    constants::{MAX_STRING_LENGTH, MAX_VARIABLE_BYTE_INT},
    error::PacketError,
};

/// Decode a variable byte integer.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901011>
///
/// **Algorithm:**
///
/// ```text
/// multiplier = 1
/// value = 0
/// do
///    encodedByte = 'next byte from stream'
///    value += (encodedByte AND 127) * multiplier
///    if (multiplier > 128*128*128)
///       throw Error(Malformed Variable Byte Integer)
///    multiplier *= 128
/// while ((encodedByte AND 128) != 0)
/// ```
///
/// # Errors
/// - Returns `PacketError::MalformedPacket` if the input ends early or a fifth byte is continued.
pub(crate) fn decode_variable_byte_int(buf: &mut Cursor<&[u8]>) -> Result<u32, PacketError> {
    let mut multiplier: u32 = 1;
    let mut decoded_value: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(PacketError::malformed("Unable to read variable byte integer"));
        }
        let encoded_byte = buf.get_u8();

        // Ensure multiplier stays within four bytes
        if multiplier > 128 * 128 * 128 {
            return Err(PacketError::malformed("Malformed variable byte integer"));
        }

        // Take the 7 least significant bits
        decoded_value += u32::from(encoded_byte & 127) * multiplier;

        // If the continuation bit is not set, we are done
        if encoded_byte & 128 == 0 {
            break;
        }

        multiplier *= 128;
    }

    Ok(decoded_value)
}

/// Decode a variable byte integer at the start of `buf` without consuming it.
///
/// Returns `Ok(None)` while more bytes are needed, otherwise the value and the
/// number of bytes it occupies.
pub(crate) fn peek_variable_byte_int(buf: &[u8]) -> Result<Option<(u32, usize)>, PacketError> {
    let mut multiplier: u32 = 1;
    let mut value: u32 = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if multiplier > 128 * 128 * 128 {
            return Err(PacketError::malformed("Malformed variable byte integer"));
        }

        value += u32::from(byte & 127) * multiplier;

        if byte & 128 == 0 {
            return Ok(Some((value, i + 1)));
        }

        multiplier *= 128;
    }

    Ok(None)
}

/// Encode a variable byte integer.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901011>
///
/// **Algorithm:**
///
/// ```text
/// do
///    encodedByte = X MOD 128
///    X = X DIV 128
///    // if there are more data to encode, set the top bit of this byte
///    if (X > 0)
///       encodedByte = encodedByte OR 128
///    endif
///    'output' encodedByte
/// while (X > 0)
/// ```
///
/// # Errors
/// - Returns `PacketError::InvalidArgument` if the value exceeds `MAX_VARIABLE_BYTE_INT`.
pub(crate) fn write_variable_byte_int(buf: &mut BytesMut, mut value: u32) -> Result<(), PacketError> {
    if value > MAX_VARIABLE_BYTE_INT {
        return Err(PacketError::invalid(format!(
            "Variable byte integer {value} exceeds maximum of {MAX_VARIABLE_BYTE_INT}"
        )));
    }

    for _ in 0..variable_byte_int_size(value) {
        // Extract the 7 least significant bits from the current value
        let mut encoded_byte = (value % 128) as u8;

        value /= 128;

        // If there are still remaining bits, mark this byte as continuation
        if value > 0 {
            encoded_byte |= 128;
        }

        buf.put_u8(encoded_byte);
    }

    Ok(())
}

/// Write a length as a variable byte integer, rejecting lengths that do not fit.
pub(crate) fn write_usize_as_var_int(buf: &mut BytesMut, value: usize) -> Result<(), PacketError> {
    let value = u32::try_from(value)
        .map_err(|_| PacketError::invalid(format!("Length {value} does not fit a variable byte integer")))?;

    write_variable_byte_int(buf, value)
}

/// Number of bytes `write_variable_byte_int` emits for `value`.
pub(crate) fn variable_byte_int_size(value: u32) -> usize {
    match value {
        0..=127 => 1,
        128..=16_383 => 2,
        16_384..=2_097_151 => 3,
        _ => 4,
    }
}

/// Decode a UTF-8 string.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010>
///
/// # Errors
/// - Returns `PacketError::MalformedPacket` if reading fails or the bytes are not valid UTF-8.
pub(crate) fn decode_utf8_string(buf: &mut Cursor<&[u8]>) -> Result<String, PacketError> {
    let len = decode_u16(buf)
        .map_err(|_| PacketError::malformed("Failed to read UTF-8 string length"))?
        as usize;

    if buf.remaining() < len {
        return Err(PacketError::malformed(format!(
            "UTF-8 string length {len} exceeds remaining {} bytes",
            buf.remaining()
        )));
    }

    let mut encoded_value = vec![0; len];
    buf.copy_to_slice(&mut encoded_value);

    String::from_utf8(encoded_value)
        .map_err(|_| PacketError::malformed("String is not valid UTF-8"))
}

/// Encode a UTF-8 string.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901010>
///
/// # Errors
/// - Returns `PacketError::MalformedPacket` if the encoded length exceeds `MAX_STRING_LENGTH`.
pub(crate) fn write_utf8_string(buf: &mut BytesMut, value: &str) -> Result<(), PacketError> {
    let len = value.len();
    if len > MAX_STRING_LENGTH {
        return Err(PacketError::malformed(format!(
            "String length {len} exceeds maximum allowed size of {MAX_STRING_LENGTH} bytes"
        )));
    }

    // Length prefix is big-endian
    buf.put_u16(len as u16);
    buf.put_slice(value.as_bytes());

    Ok(())
}

/// Encoded size of a UTF-8 string: 2-byte length followed by the bytes.
pub(crate) fn utf8_string_size(value: &str) -> usize {
    2 + value.len()
}

/// Decode binary data.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012>
///
/// # Errors
/// - Returns `PacketError::MalformedPacket` if reading fails.
pub(crate) fn decode_binary_data(buf: &mut Cursor<&[u8]>) -> Result<Bytes, PacketError> {
    let len = decode_u16(buf)
        .map_err(|_| PacketError::malformed("Failed to read binary data length"))?
        as usize;

    if buf.remaining() < len {
        return Err(PacketError::malformed(format!(
            "Binary data length {len} exceeds remaining {} bytes",
            buf.remaining()
        )));
    }

    Ok(buf.copy_to_bytes(len))
}

/// Encode binary data.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901012>
///
/// # Errors
/// - Returns `PacketError::MalformedPacket` if the data is longer than `MAX_STRING_LENGTH`.
pub(crate) fn write_binary_data(buf: &mut BytesMut, value: &[u8]) -> Result<(), PacketError> {
    let len = value.len();
    if len > MAX_STRING_LENGTH {
        return Err(PacketError::malformed(format!(
            "Binary data length {len} exceeds maximum allowed size of {MAX_STRING_LENGTH} bytes"
        )));
    }

    buf.put_u16(len as u16);
    buf.put_slice(value);

    Ok(())
}

/// Encoded size of binary data: 2-byte length followed by the bytes.
pub(crate) fn binary_data_size(value: &[u8]) -> usize {
    2 + value.len()
}

/// Encode a UTF-8 String Pair.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901013>
pub(crate) fn write_utf8_string_pair(
    buf: &mut BytesMut,
    (name, value): (&str, &str),
) -> Result<(), PacketError> {
    write_utf8_string(buf, name)?;
    write_utf8_string(buf, value)
}

/// Decode a 1-byte unsigned integer.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901007>
pub(crate) fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, PacketError> {
    if buf.remaining() < 1 {
        return Err(PacketError::malformed("Failed to read u8"));
    }

    Ok(buf.get_u8())
}

/// Decode a 2-byte unsigned integer.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901008>
pub(crate) fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, PacketError> {
    if buf.remaining() < 2 {
        return Err(PacketError::malformed("Failed to read u16"));
    }

    Ok(buf.get_u16())
}

/// Decode a 4-byte unsigned integer.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901009>
pub(crate) fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, PacketError> {
    if buf.remaining() < 4 {
        return Err(PacketError::malformed("Failed to read u32"));
    }

    Ok(buf.get_u32())
}

/// Decode a packet identifier, which must be non-zero.
pub(crate) fn decode_packet_identifier(buf: &mut Cursor<&[u8]>) -> Result<u16, PacketError> {
    let packet_identifier = decode_u16(buf)
        .map_err(|_| PacketError::malformed("Failed to read packet identifier"))?;

    if packet_identifier == 0 {
        return Err(PacketError::malformed("Packet identifier must be non-zero"));
    }

    Ok(packet_identifier)
}
