/// Protocol name carried in the CONNECT variable header.
pub const PROTOCOL_NAME: &str = "MQTT";

/// Protocol level for MQTT v5.
pub const PROTOCOL_VERSION: u8 = 5;

/// Largest remaining length a fixed header can announce.
pub const MAX_PACKET_SIZE: usize = 268_435_455;

/// Maximum length of a UTF-8 encoded string or binary data.
pub const MAX_STRING_LENGTH: usize = 65_535;

/// Largest value a variable byte integer can represent.
pub const MAX_VARIABLE_BYTE_INT: u32 = 268_435_455;

/// Keep alive, in seconds, of a freshly built CONNECT.
pub const DEFAULT_KEEP_ALIVE: u16 = 60;

/// Initial capacity of the packet reader buffer.
pub(crate) const READ_BUFFER_CAPACITY: usize = 4096;

/// Low nibble of the control byte.
pub(crate) const FIXED_HEADER_FLAGS_MASK: u8 = 0b0000_1111;

// Control packet type codes, the high nibble of the control byte.
pub(crate) const CONNECT_IDENTIFIER: u8 = 0x01;
pub(crate) const CONNACK_IDENTIFIER: u8 = 0x02;
pub(crate) const PUBLISH_IDENTIFIER: u8 = 0x03;
pub(crate) const PUBACK_IDENTIFIER: u8 = 0x04;
pub(crate) const PUBREC_IDENTIFIER: u8 = 0x05;
pub(crate) const PUBREL_IDENTIFIER: u8 = 0x06;
pub(crate) const PUBCOMP_IDENTIFIER: u8 = 0x07;
pub(crate) const SUBSCRIBE_IDENTIFIER: u8 = 0x08;
pub(crate) const SUBACK_IDENTIFIER: u8 = 0x09;
pub(crate) const UNSUBSCRIBE_IDENTIFIER: u8 = 0x0A;
pub(crate) const UNSUBACK_IDENTIFIER: u8 = 0x0B;
pub(crate) const PINGREQ_IDENTIFIER: u8 = 0x0C;
pub(crate) const PINGRESP_IDENTIFIER: u8 = 0x0D;
pub(crate) const DISCONNECT_IDENTIFIER: u8 = 0x0E;
pub(crate) const AUTH_IDENTIFIER: u8 = 0x0F;
