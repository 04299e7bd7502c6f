use std::fmt;

use crate::{constants::*, error::PacketError};

/// Represents the MQTT Control Packet Types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Connection request.
    /// Sent by: Client to Server.
    Connect = 0x01,

    /// Connect acknowledgment.
    /// Sent by: Server to Client.
    ConnAck = 0x02,

    /// Publish message.
    /// Sent by: Client to Server or Server to Client.
    Publish = 0x03,

    /// Publish acknowledgment (`QoS` 1).
    /// Sent by: Client to Server or Server to Client.
    PubAck = 0x04,

    /// Publish received (`QoS` 2 delivery part 1).
    /// Sent by: Client to Server or Server to Client.
    PubRec = 0x05,

    /// Publish release (`QoS` 2 delivery part 2).
    /// Sent by: Client to Server or Server to Client.
    PubRel = 0x06,

    /// Publish complete (`QoS` 2 delivery part 3).
    /// Sent by: Client to Server or Server to Client.
    PubComp = 0x07,

    /// Subscribe request.
    /// Sent by: Client to Server.
    Subscribe = 0x08,

    /// Subscribe acknowledgment.
    /// Sent by: Server to Client.
    SubAck = 0x09,

    /// Unsubscribe request.
    /// Sent by: Client to Server.
    Unsubscribe = 0x0A,

    /// Unsubscribe acknowledgment.
    /// Sent by: Server to Client.
    UnsubAck = 0x0B,

    /// PING request.
    /// Sent by: Client to Server.
    PingReq = 0x0C,

    /// PING response.
    /// Sent by: Server to Client.
    PingResp = 0x0D,

    /// Disconnect notification.
    /// Sent by: Client to Server or Server to Client.
    Disconnect = 0x0E,

    /// Authentication exchange.
    /// Sent by: Client to Server or Server to Client.
    Auth = 0x0F,
}

impl PacketType {
    /// Converts a 4-bit packet type code to a `PacketType`.
    ///
    /// Returns `None` if the value does not match a known type.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            CONNECT_IDENTIFIER => Some(Self::Connect),
            CONNACK_IDENTIFIER => Some(Self::ConnAck),
            PUBLISH_IDENTIFIER => Some(Self::Publish),
            PUBACK_IDENTIFIER => Some(Self::PubAck),
            PUBREC_IDENTIFIER => Some(Self::PubRec),
            PUBREL_IDENTIFIER => Some(Self::PubRel),
            PUBCOMP_IDENTIFIER => Some(Self::PubComp),
            SUBSCRIBE_IDENTIFIER => Some(Self::Subscribe),
            SUBACK_IDENTIFIER => Some(Self::SubAck),
            UNSUBSCRIBE_IDENTIFIER => Some(Self::Unsubscribe),
            UNSUBACK_IDENTIFIER => Some(Self::UnsubAck),
            PINGREQ_IDENTIFIER => Some(Self::PingReq),
            PINGRESP_IDENTIFIER => Some(Self::PingResp),
            DISCONNECT_IDENTIFIER => Some(Self::Disconnect),
            AUTH_IDENTIFIER => Some(Self::Auth),
            _ => None,
        }
    }

    /// Extracts the packet type from the first byte of a fixed header.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if the 4 most significant bits are not a known type.
    pub fn from_fixed_header(fixed_header: u8) -> Result<Self, PacketError> {
        let packet_type = fixed_header >> 4;
        Self::from_u8(packet_type)
            .ok_or_else(|| PacketError::malformed(format!("Invalid packet type: {packet_type}")))
    }

    /// Converts the `PacketType` to its numeric value.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The reserved flags a packet of this type must carry, or `None` for
    /// `Publish` whose flags hold DUP, `QoS` and RETAIN.
    pub fn fixed_flags(self) -> Option<u8> {
        match self {
            // For these packets, the 4 LSB are reserved and must be: 0010
            Self::PubRel | Self::Subscribe | Self::Unsubscribe => Some(0b0000_0010),
            Self::Publish => None,
            // For every other packet, the 4 LSB are reserved and must be: 0000
            _ => Some(0b0000_0000),
        }
    }

    /// Computes the control byte for the MQTT fixed header.
    ///
    /// The control byte is the first byte of the MQTT fixed header, consisting of:
    /// - The packet type (4 most significant bits)
    /// - Packet flags (4 least significant bits)
    ///
    /// # Fixed Header Format
    ///
    /// | Bit       | 7   | 6   | 5   | 4   | 3   | 2   | 1   | 0   |
    /// |-----------|-----|-----|-----|-----|-----|-----|-----|-----|
    /// | Byte 1    | Packet type           | Packet flags          |
    /// | Byte 2    | Remaining Length                              |
    ///
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if `flags` does not fit in 4 bits, or if the
    ///   type has reserved flags and `flags` differs from them.
    pub fn control_byte(self, flags: u8) -> Result<u8, PacketError> {
        if flags >= 16 {
            return Err(PacketError::invalid(format!("Flags {flags:#06b} do not fit in 4 bits")));
        }

        if let Some(fixed) = self.fixed_flags() {
            if flags != fixed {
                return Err(PacketError::invalid(format!(
                    "{self} flags must be {fixed:#06b}, got {flags:#06b}"
                )));
            }
        }

        Ok(self.to_u8() << 4 | flags)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Connect => "CONNECT",
            Self::ConnAck => "CONNACK",
            Self::Publish => "PUBLISH",
            Self::PubAck => "PUBACK",
            Self::PubRec => "PUBREC",
            Self::PubRel => "PUBREL",
            Self::PubComp => "PUBCOMP",
            Self::Subscribe => "SUBSCRIBE",
            Self::SubAck => "SUBACK",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::UnsubAck => "UNSUBACK",
            Self::PingReq => "PINGREQ",
            Self::PingResp => "PINGRESP",
            Self::Disconnect => "DISCONNECT",
            Self::Auth => "AUTH",
        };

        write!(f, "{value}")
    }
}
