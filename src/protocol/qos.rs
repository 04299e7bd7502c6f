use std::fmt;

use crate::error::PacketError;

/// Quality of Service levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum QoS {
    /// Fire and forget.
    #[default]
    AtMostOnce = 0,

    /// Acknowledged delivery, duplicates possible.
    AtLeastOnce = 1,

    /// Assured delivery through the four packet handshake.
    ExactlyOnce = 2,
}

impl QoS {
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` for values 3 and above.
    pub fn from_u8(value: u8) -> Result<Self, PacketError> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            _ => Err(PacketError::malformed(format!("Invalid QoS: {value}"))),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QoS {}", self.to_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(QoS::from_u8(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::from_u8(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(QoS::from_u8(2).unwrap(), QoS::ExactlyOnce);
        assert!(QoS::from_u8(3).is_err());
    }

    #[test]
    fn orders_by_level() {
        assert!(QoS::AtMostOnce < QoS::AtLeastOnce);
        assert!(QoS::AtLeastOnce < QoS::ExactlyOnce);
    }
}
