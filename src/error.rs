use std::{error::Error, fmt};

/// Errors raised by the packet codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Bytes received from the network violate the wire format.
    MalformedPacket(String),

    /// A packet value was built with arguments that break its invariants.
    InvalidArgument(String),

    /// A frame announces more bytes than the reader accepts.
    PacketTooLarge { size: usize, maximum: usize },
}

impl PacketError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPacket(reason.into())
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPacket(reason) => write!(f, "Malformed Packet: {reason}"),
            Self::InvalidArgument(reason) => write!(f, "Invalid Argument: {reason}"),
            Self::PacketTooLarge { size, maximum } => {
                write!(f, "Packet Too Large: {size} bytes exceeds maximum of {maximum}")
            }
        }
    }
}

impl Error for PacketError {}

/// Errors raised by a [`SessionStore`](crate::session::SessionStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// No in-flight packet is stored under this packet identifier.
    NoSuchElement(u16),

    /// The packet handed to the store cannot be tracked.
    InvalidArgument(String),
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchElement(packet_identifier) => {
                write!(f, "No Such Element: no in-flight packet with identifier {packet_identifier}")
            }
            Self::InvalidArgument(reason) => write!(f, "Invalid Argument: {reason}"),
        }
    }
}

impl Error for SessionStoreError {}
