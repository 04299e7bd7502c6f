use std::io::Cursor;

use bytes::{Buf, BufMut, BytesMut};
use log::trace;

use crate::{
    codec::{decode_packet_identifier, decode_u8},
    error::PacketError,
    protocol::{
        packet_type::PacketType,
        property::{
            Properties, Property, UserProperty, REASON_STRING_IDENTIFIER, USER_PROPERTY_IDENTIFIER,
        },
        reason_code::{
            decode_reason_code, ensure_reason_code, ReasonCode, PUBLISH_RELEASE_REASON_CODES,
            PUBLISH_RESPONSE_REASON_CODES,
        },
    },
};

use super::{ControlPacket, DecodablePacket, EncodablePacket};

const ACK_PROPERTIES: &[u8] = &[REASON_STRING_IDENTIFIER, USER_PROPERTY_IDENTIFIER];

/// Reason String and User Properties, the only properties an acknowledgement carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckProperties {
    /// Human readable string designed for diagnostics.
    pub reason_string: Option<String>,

    pub user_properties: Vec<UserProperty>,
}

impl AckProperties {
    pub fn is_empty(&self) -> bool {
        self.reason_string.is_none() && self.user_properties.is_empty()
    }

    pub(crate) fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.push_some(self.reason_string.clone().map(Property::ReasonString));
        properties.extend_user_properties(&self.user_properties);

        properties
    }

    pub(crate) fn from_properties(
        properties: &Properties,
        packet_type: PacketType,
    ) -> Result<Self, PacketError> {
        properties.ensure_allowed(packet_type, ACK_PROPERTIES)?;

        Ok(Self {
            reason_string: properties.string_value(REASON_STRING_IDENTIFIER)?,
            user_properties: properties.user_properties(),
        })
    }
}

/// Writes the packet identifier, then the reason code and properties unless the
/// acknowledgement is a plain success.
fn encode_ack(
    buf: &mut BytesMut,
    packet_identifier: u16,
    reason_code: ReasonCode,
    properties: &AckProperties,
) -> Result<(), PacketError> {
    buf.put_u16(packet_identifier);

    if reason_code == ReasonCode::Success && properties.is_empty() {
        return Ok(());
    }

    buf.put_u8(reason_code.code());
    properties.to_properties().write(buf)
}

/// Reads an acknowledgement body in its 2 byte, 3 byte or full form.
fn decode_ack(
    cursor: &mut Cursor<&[u8]>,
    packet_type: PacketType,
    allowed: &[ReasonCode],
) -> Result<(u16, ReasonCode, AckProperties), PacketError> {
    let packet_identifier = decode_packet_identifier(cursor)?;
    trace!("{packet_type} packet_identifier: {packet_identifier}");

    if !cursor.has_remaining() {
        return Ok((packet_identifier, ReasonCode::Success, AckProperties::default()));
    }

    let reason_code = decode_reason_code(decode_u8(cursor)?, ReasonCode::Success, packet_type, allowed)?;

    if !cursor.has_remaining() {
        return Ok((packet_identifier, reason_code, AckProperties::default()));
    }

    let properties = AckProperties::from_properties(&Properties::decode(cursor)?, packet_type)?;

    Ok((packet_identifier, reason_code, properties))
}

macro_rules! ack_packet {
    ($(#[$doc:meta])* $name:ident, $packet_type:expr, $reason_codes:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            packet_identifier: u16,
            reason_code: ReasonCode,
            properties: AckProperties,
        }

        impl $name {
            /// A successful acknowledgement without properties.
            ///
            /// # Errors
            /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0.
            pub fn new(packet_identifier: u16) -> Result<Self, PacketError> {
                Self::with_reason(packet_identifier, ReasonCode::Success, AckProperties::default())
            }

            /// # Errors
            /// - Returns `PacketError::InvalidArgument` if `packet_identifier` is 0 or the
            ///   reason code is not valid for this packet type.
            pub fn with_reason(
                packet_identifier: u16,
                reason_code: ReasonCode,
                properties: AckProperties,
            ) -> Result<Self, PacketError> {
                if packet_identifier == 0 {
                    return Err(PacketError::invalid("Packet identifier must be non-zero"));
                }
                ensure_reason_code(reason_code, $packet_type, $reason_codes)?;

                Ok(Self { packet_identifier, reason_code, properties })
            }

            pub fn packet_identifier(&self) -> u16 {
                self.packet_identifier
            }

            pub fn reason_code(&self) -> ReasonCode {
                self.reason_code
            }

            pub fn properties(&self) -> &AckProperties {
                &self.properties
            }
        }

        impl ControlPacket for $name {
            const PACKET_TYPE: PacketType = $packet_type;
        }

        impl EncodablePacket for $name {
            fn encode_body(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
                encode_ack(buf, self.packet_identifier, self.reason_code, &self.properties)
            }
        }

        impl DecodablePacket for $name {
            fn decode(cursor: &mut Cursor<&[u8]>, _flags: u8) -> Result<Self, PacketError> {
                let (packet_identifier, reason_code, properties) =
                    decode_ack(cursor, $packet_type, $reason_codes)?;

                Ok(Self { packet_identifier, reason_code, properties })
            }
        }
    };
}

ack_packet!(
    /// Response to a `QoS` 1 PUBLISH.
    PubAckPacket,
    PacketType::PubAck,
    PUBLISH_RESPONSE_REASON_CODES
);

ack_packet!(
    /// First response to a `QoS` 2 PUBLISH.
    PubRecPacket,
    PacketType::PubRec,
    PUBLISH_RESPONSE_REASON_CODES
);

ack_packet!(
    /// Response to a PUBREC, releasing the `QoS` 2 message. Fixed header flags are 0010.
    PubRelPacket,
    PacketType::PubRel,
    PUBLISH_RELEASE_REASON_CODES
);

ack_packet!(
    /// Response to a PUBREL, completing the `QoS` 2 exchange.
    PubCompPacket,
    PacketType::PubComp,
    PUBLISH_RELEASE_REASON_CODES
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_properties_is_compact() {
        let packet = PubAckPacket::new(0x1234).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x12, 0x34]);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(PubAckPacket::decode(&mut cursor, 0).unwrap(), packet);
    }

    #[test]
    fn reason_code_forces_full_form() {
        let packet =
            PubRecPacket::with_reason(7, ReasonCode::QuotaExceeded, AckProperties::default()).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x07, 0x97, 0x00]);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(PubRecPacket::decode(&mut cursor, 0).unwrap(), packet);
    }

    #[test]
    fn reason_only_form_is_accepted() {
        let mut cursor = Cursor::new(&[0x00, 0x07, 0x92][..]);
        let packet = PubCompPacket::decode(&mut cursor, 0).unwrap();

        assert_eq!(packet.packet_identifier(), 7);
        assert_eq!(packet.reason_code(), ReasonCode::PacketIdentifierNotFound);
        assert!(packet.properties().is_empty());
    }

    #[test]
    fn properties_force_full_form() {
        let properties = AckProperties {
            reason_string: Some("done".to_string()),
            user_properties: vec![UserProperty::new("k", "v")],
        };
        let packet = PubRelPacket::with_reason(3, ReasonCode::Success, properties).unwrap();

        let mut buf = BytesMut::new();
        packet.encode_body(&mut buf).unwrap();
        assert_eq!(buf[2], 0x00);

        let mut cursor = Cursor::new(&buf[..]);
        assert_eq!(PubRelPacket::decode(&mut cursor, 2).unwrap(), packet);
    }

    #[test]
    fn pubrel_carries_fixed_flags() {
        assert_eq!(PubRelPacket::new(1).unwrap().flags(), 0b0010);
        assert_eq!(PubAckPacket::new(1).unwrap().flags(), 0);
    }

    #[test]
    fn zero_packet_identifier_is_rejected() {
        assert!(matches!(PubAckPacket::new(0), Err(PacketError::InvalidArgument(_))));

        let mut cursor = Cursor::new(&[0x00, 0x00][..]);
        assert!(matches!(
            PubAckPacket::decode(&mut cursor, 0),
            Err(PacketError::MalformedPacket(_))
        ));
    }

    #[test]
    fn reason_codes_are_checked_per_type() {
        assert!(PubRelPacket::with_reason(1, ReasonCode::QuotaExceeded, AckProperties::default())
            .is_err());
        assert!(PubAckPacket::with_reason(
            1,
            ReasonCode::PacketIdentifierNotFound,
            AckProperties::default()
        )
        .is_err());

        let mut cursor = Cursor::new(&[0x00, 0x01, 0x10][..]);
        assert!(PubCompPacket::decode(&mut cursor, 0).is_err());
    }

    #[test]
    fn foreign_property_is_malformed() {
        // Topic Alias inside a PUBACK property block.
        let mut cursor = Cursor::new(&[0x00, 0x01, 0x00, 0x03, 0x23, 0x00, 0x01][..]);
        assert!(PubAckPacket::decode(&mut cursor, 0).is_err());
    }
}
