use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::trace;

use crate::{
    codec::{
        binary_data_size, decode_binary_data, decode_u16, decode_u32, decode_u8,
        decode_utf8_string, decode_variable_byte_int, utf8_string_size, variable_byte_int_size,
        write_binary_data, write_usize_as_var_int, write_utf8_string, write_utf8_string_pair,
        write_variable_byte_int,
    },
    constants::MAX_VARIABLE_BYTE_INT,
    error::PacketError,
    protocol::packet_type::PacketType,
};

pub const PAYLOAD_FORMAT_INDICATOR_IDENTIFIER: u8 = 0x01;
pub const MESSAGE_EXPIRY_INTERVAL_IDENTIFIER: u8 = 0x02;
pub const CONTENT_TYPE_IDENTIFIER: u8 = 0x03;
pub const RESPONSE_TOPIC_IDENTIFIER: u8 = 0x08;
pub const CORRELATION_DATA_IDENTIFIER: u8 = 0x09;
pub const SUBSCRIPTION_IDENTIFIER: u8 = 0x0B;
pub const SESSION_EXPIRY_INTERVAL_IDENTIFIER: u8 = 0x11;
pub const ASSIGNED_CLIENT_IDENTIFIER: u8 = 0x12;
pub const SERVER_KEEP_ALIVE_IDENTIFIER: u8 = 0x13;
pub const AUTHENTICATION_METHOD_IDENTIFIER: u8 = 0x15;
pub const AUTHENTICATION_DATA_IDENTIFIER: u8 = 0x16;
pub const REQUEST_PROBLEM_INFORMATION_IDENTIFIER: u8 = 0x17;
pub const WILL_DELAY_INTERVAL_IDENTIFIER: u8 = 0x18;
pub const REQUEST_RESPONSE_INFORMATION_IDENTIFIER: u8 = 0x19;
pub const RESPONSE_INFORMATION_IDENTIFIER: u8 = 0x1A;
pub const SERVER_REFERENCE_IDENTIFIER: u8 = 0x1C;
pub const REASON_STRING_IDENTIFIER: u8 = 0x1F;
pub const RECEIVE_MAXIMUM_IDENTIFIER: u8 = 0x21;
pub const TOPIC_ALIAS_MAXIMUM_IDENTIFIER: u8 = 0x22;
pub const TOPIC_ALIAS_IDENTIFIER: u8 = 0x23;
pub const MAXIMUM_QOS_IDENTIFIER: u8 = 0x24;
pub const RETAIN_AVAILABLE_IDENTIFIER: u8 = 0x25;
pub const USER_PROPERTY_IDENTIFIER: u8 = 0x26;
pub const MAXIMUM_PACKET_SIZE_IDENTIFIER: u8 = 0x27;
pub const WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER: u8 = 0x28;
pub const SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER: u8 = 0x29;
pub const SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER: u8 = 0x2A;

/// A name/value pair carried by the User Property. The same name may appear more than once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserProperty {
    pub name: String,
    pub value: String,
}

impl UserProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// A single MQTT v5 property.
///
/// Reference: <https://docs.oasis-open.org/mqtt/mqtt/v5.0/os/mqtt-v5.0-os.html#_Toc3901027>
///
/// Each variant has one fixed identifier and one fixed wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    PayloadFormatIndicator(u8),
    MessageExpiryInterval(u32),
    ContentType(String),
    ResponseTopic(String),
    CorrelationData(Bytes),
    SubscriptionIdentifier(u32),
    SessionExpiryInterval(u32),
    AssignedClientIdentifier(String),
    ServerKeepAlive(u16),
    AuthenticationMethod(String),
    AuthenticationData(Bytes),
    RequestProblemInformation(u8),
    WillDelayInterval(u32),
    RequestResponseInformation(u8),
    ResponseInformation(String),
    ServerReference(String),
    ReasonString(String),
    ReceiveMaximum(u16),
    TopicAliasMaximum(u16),
    TopicAlias(u16),
    MaximumQoS(u8),
    RetainAvailable(u8),
    UserProperty(UserProperty),
    MaximumPacketSize(u32),
    WildcardSubscriptionAvailable(u8),
    SubscriptionIdentifiersAvailable(u8),
    SharedSubscriptionAvailable(u8),
}

impl Property {
    /// The identifier byte written before the value.
    pub fn identifier(&self) -> u8 {
        match self {
            Self::PayloadFormatIndicator(_) => PAYLOAD_FORMAT_INDICATOR_IDENTIFIER,
            Self::MessageExpiryInterval(_) => MESSAGE_EXPIRY_INTERVAL_IDENTIFIER,
            Self::ContentType(_) => CONTENT_TYPE_IDENTIFIER,
            Self::ResponseTopic(_) => RESPONSE_TOPIC_IDENTIFIER,
            Self::CorrelationData(_) => CORRELATION_DATA_IDENTIFIER,
            Self::SubscriptionIdentifier(_) => SUBSCRIPTION_IDENTIFIER,
            Self::SessionExpiryInterval(_) => SESSION_EXPIRY_INTERVAL_IDENTIFIER,
            Self::AssignedClientIdentifier(_) => ASSIGNED_CLIENT_IDENTIFIER,
            Self::ServerKeepAlive(_) => SERVER_KEEP_ALIVE_IDENTIFIER,
            Self::AuthenticationMethod(_) => AUTHENTICATION_METHOD_IDENTIFIER,
            Self::AuthenticationData(_) => AUTHENTICATION_DATA_IDENTIFIER,
            Self::RequestProblemInformation(_) => REQUEST_PROBLEM_INFORMATION_IDENTIFIER,
            Self::WillDelayInterval(_) => WILL_DELAY_INTERVAL_IDENTIFIER,
            Self::RequestResponseInformation(_) => REQUEST_RESPONSE_INFORMATION_IDENTIFIER,
            Self::ResponseInformation(_) => RESPONSE_INFORMATION_IDENTIFIER,
            Self::ServerReference(_) => SERVER_REFERENCE_IDENTIFIER,
            Self::ReasonString(_) => REASON_STRING_IDENTIFIER,
            Self::ReceiveMaximum(_) => RECEIVE_MAXIMUM_IDENTIFIER,
            Self::TopicAliasMaximum(_) => TOPIC_ALIAS_MAXIMUM_IDENTIFIER,
            Self::TopicAlias(_) => TOPIC_ALIAS_IDENTIFIER,
            Self::MaximumQoS(_) => MAXIMUM_QOS_IDENTIFIER,
            Self::RetainAvailable(_) => RETAIN_AVAILABLE_IDENTIFIER,
            Self::UserProperty(_) => USER_PROPERTY_IDENTIFIER,
            Self::MaximumPacketSize(_) => MAXIMUM_PACKET_SIZE_IDENTIFIER,
            Self::WildcardSubscriptionAvailable(_) => WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER,
            Self::SubscriptionIdentifiersAvailable(_) => {
                SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER
            }
            Self::SharedSubscriptionAvailable(_) => SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER,
        }
    }

    pub fn name(&self) -> &'static str {
        property_name(self.identifier())
    }

    /// Number of bytes this property occupies: identifier byte plus value.
    pub fn encoded_len(&self) -> usize {
        let value_len = match self {
            Self::PayloadFormatIndicator(_)
            | Self::RequestProblemInformation(_)
            | Self::RequestResponseInformation(_)
            | Self::MaximumQoS(_)
            | Self::RetainAvailable(_)
            | Self::WildcardSubscriptionAvailable(_)
            | Self::SubscriptionIdentifiersAvailable(_)
            | Self::SharedSubscriptionAvailable(_) => 1,

            Self::ServerKeepAlive(_)
            | Self::ReceiveMaximum(_)
            | Self::TopicAliasMaximum(_)
            | Self::TopicAlias(_) => 2,

            Self::MessageExpiryInterval(_)
            | Self::SessionExpiryInterval(_)
            | Self::WillDelayInterval(_)
            | Self::MaximumPacketSize(_) => 4,

            Self::SubscriptionIdentifier(value) => variable_byte_int_size(*value),

            Self::ContentType(value)
            | Self::ResponseTopic(value)
            | Self::AssignedClientIdentifier(value)
            | Self::AuthenticationMethod(value)
            | Self::ResponseInformation(value)
            | Self::ServerReference(value)
            | Self::ReasonString(value) => utf8_string_size(value),

            Self::CorrelationData(value) | Self::AuthenticationData(value) => {
                binary_data_size(value)
            }

            Self::UserProperty(pair) => utf8_string_size(&pair.name) + utf8_string_size(&pair.value),
        };

        1 + value_len
    }

    /// Writes the identifier byte followed by the value.
    pub(crate) fn write(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        buf.put_u8(self.identifier());

        match self {
            Self::PayloadFormatIndicator(value)
            | Self::RequestProblemInformation(value)
            | Self::RequestResponseInformation(value)
            | Self::MaximumQoS(value)
            | Self::RetainAvailable(value)
            | Self::WildcardSubscriptionAvailable(value)
            | Self::SubscriptionIdentifiersAvailable(value)
            | Self::SharedSubscriptionAvailable(value) => buf.put_u8(*value),

            Self::ServerKeepAlive(value)
            | Self::ReceiveMaximum(value)
            | Self::TopicAliasMaximum(value)
            | Self::TopicAlias(value) => buf.put_u16(*value),

            Self::MessageExpiryInterval(value)
            | Self::SessionExpiryInterval(value)
            | Self::WillDelayInterval(value)
            | Self::MaximumPacketSize(value) => buf.put_u32(*value),

            Self::SubscriptionIdentifier(value) => {
                if *value == 0 {
                    return Err(PacketError::invalid("Subscription identifier must be non-zero"));
                }
                write_variable_byte_int(buf, *value)?;
            }

            Self::ContentType(value)
            | Self::ResponseTopic(value)
            | Self::AssignedClientIdentifier(value)
            | Self::AuthenticationMethod(value)
            | Self::ResponseInformation(value)
            | Self::ServerReference(value)
            | Self::ReasonString(value) => write_utf8_string(buf, value)?,

            Self::CorrelationData(value) | Self::AuthenticationData(value) => {
                write_binary_data(buf, value)?
            }

            Self::UserProperty(pair) => write_utf8_string_pair(buf, (&pair.name, &pair.value))?,
        }

        Ok(())
    }

    /// Reads one identifier byte and its value.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` for unknown identifiers or truncated values.
    pub(crate) fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self, PacketError> {
        let identifier = decode_u8(cursor)
            .map_err(|_| PacketError::malformed("Failed to read property identifier"))?;

        let property = match identifier {
            PAYLOAD_FORMAT_INDICATOR_IDENTIFIER => Self::PayloadFormatIndicator(decode_u8(cursor)?),
            MESSAGE_EXPIRY_INTERVAL_IDENTIFIER => Self::MessageExpiryInterval(decode_u32(cursor)?),
            CONTENT_TYPE_IDENTIFIER => Self::ContentType(decode_utf8_string(cursor)?),
            RESPONSE_TOPIC_IDENTIFIER => Self::ResponseTopic(decode_utf8_string(cursor)?),
            CORRELATION_DATA_IDENTIFIER => Self::CorrelationData(decode_binary_data(cursor)?),
            SUBSCRIPTION_IDENTIFIER => {
                let value = decode_variable_byte_int(cursor)?;
                if value == 0 {
                    return Err(PacketError::malformed("Subscription identifier must be non-zero"));
                }
                Self::SubscriptionIdentifier(value)
            }
            SESSION_EXPIRY_INTERVAL_IDENTIFIER => Self::SessionExpiryInterval(decode_u32(cursor)?),
            ASSIGNED_CLIENT_IDENTIFIER => {
                Self::AssignedClientIdentifier(decode_utf8_string(cursor)?)
            }
            SERVER_KEEP_ALIVE_IDENTIFIER => Self::ServerKeepAlive(decode_u16(cursor)?),
            AUTHENTICATION_METHOD_IDENTIFIER => {
                Self::AuthenticationMethod(decode_utf8_string(cursor)?)
            }
            AUTHENTICATION_DATA_IDENTIFIER => Self::AuthenticationData(decode_binary_data(cursor)?),
            REQUEST_PROBLEM_INFORMATION_IDENTIFIER => {
                Self::RequestProblemInformation(decode_u8(cursor)?)
            }
            WILL_DELAY_INTERVAL_IDENTIFIER => Self::WillDelayInterval(decode_u32(cursor)?),
            REQUEST_RESPONSE_INFORMATION_IDENTIFIER => {
                Self::RequestResponseInformation(decode_u8(cursor)?)
            }
            RESPONSE_INFORMATION_IDENTIFIER => {
                Self::ResponseInformation(decode_utf8_string(cursor)?)
            }
            SERVER_REFERENCE_IDENTIFIER => Self::ServerReference(decode_utf8_string(cursor)?),
            REASON_STRING_IDENTIFIER => Self::ReasonString(decode_utf8_string(cursor)?),
            RECEIVE_MAXIMUM_IDENTIFIER => Self::ReceiveMaximum(decode_u16(cursor)?),
            TOPIC_ALIAS_MAXIMUM_IDENTIFIER => Self::TopicAliasMaximum(decode_u16(cursor)?),
            TOPIC_ALIAS_IDENTIFIER => Self::TopicAlias(decode_u16(cursor)?),
            MAXIMUM_QOS_IDENTIFIER => Self::MaximumQoS(decode_u8(cursor)?),
            RETAIN_AVAILABLE_IDENTIFIER => Self::RetainAvailable(decode_u8(cursor)?),
            USER_PROPERTY_IDENTIFIER => {
                let name = decode_utf8_string(cursor)?;
                let value = decode_utf8_string(cursor)?;
                Self::UserProperty(UserProperty { name, value })
            }
            MAXIMUM_PACKET_SIZE_IDENTIFIER => Self::MaximumPacketSize(decode_u32(cursor)?),
            WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER => {
                Self::WildcardSubscriptionAvailable(decode_u8(cursor)?)
            }
            SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER => {
                Self::SubscriptionIdentifiersAvailable(decode_u8(cursor)?)
            }
            SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER => {
                Self::SharedSubscriptionAvailable(decode_u8(cursor)?)
            }
            _ => {
                return Err(PacketError::malformed(format!(
                    "Unknown property identifier: {identifier:#04x}"
                )));
            }
        };

        Ok(property)
    }
}

/// Human readable name of a property identifier.
pub fn property_name(identifier: u8) -> &'static str {
    match identifier {
        PAYLOAD_FORMAT_INDICATOR_IDENTIFIER => "Payload Format Indicator",
        MESSAGE_EXPIRY_INTERVAL_IDENTIFIER => "Message Expiry Interval",
        CONTENT_TYPE_IDENTIFIER => "Content Type",
        RESPONSE_TOPIC_IDENTIFIER => "Response Topic",
        CORRELATION_DATA_IDENTIFIER => "Correlation Data",
        SUBSCRIPTION_IDENTIFIER => "Subscription Identifier",
        SESSION_EXPIRY_INTERVAL_IDENTIFIER => "Session Expiry Interval",
        ASSIGNED_CLIENT_IDENTIFIER => "Assigned Client Identifier",
        SERVER_KEEP_ALIVE_IDENTIFIER => "Server Keep Alive",
        AUTHENTICATION_METHOD_IDENTIFIER => "Authentication Method",
        AUTHENTICATION_DATA_IDENTIFIER => "Authentication Data",
        REQUEST_PROBLEM_INFORMATION_IDENTIFIER => "Request Problem Information",
        WILL_DELAY_INTERVAL_IDENTIFIER => "Will Delay Interval",
        REQUEST_RESPONSE_INFORMATION_IDENTIFIER => "Request Response Information",
        RESPONSE_INFORMATION_IDENTIFIER => "Response Information",
        SERVER_REFERENCE_IDENTIFIER => "Server Reference",
        REASON_STRING_IDENTIFIER => "Reason String",
        RECEIVE_MAXIMUM_IDENTIFIER => "Receive Maximum",
        TOPIC_ALIAS_MAXIMUM_IDENTIFIER => "Topic Alias Maximum",
        TOPIC_ALIAS_IDENTIFIER => "Topic Alias",
        MAXIMUM_QOS_IDENTIFIER => "Maximum QoS",
        RETAIN_AVAILABLE_IDENTIFIER => "Retain Available",
        USER_PROPERTY_IDENTIFIER => "User Property",
        MAXIMUM_PACKET_SIZE_IDENTIFIER => "Maximum Packet Size",
        WILDCARD_SUBSCRIPTION_AVAILABLE_IDENTIFIER => "Wildcard Subscription Available",
        SUBSCRIPTION_IDENTIFIERS_AVAILABLE_IDENTIFIER => "Subscription Identifier Available",
        SHARED_SUBSCRIPTION_AVAILABLE_IDENTIFIER => "Shared Subscription Available",
        _ => "Unknown",
    }
}

/// An ordered property block, as written after a packet's variable header.
///
/// Encoded as the total byte length (variable byte integer) followed by each property in
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, property: Property) {
        self.0.push(property);
    }

    /// Pushes the property if present; absent properties are not written.
    pub fn push_some(&mut self, property: Option<Property>) {
        if let Some(property) = property {
            self.0.push(property);
        }
    }

    pub fn extend_user_properties(&mut self, user_properties: &[UserProperty]) {
        self.0.extend(user_properties.iter().cloned().map(Property::UserProperty));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.0.iter()
    }

    /// Sum of the encoded length of every property, excluding the block length prefix.
    pub fn encoded_len(&self) -> usize {
        self.0.iter().map(Property::encoded_len).sum()
    }

    /// Writes the block length followed by every property.
    pub(crate) fn write(&self, buf: &mut BytesMut) -> Result<(), PacketError> {
        let len = self.encoded_len();
        if len > MAX_VARIABLE_BYTE_INT as usize {
            return Err(PacketError::invalid(format!("Property block of {len} bytes is too large")));
        }

        write_usize_as_var_int(buf, len)?;
        for property in &self.0 {
            property.write(buf)?;
        }

        Ok(())
    }

    /// Reads the block length and exactly that many bytes of properties.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if the block is truncated, a property overruns the
    ///   declared length, or an identifier is unknown.
    pub(crate) fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self, PacketError> {
        let len = decode_variable_byte_int(cursor)? as usize;
        trace!("properties_len: {len}");

        if cursor.remaining() < len {
            return Err(PacketError::malformed(format!(
                "Property length {len} exceeds remaining {} bytes",
                cursor.remaining()
            )));
        }

        let start = cursor.position() as usize;
        let block = &cursor.get_ref()[start..start + len];
        let mut block_cursor = Cursor::new(block);

        let mut properties = Vec::new();
        while block_cursor.has_remaining() {
            properties.push(Property::decode(&mut block_cursor)?);
        }

        cursor.advance(len);

        Ok(Self(properties))
    }

    /// Every property with the given identifier, in wire order.
    pub fn all(&self, identifier: u8) -> impl Iterator<Item = &Property> {
        self.0.iter().filter(move |property| property.identifier() == identifier)
    }

    /// The property that must appear exactly once.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if it is absent or repeated.
    pub fn single(&self, identifier: u8) -> Result<&Property, PacketError> {
        self.single_or_none(identifier)?.ok_or_else(|| {
            PacketError::malformed(format!("Missing required property: {}", property_name(identifier)))
        })
    }

    /// The property that may appear at most once.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if it is repeated.
    pub fn single_or_none(&self, identifier: u8) -> Result<Option<&Property>, PacketError> {
        let mut matches = self.all(identifier);
        let first = matches.next();

        if matches.next().is_some() {
            return Err(PacketError::malformed(format!(
                "Property {} must not appear more than once",
                property_name(identifier)
            )));
        }

        Ok(first)
    }

    /// Rejects properties `packet_type` does not permit.
    pub(crate) fn ensure_allowed(
        &self,
        packet_type: PacketType,
        allowed: &[u8],
    ) -> Result<(), PacketError> {
        match self.0.iter().find(|property| !allowed.contains(&property.identifier())) {
            Some(property) => Err(PacketError::malformed(format!(
                "Property {} is not allowed in {packet_type}",
                property.name()
            ))),
            None => Ok(()),
        }
    }

    pub fn user_properties(&self) -> Vec<UserProperty> {
        self.all(USER_PROPERTY_IDENTIFIER)
            .filter_map(|property| match property {
                Property::UserProperty(pair) => Some(pair.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn u8_value(&self, identifier: u8) -> Result<Option<u8>, PacketError> {
        self.single_or_none(identifier)?
            .map(|property| match property {
                Property::PayloadFormatIndicator(value)
                | Property::RequestProblemInformation(value)
                | Property::RequestResponseInformation(value)
                | Property::MaximumQoS(value)
                | Property::RetainAvailable(value)
                | Property::WildcardSubscriptionAvailable(value)
                | Property::SubscriptionIdentifiersAvailable(value)
                | Property::SharedSubscriptionAvailable(value) => Ok(*value),
                other => Err(type_mismatch(other, "byte")),
            })
            .transpose()
    }

    /// A byte property restricted to 0 or 1.
    pub(crate) fn bool_value(&self, identifier: u8) -> Result<Option<bool>, PacketError> {
        self.u8_value(identifier)?
            .map(|value| match value {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(PacketError::malformed(format!(
                    "Property {} must be 0 or 1, got {value}",
                    property_name(identifier)
                ))),
            })
            .transpose()
    }

    pub(crate) fn u16_value(&self, identifier: u8) -> Result<Option<u16>, PacketError> {
        self.single_or_none(identifier)?
            .map(|property| match property {
                Property::ServerKeepAlive(value)
                | Property::ReceiveMaximum(value)
                | Property::TopicAliasMaximum(value)
                | Property::TopicAlias(value) => Ok(*value),
                other => Err(type_mismatch(other, "two byte integer")),
            })
            .transpose()
    }

    pub(crate) fn u32_value(&self, identifier: u8) -> Result<Option<u32>, PacketError> {
        self.single_or_none(identifier)?
            .map(|property| match property {
                Property::MessageExpiryInterval(value)
                | Property::SessionExpiryInterval(value)
                | Property::WillDelayInterval(value)
                | Property::MaximumPacketSize(value)
                | Property::SubscriptionIdentifier(value) => Ok(*value),
                other => Err(type_mismatch(other, "four byte integer")),
            })
            .transpose()
    }

    pub(crate) fn string_value(&self, identifier: u8) -> Result<Option<String>, PacketError> {
        self.single_or_none(identifier)?
            .map(|property| match property {
                Property::ContentType(value)
                | Property::ResponseTopic(value)
                | Property::AssignedClientIdentifier(value)
                | Property::AuthenticationMethod(value)
                | Property::ResponseInformation(value)
                | Property::ServerReference(value)
                | Property::ReasonString(value) => Ok(value.clone()),
                other => Err(type_mismatch(other, "UTF-8 string")),
            })
            .transpose()
    }

    pub(crate) fn binary_value(&self, identifier: u8) -> Result<Option<Bytes>, PacketError> {
        self.single_or_none(identifier)?
            .map(|property| match property {
                Property::CorrelationData(value) | Property::AuthenticationData(value) => {
                    Ok(value.clone())
                }
                other => Err(type_mismatch(other, "binary data")),
            })
            .transpose()
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn type_mismatch(property: &Property, expected: &str) -> PacketError {
    PacketError::malformed(format!("Property {} is not a {expected}", property.name()))
}

/// Bytes needed to write `properties`, including the block length prefix.
pub(crate) fn properties_size(properties: &Properties) -> usize {
    let len = properties.encoded_len();
    variable_byte_int_size(u32::try_from(len).unwrap_or(u32::MAX)) + len
}
