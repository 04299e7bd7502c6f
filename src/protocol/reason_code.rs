use std::fmt;

use crate::{error::PacketError, protocol::packet_type::PacketType};

/// MQTT v5 Reason Codes.
///
/// The numeric code 0 is shared by `Success`, `NormalDisconnection` and `GrantedQoS0`; which
/// one a zero byte means depends on the packet it was read from, so decoding takes the
/// zero-code meaning from the caller. Every other code maps to exactly one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    /// The operation completed.
    Success,

    /// Close the connection normally. Do not send the Will Message.
    NormalDisconnection,

    /// The subscription is accepted and the maximum `QoS` sent will be `QoS` 0.
    GrantedQoS0,

    /// The subscription is accepted and the maximum `QoS` sent will be `QoS` 1.
    GrantedQoS1,

    /// The subscription is accepted and any received `QoS` will be sent to this subscription.
    GrantedQoS2,

    /// The Client wishes to disconnect but requires that the Server also publishes its Will Message.
    DisconnectWithWillMessage,

    /// The message is accepted but there are no subscribers.
    NoMatchingSubscribers,

    /// No matching Topic Filter is being used by the Client.
    NoSubscriptionExisted,

    /// Continue the authentication with another step.
    ContinueAuthentication,

    /// Initiate a re-authentication.
    ReAuthenticate,

    /// The sender does not wish to reveal the reason, or none of the other Reason Codes apply.
    UnspecifiedError,

    /// The received packet does not conform to the MQTT protocol.
    MalformedPacket,

    /// An unexpected or out of order packet was received.
    ProtocolError,

    /// The packet received is valid but cannot be processed by this implementation.
    ImplementationSpecificError,

    /// The Server does not support the requested version of the MQTT protocol.
    UnsupportedProtocolVersion,

    /// The Client Identifier is a valid string but is not allowed by the Server.
    ClientIdentifierNotValid,

    /// The Server does not accept the User Name or Password specified by the Client.
    BadUserNameOrPassword,

    /// The request is not authorized.
    NotAuthorized,

    /// The MQTT Server is not available.
    ServerUnavailable,

    /// The Server is busy and cannot continue processing requests from this Client.
    ServerBusy,

    /// This Client has been banned by administrative action.
    Banned,

    /// The Server is shutting down.
    ServerShuttingDown,

    /// The authentication method is not supported or does not match the one in use.
    BadAuthenticationMethod,

    /// No packet has been received for 1.5 times the Keep alive time.
    KeepAliveTimeout,

    /// Another Connection using the same `ClientID` has connected.
    SessionTakenOver,

    /// The Topic Filter is correctly formed, but is not accepted.
    TopicFilterInvalid,

    /// The Topic Name is correctly formed, but is not accepted.
    TopicNameInvalid,

    /// The Packet Identifier is already in use.
    PacketIdentifierInUse,

    /// The Packet Identifier is not known.
    PacketIdentifierNotFound,

    /// More than Receive Maximum publications are awaiting acknowledgement.
    ReceiveMaximumExceeded,

    /// The Topic Alias is greater than the Maximum Topic Alias.
    TopicAliasInvalid,

    /// The packet size is greater than Maximum Packet Size.
    PacketTooLarge,

    /// The received data rate is too high.
    MessageRateTooHigh,

    /// An implementation or administrative imposed limit has been exceeded.
    QuotaExceeded,

    /// The Connection is closed due to an administrative action.
    AdministrativeAction,

    /// The payload format does not match the Payload Format Indicator.
    PayloadFormatInvalid,

    /// The Server does not support retained messages.
    RetainNotSupported,

    /// The requested `QoS` is greater than the Maximum `QoS`.
    QoSNotSupported,

    /// The Client should temporarily use another server.
    UseAnotherServer,

    /// The Client should permanently use another server.
    ServerMoved,

    /// The Server does not support Shared Subscriptions.
    SharedSubscriptionsNotSupported,

    /// The connection rate limit has been exceeded.
    ConnectionRateExceeded,

    /// The maximum connection time authorized for this connection has been exceeded.
    MaximumConnectTime,

    /// The Server does not support Subscription Identifiers.
    SubscriptionIdentifiersNotSupported,

    /// The Server does not support Wildcard Subscriptions.
    WildcardSubscriptionsNotSupported,
}

impl ReasonCode {
    /// Decodes a reason code byte.
    ///
    /// `zero_default` is returned for the byte `0x00`.
    ///
    /// # Errors
    /// - Returns `PacketError::MalformedPacket` if the byte is not a known reason code.
    pub fn from_u8(value: u8, zero_default: ReasonCode) -> Result<Self, PacketError> {
        let reason_code = match value {
            0x00 => zero_default,
            0x01 => Self::GrantedQoS1,
            0x02 => Self::GrantedQoS2,
            0x04 => Self::DisconnectWithWillMessage,
            0x10 => Self::NoMatchingSubscribers,
            0x11 => Self::NoSubscriptionExisted,
            0x18 => Self::ContinueAuthentication,
            0x19 => Self::ReAuthenticate,
            0x80 => Self::UnspecifiedError,
            0x81 => Self::MalformedPacket,
            0x82 => Self::ProtocolError,
            0x83 => Self::ImplementationSpecificError,
            0x84 => Self::UnsupportedProtocolVersion,
            0x85 => Self::ClientIdentifierNotValid,
            0x86 => Self::BadUserNameOrPassword,
            0x87 => Self::NotAuthorized,
            0x88 => Self::ServerUnavailable,
            0x89 => Self::ServerBusy,
            0x8A => Self::Banned,
            0x8B => Self::ServerShuttingDown,
            0x8C => Self::BadAuthenticationMethod,
            0x8D => Self::KeepAliveTimeout,
            0x8E => Self::SessionTakenOver,
            0x8F => Self::TopicFilterInvalid,
            0x90 => Self::TopicNameInvalid,
            0x91 => Self::PacketIdentifierInUse,
            0x92 => Self::PacketIdentifierNotFound,
            0x93 => Self::ReceiveMaximumExceeded,
            0x94 => Self::TopicAliasInvalid,
            0x95 => Self::PacketTooLarge,
            0x96 => Self::MessageRateTooHigh,
            0x97 => Self::QuotaExceeded,
            0x98 => Self::AdministrativeAction,
            0x99 => Self::PayloadFormatInvalid,
            0x9A => Self::RetainNotSupported,
            0x9B => Self::QoSNotSupported,
            0x9C => Self::UseAnotherServer,
            0x9D => Self::ServerMoved,
            0x9E => Self::SharedSubscriptionsNotSupported,
            0x9F => Self::ConnectionRateExceeded,
            0xA0 => Self::MaximumConnectTime,
            0xA1 => Self::SubscriptionIdentifiersNotSupported,
            0xA2 => Self::WildcardSubscriptionsNotSupported,
            _ => {
                return Err(PacketError::malformed(format!("Unknown reason code: {value:#04x}")));
            }
        };

        Ok(reason_code)
    }

    /// Converts the `ReasonCode` to its numeric value.
    pub fn code(self) -> u8 {
        match self {
            Self::Success | Self::NormalDisconnection | Self::GrantedQoS0 => 0x00,
            Self::GrantedQoS1 => 0x01,
            Self::GrantedQoS2 => 0x02,
            Self::DisconnectWithWillMessage => 0x04,
            Self::NoMatchingSubscribers => 0x10,
            Self::NoSubscriptionExisted => 0x11,
            Self::ContinueAuthentication => 0x18,
            Self::ReAuthenticate => 0x19,
            Self::UnspecifiedError => 0x80,
            Self::MalformedPacket => 0x81,
            Self::ProtocolError => 0x82,
            Self::ImplementationSpecificError => 0x83,
            Self::UnsupportedProtocolVersion => 0x84,
            Self::ClientIdentifierNotValid => 0x85,
            Self::BadUserNameOrPassword => 0x86,
            Self::NotAuthorized => 0x87,
            Self::ServerUnavailable => 0x88,
            Self::ServerBusy => 0x89,
            Self::Banned => 0x8A,
            Self::ServerShuttingDown => 0x8B,
            Self::BadAuthenticationMethod => 0x8C,
            Self::KeepAliveTimeout => 0x8D,
            Self::SessionTakenOver => 0x8E,
            Self::TopicFilterInvalid => 0x8F,
            Self::TopicNameInvalid => 0x90,
            Self::PacketIdentifierInUse => 0x91,
            Self::PacketIdentifierNotFound => 0x92,
            Self::ReceiveMaximumExceeded => 0x93,
            Self::TopicAliasInvalid => 0x94,
            Self::PacketTooLarge => 0x95,
            Self::MessageRateTooHigh => 0x96,
            Self::QuotaExceeded => 0x97,
            Self::AdministrativeAction => 0x98,
            Self::PayloadFormatInvalid => 0x99,
            Self::RetainNotSupported => 0x9A,
            Self::QoSNotSupported => 0x9B,
            Self::UseAnotherServer => 0x9C,
            Self::ServerMoved => 0x9D,
            Self::SharedSubscriptionsNotSupported => 0x9E,
            Self::ConnectionRateExceeded => 0x9F,
            Self::MaximumConnectTime => 0xA0,
            Self::SubscriptionIdentifiersNotSupported => 0xA1,
            Self::WildcardSubscriptionsNotSupported => 0xA2,
        }
    }

    /// Human readable name of the reason code.
    pub fn name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NormalDisconnection => "Normal disconnection",
            Self::GrantedQoS0 => "Granted QoS 0",
            Self::GrantedQoS1 => "Granted QoS 1",
            Self::GrantedQoS2 => "Granted QoS 2",
            Self::DisconnectWithWillMessage => "Disconnect with Will Message",
            Self::NoMatchingSubscribers => "No matching subscribers",
            Self::NoSubscriptionExisted => "No subscription existed",
            Self::ContinueAuthentication => "Continue authentication",
            Self::ReAuthenticate => "Re-authenticate",
            Self::UnspecifiedError => "Unspecified error",
            Self::MalformedPacket => "Malformed Packet",
            Self::ProtocolError => "Protocol Error",
            Self::ImplementationSpecificError => "Implementation specific error",
            Self::UnsupportedProtocolVersion => "Unsupported Protocol Version",
            Self::ClientIdentifierNotValid => "Client Identifier not valid",
            Self::BadUserNameOrPassword => "Bad User Name or Password",
            Self::NotAuthorized => "Not authorized",
            Self::ServerUnavailable => "Server unavailable",
            Self::ServerBusy => "Server busy",
            Self::Banned => "Banned",
            Self::ServerShuttingDown => "Server shutting down",
            Self::BadAuthenticationMethod => "Bad authentication method",
            Self::KeepAliveTimeout => "Keep Alive timeout",
            Self::SessionTakenOver => "Session taken over",
            Self::TopicFilterInvalid => "Topic Filter invalid",
            Self::TopicNameInvalid => "Topic Name invalid",
            Self::PacketIdentifierInUse => "Packet Identifier in use",
            Self::PacketIdentifierNotFound => "Packet Identifier not found",
            Self::ReceiveMaximumExceeded => "Receive Maximum exceeded",
            Self::TopicAliasInvalid => "Topic Alias invalid",
            Self::PacketTooLarge => "Packet too large",
            Self::MessageRateTooHigh => "Message rate too high",
            Self::QuotaExceeded => "Quota exceeded",
            Self::AdministrativeAction => "Administrative action",
            Self::PayloadFormatInvalid => "Payload format invalid",
            Self::RetainNotSupported => "Retain not supported",
            Self::QoSNotSupported => "QoS not supported",
            Self::UseAnotherServer => "Use another server",
            Self::ServerMoved => "Server moved",
            Self::SharedSubscriptionsNotSupported => "Shared Subscriptions not supported",
            Self::ConnectionRateExceeded => "Connection rate exceeded",
            Self::MaximumConnectTime => "Maximum connect time",
            Self::SubscriptionIdentifiersNotSupported => "Subscription Identifiers not supported",
            Self::WildcardSubscriptionsNotSupported => "Wildcard Subscriptions not supported",
        }
    }

    /// Reason codes below 0x80 report success.
    pub fn is_success(self) -> bool {
        self.code() < 0x80
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.code())
    }
}

/// Reason codes a CONNACK may carry.
pub(crate) const CONNACK_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::UnspecifiedError,
    ReasonCode::MalformedPacket,
    ReasonCode::ProtocolError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::UnsupportedProtocolVersion,
    ReasonCode::ClientIdentifierNotValid,
    ReasonCode::BadUserNameOrPassword,
    ReasonCode::NotAuthorized,
    ReasonCode::ServerUnavailable,
    ReasonCode::ServerBusy,
    ReasonCode::Banned,
    ReasonCode::BadAuthenticationMethod,
    ReasonCode::TopicNameInvalid,
    ReasonCode::PacketTooLarge,
    ReasonCode::QuotaExceeded,
    ReasonCode::PayloadFormatInvalid,
    ReasonCode::RetainNotSupported,
    ReasonCode::QoSNotSupported,
    ReasonCode::UseAnotherServer,
    ReasonCode::ServerMoved,
    ReasonCode::ConnectionRateExceeded,
];

/// Reason codes a PUBACK or PUBREC may carry.
pub(crate) const PUBLISH_RESPONSE_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::NoMatchingSubscribers,
    ReasonCode::UnspecifiedError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::TopicNameInvalid,
    ReasonCode::PacketIdentifierInUse,
    ReasonCode::QuotaExceeded,
    ReasonCode::PayloadFormatInvalid,
];

/// Reason codes a PUBREL or PUBCOMP may carry.
pub(crate) const PUBLISH_RELEASE_REASON_CODES: &[ReasonCode] =
    &[ReasonCode::Success, ReasonCode::PacketIdentifierNotFound];

/// Reason codes a SUBACK may carry.
pub(crate) const SUBACK_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::GrantedQoS0,
    ReasonCode::GrantedQoS1,
    ReasonCode::GrantedQoS2,
    ReasonCode::UnspecifiedError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::TopicFilterInvalid,
    ReasonCode::PacketIdentifierInUse,
    ReasonCode::QuotaExceeded,
    ReasonCode::SharedSubscriptionsNotSupported,
    ReasonCode::SubscriptionIdentifiersNotSupported,
    ReasonCode::WildcardSubscriptionsNotSupported,
];

/// Reason codes an UNSUBACK may carry.
pub(crate) const UNSUBACK_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::NoSubscriptionExisted,
    ReasonCode::UnspecifiedError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::TopicFilterInvalid,
    ReasonCode::PacketIdentifierInUse,
];

/// Reason codes a DISCONNECT may carry.
pub(crate) const DISCONNECT_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::NormalDisconnection,
    ReasonCode::DisconnectWithWillMessage,
    ReasonCode::UnspecifiedError,
    ReasonCode::MalformedPacket,
    ReasonCode::ProtocolError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::ServerBusy,
    ReasonCode::ServerShuttingDown,
    ReasonCode::KeepAliveTimeout,
    ReasonCode::SessionTakenOver,
    ReasonCode::TopicFilterInvalid,
    ReasonCode::TopicNameInvalid,
    ReasonCode::ReceiveMaximumExceeded,
    ReasonCode::TopicAliasInvalid,
    ReasonCode::PacketTooLarge,
    ReasonCode::MessageRateTooHigh,
    ReasonCode::QuotaExceeded,
    ReasonCode::AdministrativeAction,
    ReasonCode::PayloadFormatInvalid,
    ReasonCode::RetainNotSupported,
    ReasonCode::QoSNotSupported,
    ReasonCode::UseAnotherServer,
    ReasonCode::ServerMoved,
    ReasonCode::SharedSubscriptionsNotSupported,
    ReasonCode::ConnectionRateExceeded,
    ReasonCode::MaximumConnectTime,
    ReasonCode::SubscriptionIdentifiersNotSupported,
    ReasonCode::WildcardSubscriptionsNotSupported,
];

/// Reason codes an AUTH may carry.
pub(crate) const AUTH_REASON_CODES: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::ContinueAuthentication,
    ReasonCode::ReAuthenticate,
];

/// Reads one reason code byte and checks it against the codes `packet_type` allows.
pub(crate) fn decode_reason_code(
    value: u8,
    zero_default: ReasonCode,
    packet_type: PacketType,
    allowed: &[ReasonCode],
) -> Result<ReasonCode, PacketError> {
    let reason_code = ReasonCode::from_u8(value, zero_default)?;
    if !allowed.contains(&reason_code) {
        return Err(PacketError::malformed(format!(
            "Reason code {reason_code} is not valid in {packet_type}"
        )));
    }

    Ok(reason_code)
}

/// Rejects a reason code that `packet_type` does not allow when building a packet.
pub(crate) fn ensure_reason_code(
    reason_code: ReasonCode,
    packet_type: PacketType,
    allowed: &[ReasonCode],
) -> Result<(), PacketError> {
    if !allowed.contains(&reason_code) {
        return Err(PacketError::invalid(format!(
            "Reason code {reason_code} is not valid in {packet_type}"
        )));
    }

    Ok(())
}
