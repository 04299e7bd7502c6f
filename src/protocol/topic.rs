use crate::{error::PacketError, protocol::qos::QoS};

/// Checks a Topic Name: no wildcard characters and no null character.
///
/// An empty topic name passes here; PUBLISH decides whether a Topic Alias makes it valid.
pub(crate) fn validate_topic_name(topic: &str) -> Result<(), String> {
    if topic.contains(['+', '#']) {
        return Err(format!("Topic name {topic:?} must not contain wildcards"));
    }

    if topic.contains('\0') {
        return Err("Topic name must not contain the null character".to_string());
    }

    Ok(())
}

/// Checks a Topic Filter.
///
/// `#` must occupy a whole level and be the last one; `+` must occupy a whole level.
pub(crate) fn validate_topic_filter(filter: &str) -> Result<(), String> {
    if filter.is_empty() {
        return Err("Topic filter must not be empty".to_string());
    }

    if filter.contains('\0') {
        return Err("Topic filter must not contain the null character".to_string());
    }

    let levels: Vec<&str> = filter.split('/').collect();
    for (i, level) in levels.iter().enumerate() {
        if level.contains('#') && (*level != "#" || i != levels.len() - 1) {
            return Err(format!("Multi-level wildcard misplaced in topic filter {filter:?}"));
        }

        if level.contains('+') && *level != "+" {
            return Err(format!("Single-level wildcard misplaced in topic filter {filter:?}"));
        }
    }

    Ok(())
}

/// Whether retained messages are sent when the subscription is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetainHandling {
    /// Send retained messages at the time of the subscribe.
    #[default]
    SendAtSubscribe = 0,

    /// Send retained messages only if the subscription does not already exist.
    SendIfNewSubscription = 1,

    /// Do not send retained messages at the time of the subscribe.
    DoNotSend = 2,
}

impl RetainHandling {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SendAtSubscribe),
            1 => Some(Self::SendIfNewSubscription),
            2 => Some(Self::DoNotSend),
            _ => None,
        }
    }
}

/// The options byte written after each Topic Filter in SUBSCRIBE.
///
/// | Bit | 7 6      | 5 4             | 3                   | 2        | 1 0 |
/// |-----|----------|-----------------|---------------------|----------|-----|
/// |     | Reserved | Retain Handling | Retain As Published | No Local | QoS |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubscriptionOptions {
    pub qos: QoS,
    pub no_local: bool,
    pub retain_as_published: bool,
    pub retain_handling: RetainHandling,
}

impl SubscriptionOptions {
    pub fn new(qos: QoS) -> Self {
        Self { qos, ..Self::default() }
    }

    pub fn to_u8(self) -> u8 {
        self.qos.to_u8()
            | u8::from(self.no_local) << 2
            | u8::from(self.retain_as_published) << 3
            | (self.retain_handling as u8) << 4
    }

    /// # Errors
    /// - Returns `PacketError::MalformedPacket` for `QoS` 3, retain handling 3 or reserved bits set.
    pub fn from_u8(value: u8) -> Result<Self, PacketError> {
        if value >> 6 != 0 {
            return Err(PacketError::malformed("Subscription options reserved bits must be 0"));
        }

        let qos = QoS::from_u8(value & 0b0000_0011)?;
        let no_local = value >> 2 & 1 == 1;
        let retain_as_published = value >> 3 & 1 == 1;
        let retain_handling = RetainHandling::from_u8(value >> 4 & 0b0000_0011).ok_or_else(|| {
            PacketError::malformed(format!("Invalid retain handling: {}", value >> 4 & 0b11))
        })?;

        Ok(Self { qos, no_local, retain_as_published, retain_handling })
    }
}

/// A Topic Filter with its subscription options.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    filter: String,
    options: SubscriptionOptions,
}

impl TopicFilter {
    /// # Errors
    /// - Returns `PacketError::InvalidArgument` if the filter is empty or misuses wildcards.
    pub fn new(filter: impl Into<String>, options: SubscriptionOptions) -> Result<Self, PacketError> {
        let filter = filter.into();
        validate_topic_filter(&filter).map_err(PacketError::InvalidArgument)?;

        Ok(Self { filter, options })
    }

    pub(crate) fn decoded(filter: String, options: SubscriptionOptions) -> Result<Self, PacketError> {
        validate_topic_filter(&filter).map_err(PacketError::MalformedPacket)?;

        Ok(Self { filter, options })
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn options(&self) -> SubscriptionOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names() {
        assert!(validate_topic_name("sensors/kitchen/temp").is_ok());
        assert!(validate_topic_name("").is_ok());
        assert!(validate_topic_name("/").is_ok());
        assert!(validate_topic_name("sensors/+/temp").is_err());
        assert!(validate_topic_name("sensors/#").is_err());
        assert!(validate_topic_name("a\0b").is_err());
    }

    #[test]
    fn topic_filters() {
        for filter in ["#", "+", "a/+/c", "a/b/#", "+/+", "/", "a//b", "sport/tennis/+"] {
            assert!(validate_topic_filter(filter).is_ok(), "{filter}");
        }

        for filter in ["", "a/#/c", "a#", "a/b#", "a+/b", "+a", "#/a"] {
            assert!(validate_topic_filter(filter).is_err(), "{filter}");
        }
    }

    #[test]
    fn options_byte_layout() {
        let options = SubscriptionOptions {
            qos: QoS::ExactlyOnce,
            no_local: true,
            retain_as_published: true,
            retain_handling: RetainHandling::DoNotSend,
        };
        assert_eq!(options.to_u8(), 0b0010_1110);
        assert_eq!(SubscriptionOptions::from_u8(0b0010_1110).unwrap(), options);
        assert_eq!(SubscriptionOptions::new(QoS::AtLeastOnce).to_u8(), 0b0000_0001);
    }

    #[test]
    fn options_byte_rejects_invalid_values() {
        assert!(SubscriptionOptions::from_u8(0b0000_0011).is_err());
        assert!(SubscriptionOptions::from_u8(0b0011_0000).is_err());
        assert!(SubscriptionOptions::from_u8(0b0100_0000).is_err());
    }

    #[test]
    fn topic_filter_construction_is_validated() {
        assert!(TopicFilter::new("a/#", SubscriptionOptions::default()).is_ok());
        assert!(matches!(
            TopicFilter::new("a/#/b", SubscriptionOptions::default()),
            Err(PacketError::InvalidArgument(_))
        ));
        assert!(matches!(
            TopicFilter::decoded(String::new(), SubscriptionOptions::default()),
            Err(PacketError::MalformedPacket(_))
        ));
    }
}
