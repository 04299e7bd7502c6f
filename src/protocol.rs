pub mod packet_type;
pub mod property;
pub mod qos;
pub mod reason_code;
pub mod topic;

pub use packet_type::PacketType;
pub use property::{Properties, Property, UserProperty};
pub use qos::QoS;
pub use reason_code::ReasonCode;
pub use topic::{RetainHandling, SubscriptionOptions, TopicFilter};
