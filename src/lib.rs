//! MQTT v5 wire codec and `QoS` 1/2 session state for clients.
//!
//! ```
//! use mqtt5_core::{Packet, PacketReader, QoS};
//! use mqtt5_core::packets::publish_packet::PublishPacket;
//!
//! let publish = PublishPacket::builder("sensors/kitchen")
//!     .qos(QoS::AtLeastOnce)
//!     .packet_identifier(1)
//!     .payload(&b"21.5"[..])
//!     .build()
//!     .unwrap();
//!
//! let bytes = Packet::from(publish.clone()).encode().unwrap();
//!
//! let mut reader = PacketReader::new();
//! reader.extend(&bytes);
//! assert_eq!(reader.next_packet().unwrap(), Some(Packet::Publish(publish)));
//! ```

pub(crate) mod codec;
pub mod constants;
pub mod error;
pub mod packet_id;
pub mod packet_reader;
pub mod packets;
pub mod protocol;
pub mod session;

pub use error::{PacketError, SessionStoreError};
pub use packet_id::PacketIdAllocator;
pub use packet_reader::PacketReader;
pub use packets::{ControlPacket, DecodablePacket, EncodablePacket, FixedHeader, Packet};
pub use protocol::{
    PacketType, Properties, Property, QoS, ReasonCode, RetainHandling, SubscriptionOptions,
    TopicFilter, UserProperty,
};
pub use session::{InFlightPacket, InFlightPublish, InFlightPubrel, MemorySessionStore, SessionStore};
