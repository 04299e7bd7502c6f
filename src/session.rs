use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use dashmap::{DashMap, DashSet};
use log::debug;

use crate::{
    error::SessionStoreError,
    packets::{pub_ack_packet::PubRelPacket, publish_packet::PublishPacket, Packet},
    protocol::qos::QoS,
};

/// An outgoing PUBLISH waiting for its PUBACK (`QoS` 1) or PUBREC (`QoS` 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightPublish {
    packet: PublishPacket,
    created: Instant,
    key: u64,
}

impl InFlightPublish {
    pub fn packet(&self) -> &PublishPacket {
        &self.packet
    }

    pub fn packet_identifier(&self) -> u16 {
        // Only publishes with QoS > 0, which always carry an identifier, are stored.
        self.packet.packet_identifier().unwrap_or_default()
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// Sequence key; in-flight packets are replayed in ascending key order.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// `true` once more than the Message Expiry Interval has elapsed since the packet was stored.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.packet
            .message_expiry_interval()
            .is_some_and(|interval| now.saturating_duration_since(self.created) > interval)
    }
}

/// A PUBREL sent in answer to a PUBREC, waiting for its PUBCOMP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightPubrel {
    packet: PubRelPacket,

    /// Inherited from the PUBLISH it releases.
    created: Instant,

    key: u64,
}

impl InFlightPubrel {
    pub fn packet(&self) -> &PubRelPacket {
        &self.packet
    }

    pub fn packet_identifier(&self) -> u16 {
        self.packet.packet_identifier()
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    pub fn key(&self) -> u64 {
        self.key
    }
}

/// An outgoing packet that has not been fully acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InFlightPacket {
    Publish(InFlightPublish),
    Pubrel(InFlightPubrel),
}

impl InFlightPacket {
    pub fn packet_identifier(&self) -> u16 {
        match self {
            Self::Publish(publish) => publish.packet_identifier(),
            Self::Pubrel(pubrel) => pubrel.packet_identifier(),
        }
    }

    pub fn key(&self) -> u64 {
        match self {
            Self::Publish(publish) => publish.key(),
            Self::Pubrel(pubrel) => pubrel.key(),
        }
    }

    pub fn created(&self) -> Instant {
        match self {
            Self::Publish(publish) => publish.created(),
            Self::Pubrel(pubrel) => pubrel.created(),
        }
    }

    /// PUBREL never expires.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Self::Publish(publish) => publish.is_expired(now),
            Self::Pubrel(_) => false,
        }
    }

    /// The packet to retransmit. A PUBLISH is flagged as a duplicate.
    pub fn to_packet(&self) -> Packet {
        match self {
            Self::Publish(publish) => Packet::Publish(publish.packet.as_duplicate()),
            Self::Pubrel(pubrel) => Packet::PubRel(pubrel.packet.clone()),
        }
    }
}

/// Delivery state of a session: outgoing `QoS` 1/2 packets awaiting acknowledgement and
/// incoming `QoS` 2 packet identifiers awaiting their PUBREL.
///
/// Implementations are shared between the sending path and the acknowledgement path, so every
/// operation takes `&self`.
pub trait SessionStore: Send + Sync {
    /// Starts tracking an outgoing PUBLISH.
    ///
    /// # Errors
    /// - Returns `SessionStoreError::InvalidArgument` for a `QoS` 0 PUBLISH.
    fn store(&self, publish: PublishPacket) -> Result<InFlightPublish, SessionStoreError>;

    /// Moves a `QoS` 2 PUBLISH to the PUBREL stage once its PUBREC arrives.
    ///
    /// The PUBREL keeps the PUBLISH's creation time and gets a new sequence key. Replacing an
    /// identifier that is already at the PUBREL stage returns that PUBREL unchanged.
    ///
    /// # Errors
    /// - Returns `SessionStoreError::NoSuchElement` if nothing is stored under the identifier.
    fn replace(&self, publish: &InFlightPublish) -> Result<InFlightPubrel, SessionStoreError>;

    /// Stops tracking the packet identifier. Unknown identifiers are ignored.
    fn acknowledge(&self, packet_identifier: u16) -> Option<InFlightPacket>;

    /// Stored packets that have not expired at `now`, in ascending sequence key order.
    fn unacknowledged_packets_at(&self, now: Instant) -> Vec<InFlightPacket>;

    fn unacknowledged_packets(&self) -> Vec<InFlightPacket> {
        self.unacknowledged_packets_at(Instant::now())
    }

    /// Records the identifier of an incoming `QoS` 2 PUBLISH.
    ///
    /// Returns `true` if it was already recorded, meaning the PUBLISH is a re-delivery that must
    /// be acknowledged again without processing its payload.
    ///
    /// # Errors
    /// - Returns `SessionStoreError::InvalidArgument` if the PUBLISH has no packet identifier.
    fn remember_incoming_packet_id(&self, publish: &PublishPacket) -> Result<bool, SessionStoreError>;

    fn has_incoming_packet_id(&self, publish: &PublishPacket) -> bool;

    /// Forgets an incoming identifier once its PUBREL completes the exchange.
    fn release_incoming_packet_id(&self, pubrel: &PubRelPacket);

    /// Drops every outgoing and incoming entry, for a session that starts clean.
    fn clear(&self);

    /// `true` while an outgoing packet holds the identifier.
    fn contains(&self, packet_identifier: u16) -> bool;

    /// Number of outgoing packets being tracked.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct SessionState {
    in_flight: DashMap<u16, InFlightPacket>,
    incoming: DashSet<u16>,
    sequence: AtomicU64,
}

/// In-memory [`SessionStore`]. Clones share the same state.
#[derive(Clone)]
pub struct MemorySessionStore {
    state: Arc<SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SessionState {
                in_flight: DashMap::new(),
                incoming: DashSet::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    fn next_key(&self) -> u64 {
        self.state.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn store(&self, publish: PublishPacket) -> Result<InFlightPublish, SessionStoreError> {
        if publish.qos() == QoS::AtMostOnce {
            return Err(SessionStoreError::InvalidArgument(
                "QoS 0 PUBLISH is never acknowledged".to_string(),
            ));
        }

        let Some(packet_identifier) = publish.packet_identifier() else {
            return Err(SessionStoreError::InvalidArgument(
                "PUBLISH has no packet identifier".to_string(),
            ));
        };

        let in_flight = InFlightPublish { packet: publish, created: Instant::now(), key: self.next_key() };
        debug!("Storing PUBLISH {packet_identifier} with key {}", in_flight.key);

        self.state.in_flight.insert(packet_identifier, InFlightPacket::Publish(in_flight.clone()));

        Ok(in_flight)
    }

    fn replace(&self, publish: &InFlightPublish) -> Result<InFlightPubrel, SessionStoreError> {
        let packet_identifier = publish.packet_identifier();

        let Some(mut entry) = self.state.in_flight.get_mut(&packet_identifier) else {
            return Err(SessionStoreError::NoSuchElement(packet_identifier));
        };

        let created = match entry.value() {
            InFlightPacket::Pubrel(pubrel) => {
                debug!("PUBREL {packet_identifier} already in flight");
                return Ok(pubrel.clone());
            }
            InFlightPacket::Publish(stored) => stored.created,
        };

        let packet = PubRelPacket::new(packet_identifier)
            .map_err(|e| SessionStoreError::InvalidArgument(e.to_string()))?;
        let pubrel = InFlightPubrel { packet, created, key: self.next_key() };
        debug!("Replacing PUBLISH {packet_identifier} with PUBREL, key {}", pubrel.key);

        *entry = InFlightPacket::Pubrel(pubrel.clone());

        Ok(pubrel)
    }

    fn acknowledge(&self, packet_identifier: u16) -> Option<InFlightPacket> {
        let removed = self.state.in_flight.remove(&packet_identifier).map(|(_, packet)| packet);
        if removed.is_some() {
            debug!("Acknowledged packet {packet_identifier}");
        }

        removed
    }

    fn unacknowledged_packets_at(&self, now: Instant) -> Vec<InFlightPacket> {
        let mut packets: Vec<InFlightPacket> = self
            .state
            .in_flight
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|packet| !packet.is_expired(now))
            .collect();

        packets.sort_by_key(InFlightPacket::key);

        packets
    }

    fn remember_incoming_packet_id(&self, publish: &PublishPacket) -> Result<bool, SessionStoreError> {
        let Some(packet_identifier) = publish.packet_identifier() else {
            return Err(SessionStoreError::InvalidArgument(
                "PUBLISH has no packet identifier".to_string(),
            ));
        };

        let first_seen = self.state.incoming.insert(packet_identifier);
        if !first_seen {
            debug!("PUBLISH {packet_identifier} is a re-delivery");
        }

        Ok(!first_seen)
    }

    fn has_incoming_packet_id(&self, publish: &PublishPacket) -> bool {
        publish
            .packet_identifier()
            .is_some_and(|packet_identifier| self.state.incoming.contains(&packet_identifier))
    }

    fn release_incoming_packet_id(&self, pubrel: &PubRelPacket) {
        self.state.incoming.remove(&pubrel.packet_identifier());
    }

    fn clear(&self) {
        debug!(
            "Clearing session: {} in flight, {} incoming",
            self.state.in_flight.len(),
            self.state.incoming.len()
        );

        self.state.in_flight.clear();
        self.state.incoming.clear();
    }

    fn contains(&self, packet_identifier: u16) -> bool {
        self.state.in_flight.contains_key(&packet_identifier)
    }

    fn len(&self) -> usize {
        self.state.in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::packets::publish_packet::PublishProperties;

    fn publish(packet_identifier: u16, qos: QoS) -> PublishPacket {
        PublishPacket::builder("test/topic")
            .qos(qos)
            .packet_identifier(packet_identifier)
            .payload(&b"payload"[..])
            .build()
            .unwrap()
    }

    fn identifiers(packets: &[InFlightPacket]) -> Vec<u16> {
        packets.iter().map(InFlightPacket::packet_identifier).collect()
    }

    #[test]
    fn unacknowledged_packets_keep_store_order() {
        let store = MemorySessionStore::new();
        let order = [4, 5, 7, 99, 1, 2, 150, 148, 2000, 2001, 1999];

        for packet_identifier in order {
            store.store(publish(packet_identifier, QoS::AtLeastOnce)).unwrap();
        }

        assert_eq!(identifiers(&store.unacknowledged_packets()), order);
        assert_eq!(store.len(), order.len());
    }

    #[test]
    fn replace_yields_pubrel_with_same_identifier() {
        let store = MemorySessionStore::new();
        let in_flight = store.store(publish(42, QoS::ExactlyOnce)).unwrap();

        let pubrel = store.replace(&in_flight).unwrap();
        assert_eq!(pubrel.packet_identifier(), 42);
        assert_eq!(pubrel.created(), in_flight.created());
        assert!(pubrel.key() > in_flight.key());

        let packets = store.unacknowledged_packets();
        assert_eq!(packets, vec![InFlightPacket::Pubrel(pubrel)]);
    }

    #[test]
    fn replace_unknown_identifier_fails() {
        let store = MemorySessionStore::new();
        let in_flight = store.store(publish(7, QoS::ExactlyOnce)).unwrap();
        store.acknowledge(7);

        assert_eq!(store.replace(&in_flight), Err(SessionStoreError::NoSuchElement(7)));
    }

    #[test]
    fn replace_is_idempotent() {
        let store = MemorySessionStore::new();
        let in_flight = store.store(publish(3, QoS::ExactlyOnce)).unwrap();

        let first = store.replace(&in_flight).unwrap();
        let second = store.replace(&in_flight).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pubrel_moves_behind_later_publishes() {
        let store = MemorySessionStore::new();
        let first = store.store(publish(1, QoS::ExactlyOnce)).unwrap();
        store.store(publish(2, QoS::AtLeastOnce)).unwrap();

        store.replace(&first).unwrap();
        assert_eq!(identifiers(&store.unacknowledged_packets()), [2, 1]);
    }

    #[test]
    fn acknowledge_is_idempotent() {
        let store = MemorySessionStore::new();
        store.store(publish(9, QoS::AtLeastOnce)).unwrap();

        assert!(store.contains(9));
        assert!(store.acknowledge(9).is_some());
        assert!(store.acknowledge(9).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn qos_zero_publish_is_rejected() {
        let store = MemorySessionStore::new();
        let packet = PublishPacket::builder("t").build().unwrap();

        assert!(matches!(store.store(packet.clone()), Err(SessionStoreError::InvalidArgument(_))));
        assert!(store.remember_incoming_packet_id(&packet).is_err());
    }

    #[test]
    fn expired_publishes_are_skipped() {
        let store = MemorySessionStore::new();
        let expiring = PublishPacket::builder("t")
            .qos(QoS::AtLeastOnce)
            .packet_identifier(1)
            .properties(PublishProperties {
                message_expiry_interval: Some(60),
                ..PublishProperties::default()
            })
            .build()
            .unwrap();
        store.store(expiring).unwrap();
        store.store(publish(2, QoS::AtLeastOnce)).unwrap();

        let now = Instant::now();
        assert_eq!(identifiers(&store.unacknowledged_packets_at(now + Duration::from_secs(59))), [1, 2]);
        assert_eq!(identifiers(&store.unacknowledged_packets_at(now + Duration::from_secs(61))), [2]);
    }

    #[test]
    fn pubrel_never_expires() {
        let store = MemorySessionStore::new();
        let expiring = PublishPacket::builder("t")
            .qos(QoS::ExactlyOnce)
            .packet_identifier(1)
            .properties(PublishProperties {
                message_expiry_interval: Some(1),
                ..PublishProperties::default()
            })
            .build()
            .unwrap();
        let in_flight = store.store(expiring).unwrap();
        store.replace(&in_flight).unwrap();

        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(store.unacknowledged_packets_at(later).len(), 1);
    }

    #[test]
    fn incoming_identifiers_are_deduplicated() {
        let store = MemorySessionStore::new();
        let packet = publish(42, QoS::ExactlyOnce);

        assert!(!store.has_incoming_packet_id(&packet));
        assert!(!store.remember_incoming_packet_id(&packet).unwrap());
        assert!(store.remember_incoming_packet_id(&packet).unwrap());
        assert!(store.remember_incoming_packet_id(&packet).unwrap());
        assert!(store.has_incoming_packet_id(&packet));

        store.release_incoming_packet_id(&PubRelPacket::new(42).unwrap());
        assert!(!store.has_incoming_packet_id(&packet));
        assert!(!store.remember_incoming_packet_id(&packet).unwrap());
    }

    #[test]
    fn clear_drops_everything() {
        let store = MemorySessionStore::new();
        store.store(publish(1, QoS::AtLeastOnce)).unwrap();
        store.remember_incoming_packet_id(&publish(2, QoS::ExactlyOnce)).unwrap();

        store.clear();

        assert!(store.is_empty());
        assert!(store.unacknowledged_packets().is_empty());
        assert!(!store.has_incoming_packet_id(&publish(2, QoS::ExactlyOnce)));
    }

    #[test]
    fn retransmitted_publish_is_flagged_duplicate() {
        let store = MemorySessionStore::new();
        store.store(publish(5, QoS::AtLeastOnce)).unwrap();

        let packets = store.unacknowledged_packets();
        match packets[0].to_packet() {
            Packet::Publish(packet) => assert!(packet.dup()),
            other => panic!("unexpected packet: {other:?}"),
        }
    }
}
