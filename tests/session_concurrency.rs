use std::{collections::HashSet, sync::Arc};

use mqtt5_core::{
    packets::{pub_ack_packet::PubRelPacket, publish_packet::PublishPacket},
    InFlightPacket, MemorySessionStore, PacketIdAllocator, QoS, SessionStore,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn publish(packet_identifier: u16, qos: QoS) -> PublishPacket {
    PublishPacket::builder("load/test")
        .qos(qos)
        .packet_identifier(packet_identifier)
        .payload(packet_identifier.to_be_bytes().to_vec())
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_store_and_acknowledge_loses_nothing() {
    init_logger();

    let store = MemorySessionStore::new();
    let mut handles = Vec::new();

    for task in 0..8u16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 1..=250u16 {
                let packet_identifier = task * 1000 + i;
                store.store(publish(packet_identifier, QoS::AtLeastOnce)).unwrap();

                // Acknowledge every other packet straight away.
                if i % 2 == 0 {
                    assert!(store.acknowledge(packet_identifier).is_some());
                }
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let remaining = store.unacknowledged_packets();
    assert_eq!(remaining.len(), 8 * 125);
    assert!(remaining.iter().all(|packet| packet.packet_identifier() % 2 == 1));

    let keys: Vec<u64> = remaining.iter().map(InFlightPacket::key).collect();
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replace_keeps_one_pubrel_per_identifier() {
    init_logger();

    let store = Arc::new(MemorySessionStore::new());
    let in_flight: Vec<_> = (1..=100u16)
        .map(|packet_identifier| store.store(publish(packet_identifier, QoS::ExactlyOnce)).unwrap())
        .collect();
    let in_flight = Arc::new(in_flight);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let in_flight = in_flight.clone();
        handles.push(tokio::spawn(async move {
            in_flight
                .iter()
                .map(|publish| store.replace(publish).unwrap())
                .collect::<Vec<_>>()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    // Every task observed the same PUBREL for each identifier.
    for pubrels in &results[1..] {
        assert_eq!(pubrels, &results[0]);
    }

    let packets = store.unacknowledged_packets();
    assert_eq!(packets.len(), 100);
    assert!(packets.iter().all(|packet| matches!(packet, InFlightPacket::Pubrel(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redelivery_is_detected_once() {
    init_logger();

    let store = MemorySessionStore::new();
    let packet = publish(42, QoS::ExactlyOnce);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        let packet = packet.clone();
        handles.push(tokio::spawn(async move { store.remember_incoming_packet_id(&packet).unwrap() }));
    }

    let mut first_sightings = 0;
    for handle in handles {
        if !handle.await.unwrap() {
            first_sightings += 1;
        }
    }
    assert_eq!(first_sightings, 1);

    store.release_incoming_packet_id(&PubRelPacket::new(42).unwrap());
    assert!(!store.has_incoming_packet_id(&packet));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn allocator_hands_out_unique_identifiers() {
    init_logger();

    let allocator = Arc::new(PacketIdAllocator::new());
    let store = MemorySessionStore::new();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let allocator = allocator.clone();
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut identifiers = Vec::new();
            for _ in 0..500 {
                let packet_identifier =
                    allocator.next_free_id(|id| store.contains(id)).unwrap();
                store.store(publish(packet_identifier, QoS::AtLeastOnce)).unwrap();
                identifiers.push(packet_identifier);
            }
            identifiers
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for packet_identifier in handle.await.unwrap() {
            assert_ne!(packet_identifier, 0);
            assert!(seen.insert(packet_identifier), "duplicate identifier {packet_identifier}");
        }
    }

    assert_eq!(seen.len(), 4000);
    assert_eq!(store.len(), 4000);
}
