use bytes::Bytes;
use mqtt5_core::{
    packets::{
        auth_packet::{AuthPacket, AuthProperties},
        conn_ack_packet::{ConnAckPacket, ConnAckProperties},
        connect_packet::{ConnectPacket, ConnectProperties, WillMessage, WillProperties},
        disconnect_packet::DisconnectPacket,
        ping_req_packet::PingReqPacket,
        ping_resp_packet::PingRespPacket,
        pub_ack_packet::{AckProperties, PubAckPacket, PubCompPacket, PubRecPacket, PubRelPacket},
        publish_packet::{PublishPacket, PublishProperties},
        sub_ack_packet::SubAckPacket,
        subscribe_packet::{SubscribePacket, SubscribeProperties},
        unsub_ack_packet::UnsubAckPacket,
        unsubscribe_packet::UnsubscribePacket,
    },
    Packet, PacketReader, QoS, ReasonCode, RetainHandling, SubscriptionOptions, TopicFilter,
    UserProperty,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ack_properties() -> AckProperties {
    AckProperties {
        reason_string: Some("diagnostics".to_string()),
        user_properties: vec![UserProperty::new("trace", "1"), UserProperty::new("trace", "2")],
    }
}

fn sample_packets() -> Vec<Packet> {
    let mut will = WillMessage::new("clients/42/status", &b"gone"[..]);
    will.qos = QoS::AtLeastOnce;
    will.retain = true;
    will.properties = WillProperties {
        will_delay_interval: Some(5),
        message_expiry_interval: Some(120),
        ..WillProperties::default()
    };

    let mut connect = ConnectPacket::new("client-42");
    connect.clean_start = false;
    connect.keep_alive = 300;
    connect.properties = ConnectProperties {
        session_expiry_interval: Some(3600),
        receive_maximum: Some(32),
        user_properties: vec![UserProperty::new("app", "demo")],
        ..ConnectProperties::default()
    };
    connect.will = Some(will);
    connect.username = Some("alice".to_string());
    connect.password = Some(Bytes::from_static(b"s3cret"));

    let connack = ConnAckPacket::new(true, ReasonCode::Success)
        .unwrap()
        .with_properties(ConnAckProperties {
            assigned_client_identifier: Some("auto-7".to_string()),
            maximum_qos: Some(QoS::AtLeastOnce),
            topic_alias_maximum: Some(8),
            ..ConnAckProperties::default()
        });

    let publish = PublishPacket::builder("test/topic")
        .dup(true)
        .qos(QoS::ExactlyOnce)
        .retain(true)
        .packet_identifier(74)
        .properties(PublishProperties {
            payload_format_indicator: Some(true),
            message_expiry_interval: Some(10),
            response_topic: Some("test/reply".to_string()),
            correlation_data: Some(Bytes::from_static(&[0xDE, 0xAD])),
            user_properties: vec![UserProperty::new("k", "v")],
            subscription_identifiers: vec![3, 70_000],
            content_type: Some("text/plain".to_string()),
            ..PublishProperties::default()
        })
        .payload(&b"payload"[..])
        .build()
        .unwrap();

    let options = SubscriptionOptions {
        qos: QoS::ExactlyOnce,
        no_local: true,
        retain_as_published: false,
        retain_handling: RetainHandling::DoNotSend,
    };
    let subscribe = SubscribePacket::new(
        11,
        vec![
            TopicFilter::new("home/+/temperature", options).unwrap(),
            TopicFilter::new("alerts/#", SubscriptionOptions::new(QoS::AtMostOnce)).unwrap(),
        ],
    )
    .unwrap()
    .with_properties(SubscribeProperties { subscription_identifier: Some(99), user_properties: vec![] })
    .unwrap();

    let mut auth_properties = AuthProperties::new("SCRAM-SHA-1");
    auth_properties.authentication_data = Some(Bytes::from_static(b"server-first"));

    vec![
        connect.into(),
        connack.into(),
        publish.into(),
        PublishPacket::builder("").properties(PublishProperties { topic_alias: Some(2), ..Default::default() }).build().unwrap().into(),
        PubAckPacket::new(1).unwrap().into(),
        PubRecPacket::with_reason(2, ReasonCode::NoMatchingSubscribers, ack_properties()).unwrap().into(),
        PubRelPacket::with_reason(3, ReasonCode::PacketIdentifierNotFound, AckProperties::default()).unwrap().into(),
        PubCompPacket::with_reason(4, ReasonCode::Success, ack_properties()).unwrap().into(),
        subscribe.into(),
        SubAckPacket::new(11, vec![ReasonCode::GrantedQoS2, ReasonCode::GrantedQoS0])
            .unwrap()
            .with_properties(ack_properties())
            .into(),
        UnsubscribePacket::new(12, vec!["home/+/temperature".to_string()]).unwrap().into(),
        UnsubAckPacket::new(12, vec![ReasonCode::NoSubscriptionExisted]).unwrap().into(),
        PingReqPacket.into(),
        PingRespPacket.into(),
        DisconnectPacket::default().into(),
        DisconnectPacket::builder()
            .reason_code(ReasonCode::DisconnectWithWillMessage)
            .session_expiry_interval(60)
            .build()
            .unwrap()
            .into(),
        AuthPacket::new(ReasonCode::ContinueAuthentication, auth_properties).unwrap().into(),
    ]
}

#[test]
fn every_packet_type_round_trips() {
    init_logger();

    for packet in sample_packets() {
        let bytes = packet.encode().unwrap();
        assert_eq!(Packet::decode(&bytes).unwrap(), packet, "{}", hex::encode(&bytes));
    }
}

#[test]
fn reader_splits_a_concatenated_stream() {
    init_logger();

    let packets = sample_packets();
    let stream: Vec<u8> = packets
        .iter()
        .flat_map(|packet| packet.encode().unwrap().to_vec())
        .collect();

    let mut reader = PacketReader::new();
    let mut decoded = Vec::new();

    // Feed the stream in small, uneven chunks.
    for chunk in stream.chunks(7) {
        reader.extend(chunk);
        while let Some(packet) = reader.next_packet().unwrap() {
            decoded.push(packet);
        }
    }

    assert_eq!(decoded, packets);
    assert_eq!(reader.buffered_len(), 0);
}

#[test]
fn packet_identifiers_are_exposed() {
    let identifiers: Vec<Option<u16>> =
        sample_packets().iter().map(Packet::packet_identifier).collect();

    assert_eq!(
        identifiers,
        vec![
            None,
            None,
            Some(74),
            None,
            Some(1),
            Some(2),
            Some(3),
            Some(4),
            Some(11),
            Some(11),
            Some(12),
            Some(12),
            None,
            None,
            None,
            None,
            None,
        ]
    );
}
