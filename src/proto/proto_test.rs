use bytes::Bytes;
use prost::Message as _;

use super::*;
use crate::ring::Endpoint;

#[test]
fn test_stream_status_message_round_trip() {
    let mut status = StreamStatus::new("users-1-Data.db", 1024);
    status.bytes_received = 1024;
    status.set_action(StreamAction::Delete);
    let message = StreamStatusMessage {
        status: Some(status.clone()),
    };

    let encoded = message.encode_to_vec();
    let decoded = StreamStatusMessage::decode(encoded.as_slice()).unwrap();
    assert_eq!(decoded.status, Some(status));
    assert_eq!(decoded.status.unwrap().action(), StreamAction::Delete);
}

#[test]
fn test_initiate_message_round_trip() {
    let message = BootstrapInitiateMessage {
        contexts: vec![
            StreamContext {
                table: "ks".to_string(),
                target_file: "/data/ks/users-1-Data.db".to_string(),
                expected_bytes: 4096,
            },
            StreamContext {
                table: "ks".to_string(),
                target_file: "/data/ks/users-1-Index.db".to_string(),
                expected_bytes: 128,
            },
        ],
    };

    let decoded =
        BootstrapInitiateMessage::decode(message.encode_to_vec().as_slice()).unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn test_envelope_reply_echoes_correlation_id() {
    let from = Endpoint::new("a", 7000);
    let mut request = Message::new(Verb::BootstrapToken, &from, Bytes::new());
    request.id = 42;

    let replier = Endpoint::new("b", 7000);
    let reply = request.reply(&replier, Bytes::from_static(b"17"));
    assert_eq!(reply.id, 42);
    assert_eq!(reply.from_endpoint(), replier);
    assert_eq!(reply.verb(), Verb::BootstrapToken);
}

#[test]
fn test_unknown_verb_maps_to_unspecified() {
    let from = Endpoint::new("a", 7000);
    let mut message = Message::new(Verb::BootstrapToken, &from, Bytes::new());
    message.verb = 999;
    assert_eq!(message.verb(), Verb::Unspecified);
}

#[test]
fn test_typed_body_round_trip() {
    let from = Endpoint::new("a", 7000);
    let chunk = FileChunk {
        file: "/data/ks/users-1-Data.db".to_string(),
        offset: 64,
        data: Bytes::from_static(b"rows"),
        eof: true,
        crc: 0xDEAD_BEEF,
    };
    let message = Message::new(Verb::StreamChunk, &from, Message::encode_body(&chunk));
    assert_eq!(message.decode_body::<FileChunk>().unwrap(), chunk);
}

#[test]
fn test_metadata_message_round_trip() {
    let message = BootstrapMetadataMessage {
        ranges: vec![RingRange {
            left: "30".to_string(),
            right: "5".to_string(),
        }],
        target_host: "d".to_string(),
        target_port: 7000,
    };
    let decoded =
        BootstrapMetadataMessage::decode(message.encode_to_vec().as_slice()).unwrap();
    assert_eq!(decoded, message);
}
