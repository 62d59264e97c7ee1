//! Message parse/build integration tests

use smartap_core::message::{
    self, build_command, build_telemetry_query, msg_type, parse_message, Message,
};
use smartap_core::{DeviceFrame, Error};

/// An 11-byte telemetry response frame captured from a live session.
const CAPTURED_RESPONSE: [u8; 11] = [
    0x7e, 0x03, 0x64, 0x00, 0x00, 0x00, 0x03, 0x00, 0x29, 0x11, 0x80,
];

#[test]
fn test_captured_telemetry_response_frame() {
    let frame = DeviceFrame::parse(&CAPTURED_RESPONSE).unwrap();
    assert_eq!(frame.message_id, 100);
    assert_eq!(frame.payload.len(), 3);

    match parse_message(&frame.payload).unwrap() {
        Message::TelemetryResponse(m) => {
            assert_eq!(m.subtype, 0x11);
            assert_eq!(m.field, 0x80);
            assert_eq!(m.value, None);
            assert!(m.trailing.is_empty());
        }
        other => panic!("expected TelemetryResponse, got {other}"),
    }
}

#[test]
fn test_command_roundtrip() {
    let encoded = build_command(200, 0x1234, &[0xFF, 0xEE, 0xDD]).unwrap();
    let frame = DeviceFrame::parse(&encoded).unwrap();
    assert_eq!(frame.message_id, 200);

    match parse_message(&frame.payload).unwrap() {
        Message::Command(cmd) => {
            // Wire length field is data length plus the fixed 5 offset
            assert_eq!(cmd.length_field, 8);
            assert_eq!(cmd.marker, 0x01);
            assert_eq!(cmd.category, 0x1234);
            assert_eq!(cmd.data.as_ref(), &[0xFF, 0xEE, 0xDD]);
        }
        other => panic!("expected Command, got {other}"),
    }
}

#[test]
fn test_telemetry_query_roundtrip() {
    let encoded = build_telemetry_query(3, 0x80).unwrap();
    let frame = DeviceFrame::parse(&encoded).unwrap();

    // The query reuses the response discriminator, so it decodes as one
    match parse_message(&frame.payload).unwrap() {
        Message::TelemetryResponse(m) => {
            assert_eq!(m.subtype, 0x11);
            assert_eq!(m.field, 0x80);
            assert_eq!(m.value, Some(0));
        }
        other => panic!("expected TelemetryResponse, got {other}"),
    }
}

#[test]
fn test_telemetry_broadcast_fields() {
    let mut payload = vec![
        msg_type::TELEMETRY_BROADCAST,
        0x02, // telemetry type
        0x07, // status type
        0x78, 0x56, 0x34, 0x12, // field1 LE
        0x01, 0x00, 0x00, 0x00, // field2 LE
        0x05, // subtype
    ];
    payload.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
    payload.push(0x29);

    match parse_message(&payload).unwrap() {
        Message::TelemetryBroadcast(m) => {
            assert_eq!(m.telemetry_type, 0x02);
            assert_eq!(m.status_type, 0x07);
            assert_eq!(m.field1, 0x1234_5678);
            assert_eq!(m.field2, 1);
            assert_eq!(m.sub_type, 0x05);
            assert_eq!(m.data.as_ref(), &[0xAA, 0xBB, 0xCC]);
            assert_eq!(m.trailing_marker, Some(0x29));
        }
        other => panic!("expected TelemetryBroadcast, got {other}"),
    }
}

#[test]
fn test_broadcast_too_short() {
    let payload = [msg_type::TELEMETRY_BROADCAST; 11];
    assert!(matches!(
        parse_message(&payload),
        Err(Error::MessageTooShort {
            kind: "TelemetryBroadcast",
            needed: 12,
            have: 11,
        })
    ));
}

#[test]
fn test_every_discriminator_decodes_or_is_unknown() {
    // Any non-empty payload of reasonable length decodes; unrecognized
    // discriminators become Unknown rather than an error.
    for byte in 0u8..=255 {
        let payload = [byte, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let msg = parse_message(&payload).unwrap();
        if message::is_known_type(byte) {
            assert_eq!(msg.kind_name(), message::type_name(byte), "type 0x{byte:02x}");
            assert_ne!(msg.kind_name(), "Unknown", "type 0x{byte:02x}");
        } else {
            assert!(
                matches!(msg, Message::Unknown { msg_type, .. } if msg_type == byte),
                "type 0x{byte:02x}"
            );
        }
    }
}

#[test]
fn test_ota_and_extended_are_opaque() {
    match parse_message(&[msg_type::OTA, 0x01, 0x02]).unwrap() {
        Message::Ota { data } => assert_eq!(data.as_ref(), &[0x01, 0x02]),
        other => panic!("expected OTA, got {other}"),
    }
    match parse_message(&[msg_type::EXTENDED]).unwrap() {
        Message::Extended { data } => assert!(data.is_empty()),
        other => panic!("expected Extended, got {other}"),
    }
}
