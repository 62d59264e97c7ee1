//! Handshake and wire-level stream tests

use smartap_core::handshake::{Handshake, HandshakeState, UPGRADE_RESPONSE};
use smartap_core::wire::{self, opcode};
use smartap_core::Error;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

const UPGRADE_REQUEST: &[u8] = b"GET /ws HTTP/1.1\r\n\
Host: 192.168.1.10\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
Sec-WebSocket-Version: 13\r\n\
\r\n";

fn mask(payload: &[u8], key: [u8; 4]) -> Vec<u8> {
    let mut out = payload.to_vec();
    wire::unmask_payload(&mut out, key);
    out
}

#[tokio::test]
async fn test_upgrade_writes_exact_response() {
    let (mut client, mut server) = duplex(4096);
    client.write_all(UPGRADE_REQUEST).await.unwrap();

    let mut hs = Handshake::new();
    assert_eq!(hs.state(), HandshakeState::AwaitingRequest);
    let req = hs.run(&mut server).await.unwrap();
    assert_eq!(hs.state(), HandshakeState::Upgraded);
    assert_eq!(req.method, "GET");
    assert_eq!(req.target, "/ws");

    let mut response = vec![0u8; UPGRADE_RESPONSE.len()];
    client.read_exact(&mut response).await.unwrap();
    assert_eq!(response, UPGRADE_RESPONSE);

    // No Sec-WebSocket-Accept, Server or Date header follows; the firmware
    // drops the connection if any extra bytes precede its first frame.
    assert!(std::str::from_utf8(&response)
        .unwrap()
        .ends_with("Connection: Upgrade\r\n\r\n"));
}

#[tokio::test]
async fn test_handshake_leaves_following_frames_unread() {
    let (mut client, mut server) = duplex(4096);

    // Request and first protocol frame arrive in one write
    let key = [1, 2, 3, 4];
    let payload = mask(&[0x55, 0x04, 0x01], key);
    let mut bytes = UPGRADE_REQUEST.to_vec();
    bytes.extend_from_slice(&[0x82, 0x83]);
    bytes.extend_from_slice(&key);
    bytes.extend_from_slice(&payload);
    client.write_all(&bytes).await.unwrap();

    let mut hs = Handshake::new();
    hs.run(&mut server).await.unwrap();

    let frame = wire::read_frame(&mut server).await.unwrap();
    assert_eq!(frame.opcode, opcode::BINARY);
    assert_eq!(frame.payload, vec![0x55, 0x04, 0x01]);
}

#[tokio::test]
async fn test_non_get_rejected() {
    let (mut client, mut server) = duplex(4096);
    client
        .write_all(b"POST /ws HTTP/1.1\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: k\r\n\r\n")
        .await
        .unwrap();

    let mut hs = Handshake::new();
    let err = hs.run(&mut server).await.unwrap_err();
    assert_eq!(hs.state(), HandshakeState::Rejected);
    assert!(matches!(err, Error::InvalidMethod(m) if m == "POST"));
}

#[tokio::test]
async fn test_missing_upgrade_header_rejected() {
    let (mut client, mut server) = duplex(4096);
    client
        .write_all(b"GET /ws HTTP/1.1\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: k\r\n\r\n")
        .await
        .unwrap();

    let mut hs = Handshake::new();
    let err = hs.run(&mut server).await.unwrap_err();
    assert_eq!(hs.state(), HandshakeState::Rejected);
    assert!(matches!(err, Error::InvalidUpgradeHeader(_)));
}

#[tokio::test]
async fn test_rejection_writes_nothing() {
    let (mut client, mut server) = duplex(4096);
    client
        .write_all(b"GET /ws HTTP/1.1\r\nUpgrade: h2c\r\nConnection: Upgrade\r\nSec-WebSocket-Version: 13\r\nSec-WebSocket-Key: k\r\n\r\n")
        .await
        .unwrap();

    let mut hs = Handshake::new();
    hs.run(&mut server).await.unwrap_err();
    drop(server);

    let mut leftover = Vec::new();
    client.read_to_end(&mut leftover).await.unwrap();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn test_64bit_length_frame_rejected() {
    let (mut client, mut server) = duplex(4096);
    client.write_all(&[0x82, 0x7F]).await.unwrap();

    assert!(matches!(
        wire::read_frame(&mut server).await,
        Err(Error::UnsupportedFrameLength)
    ));
}
