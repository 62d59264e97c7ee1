//! Typed protocol messages
//!
//! A frame payload is discriminated on its first byte. The layouts below
//! come from firmware disassembly plus live captures; fields whose meaning
//! is still unknown are carried as opaque bytes rather than guessed at.
//! Unrecognized discriminators are not errors; they decode to
//! [`Message::Unknown`] so new traffic can still be observed and logged.

use crate::frame::DeviceFrame;
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Message type discriminators (first payload byte)
pub mod msg_type {
    /// Periodic unsolicited status, ~1.8 s cadence
    pub const TELEMETRY_BROADCAST: u8 = 0x01;
    /// Over-the-air firmware update, payload undocumented
    pub const OTA: u8 = 0x05;
    /// Response to a telemetry query
    pub const TELEMETRY_RESPONSE: u8 = 0x29;
    /// Generic command/response
    pub const COMMAND: u8 = 0x42;
    /// Extended command format, payload undocumented
    pub const EXTENDED: u8 = 0x44;
    /// Low-pressure mode status
    pub const PRESSURE_MODE: u8 = 0x55;
}

/// Periodic telemetry broadcast (0x01), sent with message ID 0x0FFFFFFF
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryBroadcast {
    pub telemetry_type: u8,
    pub status_type: u8,
    pub field1: u32,
    pub field2: u32,
    pub sub_type: u8,
    /// Field meanings still being mapped via device manipulation
    pub data: Bytes,
    /// Trailing 0x29 marker, when present
    pub trailing_marker: Option<u8>,
}

/// Telemetry response (0x29)
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryResponse {
    pub subtype: u8,
    pub field: u8,
    /// Only present in payloads long enough to carry it
    pub value: Option<u32>,
    pub trailing: Bytes,
}

/// Command message (0x42)
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// On the wire this is `data.len() + 5`, a firmware-internal convention
    pub length_field: u8,
    pub marker: u8,
    pub category: u32,
    pub data: Bytes,
}

/// Pressure mode status (0x55)
#[derive(Debug, Clone, PartialEq)]
pub struct PressureMode {
    pub subtype: u8,
    pub enabled: u8,
}

impl PressureMode {
    pub fn is_enabled(&self) -> bool {
        self.enabled != 0
    }
}

/// A decoded device message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    TelemetryBroadcast(TelemetryBroadcast),
    Ota { data: Bytes },
    TelemetryResponse(TelemetryResponse),
    Command(Command),
    Extended { data: Bytes },
    PressureMode(PressureMode),
    /// Well-formed but unrecognized; preserved verbatim for analysis
    Unknown { msg_type: u8, data: Bytes },
}

impl Message {
    /// The type discriminator byte
    pub fn msg_type(&self) -> u8 {
        match self {
            Message::TelemetryBroadcast(_) => msg_type::TELEMETRY_BROADCAST,
            Message::Ota { .. } => msg_type::OTA,
            Message::TelemetryResponse(_) => msg_type::TELEMETRY_RESPONSE,
            Message::Command(_) => msg_type::COMMAND,
            Message::Extended { .. } => msg_type::EXTENDED,
            Message::PressureMode(_) => msg_type::PRESSURE_MODE,
            Message::Unknown { msg_type, .. } => *msg_type,
        }
    }

    /// Human-readable kind name for logs
    pub fn kind_name(&self) -> &'static str {
        type_name(self.msg_type())
    }
}

/// Log-friendly name for a discriminator byte
pub fn type_name(msg_type: u8) -> &'static str {
    match msg_type {
        msg_type::TELEMETRY_BROADCAST => "TelemetryBroadcast",
        msg_type::OTA => "OTA",
        msg_type::TELEMETRY_RESPONSE => "TelemetryResponse",
        msg_type::COMMAND => "Command",
        msg_type::EXTENDED => "Extended",
        msg_type::PRESSURE_MODE => "PressureMode",
        _ => "Unknown",
    }
}

/// Whether a discriminator byte is one of the recognized message types
pub fn is_known_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        msg_type::TELEMETRY_BROADCAST
            | msg_type::OTA
            | msg_type::TELEMETRY_RESPONSE
            | msg_type::COMMAND
            | msg_type::EXTENDED
            | msg_type::PRESSURE_MODE
    )
}

/// Decode a frame payload into a typed message.
///
/// Fails for an empty payload (no discriminator) and for known types
/// shorter than their minimal form. Every other payload succeeds, producing
/// a typed message or [`Message::Unknown`].
pub fn parse_message(payload: &[u8]) -> Result<Message> {
    if payload.is_empty() {
        return Err(Error::EmptyPayload);
    }

    match payload[0] {
        msg_type::TELEMETRY_BROADCAST => parse_telemetry_broadcast(payload),
        msg_type::OTA => Ok(Message::Ota {
            data: Bytes::copy_from_slice(&payload[1..]),
        }),
        msg_type::TELEMETRY_RESPONSE => parse_telemetry_response(payload),
        msg_type::COMMAND => parse_command(payload),
        msg_type::EXTENDED => Ok(Message::Extended {
            data: Bytes::copy_from_slice(&payload[1..]),
        }),
        msg_type::PRESSURE_MODE => parse_pressure_mode(payload),
        other => Ok(Message::Unknown {
            msg_type: other,
            data: Bytes::copy_from_slice(&payload[1..]),
        }),
    }
}

fn parse_telemetry_broadcast(payload: &[u8]) -> Result<Message> {
    if payload.len() < 12 {
        return Err(Error::MessageTooShort {
            kind: "TelemetryBroadcast",
            needed: 12,
            have: payload.len(),
        });
    }

    let field1 = u32::from_le_bytes([payload[3], payload[4], payload[5], payload[6]]);
    let field2 = u32::from_le_bytes([payload[7], payload[8], payload[9], payload[10]]);

    // A trailing 0x29 marker is split off from the opaque data section
    let mut end = payload.len();
    let mut trailing_marker = None;
    if payload.len() > 12 && payload[payload.len() - 1] == msg_type::TELEMETRY_RESPONSE {
        trailing_marker = Some(msg_type::TELEMETRY_RESPONSE);
        end -= 1;
    }

    Ok(Message::TelemetryBroadcast(TelemetryBroadcast {
        telemetry_type: payload[1],
        status_type: payload[2],
        field1,
        field2,
        sub_type: payload[11],
        data: Bytes::copy_from_slice(&payload[12..end]),
        trailing_marker,
    }))
}

fn parse_telemetry_response(payload: &[u8]) -> Result<Message> {
    // Minimal 3-byte form: type + subtype + field
    if payload.len() < 3 {
        return Err(Error::MessageTooShort {
            kind: "TelemetryResponse",
            needed: 3,
            have: payload.len(),
        });
    }

    let value = if payload.len() >= 7 {
        Some(u32::from_le_bytes([
            payload[3], payload[4], payload[5], payload[6],
        ]))
    } else {
        None
    };

    let trailing = if payload.len() > 7 {
        Bytes::copy_from_slice(&payload[7..])
    } else {
        Bytes::new()
    };

    Ok(Message::TelemetryResponse(TelemetryResponse {
        subtype: payload[1],
        field: payload[2],
        value,
        trailing,
    }))
}

fn parse_command(payload: &[u8]) -> Result<Message> {
    if payload.len() < 7 {
        return Err(Error::MessageTooShort {
            kind: "Command",
            needed: 7,
            have: payload.len(),
        });
    }

    Ok(Message::Command(Command {
        length_field: payload[1],
        marker: payload[2],
        category: u32::from_le_bytes([payload[3], payload[4], payload[5], payload[6]]),
        data: Bytes::copy_from_slice(&payload[7..]),
    }))
}

fn parse_pressure_mode(payload: &[u8]) -> Result<Message> {
    if payload.len() < 3 {
        return Err(Error::MessageTooShort {
            kind: "PressureMode",
            needed: 3,
            have: payload.len(),
        });
    }

    Ok(Message::PressureMode(PressureMode {
        subtype: payload[1],
        enabled: payload[2],
    }))
}

// ============================================================================
// OUTBOUND BUILDERS
// ============================================================================

/// Build a command frame (type 0x42).
///
/// Payload layout: type, `len(data)+5`, marker 0x01, category (u32 LE),
/// data. The `+5` offset in the length field was recovered from firmware
/// disassembly; the device rejects commands without it.
pub fn build_command(message_id: u32, category: u32, data: &[u8]) -> Result<Bytes> {
    let mut payload = BytesMut::with_capacity(7 + data.len());
    payload.put_u8(msg_type::COMMAND);
    payload.put_u8((data.len() + 5) as u8);
    payload.put_u8(0x01);
    payload.put_u32_le(category);
    payload.extend_from_slice(data);
    DeviceFrame::build(message_id, &payload)
}

/// Build a telemetry query frame (type 0x29, query variant).
///
/// Fixed 19-byte payload matching the response structure: type, 0x11
/// marker, query type, 16 zero bytes.
pub fn build_telemetry_query(message_id: u32, query_type: u8) -> Result<Bytes> {
    let mut payload = [0u8; 19];
    payload[0] = msg_type::TELEMETRY_RESPONSE;
    payload[1] = 0x11;
    payload[2] = query_type;
    DeviceFrame::build(message_id, &payload)
}

/// Build a pressure-mode control frame (type 0x55).
pub fn build_pressure_mode_set(message_id: u32, enabled: bool) -> Result<Bytes> {
    let payload = [msg_type::PRESSURE_MODE, 0x04, u8::from(enabled)];
    DeviceFrame::build(message_id, &payload)
}

// ============================================================================
// DISPLAY
// ============================================================================

impl fmt::Display for TelemetryBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TelemetryBroadcast{{telemetry_type=0x{:02x}, status=0x{:02x}, field1=0x{:08x}, field2=0x{:08x}, subtype=0x{:02x}, data_len={}}}",
            self.telemetry_type, self.status_type, self.field1, self.field2, self.sub_type, self.data.len()
        )
    }
}

impl fmt::Display for TelemetryResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(v) => write!(
                f,
                "TelemetryResponse{{subtype=0x{:02x}, field=0x{:02x}, value={} (0x{:08x})}}",
                self.subtype, self.field, v, v
            ),
            None => write!(
                f,
                "TelemetryResponse{{subtype=0x{:02x}, field=0x{:02x}}}",
                self.subtype, self.field
            ),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command{{length_field={}, marker=0x{:02x}, category={} (0x{:08x}), data_len={}}}",
            self.length_field,
            self.marker,
            self.category,
            self.category,
            self.data.len()
        )
    }
}

impl fmt::Display for PressureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PressureMode{{subtype=0x{:02x}, {}}}",
            self.subtype,
            if self.is_enabled() {
                "enabled"
            } else {
                "disabled"
            }
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::TelemetryBroadcast(m) => m.fmt(f),
            Message::Ota { data } => write!(f, "OTA{{len={}}}", data.len()),
            Message::TelemetryResponse(m) => m.fmt(f),
            Message::Command(m) => m.fmt(f),
            Message::Extended { data } => write!(f, "Extended{{len={}}}", data.len()),
            Message::PressureMode(m) => m.fmt(f),
            Message::Unknown { msg_type, data } => {
                write!(f, "Unknown{{type=0x{:02x}, len={}}}", msg_type, data.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_error() {
        assert!(matches!(parse_message(&[]), Err(Error::EmptyPayload)));
    }

    #[test]
    fn test_pressure_mode_roundtrip() {
        let frame = build_pressure_mode_set(7, true).unwrap();
        let decoded = DeviceFrame::parse(&frame).unwrap();
        match parse_message(&decoded.payload).unwrap() {
            Message::PressureMode(m) => {
                assert_eq!(m.subtype, 0x04);
                assert!(m.is_enabled());
            }
            other => panic!("expected PressureMode, got {other}"),
        }
    }

    #[test]
    fn test_minimal_telemetry_response() {
        let msg = parse_message(&[0x29, 0x11, 0x80]).unwrap();
        match msg {
            Message::TelemetryResponse(m) => {
                assert_eq!(m.subtype, 0x11);
                assert_eq!(m.field, 0x80);
                assert_eq!(m.value, None);
            }
            other => panic!("expected TelemetryResponse, got {other}"),
        }
    }

    #[test]
    fn test_telemetry_response_with_value() {
        let msg = parse_message(&[0x29, 0x11, 0x80, 0x78, 0x56, 0x34, 0x12]).unwrap();
        match msg {
            Message::TelemetryResponse(m) => assert_eq!(m.value, Some(0x1234_5678)),
            other => panic!("expected TelemetryResponse, got {other}"),
        }
    }

    #[test]
    fn test_unknown_type_preserved() {
        let msg = parse_message(&[0x99, 0xDE, 0xAD]).unwrap();
        match msg {
            Message::Unknown { msg_type, data } => {
                assert_eq!(msg_type, 0x99);
                assert_eq!(data.as_ref(), &[0xDE, 0xAD]);
            }
            other => panic!("expected Unknown, got {other}"),
        }
    }

    #[test]
    fn test_telemetry_query_layout() {
        let frame = build_telemetry_query(1, 0x80).unwrap();
        let decoded = DeviceFrame::parse(&frame).unwrap();
        assert_eq!(decoded.payload.len(), 19);
        assert_eq!(decoded.payload[0], 0x29);
        assert_eq!(decoded.payload[1], 0x11);
        assert_eq!(decoded.payload[2], 0x80);
        assert!(decoded.payload[3..].iter().all(|&b| b == 0));
    }
}
