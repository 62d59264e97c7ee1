//! Device frame encoding/decoding
//!
//! Frame layout (all integers little-endian), recovered from firmware
//! disassembly:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Byte 0:     Sync (0x7e)                                    │
//! │ Byte 1:     Version (0x03)                                 │
//! │ Byte 2-5:   Message ID (uint32 LE)                         │
//! │ Byte 6-7:   Payload length (uint16 LE, payload bytes only) │
//! ├────────────────────────────────────────────────────────────┤
//! │ Payload (length bytes)                                     │
//! ├────────────────────────────────────────────────────────────┤
//! │ Zero padding until total size >= 38                        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The firmware pads every frame it sends to a 38-byte floor and expects the
//! same of frames it receives, so [`DeviceFrame::build`] always pads.
//! Parsing is deliberately more lenient: it accepts any buffer that holds
//! the header plus the declared payload, and discards trailing padding
//! without inspecting it.

use crate::message;
use crate::{Error, Result, PROTOCOL_VERSION, SYNC_BYTE};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Frame header size: sync + version + 4-byte ID + 2-byte length
pub const HEADER_SIZE: usize = 8;

/// Minimum total frame size on the wire (zero-padded below this)
pub const MIN_FRAME_SIZE: usize = 38;

/// Defensive payload cap, not an observed protocol limit
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// A parsed device frame
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFrame {
    pub message_id: u32,
    pub payload: Bytes,
}

impl DeviceFrame {
    /// Parse a device frame from raw bytes.
    ///
    /// Trailing bytes past the declared payload length are padding and are
    /// discarded, not validated.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::FrameTooSmall {
                needed: HEADER_SIZE,
                have: buf.len(),
            });
        }

        if buf[0] != SYNC_BYTE {
            return Err(Error::InvalidSync(buf[0]));
        }
        if buf[1] != PROTOCOL_VERSION {
            return Err(Error::InvalidVersion(buf[1]));
        }

        let message_id = u32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let length = u16::from_le_bytes([buf[6], buf[7]]) as usize;

        if HEADER_SIZE + length > buf.len() {
            return Err(Error::TruncatedPayload {
                length,
                needed: HEADER_SIZE + length,
                have: buf.len(),
            });
        }

        Ok(Self {
            message_id,
            payload: Bytes::copy_from_slice(&buf[HEADER_SIZE..HEADER_SIZE + length]),
        })
    }

    /// Build a complete frame, zero-padded to the 38-byte floor.
    pub fn build(message_id: u32, payload: &[u8]) -> Result<Bytes> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge(payload.len()));
        }

        let size = (HEADER_SIZE + payload.len()).max(MIN_FRAME_SIZE);
        let mut buf = BytesMut::with_capacity(size);

        buf.put_u8(SYNC_BYTE);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u32_le(message_id);
        buf.put_u16_le(payload.len() as u16);
        buf.extend_from_slice(payload);
        buf.resize(size, 0);

        Ok(buf.freeze())
    }
}

impl fmt::Display for DeviceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame{{id={} (0x{:08x}), len={}}}",
            self.message_id,
            self.message_id,
            self.payload.len()
        )
    }
}

/// Strict self-check for constructed frames.
///
/// Stricter than [`DeviceFrame::parse`] on purpose: it enforces the padded
/// minimum size and requires a known message type, so it must not be used on
/// inbound traffic (which may legitimately carry unknown types). Testing and
/// debugging aid for the outbound path.
pub fn validate_frame(frame: &[u8]) -> Result<()> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(Error::FrameTooSmall {
            needed: MIN_FRAME_SIZE,
            have: frame.len(),
        });
    }
    if frame[0] != SYNC_BYTE {
        return Err(Error::InvalidSync(frame[0]));
    }
    if frame[1] != PROTOCOL_VERSION {
        return Err(Error::InvalidVersion(frame[1]));
    }

    let length = u16::from_le_bytes([frame[6], frame[7]]) as usize;
    if HEADER_SIZE + length > frame.len() {
        return Err(Error::TruncatedPayload {
            length,
            needed: HEADER_SIZE + length,
            have: frame.len(),
        });
    }

    if length > 0 && !message::is_known_type(frame[HEADER_SIZE]) {
        return Err(Error::UnknownMessageType(frame[HEADER_SIZE]));
    }

    Ok(())
}

/// Header checksum computed firmware-side: sum of the 8 header bytes plus 3.
///
/// Never observed on the wire; the firmware appears to use it internally.
/// Kept for analysis work.
pub fn header_checksum(header: &[u8]) -> u8 {
    if header.len() < HEADER_SIZE {
        return 0;
    }
    let sum: u16 = header[..HEADER_SIZE]
        .iter()
        .fold(3u16, |acc, &b| acc.wrapping_add(b as u16));
    (sum & 0xFF) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parse_roundtrip() {
        let payload = [0x55, 0x04, 0x01];
        let encoded = DeviceFrame::build(42, &payload).unwrap();
        let decoded = DeviceFrame::parse(&encoded).unwrap();

        assert_eq!(decoded.message_id, 42);
        assert_eq!(decoded.payload.as_ref(), &payload);
    }

    #[test]
    fn test_padding_floor() {
        let encoded = DeviceFrame::build(1, &[0x29]).unwrap();
        assert_eq!(encoded.len(), MIN_FRAME_SIZE);
        // Padding bytes are zero
        assert!(encoded[9..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_large_payload_unpadded() {
        let payload = vec![0xAA; 100];
        let encoded = DeviceFrame::build(1, &payload).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 100);
    }

    #[test]
    fn test_invalid_sync() {
        let mut buf = DeviceFrame::build(1, &[0x42; 7]).unwrap().to_vec();
        buf[0] = 0x00;
        assert!(matches!(
            DeviceFrame::parse(&buf),
            Err(Error::InvalidSync(0x00))
        ));
    }

    #[test]
    fn test_truncated_payload() {
        // Header declares 100 payload bytes, buffer holds 30
        let mut buf = vec![0u8; MIN_FRAME_SIZE];
        buf[0] = SYNC_BYTE;
        buf[1] = PROTOCOL_VERSION;
        buf[6] = 100;
        assert!(matches!(
            DeviceFrame::parse(&buf),
            Err(Error::TruncatedPayload { length: 100, .. })
        ));
    }

    #[test]
    fn test_checksum_short_header() {
        assert_eq!(header_checksum(&[0x7e, 0x03]), 0);
    }
}
