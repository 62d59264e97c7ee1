//! Raw WebSocket framing
//!
//! The server reads frames below any WebSocket library so payload bytes can
//! be unmasked, captured and replayed exactly as the device sent them. Only
//! the encodings this device uses are supported: 7-bit and 16-bit payload
//! lengths. The 64-bit form is rejected; device payloads are tiny.
//!
//! Fragmented frames (`fin == false`) are returned as-is; reassembly is not
//! performed because multi-fragment messages have never been observed from
//! this firmware.

use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt};

/// WebSocket frame opcodes
pub mod opcode {
    pub const CONTINUATION: u8 = 0x0;
    pub const TEXT: u8 = 0x1;
    pub const BINARY: u8 = 0x2;
    pub const CLOSE: u8 = 0x8;
    pub const PING: u8 = 0x9;
    pub const PONG: u8 = 0xA;
}

/// A WebSocket frame, payload already unmasked
#[derive(Debug, Clone)]
pub struct WsFrame {
    pub fin: bool,
    pub opcode: u8,
    pub masked: bool,
    pub mask_key: [u8; 4],
    pub payload: Vec<u8>,
    /// Original frame bytes, kept for capture/analysis
    pub raw: Vec<u8>,
}

impl WsFrame {
    /// Human-readable opcode name
    pub fn opcode_name(&self) -> &'static str {
        opcode_name(self.opcode)
    }
}

pub fn opcode_name(op: u8) -> &'static str {
    match op {
        opcode::CONTINUATION => "continuation",
        opcode::TEXT => "text",
        opcode::BINARY => "binary",
        opcode::CLOSE => "close",
        opcode::PING => "ping",
        opcode::PONG => "pong",
        _ => "unknown",
    }
}

impl fmt::Display for WsFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WsFrame{{fin={}, opcode={}, masked={}, len={}}}",
            self.fin,
            self.opcode_name(),
            self.masked,
            self.payload.len()
        )
    }
}

/// Read one WebSocket frame from the stream.
///
/// Blocks the calling task until the frame is complete; any short read
/// propagates the I/O error unchanged, and no partial frame is ever
/// returned. Read deadlines, if desired, belong to the transport layer.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<WsFrame> {
    let mut header = [0u8; 2];
    r.read_exact(&mut header).await?;
    let mut raw = header.to_vec();

    let fin = header[0] & 0x80 != 0;
    let opcode = header[0] & 0x0F;
    let masked = header[1] & 0x80 != 0;

    let length = match header[1] & 0x7F {
        126 => {
            let mut ext = [0u8; 2];
            r.read_exact(&mut ext).await?;
            raw.extend_from_slice(&ext);
            u16::from_be_bytes(ext) as usize
        }
        127 => return Err(Error::UnsupportedFrameLength),
        n => n as usize,
    };

    let mut mask_key = [0u8; 4];
    if masked {
        r.read_exact(&mut mask_key).await?;
        raw.extend_from_slice(&mask_key);
    }

    let mut payload = vec![0u8; length];
    if length > 0 {
        r.read_exact(&mut payload).await?;
        raw.extend_from_slice(&payload);
        if masked {
            unmask_payload(&mut payload, mask_key);
        }
    }

    Ok(WsFrame {
        fin,
        opcode,
        masked,
        mask_key,
        payload,
        raw,
    })
}

/// XOR-unmask a payload in place. Involutive, so masking uses it too.
pub fn unmask_payload(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Build an unmasked server-to-client binary frame.
pub fn binary_frame(payload: &[u8]) -> Result<Bytes> {
    control_or_data_frame(opcode::BINARY, payload)
}

/// Build a pong frame echoing the ping payload.
pub fn pong_frame(payload: &[u8]) -> Result<Bytes> {
    control_or_data_frame(opcode::PONG, payload)
}

fn control_or_data_frame(op: u8, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > u16::MAX as usize {
        return Err(Error::WirePayloadTooLarge(payload.len()));
    }

    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u8(0x80 | op);
    if payload.len() < 126 {
        buf.put_u8(payload.len() as u8);
    } else {
        buf.put_u8(126);
        buf.put_u16(payload.len() as u16);
    }
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}
