//! Traffic capture for protocol analysis
//!
//! Writes one JSON object per WebSocket frame, both directions, to a
//! per-run JSONL file. The raw frame bytes are kept alongside the decoded
//! view so captures can be replayed bit-exactly when a field's meaning is
//! revised later.

use crate::error::{Result, ServerError};
use parking_lot::Mutex;
use serde::Serialize;
use smartap_core::wire::WsFrame;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// One captured frame, serialized as a JSONL line
#[derive(Debug, Serialize)]
struct CaptureRecord<'a> {
    timestamp_us: u128,
    message_num: u64,
    remote_addr: &'a str,
    /// "inbound" (device to server) or "outbound"
    direction: &'a str,
    frame_type: &'a str,
    opcode: u8,
    fin: bool,
    masked: bool,
    payload_length: usize,
    payload_hex: String,
    payload_ascii: String,
    raw_frame_hex: String,
}

/// Append-only JSONL capture file shared by all connections.
pub struct CaptureSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
    counter: AtomicU64,
}

impl CaptureSink {
    /// Open a new capture file named by the current Unix time under `dir`,
    /// creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ServerError::Capture(format!("system clock: {e}")))?
            .as_secs();
        let path = dir.join(format!("capture-{secs}.jsonl"));
        let file = File::create(&path)?;
        info!(path = %path.display(), "capture enabled");

        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
            counter: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an inbound frame as read off the wire.
    pub fn record_inbound(&self, remote_addr: &str, frame: &WsFrame) -> Result<()> {
        self.write_record(CaptureRecord {
            timestamp_us: now_us(),
            message_num: self.counter.fetch_add(1, Ordering::Relaxed),
            remote_addr,
            direction: "inbound",
            frame_type: frame.opcode_name(),
            opcode: frame.opcode,
            fin: frame.fin,
            masked: frame.masked,
            payload_length: frame.payload.len(),
            payload_hex: hex_string(&frame.payload),
            payload_ascii: ascii_string(&frame.payload),
            raw_frame_hex: hex_string(&frame.raw),
        })
    }

    /// Record an outbound binary frame. `raw` is the full frame as written,
    /// `payload` the protocol bytes inside it.
    pub fn record_outbound(&self, remote_addr: &str, payload: &[u8], raw: &[u8]) -> Result<()> {
        self.write_record(CaptureRecord {
            timestamp_us: now_us(),
            message_num: self.counter.fetch_add(1, Ordering::Relaxed),
            remote_addr,
            direction: "outbound",
            frame_type: "binary",
            opcode: smartap_core::wire::opcode::BINARY,
            fin: true,
            masked: false,
            payload_length: payload.len(),
            payload_hex: hex_string(payload),
            payload_ascii: ascii_string(payload),
            raw_frame_hex: hex_string(raw),
        })
    }

    fn write_record(&self, record: CaptureRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(&record)
            .map_err(|e| ServerError::Capture(format!("serialize: {e}")))?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        // Flush per record so captures survive a crash mid-session
        writer.flush()?;
        Ok(())
    }
}

fn now_us() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or(0)
}

/// Lowercase hex rendering of a byte slice
pub fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Printable-ASCII rendering with `.` for everything else
pub fn ascii_string(data: &[u8]) -> String {
    data.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
