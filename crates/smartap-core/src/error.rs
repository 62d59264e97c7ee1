//! Error types for the Smartap protocol engine

use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol engine error types
///
/// Malformed traffic is reported once and never retried here; resync policy
/// belongs to the caller. Handshake variants carry the offending header value
/// because rejections are what device owners report first.
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer smaller than the frame header
    #[error("frame too small: {have} bytes (minimum {needed})")]
    FrameTooSmall { needed: usize, have: usize },

    /// First byte is not 0x7e
    #[error("invalid sync byte: 0x{0:02x} (expected 0x7e)")]
    InvalidSync(u8),

    /// Second byte is not 0x03
    #[error("invalid version: 0x{0:02x} (expected 0x03)")]
    InvalidVersion(u8),

    /// Declared payload length overruns the buffer
    #[error("truncated payload: declared {length} bytes, need {needed}, have {have}")]
    TruncatedPayload {
        length: usize,
        needed: usize,
        have: usize,
    },

    /// No type discriminator available
    #[error("empty payload")]
    EmptyPayload,

    /// Known message type with too few bytes for its minimal form
    #[error("{kind} payload too short: {have} bytes (minimum {needed})")]
    MessageTooShort {
        kind: &'static str,
        needed: usize,
        have: usize,
    },

    /// Outbound payload over the defensive 1024-byte cap
    #[error("payload too large: {0} bytes (max 1024)")]
    PayloadTooLarge(usize),

    /// Strict validation only; inbound parsing maps these to `Unknown`
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    #[error("dual-valve message must be exactly 77 bytes, got {0}")]
    DualValveLength(usize),

    #[error("dual-valve cold marker mismatch: 0x{0:02x} at byte 0 (expected 0x01)")]
    DualValveColdMarker(u8),

    #[error("dual-valve hot marker mismatch: 0x{0:02x} at byte 38 (expected 0x02)")]
    DualValveHotMarker(u8),

    #[error("dual-valve terminator mismatch: 0x{0:02x} at byte 76 (expected 0x0a)")]
    DualValveTerminator(u8),

    /// 64-bit extended wire lengths never occur with this device
    #[error("unsupported wire frame length encoding (64-bit)")]
    UnsupportedFrameLength,

    /// Outbound wire payload over the 16-bit length limit
    #[error("wire payload too large for a 16-bit frame: {0} bytes")]
    WirePayloadTooLarge(usize),

    #[error("handshake rejected: method {0:?} (expected GET)")]
    InvalidMethod(String),

    #[error("handshake rejected: Upgrade header {0:?} (expected websocket)")]
    InvalidUpgradeHeader(String),

    #[error("handshake rejected: Connection header {0:?} does not contain upgrade")]
    InvalidConnectionHeader(String),

    #[error("handshake rejected: Sec-WebSocket-Version {0:?} (expected 13)")]
    InvalidWebSocketVersion(String),

    #[error("handshake rejected: missing Sec-WebSocket-Key header")]
    MissingWebSocketKey,

    #[error("malformed HTTP request: {0}")]
    MalformedRequest(String),

    /// Transport failures surface unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
