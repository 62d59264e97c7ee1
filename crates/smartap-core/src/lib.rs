//! Smartap protocol engine
//!
//! Codecs for the proprietary binary protocol spoken by Smartap
//! valve/shower controllers, recovered by reverse-engineering the device
//! firmware. The vendor cloud is gone and no specification exists, so the
//! decoders fail safely on anything not yet understood and the encoders
//! reproduce firmware padding and length conventions byte-for-byte.
//!
//! This crate provides:
//! - Device frame encoding/decoding ([`DeviceFrame`])
//! - Typed message parsing and construction ([`message`])
//! - The 77-byte dual-valve status special case ([`valve`])
//! - Raw WebSocket frame reading below any library abstraction ([`wire`])
//! - The non-standard upgrade handshake the firmware requires ([`handshake`])

pub mod error;
pub mod frame;
pub mod handshake;
pub mod ids;
pub mod message;
pub mod valve;
pub mod wire;

pub use error::{Error, Result};
pub use frame::DeviceFrame;
pub use ids::MessageIdGenerator;
pub use message::Message;
pub use valve::DualValveMessage;
pub use wire::WsFrame;

/// Sync byte opening every device frame
pub const SYNC_BYTE: u8 = 0x7e;

/// Protocol version byte, fixed across all observed firmware
pub const PROTOCOL_VERSION: u8 = 0x03;

/// Message ID the device reserves for unsolicited periodic broadcasts
pub const BROADCAST_MESSAGE_ID: u32 = 0x0FFF_FFFF;

/// Port the device firmware dials after certificate injection
pub const DEFAULT_PORT: u16 = 443;
