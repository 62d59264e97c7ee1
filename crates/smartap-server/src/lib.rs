//! Replacement cloud endpoint for Smartap shower controllers.
//!
//! The devices dial out to a hardcoded hostname on port 443 and speak a
//! proprietary binary protocol over a barely-conformant WebSocket. Point
//! their DNS here and this server completes the TLS and upgrade handshakes
//! the firmware expects, decodes its traffic and lets handlers send
//! commands back.

pub mod capture;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod server;
pub mod tls;

pub use capture::CaptureSink;
pub use config::ServerConfig;
pub use dispatch::{Dispatcher, LoggingHandler, MessageHandler};
pub use error::{Result, ServerError};
pub use server::Server;
