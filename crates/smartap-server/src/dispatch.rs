//! Inbound message dispatch
//!
//! Every binary payload goes through the same pipeline: dual-valve
//! detection first (the 77-byte status has no frame header and would fail
//! generic parsing), then frame decode, then typed message decode, then a
//! callback on the installed [`MessageHandler`].

use crate::error::Result;
use smartap_core::message::{self, Command, Message, PressureMode, TelemetryBroadcast, TelemetryResponse};
use smartap_core::valve::{self, DualValveMessage};
use smartap_core::DeviceFrame;
use tracing::{debug, info, warn};

/// Callbacks for decoded device traffic.
///
/// Every method has a no-op default, so a handler only implements what it
/// cares about. Handlers are shared across connections and must be
/// `Send + Sync`.
pub trait MessageHandler: Send + Sync {
    fn on_telemetry_broadcast(&self, _peer: &str, _frame: &DeviceFrame, _msg: &TelemetryBroadcast) {
    }

    fn on_telemetry_response(&self, _peer: &str, _frame: &DeviceFrame, _msg: &TelemetryResponse) {}

    fn on_command(&self, _peer: &str, _frame: &DeviceFrame, _msg: &Command) {}

    fn on_pressure_mode(&self, _peer: &str, _frame: &DeviceFrame, _msg: &PressureMode) {}

    fn on_dual_valve(&self, _peer: &str, _msg: &DualValveMessage) {}

    /// OTA and extended messages, whose payloads are still undocumented
    fn on_opaque(&self, _peer: &str, _frame: &DeviceFrame, _kind: &str, _data: &[u8]) {}

    fn on_unknown(&self, _peer: &str, _frame: &DeviceFrame, _msg_type: u8, _data: &[u8]) {}
}

/// Handler that logs every message, mirroring what the device app showed.
pub struct LoggingHandler;

impl MessageHandler for LoggingHandler {
    fn on_telemetry_broadcast(&self, peer: &str, frame: &DeviceFrame, msg: &TelemetryBroadcast) {
        debug!(%peer, id = frame.message_id, "{msg}");
    }

    fn on_telemetry_response(&self, peer: &str, frame: &DeviceFrame, msg: &TelemetryResponse) {
        info!(%peer, id = frame.message_id, "{msg}");
    }

    fn on_command(&self, peer: &str, frame: &DeviceFrame, msg: &Command) {
        info!(%peer, id = frame.message_id, "{msg}");
    }

    fn on_pressure_mode(&self, peer: &str, frame: &DeviceFrame, msg: &PressureMode) {
        info!(%peer, id = frame.message_id, "{msg}");
    }

    fn on_dual_valve(&self, peer: &str, msg: &DualValveMessage) {
        info!(%peer, "{msg}");
    }

    fn on_opaque(&self, peer: &str, frame: &DeviceFrame, kind: &str, data: &[u8]) {
        info!(%peer, id = frame.message_id, kind, len = data.len(), "opaque message");
    }

    fn on_unknown(&self, peer: &str, frame: &DeviceFrame, msg_type: u8, data: &[u8]) {
        warn!(
            %peer,
            id = frame.message_id,
            msg_type = format_args!("0x{msg_type:02x}"),
            len = data.len(),
            "unknown message type"
        );
    }
}

/// Routes decoded payloads to a handler.
pub struct Dispatcher<H: MessageHandler> {
    handler: H,
}

impl<H: MessageHandler> Dispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Decode one binary payload and invoke the matching callback.
    ///
    /// Decode failures are returned to the caller; the caller decides
    /// whether the connection survives (it does, for this firmware).
    pub fn dispatch(&self, peer: &str, data: &[u8]) -> Result<()> {
        if valve::is_dual_valve(data) {
            let msg = valve::parse_dual_valve(data)?;
            self.handler.on_dual_valve(peer, &msg);
            return Ok(());
        }

        let frame = DeviceFrame::parse(data)?;
        match message::parse_message(&frame.payload)? {
            Message::TelemetryBroadcast(m) => self.handler.on_telemetry_broadcast(peer, &frame, &m),
            Message::TelemetryResponse(m) => self.handler.on_telemetry_response(peer, &frame, &m),
            Message::Command(m) => self.handler.on_command(peer, &frame, &m),
            Message::PressureMode(m) => self.handler.on_pressure_mode(peer, &frame, &m),
            Message::Ota { data } => self.handler.on_opaque(peer, &frame, "OTA", &data),
            Message::Extended { data } => self.handler.on_opaque(peer, &frame, "Extended", &data),
            Message::Unknown { msg_type, data } => {
                self.handler.on_unknown(peer, &frame, msg_type, &data)
            }
        }
        Ok(())
    }
}
