//! Dual-valve status messages
//!
//! At connection start the device emits one fixed 77-byte status update
//! covering both valves. It has no sync byte and no length prefix, so it
//! must be detected by exact length and
//! fixed offsets *before* generic frame parsing is attempted, or it would be
//! misread.
//!
//! Layout: bytes 0..38 are the cold-valve record (leading marker 0x01),
//! bytes 38..76 the hot-valve record (leading marker 0x02), byte 76 is the
//! 0x0a terminator.

use crate::message::{msg_type, PressureMode};
use crate::{Error, Result};
use std::fmt;

/// Exact size of a dual-valve message
pub const DUAL_VALVE_LEN: usize = 77;

/// Leading marker of the cold-valve record
pub const COLD_VALVE_MARKER: u8 = 0x01;

/// Leading marker of the hot-valve record
pub const HOT_VALVE_MARKER: u8 = 0x02;

/// Final terminator byte
pub const DUAL_VALVE_TERMINATOR: u8 = 0x0a;

const RECORD_LEN: usize = 38;
const PRESSURE_MODE_OFFSET: usize = 18;
const TEMP_MARKER_OFFSET: usize = 37;

/// Status of a single valve
#[derive(Debug, Clone, PartialEq)]
pub struct ValveStatus {
    pub valve_id: u8,
    /// Nested pressure-mode block, when the record carries one
    pub pressure_mode: Option<PressureMode>,
    /// Hot valve only in practice; flagged by a trailing 0x29 marker
    pub has_temp_sensor: bool,
}

/// Both valve states from one 77-byte status update
#[derive(Debug, Clone, PartialEq)]
pub struct DualValveMessage {
    pub cold: ValveStatus,
    pub hot: ValveStatus,
}

/// Boolean classifier: is this buffer a dual-valve message?
///
/// Any deviation means "not a dual-valve message", never an error; the
/// buffer then falls through to generic frame parsing.
pub fn is_dual_valve(data: &[u8]) -> bool {
    data.len() == DUAL_VALVE_LEN
        && data[0] == COLD_VALVE_MARKER
        && data[RECORD_LEN] == HOT_VALVE_MARKER
        && data[DUAL_VALVE_LEN - 1] == DUAL_VALVE_TERMINATOR
}

/// Parse a 77-byte dual-valve message.
///
/// The error names whichever check failed; these failures are commonly
/// reported by users and must be distinguishable.
pub fn parse_dual_valve(data: &[u8]) -> Result<DualValveMessage> {
    if data.len() != DUAL_VALVE_LEN {
        return Err(Error::DualValveLength(data.len()));
    }
    if data[0] != COLD_VALVE_MARKER {
        return Err(Error::DualValveColdMarker(data[0]));
    }
    if data[RECORD_LEN] != HOT_VALVE_MARKER {
        return Err(Error::DualValveHotMarker(data[RECORD_LEN]));
    }
    if data[DUAL_VALVE_LEN - 1] != DUAL_VALVE_TERMINATOR {
        return Err(Error::DualValveTerminator(data[DUAL_VALVE_LEN - 1]));
    }

    Ok(DualValveMessage {
        cold: parse_valve_record(&data[..RECORD_LEN]),
        hot: parse_valve_record(&data[RECORD_LEN..2 * RECORD_LEN]),
    })
}

fn parse_valve_record(record: &[u8]) -> ValveStatus {
    let pressure_mode = if record[PRESSURE_MODE_OFFSET] == msg_type::PRESSURE_MODE {
        Some(PressureMode {
            subtype: record[PRESSURE_MODE_OFFSET + 1],
            enabled: record[PRESSURE_MODE_OFFSET + 2],
        })
    } else {
        None
    };

    ValveStatus {
        valve_id: record[0],
        pressure_mode,
        has_temp_sensor: record[TEMP_MARKER_OFFSET] == msg_type::TELEMETRY_RESPONSE,
    }
}

impl fmt::Display for ValveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pressure = match &self.pressure_mode {
            Some(m) if m.is_enabled() => "enabled",
            Some(_) => "disabled",
            None => "unknown",
        };
        write!(
            f,
            "ValveStatus{{valve_id=0x{:02x}, pressure_mode={}{}}}",
            self.valve_id,
            pressure,
            if self.has_temp_sensor {
                ", temp_sensor=yes"
            } else {
                ""
            }
        )
    }
}

impl fmt::Display for DualValveMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DualValve{{cold={}, hot={}}}", self.cold, self.hot)
    }
}
