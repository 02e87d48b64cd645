// Wire types for the command channel

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One movement request: signed drive level per channel plus a hold time.
///
/// Field defaults match what the operator side omits: an absent motor field
/// means that channel stays at rest, an absent duration means one second.
/// Extra fields (`timestamp`, `speed`, ...) are carried by the operator
/// controller on every message and are ignored here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MotorCommand {
    #[serde(default)]
    pub left_motor: i32,
    #[serde(default)]
    pub right_motor: i32,
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_duration() -> f64 {
    1.0
}

/// One parsed command line. Exactly one variant per inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    EmergencyStop,
    Calibrate,
    GetStatus,
    Move(MotorCommand),
}

/// Snapshot written back for `get_status` and logged locally.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: &'static str,
    pub link_connected: bool,
    pub ip_address: Option<String>,
    pub motors_enabled: bool,
    pub uptime_seconds: u64,
    pub free_memory_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("command has no string `action` field")]
    MissingAction,

    #[error("duration must be a non-negative number, got {0}")]
    InvalidDuration(f64),
}

/// Parse one trimmed command line into a typed action.
///
/// The `action` field selects the schema; anything that is not one of the
/// control verbs is a movement (the operator side sends `move_forward`,
/// `turn_left`, `stop`, ... and always carries the motor fields).
pub fn parse_command(line: &str) -> Result<ControlAction, ProtocolError> {
    let value: Value = serde_json::from_str(line)?;
    let action = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingAction)?;

    match action {
        "emergency_stop" => Ok(ControlAction::EmergencyStop),
        "calibrate" => Ok(ControlAction::Calibrate),
        "get_status" => Ok(ControlAction::GetStatus),
        _ => {
            let cmd: MotorCommand = serde_json::from_value(value)?;
            if !cmd.duration.is_finite() || cmd.duration < 0.0 {
                return Err(ProtocolError::InvalidDuration(cmd.duration));
            }
            Ok(ControlAction::Move(cmd))
        }
    }
}
