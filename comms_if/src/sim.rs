//! # Simulator event frames
//!
//! The simulator talks in socket.io style text frames. A frame carrying an event starts with `42`
//! (`4` for a message, `2` for an event) followed by a JSON array of `[event_name, data]`:
//!
//! ```text
//! 42["telemetry",{"cte":"0.7598","speed":"0.4380","steering_angle":"0.0000"}]
//! 42["steer",{"steering_angle":-0.311,"throttle":0.3}]
//! 42["manual",{}]
//! ```
//!
//! Telemetry values may arrive either as JSON numbers or as numeric strings.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Prefix marking a frame as a socket.io event message.
pub const EVENT_PREFIX: &str = "42";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound steering event.
pub const STEER_EVENT: &str = "steer";

/// Name of the outbound manual driving event.
pub const MANUAL_EVENT: &str = "manual";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry sent by the simulator once per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Telemetry {
    /// Cross track error, the lateral offset of the vehicle from the target path.
    #[serde(deserialize_with = "num_or_str")]
    pub cte: f64,

    /// Vehicle speed, unused by the controller.
    #[serde(default, deserialize_with = "opt_num_or_str")]
    pub speed: Option<f64>,

    /// Current steering angle, unused by the controller.
    #[serde(default, deserialize_with = "opt_num_or_str")]
    pub steering_angle: Option<f64>,
}

/// Demands sent back to the simulator in response to telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SteerDems {
    /// Steering command. The simulator expects this in [-1, 1] but it is not limited here.
    pub steering_angle: f64,

    /// Throttle command.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An event parsed from a simulator frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A new telemetry sample.
    Telemetry(Telemetry),

    /// The event carried no data, the simulator is being driven manually.
    Manual,

    /// Any other named event, which the controller ignores.
    Other(String),
}

/// A reply to be sent to the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimReply {
    /// Steering demands for a processed telemetry sample.
    Steer(SteerDems),

    /// Hand control back to manual driving.
    Manual,

    /// An empty acknowledgement, sent for frames that are not events.
    Empty,
}

/// Errors which can occur while parsing a simulator frame.
#[derive(Debug, thiserror::Error)]
pub enum SimEventError {
    #[error("Event payload is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Event payload is not an array starting with the event name: {0}")]
    InvalidEvent(String),

    #[error("Telemetry data could not be read: {0}")]
    InvalidTelemetry(serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimReply {
    /// Build the text frame for this reply.
    pub fn to_frame(&self) -> String {
        match self {
            SimReply::Steer(dems) =>
                format!("{}{}", EVENT_PREFIX, json!([STEER_EVENT, dems])),
            SimReply::Manual =>
                format!("{}{}", EVENT_PREFIX, json!([MANUAL_EVENT, {}])),
            SimReply::Empty => String::new()
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Parse a frame received from the simulator.
///
/// Returns `Ok(None)` if the frame is not an event message.
pub fn parse_frame(frame: &str) -> Result<Option<SimEvent>, SimEventError> {
    if frame.len() <= EVENT_PREFIX.len() || !frame.starts_with(EVENT_PREFIX) {
        return Ok(None)
    }

    let payload = match event_payload(frame) {
        Some(p) => p,
        None => return Ok(Some(SimEvent::Manual))
    };

    let mut array = match serde_json::from_str(payload).map_err(SimEventError::InvalidJson)? {
        Value::Array(a) => a,
        other => return Err(SimEventError::InvalidEvent(other.to_string()))
    };

    let name = match array.first() {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(SimEventError::InvalidEvent(payload.into()))
    };

    if name != TELEMETRY_EVENT {
        return Ok(Some(SimEvent::Other(name)))
    }

    let data = if array.len() > 1 { array.swap_remove(1) } else { Value::Null };

    serde_json::from_value(data)
        .map(|t| Some(SimEvent::Telemetry(t)))
        .map_err(SimEventError::InvalidTelemetry)
}

/// Extract the JSON payload of an event frame.
///
/// Frames mentioning `null` carry no data. Otherwise the payload spans from the first `[` to the
/// last `]`.
fn event_payload(frame: &str) -> Option<&str> {
    if frame.contains("null") {
        return None
    }

    let start = frame.find('[')?;
    let end = frame.rfind(']')?;

    if end < start {
        return None
    }

    Some(&frame[start..=end])
}

fn num_or_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>
{
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(serde::de::Error::custom)
    }
}

fn opt_num_or_str<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>
{
    num_or_str(deserializer).map(Some)
}
