//! JSON request/response mapping for the HTTP API.
//!
//! Transport-agnostic: the handlers in `adapters::http_server` only move
//! bytes; everything that decides *what* to answer lives here and runs
//! on the host.
//!
//! | Route                   | Body              | Response                          |
//! |-------------------------|-------------------|-----------------------------------|
//! | `GET /api/temperature`  | (none)            | `{success, temperature?, error?}` |
//! | `POST /api/power`       | `{"power": <int>}`| `{success, power?, error?}`       |

use serde::Serialize;
use serde_json::Value;

use crate::app::ports::ControlSurface;
use crate::error::{ActuatorError, LinkError};

/// Request bodies larger than this are rejected unread.
pub const MAX_BODY_LEN: usize = 128;

pub const ERR_DISCONNECTED: &str = "thermocouple not connected";
pub const ERR_SENSOR_UNINIT: &str = "sensor not initialized";
pub const ERR_READ_FAILED: &str = "failed to read temperature";
pub const ERR_PWM_UNINIT: &str = "PWM controller not initialized";
pub const ERR_RANGE: &str = "power level must be between 0 and 100";
pub const ERR_SET_FAILED: &str = "failed to set power";
pub const ERR_INVALID_INPUT: &str = "invalid input";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TemperatureResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PowerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// The body was not `{"power": <integer>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidInput;

impl core::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(ERR_INVALID_INPUT)
    }
}

pub fn link_error_message(e: LinkError) -> &'static str {
    match e {
        LinkError::ThermocoupleDisconnected => ERR_DISCONNECTED,
        LinkError::NotInitialized => ERR_SENSOR_UNINIT,
        LinkError::TransportError(_)
        | LinkError::BusUnavailable(_)
        | LinkError::DeviceRejected(_)
        | LinkError::ReleaseFailed(_) => ERR_READ_FAILED,
    }
}

pub fn actuator_error_message(e: ActuatorError) -> &'static str {
    match e {
        ActuatorError::NotInitialized => ERR_PWM_UNINIT,
        ActuatorError::InvalidRange(_) => ERR_RANGE,
        ActuatorError::HardwareError(_)
        | ActuatorError::TimerConfigError(_)
        | ActuatorError::ChannelConfigError(_) => ERR_SET_FAILED,
    }
}

/// Extract the requested power.  Any JSON number is accepted: fractions
/// truncate toward zero (`12.5` → 12, `-0.5` → 0) and values outside
/// `i32` saturate so the range check reports them.
pub fn parse_power_request(body: &[u8]) -> Result<i32, InvalidInput> {
    if body.len() > MAX_BODY_LEN {
        return Err(InvalidInput);
    }
    let value: Value = serde_json::from_slice(body).map_err(|_| InvalidInput)?;
    let power = value.get("power").ok_or(InvalidInput)?;

    if let Some(i) = power.as_i64() {
        return Ok(i.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32);
    }
    if power.is_u64() {
        return Ok(i32::MAX);
    }
    // `as` truncates toward zero and saturates.
    power.as_f64().map(|f| f as i32).ok_or(InvalidInput)
}

/// Answer `GET /api/temperature` from the cache.
pub fn temperature_response(surface: &impl ControlSurface) -> TemperatureResponse {
    match surface.get_latest_reading() {
        Ok(reading) => TemperatureResponse {
            success: true,
            temperature: Some(round_centi(reading.celsius)),
            error: None,
        },
        Err(e) => TemperatureResponse {
            success: false,
            temperature: None,
            error: Some(link_error_message(e)),
        },
    }
}

/// Answer `POST /api/power`.
pub fn power_response(surface: &impl ControlSurface, body: &[u8]) -> PowerResponse {
    let outcome = parse_power_request(body)
        .map_err(|_| ERR_INVALID_INPUT)
        .and_then(|p| surface.apply_power_command(p).map_err(actuator_error_message));

    match outcome {
        Ok(power) => PowerResponse {
            success: true,
            power: Some(power),
            error: None,
        },
        Err(msg) => PowerResponse {
            success: false,
            power: None,
            error: Some(msg),
        },
    }
}

fn round_centi(celsius: f32) -> f64 {
    (f64::from(celsius) * 100.0).round() / 100.0
}
