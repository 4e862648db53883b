//! Fuzz target: `POST /api/power` body handling
//!
//! Arbitrary bodies go through `parse_power_request` and `power_response`
//! against a stub surface.  Nothing may panic, accepted levels are always
//! 0–100, and the serialised reply is always valid JSON.
//!
//! cargo fuzz run fuzz_power_request

#![no_main]

use libfuzzer_sys::fuzz_target;
use tempctl::api::{parse_power_request, power_response};
use tempctl::app::bridge::{BridgeStatus, SubsystemState};
use tempctl::app::ports::ControlSurface;
use tempctl::error::{ActuatorError, LinkError};
use tempctl::sensors::thermocouple::TemperatureReading;

struct Stub;

impl ControlSurface for Stub {
    fn sample_once(&self) -> Result<TemperatureReading, LinkError> {
        Err(LinkError::NotInitialized)
    }

    fn get_latest_reading(&self) -> Result<TemperatureReading, LinkError> {
        Err(LinkError::NotInitialized)
    }

    fn apply_power_command(&self, percent: i32) -> Result<u8, ActuatorError> {
        if (0..=100).contains(&percent) {
            Ok(percent as u8)
        } else {
            Err(ActuatorError::InvalidRange(percent))
        }
    }

    fn status(&self) -> BridgeStatus {
        BridgeStatus {
            sensor: SubsystemState::Uninitialized,
            actuator: SubsystemState::Ready,
            latest: Err(LinkError::NotInitialized),
            power_percent: 0,
            duty_code: 0,
            samples: 0,
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let parsed = parse_power_request(data);
    let resp = power_response(&Stub, data);

    assert_eq!(resp.success, resp.power.is_some());
    if let Some(p) = resp.power {
        assert!(p <= 100);
        assert_eq!(parsed, Ok(i32::from(p)));
    }

    let json = serde_json::to_vec(&resp).unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&json).is_ok());
});
