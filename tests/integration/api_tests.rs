//! JSON API responses computed against a live bridge.

use tempctl::api::{self, PowerResponse, TemperatureResponse};
use tempctl::config::SystemConfig;

use super::mock_hw::{ready_bridge, MockBridge, FRAME_OPEN};

fn post(bridge: &MockBridge, body: &str) -> PowerResponse {
    api::power_response(bridge, body.as_bytes())
}

#[test]
fn temperature_before_any_sample_reports_uninitialized() {
    let (bridge, _spi, _pwm) = ready_bridge();
    assert_eq!(
        api::temperature_response(&bridge),
        TemperatureResponse {
            success: false,
            temperature: None,
            error: Some("sensor not initialized"),
        }
    );
}

#[test]
fn temperature_reports_cached_value() {
    let (bridge, spi, _pwm) = ready_bridge();
    spi.push_frame(401 << 3); // 401 * 0.25
    bridge.sample_once().unwrap();

    let resp = api::temperature_response(&bridge);
    assert!(resp.success);
    assert_eq!(resp.temperature, Some(100.25));
    assert_eq!(
        serde_json::to_string(&resp).unwrap(),
        r#"{"success":true,"temperature":100.25}"#
    );
}

#[test]
fn temperature_reports_disconnected_thermocouple() {
    let (bridge, spi, _pwm) = ready_bridge();
    spi.push_frame(FRAME_OPEN);
    let _ = bridge.sample_once();

    let resp = api::temperature_response(&bridge);
    assert_eq!(resp.error, Some("thermocouple not connected"));
    assert_eq!(
        serde_json::to_string(&resp).unwrap(),
        r#"{"success":false,"error":"thermocouple not connected"}"#
    );
}

#[test]
fn temperature_reports_transport_failure() {
    let (bridge, spi, _pwm) = ready_bridge();
    spi.push_error(embedded_hal::spi::ErrorKind::Overrun);
    let _ = bridge.sample_once();
    assert_eq!(
        api::temperature_response(&bridge).error,
        Some("failed to read temperature")
    );
}

#[test]
fn power_request_applies_level() {
    let (bridge, _spi, pwm) = ready_bridge();
    let resp = post(&bridge, r#"{"power": 75}"#);
    assert_eq!(
        serde_json::to_string(&resp).unwrap(),
        r#"{"success":true,"power":75}"#
    );
    assert_eq!(pwm.latched(), 3071);
}

#[test]
fn out_of_range_power_is_rejected_without_driver_calls() {
    let (bridge, _spi, pwm) = ready_bridge();
    let calls = pwm.call_count();

    for body in [r#"{"power": -1}"#, r#"{"power": 101}"#, r#"{"power": 99999999999}"#] {
        let resp = post(&bridge, body);
        assert!(!resp.success, "{body}");
        assert_eq!(resp.error, Some("power level must be between 0 and 100"));
    }
    assert_eq!(pwm.call_count(), calls);
}

#[test]
fn malformed_power_requests_are_invalid_input() {
    let (bridge, _spi, pwm) = ready_bridge();
    let calls = pwm.call_count();

    for body in ["", "{", "[]", r#"{"level": 10}"#, r#"{"power": "10"}"#, r#"{"power": [10]}"#] {
        assert_eq!(post(&bridge, body).error, Some("invalid input"), "{body:?}");
    }
    assert_eq!(pwm.call_count(), calls);
}

#[test]
fn power_without_actuator_reports_pwm_uninitialized() {
    let bridge = MockBridge::new(&SystemConfig::default());
    assert_eq!(
        post(&bridge, r#"{"power": 10}"#).error,
        Some("PWM controller not initialized")
    );
}

#[test]
fn hardware_failure_reports_set_failed() {
    let (bridge, _spi, pwm) = ready_bridge();
    pwm.state().latch_rc = Some(0x107);
    assert_eq!(
        post(&bridge, r#"{"power": 10}"#).error,
        Some("failed to set power")
    );
}

#[test]
fn fractional_power_applies_truncated_level() {
    let (bridge, _spi, pwm) = ready_bridge();

    let resp = post(&bridge, r#"{"power": 12.5}"#);
    assert_eq!(resp.power, Some(12));
    assert_eq!(pwm.latched(), 491);

    assert_eq!(post(&bridge, r#"{"power": 100.9}"#).power, Some(100));
    assert_eq!(post(&bridge, r#"{"power": -0.5}"#).power, Some(0));
    assert_eq!(
        post(&bridge, r#"{"power": 101.2}"#).error,
        Some("power level must be between 0 and 100")
    );
}
