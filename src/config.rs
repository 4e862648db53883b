//! System configuration parameters
//!
//! All tunable parameters for the controller.  Defaults match the board
//! wiring in [`crate::pins`]; [`SystemConfig::validate`] rejects values the
//! hardware cannot honour instead of silently clamping them.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::adapters::wifi;
use crate::error::{Error, Result};
use crate::pins;

/// Highest LEDC frequency that still leaves 12 bits of resolution on the
/// 80 MHz APB clock.
const MAX_PWM_FREQ_HZ: u32 = 80_000_000 >> pins::PWM_RESOLUTION_BITS;
/// MAX6675 conversion time is ~220 ms; sampling faster only re-reads
/// the previous conversion.
const MIN_SAMPLE_INTERVAL_MS: u32 = 250;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensor link ---
    /// SPI clock for the thermocouple converter (Hz)
    pub spi_clock_hz: u32,
    /// Background sample interval (milliseconds)
    pub sample_interval_ms: u32,
    /// Consecutive transport failures before the link is marked faulted
    pub transport_fault_threshold: u32,
    /// Emit a status line every N samples (0 = never)
    pub status_every_samples: u32,

    // --- Heater ---
    /// PWM switching frequency (Hz)
    pub pwm_frequency_hz: u32,

    // --- Network ---
    /// HTTP API port
    pub http_port: u16,
    pub network: NetworkConfig,
}

/// WiFi station credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub ssid: String<32>,
    pub password: String<64>,
    /// Connection attempts before giving up
    pub max_retries: u8,
}

impl NetworkConfig {
    /// Credentials baked in at build time via `WIFI_SSID` / `WIFI_PASS`.
    pub fn from_build_env() -> Self {
        let mut cfg = Self {
            max_retries: 5,
            ..Self::default()
        };
        // Oversized values are left empty and rejected by `validate`.
        if let Some(ssid) = option_env!("WIFI_SSID") {
            let _ = cfg.ssid.push_str(ssid);
        }
        if let Some(pass) = option_env!("WIFI_PASS") {
            let _ = cfg.password.push_str(pass);
        }
        cfg
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            spi_clock_hz: pins::MAX6675_CLOCK_HZ,
            sample_interval_ms: 1000, // 1 Hz
            transport_fault_threshold: 5,
            status_every_samples: 10,

            pwm_frequency_hz: pins::HEATER_PWM_FREQ_HZ,

            http_port: 80,
            network: NetworkConfig {
                max_retries: 5,
                ..NetworkConfig::default()
            },
        }
    }
}

impl SystemConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<()> {
        if self.spi_clock_hz == 0 || self.spi_clock_hz > pins::MAX6675_MAX_CLOCK_HZ {
            return Err(Error::Config("spi_clock_hz must be 1..=4300000"));
        }
        if self.sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            return Err(Error::Config("sample_interval_ms below converter conversion time"));
        }
        if self.transport_fault_threshold == 0 {
            return Err(Error::Config("transport_fault_threshold must be non-zero"));
        }
        if self.pwm_frequency_hz == 0 || self.pwm_frequency_hz > MAX_PWM_FREQ_HZ {
            return Err(Error::Config("pwm_frequency_hz out of range for 12-bit resolution"));
        }
        if self.http_port == 0 {
            return Err(Error::Config("http_port must be non-zero"));
        }
        Ok(())
    }

    /// Validate WiFi credentials in addition to [`validate`](Self::validate).
    pub fn validate_network(&self) -> Result<()> {
        wifi::validate_ssid(&self.network.ssid)
            .map_err(|_| Error::Config("WiFi SSID must be 1-32 printable ASCII bytes"))?;
        wifi::validate_password(&self.network.password)
            .map_err(|_| Error::Config("WiFi password must be empty or 8-64 bytes"))?;
        if self.network.max_retries == 0 {
            return Err(Error::Config("network.max_retries must be non-zero"));
        }
        Ok(())
    }
}
