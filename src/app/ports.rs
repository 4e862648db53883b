//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Hardware adapter ──▶ SpiPort / PwmPort ──▶ link / heater driver
//!   HTTP responder   ──▶ ControlSurface    ──▶ ControlBridge
//!   ControlBridge    ──▶ EventSink         ──▶ log / telemetry
//! ```
//!
//! Driven adapters (SPI host, LEDC timer, event sinks) implement these
//! traits.  The drivers and the bridge consume them via generics, so the
//! domain core never touches ESP-IDF directly and every path can be
//! exercised on the host with mock adapters.
//!
//! Hardware ports report raw `esp_err_t` codes; the drivers map them into
//! their own typed errors so the taxonomy lives in one place.

use embedded_hal::spi::SpiDevice;

use crate::drivers::heater::PwmConfig;
use crate::error::{ActuatorError, LinkError};
use crate::sensors::thermocouple::{BusConfig, TemperatureReading};

use super::bridge::BridgeStatus;

/// Raw hardware result carrying an `esp_err_t` on failure.
pub type HwResult<T = ()> = core::result::Result<T, i32>;

// ───────────────────────────────────────────────────────────────
// SPI port (driven adapter: domain → SPI host)
// ───────────────────────────────────────────────────────────────

/// Owns the SPI host and hands out the converter's device handle.
pub trait SpiPort {
    /// Full-duplex device attached to the claimed bus.
    type Device: SpiDevice<u8>;

    /// Initialise the SPI host with the configured pins.
    fn claim_bus(&mut self, config: &BusConfig) -> HwResult;

    /// Attach the converter with its dedicated chip-select line.
    fn attach_device(&mut self, config: &BusConfig) -> HwResult<Self::Device>;

    /// Remove the device from the bus.  The caller drops `device` only
    /// once this succeeds, so a failed removal can be retried.
    fn detach_device(&mut self, device: &Self::Device) -> HwResult;

    /// Free the SPI host.
    fn release_bus(&mut self) -> HwResult;
}

// ───────────────────────────────────────────────────────────────
// PWM port (driven adapter: domain → LEDC timer/channel)
// ───────────────────────────────────────────────────────────────

/// Two-phase duty update: `stage_duty` writes the shadow register,
/// `latch_duty` makes it take effect on the next PWM period.
pub trait PwmPort {
    fn configure_timer(&mut self, config: &PwmConfig) -> HwResult;

    /// Bind the channel to its output pin, starting at 0 % duty.
    fn configure_channel(&mut self, config: &PwmConfig) -> HwResult;

    fn stage_duty(&mut self, duty: u32) -> HwResult;

    fn latch_duty(&mut self) -> HwResult;
}

// ───────────────────────────────────────────────────────────────
// Control surface (driving port: network / sampler → bridge)
// ───────────────────────────────────────────────────────────────

/// Everything the network responder and the background sampler may do.
///
/// Implementations must be callable concurrently from several threads.
pub trait ControlSurface {
    /// Take one sample over the bus and cache the outcome.
    fn sample_once(&self) -> Result<TemperatureReading, LinkError>;

    /// Most recently cached outcome.  Never touches the bus.
    fn get_latest_reading(&self) -> Result<TemperatureReading, LinkError>;

    /// Validate and apply an externally requested power level.
    /// Returns the applied percentage.
    fn apply_power_command(&self, percent: i32) -> Result<u8, ActuatorError>;

    /// Point-in-time status for telemetry.
    fn status(&self) -> BridgeStatus;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The sampler emits structured [`BridgeEvent`](super::events::BridgeEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::BridgeEvent);
}
