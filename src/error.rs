//! Unified error types for the tempctl firmware.
//!
//! Each hardware subsystem has its own typed error so the bridge can tell
//! expected conditions (an open thermocouple) apart from bus or timer
//! failures.  All variants are `Copy`; the bridge caches the last sample
//! outcome, error included, and hands out copies to every reader.

use core::fmt;

use embedded_hal::spi::ErrorKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The thermocouple link failed.
    Link(LinkError),
    /// The heater PWM driver failed.
    Actuator(ActuatorError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "sensor link: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Serial sensor link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// `read` called before `initialize` or after `teardown`.
    NotInitialized,
    /// The SPI host could not be claimed (esp_err_t code).
    BusUnavailable(i32),
    /// The converter could not be attached to the claimed bus.
    DeviceRejected(i32),
    /// The SPI transaction itself failed.
    TransportError(ErrorKind),
    /// Open-thermocouple fault bit (D2) set in the returned frame.
    ThermocoupleDisconnected,
    /// Removing the device or freeing the bus failed during teardown.
    ReleaseFailed(i32),
}

impl LinkError {
    /// Transient errors are retried on the next sample cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportError(_) | Self::ThermocoupleDisconnected)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "sensor not initialized"),
            Self::BusUnavailable(rc) => write!(f, "SPI bus unavailable (rc={})", rc),
            Self::DeviceRejected(rc) => write!(f, "SPI device rejected (rc={})", rc),
            Self::TransportError(kind) => write!(f, "SPI transaction failed: {kind}"),
            Self::ThermocoupleDisconnected => write!(f, "thermocouple not connected"),
            Self::ReleaseFailed(rc) => write!(f, "SPI release failed (rc={})", rc),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Power command issued before `initialize` or after `deinit`.
    NotInitialized,
    /// LEDC timer rejected the frequency/resolution pair.
    TimerConfigError(i32),
    /// LEDC channel could not be bound to the output pin.
    ChannelConfigError(i32),
    /// Staging or latching the duty register failed.
    HardwareError(i32),
    /// External power command outside 0..=100.
    InvalidRange(i32),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "PWM controller not initialized"),
            Self::TimerConfigError(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::ChannelConfigError(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
            Self::HardwareError(rc) => write!(f, "duty update failed (rc={})", rc),
            Self::InvalidRange(v) => write!(f, "power level {} outside 0..=100", v),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
