//! MAX6675 K-type thermocouple-to-digital converter.
//!
//! The converter is read-only: each transaction clocks out one 16-bit
//! frame, MSB first, while the master sends don't-care bytes.
//!
//! ```text
//!  15  14 ........................ 3    2      1     0
//! ┌───┬──────────────────────────────┬──────┬─────┬─────┐
//! │ 0 │   12-bit temperature (LSB = 0.25 °C)│ OPEN │ ID  │ TRI │
//! └───┴──────────────────────────────┴──────┴─────┴─────┘
//! ```
//!
//! Bit 2 is set when the thermocouple input is open; the temperature
//! field then holds stale data and is never reported.  Bits 1–0 carry
//! the device ID and a tri-state marker and are ignored.

use embedded_hal::spi::{Error as _, SpiDevice};
use log::{debug, info, warn};

use crate::app::ports::SpiPort;
use crate::error::LinkError;
use crate::pins;

/// One frame is exactly two bytes on the wire.
pub const FRAME_LEN: usize = 2;
/// Open-thermocouple fault flag.
pub const FAULT_OPEN_BIT: u16 = 0x0004;
/// Temperature field after shifting out bits 2–0.
const TEMP_MASK: u16 = 0x0FFF;
const TEMP_SHIFT: u16 = 3;
/// Degrees Celsius per LSB of the temperature field.
pub const CELSIUS_PER_LSB: f32 = 0.25;

// ───────────────────────────────────────────────────────────────
// Frame decoding
// ───────────────────────────────────────────────────────────────

/// One decoded converter frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    /// Frame as received (big-endian word).
    pub raw_frame: u16,
    /// Only meaningful when `fault == false`; 0.0 otherwise.
    pub celsius: f32,
    /// Open-thermocouple flag.
    pub fault: bool,
}

impl TemperatureReading {
    /// Decode a raw frame.  Never fails; check `fault` before using
    /// `celsius`.
    pub fn from_frame(raw_frame: u16) -> Self {
        let fault = raw_frame & FAULT_OPEN_BIT != 0;
        let celsius = if fault {
            0.0
        } else {
            ((raw_frame >> TEMP_SHIFT) & TEMP_MASK) as f32 * CELSIUS_PER_LSB
        };
        Self {
            raw_frame,
            celsius,
            fault,
        }
    }
}

/// Decode the two received bytes, rejecting faulted frames.
pub fn decode_frame(rx: [u8; FRAME_LEN]) -> Result<TemperatureReading, LinkError> {
    let reading = TemperatureReading::from_frame(u16::from_be_bytes(rx));
    if reading.fault {
        return Err(LinkError::ThermocoupleDisconnected);
    }
    Ok(reading)
}

// ───────────────────────────────────────────────────────────────
// Bus configuration
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub host: u32,
    pub clock_hz: u32,
    pub miso_gpio: i32,
    pub mosi_gpio: i32,
    pub sclk_gpio: i32,
    pub cs_gpio: i32,
}

impl BusConfig {
    /// Board wiring from [`pins`] at the given clock.
    pub fn from_pins(clock_hz: u32) -> Self {
        Self {
            host: pins::MAX6675_SPI_HOST,
            clock_hz,
            miso_gpio: pins::MAX6675_MISO_GPIO,
            mosi_gpio: pins::MAX6675_MOSI_GPIO,
            sclk_gpio: pins::MAX6675_SCLK_GPIO,
            cs_gpio: pins::MAX6675_CS_GPIO,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::from_pins(pins::MAX6675_CLOCK_HZ)
    }
}

// ───────────────────────────────────────────────────────────────
// Link
// ───────────────────────────────────────────────────────────────

/// An initialised converter link.  Owns the SPI port for its lifetime.
pub struct ThermocoupleLink<P: SpiPort> {
    port: P,
    device: Option<P::Device>,
    bus_claimed: bool,
    config: BusConfig,
}

impl<P: SpiPort> ThermocoupleLink<P> {
    /// Claim the bus and attach the converter.
    ///
    /// A clock above the converter's rating is clamped, not rejected.
    /// If attaching fails the bus claim is released again.
    pub fn initialize(mut port: P, mut config: BusConfig) -> Result<Self, LinkError> {
        if config.clock_hz > pins::MAX6675_MAX_CLOCK_HZ {
            warn!(
                "MAX6675: clock {} Hz above rating, clamped to {} Hz",
                config.clock_hz,
                pins::MAX6675_MAX_CLOCK_HZ
            );
            config.clock_hz = pins::MAX6675_MAX_CLOCK_HZ;
        }

        port.claim_bus(&config).map_err(LinkError::BusUnavailable)?;

        let device = match port.attach_device(&config) {
            Ok(d) => d,
            Err(rc) => {
                if let Err(free_rc) = port.release_bus() {
                    warn!("MAX6675: bus release after failed attach returned {}", free_rc);
                }
                return Err(LinkError::DeviceRejected(rc));
            }
        };

        info!(
            "MAX6675 initialized (host={}, CS=GPIO{}, clock={} Hz)",
            config.host, config.cs_gpio, config.clock_hz
        );

        Ok(Self {
            port,
            device: Some(device),
            bus_claimed: true,
            config,
        })
    }

    /// Exchange one frame and decode it.
    pub fn read(&mut self) -> Result<TemperatureReading, LinkError> {
        let device = self.device.as_mut().ok_or(LinkError::NotInitialized)?;

        // The converter ignores MOSI; only CS and SCLK matter.
        let tx = [0u8; FRAME_LEN];
        let mut rx = [0u8; FRAME_LEN];
        device
            .transfer(&mut rx, &tx)
            .map_err(|e| LinkError::TransportError(e.kind()))?;

        let reading = decode_frame(rx)?;
        debug!(
            "MAX6675: raw=0x{:04X} T={:.2}\u{00b0}C",
            reading.raw_frame, reading.celsius
        );
        Ok(reading)
    }

    /// Remove the device and free the bus.  A step that fails is left
    /// pending, so calling it again resumes where it stopped; once both
    /// steps are done it is a no-op.
    pub fn teardown(&mut self) -> Result<(), LinkError> {
        if let Some(device) = &self.device {
            self.port
                .detach_device(device)
                .map_err(LinkError::ReleaseFailed)?;
            self.device = None;
        }
        if self.bus_claimed {
            self.port.release_bus().map_err(LinkError::ReleaseFailed)?;
            self.bus_claimed = false;
            info!("MAX6675 deinitialized");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Effective configuration (clock after clamping).
    pub fn config(&self) -> &BusConfig {
        &self.config
    }
}
