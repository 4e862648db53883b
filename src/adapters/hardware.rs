//! Hardware adapter: bridges the ESP32 SPI host and LEDC block to the
//! domain port traits.
//!
//! This is the only module besides [`hw_init`](crate::drivers::hw_init)
//! that knows peripherals exist.  On non-espidf targets `hw_init` swaps
//! in simulation stubs, so these adapters run unchanged on the host.

use embedded_hal::spi::{self, ErrorType, Operation, SpiDevice};

use crate::app::ports::{HwResult, PwmPort, SpiPort};
use crate::drivers::heater::PwmConfig;
use crate::drivers::hw_init::{self, SpiHandle, SPI_MAX_TRANSFER};
use crate::sensors::thermocouple::BusConfig;

// ── SpiPort implementation ───────────────────────────────────

/// Owns the SPI host used by the thermocouple converter.
pub struct Max6675Port {
    host: Option<u32>,
}

impl Max6675Port {
    pub fn new() -> Self {
        Self { host: None }
    }
}

impl Default for Max6675Port {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiPort for Max6675Port {
    type Device = Max6675Device;

    fn claim_bus(&mut self, config: &BusConfig) -> HwResult {
        hw_init::spi_claim(config)?;
        self.host = Some(config.host);
        Ok(())
    }

    fn attach_device(&mut self, config: &BusConfig) -> HwResult<Max6675Device> {
        hw_init::spi_attach(config).map(|handle| Max6675Device { handle })
    }

    fn detach_device(&mut self, device: &Max6675Device) -> HwResult {
        hw_init::spi_detach(&device.handle)
    }

    fn release_bus(&mut self) -> HwResult {
        match self.host.take() {
            Some(host) => hw_init::spi_release(host),
            None => Ok(()),
        }
    }
}

/// `esp_err_t` returned by a failed SPI transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiTransferError(pub i32);

impl spi::Error for SpiTransferError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

/// The converter as an `embedded-hal` SPI device.
///
/// One polling transmit is one chip-select cycle, so a transaction may
/// carry at most one data operation; delays are allowed around it.
/// Transactions with more are rejected before touching the bus.
pub struct Max6675Device {
    handle: SpiHandle,
}

impl ErrorType for Max6675Device {
    type Error = SpiTransferError;
}

impl SpiDevice<u8> for Max6675Device {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SpiTransferError> {
        let data_ops = operations
            .iter()
            .filter(|op| !matches!(op, Operation::DelayNs(_)))
            .count();
        if data_ops > 1 {
            return Err(SpiTransferError(ESP_ERR_INVALID_ARG));
        }

        let mut tx = [0u8; SPI_MAX_TRANSFER];
        let mut rx = [0u8; SPI_MAX_TRANSFER];

        for op in operations {
            match op {
                Operation::Read(buf) => {
                    let n = fit(buf.len())?;
                    tx[..n].fill(0);
                    self.exchange(&tx[..n], &mut rx[..n])?;
                    buf.copy_from_slice(&rx[..n]);
                }
                Operation::Write(buf) => {
                    let n = fit(buf.len())?;
                    self.exchange(&buf[..], &mut rx[..n])?;
                }
                Operation::Transfer(read, write) => {
                    let n = fit(read.len().max(write.len()))?;
                    tx[..n].fill(0);
                    tx[..write.len()].copy_from_slice(&write[..]);
                    self.exchange(&tx[..n], &mut rx[..n])?;
                    read.copy_from_slice(&rx[..read.len()]);
                }
                Operation::TransferInPlace(buf) => {
                    let n = fit(buf.len())?;
                    tx[..n].copy_from_slice(buf);
                    self.exchange(&tx[..n], &mut rx[..n])?;
                    buf.copy_from_slice(&rx[..n]);
                }
                Operation::DelayNs(ns) => {
                    std::thread::sleep(std::time::Duration::from_nanos(u64::from(*ns)));
                }
            }
        }
        Ok(())
    }
}

impl Max6675Device {
    fn exchange(&self, tx: &[u8], rx: &mut [u8]) -> Result<(), SpiTransferError> {
        hw_init::spi_transfer(&self.handle, tx, rx).map_err(SpiTransferError)
    }
}

const ESP_ERR_INVALID_ARG: i32 = 0x102;
const ESP_ERR_INVALID_SIZE: i32 = 0x104;

/// Reject transfers beyond the bus limit.
fn fit(len: usize) -> Result<usize, SpiTransferError> {
    if len > SPI_MAX_TRANSFER {
        Err(SpiTransferError(ESP_ERR_INVALID_SIZE))
    } else {
        Ok(len)
    }
}

// ── PwmPort implementation ───────────────────────────────────

/// LEDC timer + channel driving the heater MOSFET.
pub struct LedcPwmPort {
    channel: u32,
}

impl LedcPwmPort {
    pub fn new() -> Self {
        Self {
            channel: crate::pins::HEATER_LEDC_CHANNEL,
        }
    }
}

impl Default for LedcPwmPort {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmPort for LedcPwmPort {
    fn configure_timer(&mut self, config: &PwmConfig) -> HwResult {
        hw_init::ledc_timer(config)
    }

    fn configure_channel(&mut self, config: &PwmConfig) -> HwResult {
        hw_init::ledc_channel(config)?;
        self.channel = config.channel;
        Ok(())
    }

    fn stage_duty(&mut self, duty: u32) -> HwResult {
        hw_init::ledc_stage(self.channel, duty)
    }

    fn latch_duty(&mut self) -> HwResult {
        hw_init::ledc_latch(self.channel)
    }
}
