//! GPIO / peripheral pin assignments for the controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// MAX6675 thermocouple converter (SPI2 / HSPI)
// ---------------------------------------------------------------------------

/// SPI host the converter hangs off (`SPI2_HOST`).
pub const MAX6675_SPI_HOST: u32 = 1;
/// Master In, Slave Out, the only data line the converter drives.
pub const MAX6675_MISO_GPIO: i32 = 19;
/// Master Out, Slave In, routed but unused by the converter.
pub const MAX6675_MOSI_GPIO: i32 = 23;
pub const MAX6675_SCLK_GPIO: i32 = 18;
/// Dedicated chip-select; pulling it low also aborts any conversion.
pub const MAX6675_CS_GPIO: i32 = 5;

/// Default SPI clock.  The MAX6675 is rated to 4.3 MHz.
pub const MAX6675_CLOCK_HZ: u32 = 1_000_000;
/// Upper bound accepted by the link.
pub const MAX6675_MAX_CLOCK_HZ: u32 = 4_300_000;

// ---------------------------------------------------------------------------
// Heater MOSFET (IRF3205) gate drive
// ---------------------------------------------------------------------------

/// LEDC PWM output to the MOSFET gate driver.
pub const HEATER_PWM_GPIO: i32 = 2;
pub const HEATER_LEDC_TIMER: u32 = 0;
pub const HEATER_LEDC_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  12-bit gives 0 – 4095 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 12;
/// Switching frequency for the nichrome load (1 kHz).
pub const HEATER_PWM_FREQ_HZ: u32 = 1_000;
