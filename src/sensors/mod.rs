//! Sensor drivers.
//!
//! The controller has a single temperature input: a K-type thermocouple
//! behind a MAX6675 converter on the SPI bus.

pub mod thermocouple;

pub use thermocouple::{decode_frame, BusConfig, TemperatureReading, ThermocoupleLink};
