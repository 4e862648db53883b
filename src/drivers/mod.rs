//! Actuator drivers and raw peripheral helpers.

pub mod heater;
pub mod hw_init;
pub mod task_pin;
