//! Outbound bridge events.
//!
//! The [`Sampler`](super::sampler::Sampler) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::LinkError;
use crate::sensors::thermocouple::TemperatureReading;

use super::bridge::BridgeStatus;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeEvent {
    /// The background sampler has started.
    Started { sample_interval_ms: u32 },

    /// A sample completed with a valid temperature.
    Sampled { count: u64, reading: TemperatureReading },

    /// A sample failed; the cache now carries `error`.
    SampleFailed { count: u64, error: LinkError },

    /// Periodic status snapshot.
    Status(BridgeStatus),

    /// The sampler stopped after its stop flag was raised.
    Stopped { samples: u64 },
}
