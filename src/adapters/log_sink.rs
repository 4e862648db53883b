//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing bridge events to the ESP-IDF
//! logger (UART in production).

use log::{debug, info, warn};

use crate::app::events::BridgeEvent;
use crate::app::ports::EventSink;
use crate::error::LinkError;

/// Adapter that logs every [`BridgeEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BridgeEvent) {
        match event {
            BridgeEvent::Started { sample_interval_ms } => {
                info!("START | sampling every {} ms", sample_interval_ms);
            }
            BridgeEvent::Sampled { count, reading } => {
                debug!(
                    "SAMPLE #{} | T={:.2}\u{00b0}C raw=0x{:04X}",
                    count, reading.celsius, reading.raw_frame
                );
            }
            BridgeEvent::SampleFailed { count, error } => match error {
                // The bridge already warned on the transition.
                LinkError::ThermocoupleDisconnected => debug!("SAMPLE #{} | {}", count, error),
                _ => warn!("SAMPLE #{} | failed: {}", count, error),
            },
            BridgeEvent::Status(s) => {
                let temp = match s.latest {
                    Ok(r) => format!("{:.2}\u{00b0}C", r.celsius),
                    Err(e) => e.to_string(),
                };
                info!(
                    "STATUS | sensor={:?} actuator={:?} | T={} | power={}% (duty {}) | samples={}",
                    s.sensor, s.actuator, temp, s.power_percent, s.duty_code, s.samples
                );
            }
            BridgeEvent::Stopped { samples } => {
                info!("STOP | sampler exited after {} samples", samples);
            }
        }
    }
}
