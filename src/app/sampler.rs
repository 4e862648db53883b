//! Background sampling loop.
//!
//! Calls [`ControlSurface::sample_once`] every `sample_interval_ms`,
//! reports each outcome through an [`EventSink`], and keeps going on
//! failure.  The wait between samples holds no lock and is sliced so a
//! raised stop flag is noticed promptly.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::info;

use crate::config::SystemConfig;
use crate::drivers::task_pin::{self, Core};
use crate::error::LinkError;
use crate::sensors::thermocouple::TemperatureReading;

use super::events::BridgeEvent;
use super::ports::{ControlSurface, EventSink};

/// Longest single sleep while waiting for the next sample.
const STOP_POLL: Duration = Duration::from_millis(50);
const SAMPLER_STACK_KB: usize = 4;
const SAMPLER_PRIORITY: u8 = 5;

pub struct Sampler<C: ControlSurface> {
    surface: Arc<C>,
    interval: Duration,
    status_every: u32,
    count: u64,
}

impl<C: ControlSurface> Sampler<C> {
    pub fn new(surface: Arc<C>, config: &SystemConfig) -> Self {
        Self {
            surface,
            interval: Duration::from_millis(u64::from(config.sample_interval_ms)),
            status_every: config.status_every_samples,
            count: 0,
        }
    }

    /// Samples taken by this loop so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Take one sample and report it.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> Result<TemperatureReading, LinkError> {
        let result = self.surface.sample_once();
        self.count += 1;

        let event = match result {
            Ok(reading) => BridgeEvent::Sampled {
                count: self.count,
                reading,
            },
            Err(error) => BridgeEvent::SampleFailed {
                count: self.count,
                error,
            },
        };
        sink.emit(&event);

        if self.status_every > 0 && self.count % u64::from(self.status_every) == 0 {
            sink.emit(&BridgeEvent::Status(self.surface.status()));
        }
        result
    }

    /// Run until `stop` is raised.  The first sample is taken immediately.
    pub fn run(&mut self, sink: &mut impl EventSink, stop: &AtomicBool) {
        sink.emit(&BridgeEvent::Started {
            sample_interval_ms: self.interval.as_millis() as u32,
        });

        while !stop.load(Ordering::Acquire) {
            let started = Instant::now();
            let _ = self.tick(sink);
            self.wait_until(started + self.interval, stop);
        }

        sink.emit(&BridgeEvent::Stopped { samples: self.count });
    }

    fn wait_until(&self, deadline: Instant, stop: &AtomicBool) {
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL));
        }
    }
}

impl<C: ControlSurface + Send + Sync + 'static> Sampler<C> {
    /// Run the loop on its own task, pinned to the application core.
    pub fn spawn<E>(mut self, mut sink: E, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>>
    where
        E: EventSink + Send + 'static,
    {
        info!("sampler: every {} ms", self.interval.as_millis());
        task_pin::spawn_on_core(
            Core::App,
            SAMPLER_PRIORITY,
            SAMPLER_STACK_KB,
            "sampler\0",
            move || self.run(&mut sink, &stop),
        )
    }
}
