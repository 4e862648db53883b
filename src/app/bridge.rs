//! Shared control state: the sensing-actuation bridge.
//!
//! [`ControlBridge`] is built once in `main`, wrapped in an `Arc`, and
//! shared between the HTTP handlers and the background sampler.
//!
//! ```text
//!              ┌──────────── ControlBridge ─────────────┐
//!  sampler ──▶ │ Mutex<link>   ──▶ RwLock<latest>       │ ◀── GET  /api/temperature
//!              │ Mutex<heater> ──▶ Mutex<commanded>     │ ◀── POST /api/power
//!              │ AtomicU8 sensor/actuator state         │
//!              └────────────────────────────────────────┘
//! ```
//!
//! ## Locking rules
//!
//! - The link and the heater have independent mutexes; a power command
//!   never waits for a bus transaction.
//! - The reading cache is only write-locked *after* the transfer has
//!   completed, so readers never wait on the bus.
//! - Lock order, where two are held: `link → latest`, `heater → commanded`.
//!   No path holds locks from both chains.
//! - Poisoned locks are recovered; every critical section leaves its data
//!   in a valid state.

use core::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::drivers::heater::{HeaterPwm, PwmConfig};
use crate::error::{ActuatorError, Error, LinkError};
use crate::sensors::thermocouple::{BusConfig, TemperatureReading, ThermocoupleLink};

use super::ports::{ControlSurface, PwmPort, SpiPort};

// ───────────────────────────────────────────────────────────────
// Subsystem lifecycle
// ───────────────────────────────────────────────────────────────

/// ```text
/// Uninitialized → Initializing → Ready ⇄ Faulted
/// Ready/Faulted → ShuttingDown → Uninitialized
/// ShuttingDown → Faulted            (release failed; still attached)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubsystemState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    Faulted = 3,
    ShuttingDown = 4,
}

impl SubsystemState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Faulted,
            4 => Self::ShuttingDown,
            _ => Self::Uninitialized,
        }
    }

    /// Ready or Faulted: the hardware is claimed and usable.
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Ready | Self::Faulted)
    }
}

/// Lock-free state holder that logs every transition.
struct StateCell {
    name: &'static str,
    state: AtomicU8,
}

impl StateCell {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(SubsystemState::Uninitialized as u8),
        }
    }

    fn get(&self) -> SubsystemState {
        SubsystemState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, to: SubsystemState) {
        let from = SubsystemState::from_u8(self.state.swap(to as u8, Ordering::AcqRel));
        if from != to {
            info!("{}: {:?} -> {:?}", self.name, from, to);
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Snapshots
// ───────────────────────────────────────────────────────────────

/// Last power level accepted by the heater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandedPower {
    pub percent: u8,
    pub duty_code: u32,
}

/// Point-in-time view of the whole bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeStatus {
    pub sensor: SubsystemState,
    pub actuator: SubsystemState,
    pub latest: Result<TemperatureReading, LinkError>,
    pub power_percent: u8,
    pub duty_code: u32,
    pub samples: u64,
}

// ───────────────────────────────────────────────────────────────
// ControlBridge
// ───────────────────────────────────────────────────────────────

pub struct ControlBridge<S: SpiPort, P: PwmPort> {
    link: Mutex<Option<ThermocoupleLink<S>>>,
    heater: Mutex<Option<HeaterPwm<P>>>,
    latest: RwLock<Result<TemperatureReading, LinkError>>,
    commanded: Mutex<CommandedPower>,
    sensor: StateCell,
    actuator: StateCell,
    transport_failures: AtomicU32,
    samples: AtomicU64,
    bus_config: BusConfig,
    pwm_config: PwmConfig,
    fault_threshold: u32,
}

impl<S: SpiPort, P: PwmPort> ControlBridge<S, P> {
    /// Both subsystems start `Uninitialized`; call
    /// [`init_sensor`](Self::init_sensor) and
    /// [`init_actuator`](Self::init_actuator) next.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            link: Mutex::new(None),
            heater: Mutex::new(None),
            latest: RwLock::new(Err(LinkError::NotInitialized)),
            commanded: Mutex::new(CommandedPower::default()),
            sensor: StateCell::new("sensor"),
            actuator: StateCell::new("actuator"),
            transport_failures: AtomicU32::new(0),
            samples: AtomicU64::new(0),
            bus_config: BusConfig::from_pins(config.spi_clock_hz),
            pwm_config: PwmConfig::from_pins(config.pwm_frequency_hz),
            fault_threshold: config.transport_fault_threshold.max(1),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the thermocouple link.  An existing link is torn down first.
    pub fn init_sensor(&self, port: S) -> Result<(), LinkError> {
        let mut slot = lock(&self.link);
        if slot.is_some() {
            self.shutdown_link(&mut slot)?;
        }

        self.sensor.set(SubsystemState::Initializing);
        match ThermocoupleLink::initialize(port, self.bus_config) {
            Ok(link) => {
                *slot = Some(link);
                self.transport_failures.store(0, Ordering::Relaxed);
                self.sensor.set(SubsystemState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("sensor: initialization failed: {}", e);
                self.sensor.set(SubsystemState::Uninitialized);
                Err(e)
            }
        }
    }

    /// Bring up the heater output at 0 %.  An existing driver is
    /// deinitialised first.
    pub fn init_actuator(&self, port: P) -> Result<(), ActuatorError> {
        let mut slot = lock(&self.heater);
        if slot.is_some() {
            self.shutdown_heater(&mut slot)?;
        }

        self.actuator.set(SubsystemState::Initializing);
        match HeaterPwm::initialize(port, self.pwm_config) {
            Ok(heater) => {
                let percent = heater.start().unwrap_or_default();
                *lock(&self.commanded) = CommandedPower {
                    percent: percent.round() as u8,
                    duty_code: heater.state().duty_code,
                };
                *slot = Some(heater);
                self.actuator.set(SubsystemState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("actuator: initialization failed: {}", e);
                self.actuator.set(SubsystemState::Uninitialized);
                Err(e)
            }
        }
    }

    /// Heater off, then both subsystems released.  Both steps are always
    /// attempted and the first failure is returned.  A subsystem whose
    /// release fails stays attached and `Faulted`, so `teardown` can be
    /// called again to finish the job.
    pub fn teardown(&self) -> Result<(), Error> {
        let heater_result = {
            let mut slot = lock(&self.heater);
            self.shutdown_heater(&mut slot)
        };
        let link_result = {
            let mut slot = lock(&self.link);
            self.shutdown_link(&mut slot)
        };
        heater_result?;
        link_result?;
        Ok(())
    }

    fn shutdown_link(&self, slot: &mut Option<ThermocoupleLink<S>>) -> Result<(), LinkError> {
        let Some(link) = slot.as_mut() else {
            return Ok(());
        };
        self.sensor.set(SubsystemState::ShuttingDown);
        if let Err(e) = link.teardown() {
            error!("sensor: teardown failed: {}", e);
            self.sensor.set(SubsystemState::Faulted);
            return Err(e);
        }
        *slot = None;
        *self
            .latest
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Err(LinkError::NotInitialized);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.sensor.set(SubsystemState::Uninitialized);
        Ok(())
    }

    fn shutdown_heater(&self, slot: &mut Option<HeaterPwm<P>>) -> Result<(), ActuatorError> {
        let Some(heater) = slot.as_mut() else {
            return Ok(());
        };
        self.actuator.set(SubsystemState::ShuttingDown);
        // A failed deinit leaves the previous duty latched; keep the driver
        // and the commanded record so the output stays reachable.
        if let Err(e) = heater.deinit() {
            error!("actuator: deinit failed: {}", e);
            self.actuator.set(SubsystemState::Faulted);
            return Err(e);
        }
        *slot = None;
        *lock(&self.commanded) = CommandedPower::default();
        self.actuator.set(SubsystemState::Uninitialized);
        Ok(())
    }

    // ── Sensing ───────────────────────────────────────────────

    /// One bus transaction; the outcome (value or error) replaces the cache.
    ///
    /// Health tracking runs before the link lock is released, so its
    /// state changes cannot interleave with `init_sensor` or `teardown`.
    pub fn sample_once(&self) -> Result<TemperatureReading, LinkError> {
        let mut slot = lock(&self.link);
        let link = slot.as_mut().ok_or(LinkError::NotInitialized)?;
        let result = link.read();

        let previous = {
            let mut cache = self
                .latest
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            core::mem::replace(&mut *cache, result)
        };
        self.samples.fetch_add(1, Ordering::Relaxed);

        self.track_health(&result, &previous);
        drop(slot);
        result
    }

    fn track_health(
        &self,
        result: &Result<TemperatureReading, LinkError>,
        previous: &Result<TemperatureReading, LinkError>,
    ) {
        match result {
            Err(e @ LinkError::TransportError(_)) => {
                let n = self.transport_failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!("sensor: {} ({} consecutive)", e, n);
                if n >= self.fault_threshold && self.sensor.get() == SubsystemState::Ready {
                    error!("sensor: {} consecutive transport failures", n);
                    self.sensor.set(SubsystemState::Faulted);
                }
                return;
            }
            Err(LinkError::ThermocoupleDisconnected) => {
                if matches!(previous, Err(LinkError::ThermocoupleDisconnected)) {
                    debug!("sensor: thermocouple still disconnected");
                } else {
                    warn!("sensor: thermocouple not connected");
                }
            }
            Ok(reading) => {
                if matches!(previous, Err(LinkError::ThermocoupleDisconnected)) {
                    info!("sensor: thermocouple reconnected ({:.2}\u{00b0}C)", reading.celsius);
                }
            }
            Err(_) => {}
        }

        // The bus answered, so the link itself is healthy again.
        self.transport_failures.store(0, Ordering::Relaxed);
        if self.sensor.get() == SubsystemState::Faulted {
            self.sensor.set(SubsystemState::Ready);
        }
    }

    /// Cached outcome of the most recent sample.  Never touches the bus.
    pub fn get_latest_reading(&self) -> Result<TemperatureReading, LinkError> {
        *self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Actuation ─────────────────────────────────────────────

    /// Strictly validated external power command.
    pub fn apply_power_command(&self, percent: i32) -> Result<u8, ActuatorError> {
        if !(0..=100).contains(&percent) {
            warn!("actuator: rejected power command {}%", percent);
            return Err(ActuatorError::InvalidRange(percent));
        }

        let mut slot = lock(&self.heater);
        let heater = slot.as_mut().ok_or(ActuatorError::NotInitialized)?;

        match heater.set_power(percent) {
            Ok(()) => {
                let applied = CommandedPower {
                    percent: percent as u8,
                    duty_code: heater.state().duty_code,
                };
                *lock(&self.commanded) = applied;
                if self.actuator.get() == SubsystemState::Faulted {
                    self.actuator.set(SubsystemState::Ready);
                }
                info!("actuator: power set to {}% (duty {})", applied.percent, applied.duty_code);
                Ok(applied.percent)
            }
            Err(e) => {
                error!("actuator: {}", e);
                if matches!(e, ActuatorError::HardwareError(_)) {
                    self.actuator.set(SubsystemState::Faulted);
                }
                Err(e)
            }
        }
    }

    /// Drive the heater to 0 %.
    pub fn stop_heater(&self) -> Result<(), ActuatorError> {
        self.apply_power_command(0).map(|_| ())
    }

    // ── Introspection ─────────────────────────────────────────

    pub fn sensor_state(&self) -> SubsystemState {
        self.sensor.get()
    }

    pub fn actuator_state(&self) -> SubsystemState {
        self.actuator.get()
    }

    pub fn commanded_power(&self) -> CommandedPower {
        *lock(&self.commanded)
    }

    pub fn status(&self) -> BridgeStatus {
        let commanded = self.commanded_power();
        BridgeStatus {
            sensor: self.sensor_state(),
            actuator: self.actuator_state(),
            latest: self.get_latest_reading(),
            power_percent: commanded.percent,
            duty_code: commanded.duty_code,
            samples: self.samples.load(Ordering::Relaxed),
        }
    }
}

impl<S: SpiPort, P: PwmPort> ControlSurface for ControlBridge<S, P> {
    fn sample_once(&self) -> Result<TemperatureReading, LinkError> {
        ControlBridge::sample_once(self)
    }

    fn get_latest_reading(&self) -> Result<TemperatureReading, LinkError> {
        ControlBridge::get_latest_reading(self)
    }

    fn apply_power_command(&self, percent: i32) -> Result<u8, ActuatorError> {
        ControlBridge::apply_power_command(self, percent)
    }

    fn status(&self) -> BridgeStatus {
        ControlBridge::status(self)
    }
}
