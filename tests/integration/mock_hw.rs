//! Mock hardware adapters for integration tests.
//!
//! Each mock is split into a port (moved into the bridge) and a shared
//! script handle the test keeps, so frames can be queued and calls
//! inspected after the port has been handed over.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};

use tempctl::app::bridge::ControlBridge;
use tempctl::app::events::BridgeEvent;
use tempctl::app::ports::{EventSink, HwResult, PwmPort, SpiPort};
use tempctl::config::SystemConfig;
use tempctl::drivers::heater::PwmConfig;
use tempctl::sensors::thermocouple::BusConfig;

pub type MockBridge = ControlBridge<MockSpiPort, MockPwmPort>;

/// 12.5 °C, no fault.
pub const FRAME_12_5C: u16 = 0x0190;
/// Open thermocouple.
pub const FRAME_OPEN: u16 = 0x0004;

// ── SPI ───────────────────────────────────────────────────────

pub struct SpiScriptState {
    pub queue: VecDeque<Result<u16, ErrorKind>>,
    /// Returned once the queue is empty.
    pub fallback: u16,
    pub claim_rc: Option<i32>,
    pub attach_rc: Option<i32>,
    pub detach_rc: Option<i32>,
    pub claims: u32,
    pub releases: u32,
    pub detaches: u32,
    pub transfers: u32,
    pub last_clock_hz: u32,
}

impl Default for SpiScriptState {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: FRAME_12_5C,
            claim_rc: None,
            attach_rc: None,
            detach_rc: None,
            claims: 0,
            releases: 0,
            detaches: 0,
            transfers: 0,
            last_clock_hz: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct SpiScript(Arc<Mutex<SpiScriptState>>);

#[allow(dead_code)]
impl SpiScript {
    pub fn state(&self) -> MutexGuard<'_, SpiScriptState> {
        self.0.lock().unwrap()
    }

    pub fn push_frame(&self, raw: u16) {
        self.state().queue.push_back(Ok(raw));
    }

    pub fn push_error(&self, kind: ErrorKind) {
        self.state().queue.push_back(Err(kind));
    }

    pub fn transfers(&self) -> u32 {
        self.state().transfers
    }
}

/// Blocks every transfer until the test releases it.
pub struct SlowGate {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Test-side handle for a [`SlowGate`].
pub struct GateControl {
    pub entered: Receiver<()>,
    pub release: Sender<()>,
}

pub fn slow_gate() -> (SlowGate, GateControl) {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        SlowGate {
            entered: entered_tx,
            release: release_rx,
        },
        GateControl {
            entered: entered_rx,
            release: release_tx,
        },
    )
}

pub struct MockSpiPort {
    script: SpiScript,
    gate: Option<SlowGate>,
}

#[allow(dead_code)]
impl MockSpiPort {
    pub fn new() -> (Self, SpiScript) {
        let script = SpiScript::default();
        (
            Self {
                script: script.clone(),
                gate: None,
            },
            script,
        )
    }

    pub fn with_gate(gate: SlowGate) -> (Self, SpiScript) {
        let (mut port, script) = Self::new();
        port.gate = Some(gate);
        (port, script)
    }
}

impl SpiPort for MockSpiPort {
    type Device = MockSpiDevice;

    fn claim_bus(&mut self, config: &BusConfig) -> HwResult {
        let mut s = self.script.state();
        s.claims += 1;
        s.last_clock_hz = config.clock_hz;
        s.claim_rc.map_or(Ok(()), Err)
    }

    fn attach_device(&mut self, _config: &BusConfig) -> HwResult<MockSpiDevice> {
        if let Some(rc) = self.script.state().attach_rc {
            return Err(rc);
        }
        Ok(MockSpiDevice {
            script: self.script.clone(),
            gate: self.gate.take(),
        })
    }

    fn detach_device(&mut self, _device: &MockSpiDevice) -> HwResult {
        let mut s = self.script.state();
        s.detaches += 1;
        s.detach_rc.map_or(Ok(()), Err)
    }

    fn release_bus(&mut self) -> HwResult {
        self.script.state().releases += 1;
        Ok(())
    }
}

pub struct MockSpiDevice {
    script: SpiScript,
    gate: Option<SlowGate>,
}

impl ErrorType for MockSpiDevice {
    type Error = ErrorKind;
}

impl SpiDevice<u8> for MockSpiDevice {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        if let Some(gate) = &self.gate {
            let _ = gate.entered.send(());
            let _ = gate.release.recv();
        }

        let frame = {
            let mut s = self.script.state();
            s.transfers += 1;
            let fallback = s.fallback;
            s.queue.pop_front().unwrap_or(Ok(fallback))?
        };

        for op in operations {
            match op {
                Operation::Transfer(read, _) | Operation::Read(read) => {
                    read.copy_from_slice(&frame.to_be_bytes()[..read.len()]);
                }
                Operation::TransferInPlace(buf) => {
                    buf.copy_from_slice(&frame.to_be_bytes()[..buf.len()]);
                }
                Operation::Write(_) | Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}

// ── PWM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmCall {
    ConfigureTimer { frequency_hz: u32 },
    ConfigureChannel { gpio: i32 },
    Stage(u32),
    Latch,
}

#[derive(Default)]
pub struct PwmScriptState {
    pub calls: Vec<PwmCall>,
    pub timer_rc: Option<i32>,
    pub channel_rc: Option<i32>,
    pub latch_rc: Option<i32>,
    pub staged: u32,
    pub latched: u32,
}

#[derive(Clone, Default)]
pub struct PwmScript(Arc<Mutex<PwmScriptState>>);

#[allow(dead_code)]
impl PwmScript {
    pub fn state(&self) -> MutexGuard<'_, PwmScriptState> {
        self.0.lock().unwrap()
    }

    pub fn latched(&self) -> u32 {
        self.state().latched
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }
}

pub struct MockPwmPort {
    script: PwmScript,
}

impl MockPwmPort {
    pub fn new() -> (Self, PwmScript) {
        let script = PwmScript::default();
        (
            Self {
                script: script.clone(),
            },
            script,
        )
    }
}

impl PwmPort for MockPwmPort {
    fn configure_timer(&mut self, config: &PwmConfig) -> HwResult {
        let mut s = self.script.state();
        s.calls.push(PwmCall::ConfigureTimer {
            frequency_hz: config.frequency_hz,
        });
        s.timer_rc.map_or(Ok(()), Err)
    }

    fn configure_channel(&mut self, config: &PwmConfig) -> HwResult {
        let mut s = self.script.state();
        s.calls.push(PwmCall::ConfigureChannel { gpio: config.gpio });
        s.channel_rc.map_or(Ok(()), Err)
    }

    fn stage_duty(&mut self, duty: u32) -> HwResult {
        let mut s = self.script.state();
        s.calls.push(PwmCall::Stage(duty));
        s.staged = duty;
        Ok(())
    }

    fn latch_duty(&mut self) -> HwResult {
        let mut s = self.script.state();
        s.calls.push(PwmCall::Latch);
        if let Some(rc) = s.latch_rc {
            return Err(rc);
        }
        s.latched = s.staged;
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects every emitted event; clones share the same buffer.
#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<BridgeEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &BridgeEvent) {
        self.0.lock().unwrap().push(*event);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Bridge with both subsystems initialised against fresh mocks.
#[allow(dead_code)]
pub fn ready_bridge() -> (MockBridge, SpiScript, PwmScript) {
    ready_bridge_with(&SystemConfig::default())
}

#[allow(dead_code)]
pub fn ready_bridge_with(config: &SystemConfig) -> (MockBridge, SpiScript, PwmScript) {
    let bridge = MockBridge::new(config);
    let (spi, spi_script) = MockSpiPort::new();
    let (pwm, pwm_script) = MockPwmPort::new();
    bridge.init_sensor(spi).unwrap();
    bridge.init_actuator(pwm).unwrap();
    (bridge, spi_script, pwm_script)
}
