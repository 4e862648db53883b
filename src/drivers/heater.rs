//! Nichrome heater driver (IRF3205 low-side MOSFET on an LEDC channel).
//!
//! Power is expressed as a percentage and mapped onto a 12-bit duty code.
//! Every update is two-phase: the duty is staged into the channel's shadow
//! register and then latched, both under the driver's `&mut self`, so a
//! concurrent command can never interleave a stage with another latch.
//!
//! ## Clamping contract
//!
//! The driver clamps silently.  Rejecting out-of-range *external*
//! commands is the bridge's job.

use log::{info, warn};

use crate::app::ports::PwmPort;
use crate::error::ActuatorError;
use crate::pins;

/// Highest duty code at the configured resolution (4095 for 12 bits).
pub const MAX_DUTY: u32 = (1 << pins::PWM_RESOLUTION_BITS) - 1;

/// Map a percentage onto a duty code: clamp to 0–100, then floor.
pub fn percent_to_duty(percent: f32) -> u32 {
    if percent.is_nan() {
        return 0;
    }
    let p = f64::from(percent.clamp(0.0, 100.0));
    (p / 100.0 * f64::from(MAX_DUTY)).floor() as u32
}

/// Inverse of [`percent_to_duty`], within one duty step.
pub fn duty_to_percent(duty: u32) -> f32 {
    let d = duty.min(MAX_DUTY);
    (f64::from(d) / f64::from(MAX_DUTY) * 100.0) as f32
}

/// LEDC timer + channel parameters for the heater output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwmConfig {
    pub frequency_hz: u32,
    pub resolution_bits: u32,
    pub gpio: i32,
    pub timer: u32,
    pub channel: u32,
}

impl PwmConfig {
    pub fn from_pins(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
            resolution_bits: pins::PWM_RESOLUTION_BITS,
            gpio: pins::HEATER_PWM_GPIO,
            timer: pins::HEATER_LEDC_TIMER,
            channel: pins::HEATER_LEDC_CHANNEL,
        }
    }
}

impl Default for PwmConfig {
    fn default() -> Self {
        Self::from_pins(pins::HEATER_PWM_FREQ_HZ)
    }
}

/// What the output is currently driving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorState {
    /// Last duty code that was successfully latched.
    pub duty_code: u32,
    /// Percentage corresponding to `duty_code`.
    pub requested_percent: f32,
}

impl ActuatorState {
    pub fn from_duty(duty_code: u32) -> Self {
        Self {
            duty_code,
            requested_percent: duty_to_percent(duty_code),
        }
    }

    pub const OFF: Self = Self {
        duty_code: 0,
        requested_percent: 0.0,
    };
}

pub struct HeaterPwm<P: PwmPort> {
    port: P,
    config: PwmConfig,
    state: ActuatorState,
    initialized: bool,
}

impl<P: PwmPort> HeaterPwm<P> {
    /// Configure timer then channel.  The output starts at 0 %.
    pub fn initialize(mut port: P, config: PwmConfig) -> Result<Self, ActuatorError> {
        port.configure_timer(&config)
            .map_err(ActuatorError::TimerConfigError)?;
        port.configure_channel(&config)
            .map_err(ActuatorError::ChannelConfigError)?;

        info!(
            "Heater PWM initialized (GPIO{}, {} Hz, {}-bit)",
            config.gpio, config.frequency_hz, config.resolution_bits
        );

        Ok(Self {
            port,
            config,
            state: ActuatorState::OFF,
            initialized: true,
        })
    }

    /// Drive the heater at an integer percentage, clamped to 0–100.
    pub fn set_power(&mut self, percent: i32) -> Result<(), ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        let clamped = percent.clamp(0, 100);
        if clamped != percent {
            warn!("Heater: power {}% clamped to {}%", percent, clamped);
        }
        self.set_power_percent(clamped as f32)
    }

    /// Fractional variant of [`set_power`](Self::set_power).
    pub fn set_power_percent(&mut self, percent: f32) -> Result<(), ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        self.commit(percent_to_duty(percent))
    }

    fn commit(&mut self, duty: u32) -> Result<(), ActuatorError> {
        self.port
            .stage_duty(duty)
            .map_err(ActuatorError::HardwareError)?;

        if let Err(rc) = self.port.latch_duty() {
            // Leave the shadow register matching what is actually latched.
            if let Err(restage_rc) = self.port.stage_duty(self.state.duty_code) {
                warn!("Heater: re-staging duty {} failed (rc={})", self.state.duty_code, restage_rc);
            }
            return Err(ActuatorError::HardwareError(rc));
        }

        self.state = ActuatorState::from_duty(duty);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_power(0)
    }

    /// Report the committed output.  The channel already runs from
    /// `initialize`; this only confirms it.
    pub fn start(&self) -> Result<f32, ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        info!(
            "Heater PWM running at {:.1}% (duty {}/{})",
            self.state.requested_percent, self.state.duty_code, MAX_DUTY
        );
        Ok(self.state.requested_percent)
    }

    /// Force the output off and refuse further commands.  Idempotent.
    pub fn deinit(&mut self) -> Result<(), ActuatorError> {
        if !self.initialized {
            return Ok(());
        }
        self.stop()?;
        self.initialized = false;
        info!("Heater PWM deinitialized");
        Ok(())
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &PwmConfig {
        &self.config
    }
}
