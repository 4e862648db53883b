//! tempctl Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  Max6675Port    LedcPwmPort    LogEventSink    HTTP server   │
//! │  (SpiPort)      (PwmPort)      (EventSink)     (ControlSurface)
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  ControlBridge: link · heater · reading cache          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Sampler task (APP core) · httpd + WiFi (PRO core)           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use tempctl::adapters::hardware::{LedcPwmPort, Max6675Port};
use tempctl::adapters::log_sink::LogEventSink;
use tempctl::adapters::{http_server, wifi};
use tempctl::app::bridge::ControlBridge;
use tempctl::app::sampler::Sampler;
use tempctl::config::{NetworkConfig, SystemConfig};
use tempctl::pins;

type Bridge = ControlBridge<Max6675Port, LedcPwmPort>;

fn log_pin_map() {
    warn!(
        "MAX6675 wiring: host=SPI{} MISO=GPIO{} MOSI=GPIO{} SCLK=GPIO{} CS=GPIO{}",
        pins::MAX6675_SPI_HOST + 1,
        pins::MAX6675_MISO_GPIO,
        pins::MAX6675_MOSI_GPIO,
        pins::MAX6675_SCLK_GPIO,
        pins::MAX6675_CS_GPIO
    );
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  tempctl v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig {
        network: NetworkConfig::from_build_env(),
        ..SystemConfig::default()
    };
    config.validate()?;

    // ── 3. Hardware ───────────────────────────────────────────
    let bridge: Arc<Bridge> = Arc::new(ControlBridge::new(&config));

    if let Err(e) = bridge.init_sensor(Max6675Port::new()) {
        // Keep serving; the API reports "sensor not initialized".
        error!("Thermocouple unavailable: {}", e);
        log_pin_map();
    }
    if let Err(e) = bridge.init_actuator(LedcPwmPort::new()) {
        error!("Heater PWM unavailable: {}", e);
    }

    // ── 4. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let _wifi = match config.validate_network() {
        Ok(()) => match wifi::connect_station(peripherals.modem, sys_loop, nvs, &config.network) {
            Ok(w) => Some(w),
            Err(e) => {
                error!("WiFi: {:#}", e);
                None
            }
        },
        Err(e) => {
            warn!("WiFi disabled: {}", e);
            None
        }
    };

    let _server = http_server::start(bridge.clone(), config.http_port)?;

    // ── 5. Sampling ───────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let sampler = Sampler::new(bridge.clone(), &config)
        .spawn(LogEventSink::new(), stop.clone())?;

    info!("System ready.");

    // The sampler only returns if its stop flag is raised or it panics.
    if sampler.join().is_err() {
        error!("Sampler task panicked");
    }

    if let Err(e) = bridge.teardown() {
        error!("Teardown: {}", e);
    }
    Ok(())
}
