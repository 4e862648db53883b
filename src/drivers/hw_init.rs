//! Raw ESP-IDF peripheral calls for the SPI host and the LEDC block.
//!
//! Every function returns the bare `esp_err_t` on failure; the hardware
//! adapter hands these to the drivers, which map them into typed errors.
//!
//! On non-espidf targets the same functions operate on in-memory
//! simulation state so the adapter layer can be exercised on the host.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::app::ports::HwResult;
use crate::drivers::heater::PwmConfig;
use crate::sensors::thermocouple::BusConfig;

/// Largest single transaction the bus is configured for.
pub const SPI_MAX_TRANSFER: usize = 32;

#[cfg(target_os = "espidf")]
fn check(ret: esp_err_t) -> HwResult {
    if ret == ESP_OK as esp_err_t { Ok(()) } else { Err(ret) }
}

// ── SPI master ───────────────────────────────────────────────

/// Handle for a device attached with `spi_bus_add_device`.
#[cfg(target_os = "espidf")]
pub struct SpiHandle(spi_device_handle_t);

// SAFETY: the handle is an opaque pointer owned by the SPI driver.  The
// link keeps it behind `&mut` access (and the bridge behind a Mutex), so
// it is only ever used from one thread at a time.
#[cfg(target_os = "espidf")]
unsafe impl Send for SpiHandle {}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug)]
pub struct SpiHandle(u32);

#[cfg(target_os = "espidf")]
pub fn spi_claim(cfg: &BusConfig) -> HwResult {
    let bus = spi_bus_config_t {
        __bindgen_anon_1: spi_bus_config_t__bindgen_ty_1 { mosi_io_num: cfg.mosi_gpio },
        __bindgen_anon_2: spi_bus_config_t__bindgen_ty_2 { miso_io_num: cfg.miso_gpio },
        sclk_io_num: cfg.sclk_gpio,
        __bindgen_anon_3: spi_bus_config_t__bindgen_ty_3 { quadwp_io_num: -1 },
        __bindgen_anon_4: spi_bus_config_t__bindgen_ty_4 { quadhd_io_num: -1 },
        max_transfer_sz: SPI_MAX_TRANSFER as i32,
        ..Default::default()
    };
    // SAFETY: `bus` outlives the call; the driver copies the config.
    check(unsafe {
        spi_bus_initialize(cfg.host as spi_host_device_t, &bus, spi_common_dma_t_SPI_DMA_DISABLED)
    })
}

#[cfg(target_os = "espidf")]
pub fn spi_attach(cfg: &BusConfig) -> HwResult<SpiHandle> {
    let dev = spi_device_interface_config_t {
        clock_speed_hz: cfg.clock_hz as i32,
        mode: 0, // CPOL=0, CPHA=0
        spics_io_num: cfg.cs_gpio,
        queue_size: 1,
        ..Default::default()
    };
    let mut handle: spi_device_handle_t = core::ptr::null_mut();
    // SAFETY: `handle` is written by the driver on success only.
    check(unsafe { spi_bus_add_device(cfg.host as spi_host_device_t, &dev, &mut handle) })?;
    Ok(SpiHandle(handle))
}

/// Full-duplex polling transfer.  `tx` and `rx` must have equal length.
#[cfg(target_os = "espidf")]
pub fn spi_transfer(handle: &SpiHandle, tx: &[u8], rx: &mut [u8]) -> HwResult {
    if tx.len() != rx.len() || tx.len() > SPI_MAX_TRANSFER {
        return Err(ESP_ERR_INVALID_SIZE as esp_err_t);
    }
    let mut t = spi_transaction_t {
        length: tx.len() * 8,
        __bindgen_anon_1: spi_transaction_t__bindgen_ty_1 {
            tx_buffer: tx.as_ptr().cast(),
        },
        __bindgen_anon_2: spi_transaction_t__bindgen_ty_2 {
            rx_buffer: rx.as_mut_ptr().cast(),
        },
        ..Default::default()
    };
    // SAFETY: both buffers outlive the blocking polling transmit.
    check(unsafe { spi_device_polling_transmit(handle.0, &mut t) })
}

#[cfg(target_os = "espidf")]
pub fn spi_detach(handle: &SpiHandle) -> HwResult {
    // SAFETY: the link drops the handle as soon as removal succeeds, so a
    // removed handle is never passed here again.
    check(unsafe { spi_bus_remove_device(handle.0) })
}

#[cfg(target_os = "espidf")]
pub fn spi_release(host: u32) -> HwResult {
    // SAFETY: all devices were removed before the bus is freed.
    check(unsafe { spi_bus_free(host as spi_host_device_t) })
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn ledc_timer(cfg: &PwmConfig) -> HwResult {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: cfg.timer,
        // ledc_timer_bit_t values equal the bit count.
        duty_resolution: cfg.resolution_bits,
        freq_hz: cfg.frequency_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: config is copied by the driver.
    check(unsafe { ledc_timer_config(&timer) })
}

#[cfg(target_os = "espidf")]
pub fn ledc_channel(cfg: &PwmConfig) -> HwResult {
    let channel = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: cfg.channel,
        timer_sel: cfg.timer,
        gpio_num: cfg.gpio,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: config is copied by the driver.
    check(unsafe { ledc_channel_config(&channel) })
}

#[cfg(target_os = "espidf")]
pub fn ledc_stage(channel: u32, duty: u32) -> HwResult {
    // SAFETY: the channel was configured in `ledc_channel`; callers hold
    // the heater driver exclusively.
    check(unsafe { ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty) })
}

#[cfg(target_os = "espidf")]
pub fn ledc_latch(channel: u32) -> HwResult {
    // SAFETY: as for `ledc_stage`.
    check(unsafe { ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel) })
}

// ── Host simulation ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

    /// 25.00 °C, no fault.
    pub(super) static SIM_FRAME: AtomicU16 = AtomicU16::new(0x0320);
    pub(super) static SIM_STAGED: AtomicU32 = AtomicU32::new(0);
    pub(super) static SIM_DUTY: AtomicU32 = AtomicU32::new(0);
    pub(super) static SIM_HANDLES: AtomicU32 = AtomicU32::new(0);

    pub fn set_frame(raw: u16) {
        SIM_FRAME.store(raw, Ordering::Relaxed);
    }

    pub fn duty() -> u32 {
        SIM_DUTY.load(Ordering::Relaxed)
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::{duty as sim_duty, set_frame as sim_set_frame};

#[cfg(not(target_os = "espidf"))]
pub fn spi_claim(_cfg: &BusConfig) -> HwResult {
    log::info!("hw_init(sim): SPI bus claimed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn spi_attach(_cfg: &BusConfig) -> HwResult<SpiHandle> {
    use core::sync::atomic::Ordering;
    Ok(SpiHandle(sim::SIM_HANDLES.fetch_add(1, Ordering::Relaxed)))
}

#[cfg(not(target_os = "espidf"))]
pub fn spi_transfer(_handle: &SpiHandle, tx: &[u8], rx: &mut [u8]) -> HwResult {
    use core::sync::atomic::Ordering;
    const ESP_ERR_INVALID_SIZE: i32 = 0x104;
    if tx.len() != rx.len() || tx.len() > SPI_MAX_TRANSFER {
        return Err(ESP_ERR_INVALID_SIZE);
    }
    let frame = sim::SIM_FRAME.load(Ordering::Relaxed).to_be_bytes();
    for (dst, src) in rx.iter_mut().zip(frame.iter().cycle()) {
        *dst = *src;
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn spi_detach(handle: &SpiHandle) -> HwResult {
    log::debug!("hw_init(sim): SPI device {} removed", handle.0);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn spi_release(_host: u32) -> HwResult {
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_timer(_cfg: &PwmConfig) -> HwResult {
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_channel(_cfg: &PwmConfig) -> HwResult {
    use core::sync::atomic::Ordering;
    sim::SIM_STAGED.store(0, Ordering::Relaxed);
    sim::SIM_DUTY.store(0, Ordering::Relaxed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_stage(_channel: u32, duty: u32) -> HwResult {
    sim::SIM_STAGED.store(duty, core::sync::atomic::Ordering::Relaxed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_latch(_channel: u32) -> HwResult {
    use core::sync::atomic::Ordering;
    sim::SIM_DUTY.store(sim::SIM_STAGED.load(Ordering::Relaxed), Ordering::Relaxed);
    Ok(())
}
