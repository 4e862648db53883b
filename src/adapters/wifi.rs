//! WiFi station-mode bring-up.
//!
//! Connection management is thin: join the configured AP at
//! boot, retrying a bounded number of times, and hand the driver back to
//! `main` so it stays alive for the lifetime of the HTTP server.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real driver via `esp_idf_svc::wifi`.
//! - **all other targets**: credential validation only.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network.
pub fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (device only)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const RETRY_DELAY_MS: u64 = 1_000;

/// Join the configured AP, trying up to `network.max_retries` times.
#[cfg(target_os = "espidf")]
pub fn connect_station(
    modem: esp_idf_svc::hal::modem::Modem,
    sys_loop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
    network: &crate::config::NetworkConfig,
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use anyhow::anyhow;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{error, info, warn};

    if network.ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials.into());
    }
    validate_ssid(&network.ssid)?;
    validate_password(&network.password)?;

    let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
    let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

    let auth_method = if network.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!(ConnectivityError::InvalidSsid))?,
        password: network
            .password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!(ConnectivityError::InvalidPassword))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("WiFi: connecting to '{}'", network.ssid);

    let attempts = network.max_retries.max(1);
    for attempt in 1..=attempts {
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                let ip = wifi.wifi().sta_netif().get_ip_info()?;
                info!("WiFi: connected on attempt {}, IP {}", attempt, ip.ip);
                return Ok(wifi);
            }
            Err(e) => {
                warn!("WiFi: attempt {}/{} failed: {}", attempt, attempts, e);
                if attempt < attempts {
                    let _ = wifi.disconnect();
                    std::thread::sleep(std::time::Duration::from_millis(RETRY_DELAY_MS));
                }
            }
        }
    }

    error!("WiFi: giving up on '{}' after {} attempts", network.ssid, attempts);
    Err(ConnectivityError::ConnectionFailed.into())
}
