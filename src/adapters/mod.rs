//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `hardware`     | SpiPort            | ESP32 SPI master         |
//! |                | PwmPort            | ESP32 LEDC               |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `http_server`  | (drives ControlSurface) | ESP-IDF httpd       |
//! | `wifi`         | (none)             | ESP-IDF WiFi STA         |

pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod http_server;
pub mod log_sink;
pub mod wifi;
