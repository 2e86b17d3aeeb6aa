//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the zivyobraz.toml file.
//! It provides a centralized way to configure the content server, the values the
//! device reports about itself, and the display wiring.
//!
//! Every field has a default, so a partial file only overrides what it names and a
//! missing or broken file falls back to the stock configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "zivyobraz.toml";

/// Application configuration loaded from zivyobraz.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Content server configuration
    pub server: ServerConfig,
    /// Values reported to the server about this device
    pub device: DeviceConfig,
    /// Display geometry and wiring
    pub display: DisplayConfig,
}

/// Content server endpoint and timing
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host name (e.g., "cdn.zivyobraz.eu")
    pub host: String,
    /// Request path for both the check and the fetch call
    pub path: String,
    /// Firmware version string sent as `fw`
    pub firmware: String,
    /// Timeout for the timestamp check request
    pub check_timeout_secs: u64,
    /// Timeout for the image download
    pub fetch_timeout_secs: u64,
    /// Sleep interval used whenever the server's advice is unavailable
    pub default_sleep_secs: u64,
}

/// Device-reported values. The radio and power figures are placeholders
/// since a wired or Wi-Fi Pi has no battery to measure.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Override the discovered MAC address (XX:XX:XX:XX:XX:XX)
    pub mac: Option<String>,
    /// Network interfaces to read the MAC from, in order of preference
    pub interfaces: Vec<String>,
    /// Signal strength placeholder sent as `rssi`
    pub rssi: String,
    /// Network name placeholder sent as `ssid`
    pub ssid: String,
    /// Voltage placeholder sent as `v`
    pub voltage: String,
    /// Access point retry counter sent as `ap_retries`
    pub ap_retries: u32,
}

/// Display and panel configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// E-ink display width in pixels
    pub width: u32,
    /// E-ink display height in pixels
    pub height: u32,
    /// Color capability tag sent as `c`
    pub color_type: String,
    /// GPIO and bus wiring of the panel
    pub hardware: HardwareConfig,
}

/// Waveshare HAT wiring (BCM GPIO numbers)
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub cs_pin: u32,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
    pub spi_device: String,
    pub gpio_chip: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "cdn.zivyobraz.eu".to_string(),
            path: "/index.php".to_string(),
            firmware: "2.4".to_string(),
            check_timeout_secs: 30,
            fetch_timeout_secs: 60,
            default_sleep_secs: crate::DEFAULT_SLEEP_SECS,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            mac: None,
            interfaces: vec!["wlan0".to_string(), "eth0".to_string()],
            rssi: "-50".to_string(),
            ssid: "RaspberryPi".to_string(),
            voltage: "5.0".to_string(),
            ap_retries: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: crate::DISPLAY_WIDTH,   // Waveshare 7.5" V2
            height: crate::DISPLAY_HEIGHT, // Waveshare 7.5" V2
            color_type: "BW".to_string(),
            hardware: HardwareConfig::default(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            cs_pin: 8,
            dc_pin: 25,
            rst_pin: 17,
            busy_pin: 24,
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
        }
    }
}

impl ServerConfig {
    /// Full URL shared by the check and fetch requests
    pub fn url(&self) -> String {
        format!("http://{}{}", self.host, self.path)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Load configuration from zivyobraz.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "cdn.zivyobraz.eu");
        assert_eq!(config.server.url(), "http://cdn.zivyobraz.eu/index.php");
        assert_eq!(config.server.check_timeout(), Duration::from_secs(30));
        assert_eq!(config.server.fetch_timeout(), Duration::from_secs(60));
        assert_eq!(config.server.default_sleep_secs, 120);
        assert_eq!(config.display.width, 800);
        assert_eq!(config.display.height, 480);
        assert_eq!(config.display.color_type, "BW");
        assert_eq!(config.device.interfaces, ["wlan0", "eth0"]);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.device.mac = Some("AA:BB:CC:DD:EE:FF".to_string());
        let temp_file = NamedTempFile::new().unwrap();
        config.save_to_path(temp_file.path()).unwrap();

        let parsed = Config::load_from_path(temp_file.path());
        assert_eq!(parsed.server.host, config.server.host);
        assert_eq!(parsed.device.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
        assert_eq!(parsed.display.hardware.busy_pin, 24);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            temp_file.path(),
            "[server]\nhost = \"localhost:8080\"\n\n[display.hardware]\nbusy_pin = 5\n",
        )
        .unwrap();

        let config = Config::load_from_path(temp_file.path());
        assert_eq!(config.server.url(), "http://localhost:8080/index.php");
        assert_eq!(config.server.firmware, "2.4");
        assert_eq!(config.display.hardware.busy_pin, 5);
        assert_eq!(config.display.hardware.dc_pin, 25);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "server = [not toml").unwrap();
        let config = Config::load_from_path(temp_file.path());
        assert_eq!(config.server.host, "cdn.zivyobraz.eu");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.server.host, "cdn.zivyobraz.eu");
    }
}
