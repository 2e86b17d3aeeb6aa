//! # Device Identity
//!
//! The server knows a display only by its MAC address, so the client reports
//! the address of the Pi's network interface. Discovery mirrors what the
//! ESP32 firmware exposes: the Wi-Fi MAC when present, otherwise the
//! Ethernet one, otherwise any non-loopback interface.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reported when no interface exposes a usable address
pub const UNKNOWN_MAC: &str = "00:00:00:00:00:00";

/// Where Linux exposes network interfaces
pub const SYSFS_NET: &str = "/sys/class/net";

/// MAC address and the hostname derived from it. Immutable for the life of
/// the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    mac: String,
    hostname: String,
}

impl DeviceIdentity {
    /// Build an identity from a MAC address in any case.
    pub fn from_mac(mac: &str) -> Self {
        let mac = mac.trim().to_uppercase();
        let hostname = format!("INK_{}", mac.replace(':', ""));
        Self { mac, hostname }
    }

    /// Discover the MAC from the real sysfs tree.
    pub fn discover(preferred: &[String]) -> Self {
        Self::discover_in(Path::new(SYSFS_NET), preferred)
    }

    /// Discover the MAC below `root` (a `/sys/class/net` lookalike).
    pub fn discover_in(root: &Path, preferred: &[String]) -> Self {
        let from_preferred = preferred
            .iter()
            .find_map(|iface| read_address(&root.join(iface)));

        let mac = from_preferred
            .or_else(|| {
                let mut others: Vec<PathBuf> = fs::read_dir(root)
                    .ok()?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| path.file_name().is_some_and(|name| name != "lo"))
                    .collect();
                others.sort();
                others.iter().find_map(|path| read_address(path))
            })
            .unwrap_or_else(|| {
                warn!("No network interface with a MAC address found");
                UNKNOWN_MAC.to_string()
            });

        let identity = Self::from_mac(&mac);
        info!("MAC Address: {}", identity.mac);
        info!("Hostname: {}", identity.hostname);
        identity
    }

    /// Canonical `XX:XX:XX:XX:XX:XX`, uppercase
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// `INK_` followed by the twelve MAC digits
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

/// Read `<iface>/address`, skipping empty and all-zero addresses.
fn read_address(iface: &Path) -> Option<String> {
    let raw = fs::read_to_string(iface.join("address")).ok()?;
    let mac = raw.trim().to_uppercase();
    if mac.is_empty() || mac == UNKNOWN_MAC {
        debug!("Skipping {} (no address)", iface.display());
        return None;
    }
    Some(mac)
}
