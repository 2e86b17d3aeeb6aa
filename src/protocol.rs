//! # Update Detection Protocol
//!
//! Before downloading anything the client asks the server whether the
//! content changed, using the same request as the download plus
//! `timestamp_check=1`. The answer comes back entirely in response headers:
//!
//! | header | meaning |
//! |---|---|
//! | `timestamp` | content version; any change means "redraw" |
//! | `sleep` | minutes until the next check |
//! | `sleepseconds` | seconds until the next check, wins over `sleep` |
//! | `rotate` | orientation code 0-3 |
//!
//! Header names are matched case-insensitively. `sleepseconds` takes
//! precedence over `sleep` no matter which one the server sends first.
//!
//! ## State Rules
//! [`UpdateState`] only changes after a successfully parsed response that
//! reports a new timestamp. Transport failures return the fallback decision
//! `(false, default sleep, identity)` and leave the state alone, so the next
//! successful check still compares against the last displayed version.

use crate::config::{Config, ServerConfig};
use crate::error::{ProtocolError, TransportError};
use crate::identity::DeviceIdentity;
use crate::image::Rotation;
use crate::transport::{HttpResponse, Transport};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument, Span};

/// What the client remembers between iterations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateState {
    /// Version of the content currently on the panel, 0 before the first draw
    pub last_timestamp: i64,
    pub sleep_seconds: u64,
    pub rotation: Rotation,
}

impl Default for UpdateState {
    fn default() -> Self {
        Self {
            last_timestamp: 0,
            sleep_seconds: crate::DEFAULT_SLEEP_SECS,
            rotation: Rotation::Identity,
        }
    }
}

impl UpdateState {
    /// Compare fresh server advice against the stored version.
    ///
    /// The state is replaced wholesale only when the timestamp changed.
    pub fn apply(&mut self, advice: ServerAdvice) -> UpdateCheck {
        let needs_update = advice.timestamp != self.last_timestamp;
        if needs_update {
            info!(
                "Update needed: timestamp changed from {} to {}",
                self.last_timestamp, advice.timestamp
            );
            *self = UpdateState {
                last_timestamp: advice.timestamp,
                sleep_seconds: advice.sleep_seconds,
                rotation: advice.rotation,
            };
        } else {
            info!("No update needed, timestamp unchanged");
        }
        UpdateCheck {
            needs_update,
            sleep_seconds: advice.sleep_seconds,
            rotation: advice.rotation,
        }
    }
}

/// Result of one update check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateCheck {
    pub needs_update: bool,
    pub sleep_seconds: u64,
    pub rotation: Rotation,
}

impl UpdateCheck {
    /// Decision used when the server could not be reached.
    pub fn fallback(default_sleep_secs: u64) -> Self {
        Self {
            needs_update: false,
            sleep_seconds: default_sleep_secs,
            rotation: Rotation::Identity,
        }
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_secs(self.sleep_seconds)
    }
}

/// Control values parsed from a check response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerAdvice {
    pub timestamp: i64,
    pub sleep_seconds: u64,
    pub rotation: Rotation,
}

fn parse_header<T: FromStr>(name: &str, value: &str) -> Result<T, ProtocolError> {
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidHeader {
            name: name.to_string(),
            value: value.to_string(),
        })
}

impl ServerAdvice {
    /// Interpret response headers. Missing headers keep their defaults:
    /// timestamp 0, `default_sleep_secs`, identity rotation.
    pub fn from_headers(
        headers: &[(String, String)],
        default_sleep_secs: u64,
    ) -> Result<Self, ProtocolError> {
        let mut timestamp = 0i64;
        let mut sleep_minutes: Option<u64> = None;
        let mut sleep_seconds: Option<u64> = None;
        let mut rotation = Rotation::Identity;

        for (name, value) in headers {
            match name.to_ascii_lowercase().as_str() {
                "timestamp" => {
                    timestamp = parse_header(name, value)?;
                    info!("Timestamp from server: {}", timestamp);
                }
                "sleep" => {
                    let minutes: u64 = parse_header(name, value)?;
                    info!("Sleep time: {} minutes", minutes);
                    sleep_minutes = Some(minutes);
                }
                "sleepseconds" => {
                    let seconds: u64 = parse_header(name, value)?;
                    info!("Sleep time: {} seconds", seconds);
                    sleep_seconds = Some(seconds);
                }
                "rotate" => {
                    let code: i64 = parse_header(name, value)?;
                    rotation = Rotation::from_code(code).unwrap_or_else(|| {
                        warn!("Unknown rotation {}, using 0", code);
                        Rotation::Identity
                    });
                    info!("Rotation: {}", rotation.code());
                }
                _ => {}
            }
        }

        let sleep_seconds = sleep_seconds
            .or(sleep_minutes.map(|m| m.saturating_mul(60)))
            .unwrap_or(default_sleep_secs);

        Ok(Self {
            timestamp,
            sleep_seconds,
            rotation,
        })
    }
}

/// Identification and capability values sent with every request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceQuery {
    pub mac: String,
    pub rssi: String,
    pub ssid: String,
    pub voltage: String,
    pub width: u32,
    pub height: u32,
    pub color_type: String,
    pub firmware: String,
    pub ap_retries: u32,
}

impl DeviceQuery {
    pub fn new(identity: &DeviceIdentity, config: &Config) -> Self {
        Self {
            mac: identity.mac().to_string(),
            rssi: config.device.rssi.clone(),
            ssid: config.device.ssid.clone(),
            voltage: config.device.voltage.clone(),
            width: config.display.width,
            height: config.display.height,
            color_type: config.display.color_type.clone(),
            firmware: config.server.firmware.clone(),
            ap_retries: config.device.ap_retries,
        }
    }

    /// Query parameters; the check call adds `timestamp_check=1`.
    pub fn params(&self, timestamp_check: bool) -> Vec<(&'static str, String)> {
        let mut params = vec![("mac", self.mac.clone())];
        if timestamp_check {
            params.push(("timestamp_check", "1".to_string()));
        }
        params.extend([
            ("rssi", self.rssi.clone()),
            ("ssid", self.ssid.clone()),
            ("v", self.voltage.clone()),
            ("x", self.width.to_string()),
            ("y", self.height.to_string()),
            ("c", self.color_type.clone()),
            ("fw", self.firmware.clone()),
            ("ap_retries", self.ap_retries.to_string()),
        ]);
        params
    }
}

/// Talks to the content server on behalf of the client loop.
pub struct Poller<T> {
    transport: T,
    query: DeviceQuery,
    check_timeout: Duration,
    fetch_timeout: Duration,
    default_sleep_secs: u64,
    span: Span,
}

impl<T: Transport> Poller<T> {
    pub fn new(transport: T, query: DeviceQuery, server: &ServerConfig, span: Span) -> Self {
        Self {
            transport,
            query,
            check_timeout: server.check_timeout(),
            fetch_timeout: server.fetch_timeout(),
            default_sleep_secs: server.default_sleep_secs,
            span,
        }
    }

    /// Ask the server whether new content exists.
    ///
    /// Transport failures are absorbed into [`UpdateCheck::fallback`];
    /// only malformed control headers surface as errors.
    pub async fn check_for_update(
        &self,
        state: &mut UpdateState,
    ) -> Result<UpdateCheck, ProtocolError> {
        async {
            info!("Checking for updates");
            let params = self.query.params(true);
            debug!(?params, "Check parameters");

            let response = match self.request(&params, self.check_timeout).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Update check failed: {}", e);
                    return Ok(UpdateCheck::fallback(self.default_sleep_secs));
                }
            };

            let advice = ServerAdvice::from_headers(&response.headers, self.default_sleep_secs)?;
            Ok::<_, ProtocolError>(state.apply(advice))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Download the current content payload.
    pub async fn fetch_payload(&self) -> Result<Vec<u8>, TransportError> {
        async {
            info!("Downloading image...");
            let params = self.query.params(false);
            let response = self.request(&params, self.fetch_timeout).await?;
            info!("Downloaded {} bytes", response.body.len());
            Ok::<_, TransportError>(response.body)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn request(
        &self,
        params: &[(&'static str, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let response = self.transport.get(params, timeout).await?;
        info!("Response status: {}", response.status);
        response.ok()
    }
}
