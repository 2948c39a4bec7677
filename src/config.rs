//! Application configuration
//!
//! All configuration is read from the environment once at startup and
//! collected into an explicit [`AppConfig`] that is passed to components
//! at construction time. No ambient global state.

use crate::device_registry::Device;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP port
const DEFAULT_PORT: u16 = 3121;
/// Default bound on waiting for the first decoded WebRTC frame
const DEFAULT_FRAME_WAIT_SECS: u64 = 30;
/// Default wall-clock bound for a whole capture dispatch
const DEFAULT_CAPTURE_TIMEOUT_SECS: u64 = 90;
/// Default cap on concurrent browser sessions
const DEFAULT_MAX_WEBRTC_SESSIONS: usize = 2;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Long-lived refresh token
    pub refresh_token: String,
    /// SDM project identifier
    pub project_id: String,
    /// Configured devices
    pub devices: Vec<Device>,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root directory for captured images
    pub images_dir: PathBuf,
    /// Browser executable override (auto-discovered when unset)
    pub browser_path: Option<PathBuf>,
    /// Bound on waiting for the first decoded WebRTC frame
    pub frame_wait: Duration,
    /// Wall-clock bound for a whole capture dispatch
    pub capture_timeout: Duration,
    /// Cap on concurrent WebRTC browser sessions
    pub max_webrtc_sessions: usize,
}

impl AppConfig {
    /// Read configuration from the environment, failing fast on missing
    /// secrets or a malformed device list
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: require("CLIENT_ID")?,
            client_secret: require("CLIENT_SECRET")?,
            refresh_token: require("REFRESH_TOKEN")?,
            project_id: require("PROJECT_ID")?,
            devices: parse_devices(&std::env::var("DEVICES").unwrap_or_default())?,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            images_dir: std::env::var("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./images")),
            browser_path: std::env::var("BROWSER_PATH").ok().map(PathBuf::from),
            frame_wait: Duration::from_secs(env_u64("FRAME_WAIT_SECS", DEFAULT_FRAME_WAIT_SECS)),
            capture_timeout: Duration::from_secs(env_u64(
                "CAPTURE_TIMEOUT_SECS",
                DEFAULT_CAPTURE_TIMEOUT_SECS,
            )),
            max_webrtc_sessions: env_u64(
                "MAX_WEBRTC_SESSIONS",
                DEFAULT_MAX_WEBRTC_SESSIONS as u64,
            ) as usize,
        })
    }
}

fn require(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::Config(format!("{} is not set", key)))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a device list encoded as `name:id:transport` triples, separated
/// by commas or semicolons
pub fn parse_devices(raw: &str) -> Result<Vec<Device>> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            match parts.as_slice() {
                [name, id, transport] if !name.is_empty() && !id.is_empty() => Ok(Device {
                    name: name.to_string(),
                    id: id.to_string(),
                    transport: transport
                        .parse()
                        .map_err(|e| Error::Config(format!("device {}: {}", name, e)))?,
                }),
                _ => Err(Error::Config(format!(
                    "malformed device entry (expected name:id:transport): {}",
                    entry
                ))),
            }
        })
        .collect()
}
