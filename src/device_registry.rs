//! DeviceRegistry - static device table
//!
//! Resolves a human-readable device name to its provider-assigned
//! identifier and declared stream transport. The table is loaded once at
//! startup from configuration and never changes afterwards.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Capture mechanism declared per device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamTransport {
    /// Pull a short-lived stream URL, decode externally
    Rtsp,
    /// Negotiate a live peer connection via a cloud signaling command
    Webrtc,
}

impl FromStr for StreamTransport {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RTSP" => Ok(StreamTransport::Rtsp),
            "WEBRTC" => Ok(StreamTransport::Webrtc),
            other => Err(format!("unknown stream transport: {}", other)),
        }
    }
}

/// A configured smart-camera device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Unique human-readable name (lookup key)
    pub name: String,
    /// Opaque identifier assigned by the cloud provider
    pub id: String,
    /// Declared transport
    pub transport: StreamTransport,
}

/// Immutable device table with exact-match lookup
///
/// Cardinality is small and bounded, so a linear scan is fine.
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    /// Exact-match lookup; `None` is a normal outcome, not an error
    pub fn lookup(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// All configured device names, in configuration order
    pub fn names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    /// First configured device (used as the default capture target)
    pub fn first(&self) -> Option<&Device> {
        self.devices.first()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
