//! Shared response models
//!
//! Wire shapes returned by the delivery endpoint.

use serde::{Deserialize, Serialize};

/// Capture route response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResponse {
    pub success: bool,
    pub device: String,
    #[serde(rename = "imagePath", skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CaptureResponse {
    pub fn success(device: impl Into<String>, image_path: impl Into<String>) -> Self {
        Self {
            success: true,
            device: device.into(),
            image_path: Some(image_path.into()),
            error: None,
        }
    }

    pub fn failure(device: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            device: device.into(),
            image_path: None,
            error: Some(error.into()),
        }
    }
}

/// Service descriptor served at the root route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub status: String,
    pub service: String,
    pub version: String,
    pub devices: Vec<String>,
    pub endpoints: EndpointMap,
}

/// Route templates advertised to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointMap {
    pub capture: String,
    pub images: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
