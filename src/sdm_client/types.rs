//! SDM wire types
//!
//! Request/response shapes for the OAuth token endpoint and the SDM
//! device executeCommand endpoint.

use serde::{Deserialize, Serialize};

/// Google token endpoint (refresh grant)
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// SDM API base URL
pub const SDM_API_BASE: &str = "https://smartdevicemanagement.googleapis.com/v1";

/// Command issued to start an RTSP live stream
pub const CMD_GENERATE_RTSP_STREAM: &str =
    "sdm.devices.commands.CameraLiveStream.GenerateRtspStream";

/// Command issued to negotiate a WebRTC live stream
pub const CMD_GENERATE_WEBRTC_STREAM: &str =
    "sdm.devices.commands.CameraLiveStream.GenerateWebRtcStream";

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

/// Token endpoint error response
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenError {
    pub error: String,
    pub error_description: Option<String>,
}

/// executeCommand request envelope
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest<'a> {
    pub command: &'a str,
    pub params: serde_json::Value,
}

/// executeCommand response: either `results` or `error` is present
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    pub results: Option<CommandResults>,
    pub error: Option<ApiErrorBody>,
}

/// Fields we care about inside `results`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResults {
    pub stream_urls: Option<StreamUrls>,
    pub answer_sdp: Option<String>,
}

/// Stream URL set returned by GenerateRtspStream
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUrls {
    pub rtsp_url: Option<String>,
}

/// Provider error payload
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ApiErrorBody {
    /// Best human-readable description of the provider error
    pub fn describe(&self) -> String {
        match (&self.message, &self.status) {
            (Some(msg), _) => msg.clone(),
            (None, Some(status)) => status.clone(),
            (None, None) => format!("code {}", self.code.unwrap_or(0)),
        }
    }
}
