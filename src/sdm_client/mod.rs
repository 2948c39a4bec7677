//! SDM client - credential provider + cloud device-command API
//!
//! ## Responsibilities
//!
//! - OAuth token refresh (refresh_token grant, one token per capture
//!   request, never cached)
//! - executeCommand dispatch for live-stream generation (RTSP URL or
//!   WebRTC offer/answer exchange)
//!
//! Failure domains: `Auth` for the token exchange, `Api` for a
//! provider-reported error payload, `Protocol` for an unexpected
//! response shape. All calls are single-shot; the caller treats any
//! failure as terminal for the request.

pub mod types;

use crate::config::AppConfig;
use crate::error::{Error, Result};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub use types::*;

/// Cloud API surface used by the capture pipeline
#[async_trait::async_trait]
pub trait SdmApi: Send + Sync {
    /// Exchange the refresh credential for a short-lived access token
    async fn fetch_access_token(&self) -> Result<String>;

    /// Request a short-lived RTSP playback URL for a device
    async fn generate_rtsp_stream(&self, access_token: &str, device_id: &str) -> Result<String>;

    /// Exchange an SDP offer for an SDP answer for a device
    async fn generate_webrtc_stream(
        &self,
        access_token: &str,
        device_id: &str,
        offer_sdp: &str,
    ) -> Result<String>;
}

/// Real SDM client
pub struct SdmClient {
    http_client: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    project_id: String,
    token_endpoint: String,
    api_base: String,
}

impl SdmClient {
    pub fn new(config: &AppConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            project_id: config.project_id.clone(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            api_base: SDM_API_BASE.to_string(),
        }
    }

    /// Single executeCommand round trip with discriminated response handling
    async fn execute_command(
        &self,
        access_token: &str,
        device_id: &str,
        command: &str,
        params: serde_json::Value,
    ) -> Result<CommandResults> {
        let url = format!(
            "{}/enterprises/{}/devices/{}:executeCommand",
            self.api_base, self.project_id, device_id
        );

        debug!(device_id = %device_id, command = %command, "executeCommand");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&CommandRequest { command, params })
            .send()
            .await?;

        let body = response.text().await?;
        parse_command_response(&body)
    }
}

#[async_trait::async_trait]
impl SdmApi for SdmClient {
    async fn fetch_access_token(&self) -> Result<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("token endpoint unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = match serde_json::from_str::<GoogleTokenError>(&body) {
                Ok(err) => err.error_description.unwrap_or(err.error),
                Err(_) => format!("HTTP {}: {}", status, truncate(&body)),
            };
            return Err(Error::Auth(message));
        }

        let token: GoogleTokenResponse = serde_json::from_str(&body).map_err(|_| {
            Error::Auth(format!(
                "token response missing access_token: {}",
                truncate(&body)
            ))
        })?;

        debug!(expires_in = token.expires_in, "access token obtained");
        Ok(token.access_token)
    }

    async fn generate_rtsp_stream(&self, access_token: &str, device_id: &str) -> Result<String> {
        let results = self
            .execute_command(access_token, device_id, CMD_GENERATE_RTSP_STREAM, json!({}))
            .await?;
        extract_rtsp_url(results)
    }

    async fn generate_webrtc_stream(
        &self,
        access_token: &str,
        device_id: &str,
        offer_sdp: &str,
    ) -> Result<String> {
        let results = self
            .execute_command(
                access_token,
                device_id,
                CMD_GENERATE_WEBRTC_STREAM,
                json!({ "offerSdp": offer_sdp }),
            )
            .await?;
        extract_answer_sdp(results)
    }
}

/// Classify an executeCommand response body into results, a provider
/// error, or a protocol error
fn parse_command_response(body: &str) -> Result<CommandResults> {
    let response: CommandResponse = serde_json::from_str(body)
        .map_err(|_| Error::Protocol(format!("unparseable command response: {}", truncate(body))))?;

    if let Some(error) = response.error {
        return Err(Error::Api(error.describe()));
    }

    response.results.ok_or_else(|| {
        Error::Protocol(format!(
            "command response has neither results nor error: {}",
            truncate(body)
        ))
    })
}

fn extract_rtsp_url(results: CommandResults) -> Result<String> {
    results
        .stream_urls
        .and_then(|urls| urls.rtsp_url)
        .ok_or_else(|| Error::Protocol("results missing streamUrls.rtspUrl".to_string()))
}

fn extract_answer_sdp(results: CommandResults) -> Result<String> {
    results
        .answer_sdp
        .ok_or_else(|| Error::Protocol("results missing answerSdp".to_string()))
}

/// Longest provider-body excerpt quoted in error messages
const MAX_QUOTED_BODY: usize = 200;

/// Cap provider bodies quoted in error messages
///
/// The cut must land on a char boundary: provider error bodies can be
/// non-ASCII and a byte-offset slice would panic mid-character.
fn truncate(body: &str) -> &str {
    if body.len() <= MAX_QUOTED_BODY {
        return body;
    }
    let mut end = MAX_QUOTED_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
