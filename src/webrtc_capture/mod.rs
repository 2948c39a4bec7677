//! WebRTC capture session
//!
//! ## Responsibilities
//!
//! - Drive a headless browser through a single offer/answer negotiation
//!   with the SDM signaling command
//! - Extract one decoded video frame and persist it as JPEG
//!
//! The session is a strict step sequence: launch browser, load the
//! negotiation page, generate the offer, exchange it for an answer,
//! apply the answer, capture a frame, clean up. No step may be skipped;
//! any failure aborts the session. The peer connection cleanup hook runs
//! whether or not the frame capture succeeded, and the browser process
//! is torn down on every exit path.
//!
//! Boundary guarantee: [`WebrtcCapturer::capture`] returns a boolean
//! instead of propagating errors; internal failures are logged.

mod browser;

use crate::error::{Error, Result};
use crate::sdm_client::SdmApi;
use base64::Engine;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::fs;

pub use browser::{resolve_browser, ChromiumPage};

/// The negotiation page embedded in the binary; materialized to a temp
/// file and loaded over file://
const NEGOTIATION_PAGE: &str = include_str!("../../assets/webrtc-client.html");

/// Data URL prefix produced by the page's captureFrame hook
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Capability hooks exposed by the negotiation page
///
/// The page runs across a process boundary, so the hooks are modeled as
/// an explicit typed interface rather than ad-hoc script strings at the
/// call sites.
#[async_trait::async_trait]
pub trait NegotiationPage: Send + Sync {
    /// Produce an SDP offer string
    async fn init_webrtc(&self) -> Result<String>;
    /// Apply a remote SDP answer; media starts flowing afterwards
    async fn set_answer(&self, answer_sdp: &str) -> Result<()>;
    /// Render one decoded video frame to a JPEG data URL
    async fn capture_frame(&self) -> Result<String>;
    /// Tear down the peer connection
    async fn cleanup(&self) -> Result<()>;
}

/// Capture boundary seen by the orchestrator
#[async_trait::async_trait]
pub trait WebrtcCapturer: Send + Sync {
    /// Capture one frame to `output`; false on any internal failure
    async fn capture(&self, access_token: &str, device_id: &str, output: &Path) -> bool;
}

/// One-shot WebRTC capture session factory
pub struct WebrtcCaptureSession {
    sdm: Arc<dyn SdmApi>,
    browser_path: Option<PathBuf>,
    frame_wait: Duration,
}

impl WebrtcCaptureSession {
    pub fn new(sdm: Arc<dyn SdmApi>, browser_path: Option<PathBuf>, frame_wait: Duration) -> Self {
        Self {
            sdm,
            browser_path,
            frame_wait,
        }
    }

    async fn run(&self, access_token: &str, device_id: &str, output: &Path) -> Result<()> {
        let executable = resolve_browser(self.browser_path.as_deref())?;
        // Held for the whole session; the file is removed on drop.
        let page_file = materialize_negotiation_page()?;

        tracing::debug!(browser = %executable.display(), "launching negotiation browser");
        let (browser, handler_task) = browser::launch_browser(&executable).await?;

        // From here the browser must be released on every path.
        let result = async {
            let page = browser
                .new_page(format!("file://{}", page_file.path().display()))
                .await
                .map_err(|e| Error::Capture(format!("negotiation page load failed: {}", e)))?;
            let page = ChromiumPage::new(page);
            self.drive(&page, access_token, device_id, output).await
        }
        .await;

        browser::teardown(browser, handler_task).await;
        result
    }

    /// The negotiation state machine, generic over the page so the step
    /// ordering is testable without a browser
    async fn drive<P: NegotiationPage>(
        &self,
        page: &P,
        access_token: &str,
        device_id: &str,
        output: &Path,
    ) -> Result<()> {
        let offer_sdp = page.init_webrtc().await?;
        tracing::debug!(device_id = %device_id, offer_len = offer_sdp.len(), "SDP offer generated");

        let answer_sdp = self
            .sdm
            .generate_webrtc_stream(access_token, device_id, &offer_sdp)
            .await?;

        page.set_answer(&answer_sdp).await?;
        tracing::debug!(device_id = %device_id, "SDP answer applied, waiting for media");

        let frame = tokio::time::timeout(self.frame_wait, page.capture_frame()).await;

        // The peer connection is torn down regardless of the frame outcome.
        if let Err(e) = page.cleanup().await {
            tracing::warn!(error = %e, "negotiation page cleanup failed");
        }

        let data_url = match frame {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Capture(format!(
                    "no decoded frame within {}s",
                    self.frame_wait.as_secs()
                )))
            }
        };

        write_frame(&data_url, output).await
    }
}

#[async_trait::async_trait]
impl WebrtcCapturer for WebrtcCaptureSession {
    async fn capture(&self, access_token: &str, device_id: &str, output: &Path) -> bool {
        match self.run(access_token, device_id, output).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(device_id = %device_id, error = %e, "WebRTC capture failed");
                false
            }
        }
    }
}

/// Write the embedded negotiation page where the browser can load it
///
/// Each session gets its own file so concurrent sessions never share a
/// path, and dropping the handle removes it.
fn materialize_negotiation_page() -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("camsnap-webrtc-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(NEGOTIATION_PAGE.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Decode the JPEG data URL and persist it at `output`
async fn write_frame(data_url: &str, output: &Path) -> Result<()> {
    let encoded = data_url
        .strip_prefix(JPEG_DATA_URL_PREFIX)
        .ok_or_else(|| Error::Capture("frame payload is not a JPEG data URL".to_string()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::Capture(format!("frame payload base64 decode failed: {}", e)))?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(output, &bytes).await?;

    tracing::info!(path = %output.display(), size = bytes.len(), "snapshot saved");
    Ok(())
}
