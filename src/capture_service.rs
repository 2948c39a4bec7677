//! CaptureService - capture orchestration
//!
//! ## Responsibilities
//!
//! - Per-request sequencing: credential fetch, device lookup,
//!   timestamped output path, transport dispatch
//! - RTSP path: resolve a playback URL, then extract one frame with
//!   ffmpeg (resolution strictly before extraction)
//! - WebRTC path: delegate to the browser capture session, bounded by an
//!   admission semaphore since each session spawns a full browser
//! - Post-condition: a capture only counts as successful if the output
//!   file exists on disk afterwards

use crate::device_registry::{Device, DeviceRegistry, StreamTransport};
use crate::error::{Error, Result};
use crate::sdm_client::SdmApi;
use crate::webrtc_capture::WebrtcCapturer;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Default ffmpeg timeout for single-frame extraction
const DEFAULT_FFMPEG_TIMEOUT_SECS: u64 = 30;

/// How long a request waits for a free browser-session permit before
/// being rejected as over capacity
const PERMIT_WAIT_SECS: u64 = 10;

/// External decoder seam: extracts exactly one frame from a stream URL
#[async_trait::async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract_frame(&self, stream_url: &str, output: &Path) -> Result<()>;
}

/// ffmpeg-based single-frame extractor
pub struct FfmpegExtractor {
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FFMPEG_TIMEOUT_SECS))
    }
}

#[async_trait::async_trait]
impl FrameExtractor for FfmpegExtractor {
    /// Extract one frame from an RTSP URL to a file
    ///
    /// kill_on_drop(true) ensures the ffmpeg process is killed when the
    /// timeout cancels the wait future and the Child is dropped, so
    /// unresponsive streams do not accumulate zombie processes.
    async fn extract_frame(&self, stream_url: &str, output: &Path) -> Result<()> {
        let child = Command::new("ffmpeg")
            .args(["-rtsp_transport", "tcp", "-i", stream_url])
            .args(["-frames:v", "1", "-loglevel", "error", "-y"])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {}", e)))?;

        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => {
                if !out.status.success() {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    return Err(Error::Capture(format!("ffmpeg failed: {}", stderr.trim())));
                }
                Ok(())
            }
            Ok(Err(e)) => Err(Error::Capture(format!("ffmpeg execution failed: {}", e))),
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.timeout.as_secs(),
                    "ffmpeg timeout, process killed via kill_on_drop"
                );
                Err(Error::Capture(format!(
                    "ffmpeg timeout ({}s)",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// CaptureService instance
pub struct CaptureService {
    images_dir: PathBuf,
    registry: Arc<DeviceRegistry>,
    sdm: Arc<dyn SdmApi>,
    extractor: Arc<dyn FrameExtractor>,
    webrtc: Arc<dyn WebrtcCapturer>,
    /// Admission bound on concurrent browser sessions
    webrtc_permits: Arc<Semaphore>,
    /// Wall-clock bound for a whole dispatch
    capture_timeout: Duration,
}

impl CaptureService {
    pub fn new(
        images_dir: PathBuf,
        registry: Arc<DeviceRegistry>,
        sdm: Arc<dyn SdmApi>,
        extractor: Arc<dyn FrameExtractor>,
        webrtc: Arc<dyn WebrtcCapturer>,
        max_webrtc_sessions: usize,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            images_dir,
            registry,
            sdm,
            extractor,
            webrtc,
            webrtc_permits: Arc::new(Semaphore::new(max_webrtc_sessions.max(1))),
            capture_timeout,
        }
    }

    /// Capture one still image for a named device
    ///
    /// Returns the path of the persisted image. Any failure is terminal
    /// for the request; nothing is retried.
    pub async fn capture_for_device(&self, device_name: &str) -> Result<PathBuf> {
        let access_token = self.sdm.fetch_access_token().await?;

        let device = self
            .registry
            .lookup(device_name)
            .ok_or_else(|| Error::DeviceNotFound(device_name.to_string()))?
            .clone();

        // Minute granularity; a second capture within the same minute
        // overwrites the first (latest wins).
        let output = self.snapshot_path(&device.name, chrono::Local::now().naive_local());
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        match timeout(
            self.capture_timeout,
            self.dispatch(&access_token, &device, &output),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Capture(format!(
                    "capture timed out after {}s for {}",
                    self.capture_timeout.as_secs(),
                    device.name
                )))
            }
        }

        // Success means a file on disk, not merely the absence of errors.
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(Error::Persistence(format!(
                "no output file at {} after capture",
                output.display()
            )));
        }

        tracing::info!(
            device = %device.name,
            path = %output.display(),
            "capture complete"
        );
        Ok(output)
    }

    async fn dispatch(&self, access_token: &str, device: &Device, output: &Path) -> Result<()> {
        match device.transport {
            StreamTransport::Rtsp => {
                let stream_url = self.sdm.generate_rtsp_stream(access_token, &device.id).await?;
                tracing::debug!(device = %device.name, "stream URL resolved, extracting frame");
                self.extractor.extract_frame(&stream_url, output).await
            }
            StreamTransport::Webrtc => {
                let _permit = timeout(
                    Duration::from_secs(PERMIT_WAIT_SECS),
                    self.webrtc_permits.clone().acquire_owned(),
                )
                .await
                .map_err(|_| {
                    Error::OverCapacity(
                        "all WebRTC capture sessions are busy, try again later".to_string(),
                    )
                })?
                .map_err(|_| Error::OverCapacity("session pool closed".to_string()))?;

                if self.webrtc.capture(access_token, &device.id, output).await {
                    Ok(())
                } else {
                    Err(Error::Capture(format!(
                        "WebRTC capture failed for {}",
                        device.name
                    )))
                }
            }
        }
    }

    /// Output path: `<images_dir>/<device>/<YYYY-MM-DD-HH-MM>.jpg`
    fn snapshot_path(&self, device_name: &str, timestamp: NaiveDateTime) -> PathBuf {
        self.images_dir
            .join(device_name)
            .join(format!("{}.jpg", timestamp.format("%Y-%m-%d-%H-%M")))
    }
}
