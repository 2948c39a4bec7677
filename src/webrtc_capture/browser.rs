//! Headless browser glue for the negotiation session
//!
//! Discovers a system Chrome/Chromium executable, launches it with
//! media-capture policy flags, and exposes the negotiation page's four
//! capability hooks as a typed interface.

use crate::error::{Error, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use super::NegotiationPage;

/// Candidate browser locations, checked in order (macOS then Linux)
const BROWSER_CANDIDATES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/usr/local/bin/chrome",
];

/// Policy flags: auto-grant media capture, autoplay without a user
/// gesture, and sandbox relaxations for constrained hosts
const LAUNCH_ARGS: &[&str] = &[
    "--use-fake-ui-for-media-stream",
    "--autoplay-policy=no-user-gesture-required",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

/// Find a usable browser executable
pub fn resolve_browser(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::Config(format!(
            "BROWSER_PATH {} does not exist",
            path.display()
        )));
    }

    for candidate in BROWSER_CANDIDATES {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    Err(Error::Capture(
        "no Chrome/Chromium executable found; install chromium or set BROWSER_PATH".to_string(),
    ))
}

/// Launch an isolated headless browser instance
///
/// The returned task drives the CDP event stream and must be aborted
/// after the browser is closed.
pub async fn launch_browser(executable: &Path) -> Result<(Browser, JoinHandle<()>)> {
    let config = BrowserConfig::builder()
        .chrome_executable(executable)
        .window_size(1920, 1080)
        .args(LAUNCH_ARGS.iter().copied())
        .build()
        .map_err(Error::Capture)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| Error::Capture(format!("browser launch failed: {}", e)))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// Close the browser on every exit path, success or failure
pub async fn teardown(mut browser: Browser, handler_task: JoinHandle<()>) {
    match browser.close().await {
        Ok(_) => {
            if let Err(e) = browser.wait().await {
                tracing::warn!(error = %e, "browser did not exit cleanly");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "browser close failed, killing process");
            let _ = browser.kill().await;
        }
    }
    handler_task.abort();
}

/// The negotiation page loaded in a Chromium tab
pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Evaluate an expression, awaiting any returned promise
    async fn eval<T: serde::de::DeserializeOwned>(&self, expression: String) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(Error::Capture)?;

        let result = self
            .page
            .evaluate(params)
            .await
            .map_err(|e| Error::Capture(format!("page evaluation failed: {}", e)))?;

        result
            .into_value()
            .map_err(|e| Error::Capture(format!("unexpected evaluation result: {}", e)))
    }
}

#[async_trait::async_trait]
impl NegotiationPage for ChromiumPage {
    async fn init_webrtc(&self) -> Result<String> {
        self.eval("window.initWebRTC()".to_string()).await
    }

    async fn set_answer(&self, answer_sdp: &str) -> Result<()> {
        // Pass the SDP as a JSON string literal so newlines survive
        let literal = serde_json::to_string(answer_sdp)
            .map_err(|e| Error::Capture(format!("answer SDP not encodable: {}", e)))?;
        let _: bool = self.eval(format!("window.setAnswer({})", literal)).await?;
        Ok(())
    }

    async fn capture_frame(&self) -> Result<String> {
        self.eval("window.captureFrame()".to_string()).await
    }

    async fn cleanup(&self) -> Result<()> {
        let _: bool = self.eval("window.cleanup()".to_string()).await?;
        Ok(())
    }
}
