//! End-to-end tests for the HTTP delivery endpoint
//!
//! The router runs against a real CaptureService wired to mock cloud,
//! decoder, and browser-session collaborators.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use camsnap::capture_service::{CaptureService, FrameExtractor};
use camsnap::config::AppConfig;
use camsnap::device_registry::{Device, DeviceRegistry, StreamTransport};
use camsnap::sdm_client::SdmApi;
use camsnap::state::AppState;
use camsnap::web_api::create_router;
use camsnap::webrtc_capture::WebrtcCapturer;
use camsnap::Result;
use http_body_util::BodyExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct MockSdm;

#[async_trait::async_trait]
impl SdmApi for MockSdm {
    async fn fetch_access_token(&self) -> Result<String> {
        Ok("test-token".to_string())
    }

    async fn generate_rtsp_stream(&self, _: &str, _: &str) -> Result<String> {
        Ok("rtsp://example/stream".to_string())
    }

    async fn generate_webrtc_stream(&self, _: &str, _: &str, _: &str) -> Result<String> {
        Ok("v=0 answer".to_string())
    }
}

struct MockExtractor;

#[async_trait::async_trait]
impl FrameExtractor for MockExtractor {
    async fn extract_frame(&self, stream_url: &str, output: &Path) -> Result<()> {
        assert_eq!(stream_url, "rtsp://example/stream");
        std::fs::write(output, b"\xFF\xD8\xFF\xD9").unwrap();
        Ok(())
    }
}

/// Session that fails at the frame-capture step
struct FailingWebrtc;

#[async_trait::async_trait]
impl WebrtcCapturer for FailingWebrtc {
    async fn capture(&self, _: &str, _: &str, _: &Path) -> bool {
        false
    }
}

fn test_config(images_dir: PathBuf, devices: Vec<Device>) -> AppConfig {
    AppConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        refresh_token: "refresh".to_string(),
        project_id: "project".to_string(),
        devices,
        host: "127.0.0.1".to_string(),
        port: 0,
        images_dir,
        browser_path: None,
        frame_wait: Duration::from_secs(5),
        capture_timeout: Duration::from_secs(30),
        max_webrtc_sessions: 2,
    }
}

fn test_state(images_dir: PathBuf) -> AppState {
    let devices = vec![
        Device {
            name: "FRONT".to_string(),
            id: "dev-front".to_string(),
            transport: StreamTransport::Rtsp,
        },
        Device {
            name: "BACK".to_string(),
            id: "dev-back".to_string(),
            transport: StreamTransport::Webrtc,
        },
    ];
    let config = test_config(images_dir.clone(), devices.clone());
    let registry = Arc::new(DeviceRegistry::new(devices));
    let capture = Arc::new(CaptureService::new(
        images_dir,
        registry.clone(),
        Arc::new(MockSdm),
        Arc::new(MockExtractor),
        Arc::new(FailingWebrtc),
        config.max_webrtc_sessions,
        config.capture_timeout,
    ));

    AppState {
        config: Arc::new(config),
        registry,
        capture,
    }
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_capture_rtsp_device_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let (status, body) = get(app, "/capture/FRONT").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["device"], "FRONT");
    let image_path = body["imagePath"].as_str().unwrap();
    assert!(image_path.starts_with("/images/FRONT/"));
    assert!(image_path.ends_with(".jpg"));

    // The advertised path resolves to a real file under the images root
    let on_disk = dir
        .path()
        .join(image_path.trim_start_matches("/images/"));
    assert!(on_disk.exists());
}

#[tokio::test]
async fn test_capture_webrtc_failure_returns_error_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let (status, body) = get(app, "/capture/BACK").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["device"], "BACK");
    assert!(body["error"].as_str().unwrap().contains("Capture failed"));
}

#[tokio::test]
async fn test_unknown_device_maps_to_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let (status, body) = get(app, "/capture/GARAGE").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["device"], "GARAGE");
}

#[tokio::test]
async fn test_root_lists_devices_and_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let (status, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["devices"], serde_json::json!(["FRONT", "BACK"]));
    assert_eq!(body["endpoints"]["capture"], "/capture/:deviceName");
}

#[tokio::test]
async fn test_capture_redirects_to_first_device() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/capture")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/capture/FRONT"
    );
}

#[tokio::test]
async fn test_capture_redirect_falls_back_without_devices() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path().to_path_buf(), vec![]);
    let registry = Arc::new(DeviceRegistry::new(vec![]));
    let capture = Arc::new(CaptureService::new(
        dir.path().to_path_buf(),
        registry.clone(),
        Arc::new(MockSdm),
        Arc::new(MockExtractor),
        Arc::new(FailingWebrtc),
        1,
        Duration::from_secs(30),
    ));
    let app = create_router(AppState {
        config: Arc::new(config),
        registry,
        capture,
    });

    let response = app
        .oneshot(
            Request::builder()
                .uri("/capture")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/capture/TATAMI"
    );
}

#[tokio::test]
async fn test_captured_image_is_served_statically() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path().to_path_buf());
    let app = create_router(state);

    // Capture first so a file exists, then fetch it through /images
    let (_, body) = get(app.clone(), "/capture/FRONT").await;
    let image_path = body["imagePath"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri(&image_path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\xFF\xD8\xFF\xD9");
}

/// Session that signals once admitted, then holds its slot open
struct BusyWebrtc {
    entered: tokio::sync::mpsc::UnboundedSender<()>,
}

#[async_trait::async_trait]
impl WebrtcCapturer for BusyWebrtc {
    async fn capture(&self, _: &str, _: &str, _: &Path) -> bool {
        let _ = self.entered.send(());
        std::future::pending::<()>().await;
        false
    }
}

// Slow: the rejected request waits out the full admission window in
// real time.
#[tokio::test]
async fn test_concurrent_webrtc_capture_returns_service_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let devices = vec![Device {
        name: "BACK".to_string(),
        id: "dev-back".to_string(),
        transport: StreamTransport::Webrtc,
    }];
    let config = test_config(dir.path().to_path_buf(), devices.clone());
    let registry = Arc::new(DeviceRegistry::new(devices));
    let (entered_tx, mut entered_rx) = tokio::sync::mpsc::unbounded_channel();
    let capture = Arc::new(CaptureService::new(
        dir.path().to_path_buf(),
        registry.clone(),
        Arc::new(MockSdm),
        Arc::new(MockExtractor),
        Arc::new(BusyWebrtc {
            entered: entered_tx,
        }),
        1,
        Duration::from_secs(7200),
    ));
    let app = create_router(AppState {
        config: Arc::new(config),
        registry,
        capture,
    });

    let blocked = tokio::spawn(get(app.clone(), "/capture/BACK"));
    // The blocked request owns the only session slot before the next one
    entered_rx.recv().await.unwrap();

    let (status, body) = get(app, "/capture/BACK").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("busy"));

    blocked.abort();
}

#[tokio::test]
async fn test_healthz() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(test_state(dir.path().to_path_buf()));

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
