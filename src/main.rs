//! Camsnap - smart-camera snapshot server
//!
//! Main entry point.

use camsnap::{
    capture_service::{CaptureService, FfmpegExtractor, FrameExtractor},
    config::AppConfig,
    device_registry::DeviceRegistry,
    sdm_client::{SdmApi, SdmClient},
    state::AppState,
    web_api,
    webrtc_capture::{WebrtcCaptureSession, WebrtcCapturer},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camsnap=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camsnap v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (secrets are not logged)
    let config = AppConfig::from_env()?;
    tracing::info!(
        devices = config.devices.len(),
        images_dir = %config.images_dir.display(),
        frame_wait_sec = config.frame_wait.as_secs(),
        capture_timeout_sec = config.capture_timeout.as_secs(),
        max_webrtc_sessions = config.max_webrtc_sessions,
        "Configuration loaded"
    );

    if config.devices.is_empty() {
        tracing::warn!("No devices configured (set DEVICES=name:id:transport,...)");
    }

    tokio::fs::create_dir_all(&config.images_dir).await?;

    // Initialize components
    let registry = Arc::new(DeviceRegistry::new(config.devices.clone()));
    tracing::info!(devices = ?registry.names(), "DeviceRegistry initialized");

    let sdm: Arc<dyn SdmApi> = Arc::new(SdmClient::new(&config));
    let extractor: Arc<dyn FrameExtractor> = Arc::new(FfmpegExtractor::default());
    let webrtc: Arc<dyn WebrtcCapturer> = Arc::new(WebrtcCaptureSession::new(
        sdm.clone(),
        config.browser_path.clone(),
        config.frame_wait,
    ));

    let capture = Arc::new(CaptureService::new(
        config.images_dir.clone(),
        registry.clone(),
        sdm,
        extractor,
        webrtc,
        config.max_webrtc_sessions,
        config.capture_timeout,
    ));
    tracing::info!("CaptureService initialized");

    let state = AppState {
        config: Arc::new(config),
        registry,
        capture,
    };

    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
