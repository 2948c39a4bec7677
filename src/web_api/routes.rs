//! API Routes

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use tower_http::services::ServeDir;

use crate::models::{CaptureResponse, EndpointMap, ServiceDescriptor};
use crate::state::AppState;

/// Device name used for the default capture route when no devices are
/// configured
const FALLBACK_DEVICE: &str = "TATAMI";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let images_dir = state.config.images_dir.clone();

    Router::new()
        .route("/", get(service_descriptor))
        .route("/healthz", get(super::health_check))
        .route("/capture", get(capture_default))
        .route("/capture/:device_name", get(capture_device))
        .nest_service("/images", ServeDir::new(images_dir))
        .with_state(state)
}

/// Service descriptor: configured devices and available routes
async fn service_descriptor(State(state): State<AppState>) -> impl IntoResponse {
    Json(ServiceDescriptor {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        devices: state.registry.names(),
        endpoints: EndpointMap {
            capture: "/capture/:deviceName".to_string(),
            images: "/images/:deviceName/".to_string(),
        },
    })
}

/// Capture a snapshot from a named device
async fn capture_device(
    State(state): State<AppState>,
    Path(device_name): Path<String>,
) -> Response {
    tracing::info!(device = %device_name, "capture requested");

    match state.capture.capture_for_device(&device_name).await {
        Ok(path) => {
            let relative = path
                .strip_prefix(&state.config.images_dir)
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|_| path.to_string_lossy().into_owned());

            Json(CaptureResponse::success(
                device_name,
                format!("/images/{}", relative),
            ))
            .into_response()
        }
        Err(e) => {
            tracing::error!(device = %device_name, error = %e, "capture failed");
            (
                e.status_code(),
                Json(CaptureResponse::failure(device_name, e.to_string())),
            )
                .into_response()
        }
    }
}

/// Redirect to the first configured device's capture route
async fn capture_default(State(state): State<AppState>) -> Redirect {
    let device_name = state
        .registry
        .first()
        .map(|d| d.name.clone())
        .unwrap_or_else(|| FALLBACK_DEVICE.to_string());

    Redirect::temporary(&format!("/capture/{}", device_name))
}
