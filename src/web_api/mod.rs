//! WebAPI - REST endpoints
//!
//! ## Responsibilities
//!
//! - HTTP routes for capture dispatch and service discovery
//! - Response formatting
//! - Read-only static serving of captured images

mod routes;

pub use routes::create_router;

use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
