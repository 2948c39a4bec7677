//! Application state
//!
//! Holds all shared components, constructed once in `main` and cloned
//! into handlers.

use crate::capture_service::CaptureService;
use crate::config::AppConfig;
use crate::device_registry::DeviceRegistry;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: Arc<AppConfig>,
    /// Static device table
    pub registry: Arc<DeviceRegistry>,
    /// Capture orchestrator
    pub capture: Arc<CaptureService>,
}
