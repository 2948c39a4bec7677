//! Camsnap - smart-camera snapshot server
//!
//! Captures still images from configured SDM cameras, over RTSP or
//! WebRTC, and serves the results over HTTP.
//!
//! ## Components
//!
//! 1. AppConfig - environment configuration and device list parsing
//! 2. DeviceRegistry - static name -> (id, transport) table
//! 3. SdmClient - OAuth token refresh + cloud device commands
//! 4. WebrtcCaptureSession - headless-browser offer/answer capture
//! 5. CaptureService - per-request orchestration and persistence
//! 6. WebAPI - HTTP delivery endpoint and static image serving
//!
//! ## Design principles
//!
//! - Configuration is an explicit immutable object passed at
//!   construction time, never ambient globals
//! - External collaborators (cloud API, decoder, browser page) sit
//!   behind trait seams
//! - Every capture request is independent; nothing is retried

pub mod capture_service;
pub mod config;
pub mod device_registry;
pub mod error;
pub mod models;
pub mod sdm_client;
pub mod state;
pub mod web_api;
pub mod webrtc_capture;

pub use error::{Error, Result};
pub use state::AppState;
