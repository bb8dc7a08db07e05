//! Handler definitions for both listeners.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports the handler functions used when building the
//! routers.

pub mod health;
pub mod launch;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use launch::open_in_app_handler;

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::app::AppContext;

/// Shared state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc` references so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Configuration, discovery table, gateway, and token codec.
    pub app: Arc<AppContext>,
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Process start time, used for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// State with a fresh shutdown controller.
    #[must_use]
    pub fn new(app: Arc<AppContext>) -> Self {
        Self::with_shutdown(app, Arc::new(ShutdownController::new()))
    }

    #[must_use]
    pub fn with_shutdown(app: Arc<AppContext>, shutdown: Arc<ShutdownController>) -> Self {
        Self {
            app,
            shutdown,
            start_time: Instant::now(),
        }
    }
}
