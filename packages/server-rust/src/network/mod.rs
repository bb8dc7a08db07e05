//! Listener configuration, lifecycle, middleware, and shutdown control.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod module;
pub mod shutdown;

pub use config::{NetworkConfig, TlsConfig};
pub use handlers::AppState;
pub use module::{BoundAddrs, NetworkModule};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
