//! Listener configuration for the bridge's two HTTP surfaces.

use std::path::PathBuf;
use std::time::Duration;

/// Bind addresses and transport settings for both listeners.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address of the WOPI surface (editors). Port 0 means OS-assigned.
    pub wopi_bind: String,
    /// Bind address of the launch surface (backend).
    pub launch_bind: String,
    /// Optional TLS for the WOPI listener.
    pub tls: Option<TlsConfig>,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time until a handler produces response headers.
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wopi_bind: "127.0.0.1:6789".to_string(),
            launch_bind: "127.0.0.1:5678".to_string(),
            tls: None,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// TLS certificate configuration.
///
/// No `Default` impl because certificate paths have no sensible defaults.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// PEM certificate chain.
    pub cert_path: PathBuf,
    /// PEM private key.
    pub key_path: PathBuf,
}
