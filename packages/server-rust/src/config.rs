//! Bridge-level configuration: secrets, app identity, and upstream addresses.
//!
//! Listener settings live in [`crate::network::NetworkConfig`].

use std::time::Duration;

use url::Url;

/// Top-level configuration for the WOPI bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Signs session tokens and encrypts the backend credentials inside them.
    pub secret: String,
    /// How this bridge presents itself to the backend's app registry.
    pub app: AppProviderConfig,
    /// Externally reachable base URL of the WOPI listener, used to build the
    /// `WOPISrc` callback handed to editors.
    pub wopi_src_base: Url,
    /// The office editor whose discovery manifest is consumed.
    pub editor: EditorConfig,
    /// The storage backend gateway.
    pub gateway: GatewayConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            app: AppProviderConfig::default(),
            wopi_src_base: Url::parse("http://127.0.0.1:6789")
                .unwrap_or_else(|_| unreachable!("static URL parses")),
            editor: EditorConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// App-provider identity announced to the backend.
#[derive(Debug, Clone)]
pub struct AppProviderConfig {
    pub name: String,
    pub description: String,
    pub icon: String,
    /// Owner tag written into every lock this bridge sets.
    pub lock_name: String,
    /// Address at which the backend reaches the launch listener.
    pub address: String,
}

impl Default for AppProviderConfig {
    fn default() -> Self {
        Self {
            name: "WOPI app".to_string(),
            description: "Open office documents with a WOPI app".to_string(),
            icon: "image-edit".to_string(),
            lock_name: "com.github.wkloucek.cs3-wopi-server".to_string(),
            address: "127.0.0.1:5678".to_string(),
        }
    }
}

/// Office editor (WOPI client) settings.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Base URL of the editor; discovery lives at `{addr}/hosting/discovery`.
    pub addr: String,
    /// Skip TLS certificate verification when fetching discovery.
    pub insecure: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            addr: "https://127.0.0.1:8080".to_string(),
            insecure: false,
        }
    }
}

/// Storage backend gateway settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway's RPC endpoint.
    pub addr: String,
    /// Skip TLS certificate verification on data transfer endpoints.
    pub data_insecure: bool,
    /// Upper bound for establishing connections to the gateway and data
    /// endpoints. Transfers themselves are bounded by the request lifetime.
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: "http://127.0.0.1:9142".to_string(),
            data_insecure: false,
            connect_timeout: Duration::from_secs(10),
        }
    }
}
