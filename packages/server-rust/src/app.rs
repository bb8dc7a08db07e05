//! The application context shared by both listeners.

use std::sync::Arc;

use anyhow::Context as _;

use crate::auth::TokenCodec;
use crate::config::BridgeConfig;
use crate::discovery::DiscoveryTable;
use crate::gateway::Gateway;

/// Everything a request handler needs, built once at startup.
///
/// The discovery table is immutable after construction.
pub struct AppContext {
    pub config: BridgeConfig,
    pub discovery: DiscoveryTable,
    pub gateway: Arc<dyn Gateway>,
    pub codec: TokenCodec,
    /// Client for data transfer endpoints, separate from the gateway client
    /// because its TLS policy is configured independently.
    pub transfer: reqwest::Client,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("app", &self.config.app.name)
            .field("extensions", &self.discovery.extensions().len())
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// # Errors
    ///
    /// Fails if the token codec or the transfer client cannot be built.
    pub fn new(
        config: BridgeConfig,
        discovery: DiscoveryTable,
        gateway: Arc<dyn Gateway>,
    ) -> anyhow::Result<Self> {
        let codec = TokenCodec::new(&config.secret).context("initializing token codec")?;
        let transfer = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.gateway.data_insecure)
            .connect_timeout(config.gateway.connect_timeout)
            .build()
            .context("building data transfer client")?;

        Ok(Self {
            config,
            discovery,
            gateway,
            codec,
            transfer,
        })
    }
}
