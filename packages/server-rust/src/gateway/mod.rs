//! The storage backend gateway seam.
//!
//! Every backend call the bridge makes goes through [`Gateway`], so the
//! handlers can be driven either by the Connect client in [`connect`] or by
//! the in-process [`memory`] backend.

pub mod connect;
pub mod memory;

use async_trait::async_trait;
use wopibridge_core::messages::{
    AddAppProviderResponse, GetLockResponse, InitiateFileDownloadResponse,
    InitiateFileUploadResponse, Lock, ProviderInfo, Reference, SetLockResponse, StatResponse,
    UnlockResponse, WhoAmIResponse,
};

pub use connect::ConnectGateway;
pub use memory::InMemoryGateway;

/// Header carrying the user's backend credential on every call.
pub const TOKEN_HEADER: &str = "x-access-token";

/// Header carrying the per-transfer token on data endpoint requests.
pub const TRANSFER_TOKEN_HEADER: &str = "X-Reva-Transfer";

/// Transport-level failure talking to the gateway.
///
/// Backend-level failures arrive as a non-OK `status` inside a successful
/// response and are not represented here.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{method}: transport error: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method}: gateway answered HTTP {status}: {detail}")]
    Http {
        method: &'static str,
        status: u16,
        detail: String,
    },
    #[error("{method}: undecodable response: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Backend operations used by the bridge.
///
/// `token` is the user's plaintext backend credential.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn who_am_i(&self, token: &str) -> Result<WhoAmIResponse, GatewayError>;

    async fn stat(&self, token: &str, reference: &Reference)
        -> Result<StatResponse, GatewayError>;

    async fn get_lock(
        &self,
        token: &str,
        reference: &Reference,
    ) -> Result<GetLockResponse, GatewayError>;

    async fn set_lock(
        &self,
        token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<SetLockResponse, GatewayError>;

    async fn unlock(
        &self,
        token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<UnlockResponse, GatewayError>;

    async fn initiate_file_download(
        &self,
        token: &str,
        reference: &Reference,
    ) -> Result<InitiateFileDownloadResponse, GatewayError>;

    /// `lock_id` is empty when the writer holds no lock.
    async fn initiate_file_upload(
        &self,
        token: &str,
        reference: &Reference,
        lock_id: &str,
    ) -> Result<InitiateFileUploadResponse, GatewayError>;

    /// Registers this bridge in the backend's app registry.
    async fn add_app_provider(
        &self,
        provider: ProviderInfo,
    ) -> Result<AddAppProviderResponse, GatewayError>;
}
