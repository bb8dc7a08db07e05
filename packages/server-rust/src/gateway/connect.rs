//! Gateway client speaking the Connect protocol's unary JSON encoding.
//!
//! Each RPC is `POST {base}/cs3.gateway.v1beta1.GatewayAPI/{Method}` with a
//! proto3-JSON body. The user's credential rides in `x-access-token`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use wopibridge_core::messages::{
    AddAppProviderRequest, AddAppProviderResponse, GetLockRequest, GetLockResponse,
    InitiateFileDownloadRequest, InitiateFileDownloadResponse, InitiateFileUploadRequest,
    InitiateFileUploadResponse, Lock, ProviderInfo, Reference, SetLockRequest, SetLockResponse,
    StatRequest, StatResponse, UnlockRequest, UnlockResponse, WhoAmIRequest, WhoAmIResponse,
};

use super::{Gateway, GatewayError, TOKEN_HEADER};
use crate::config::GatewayConfig;

const SERVICE: &str = "cs3.gateway.v1beta1.GatewayAPI";
const PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";

/// [`Gateway`] backed by a remote gateway over HTTP.
#[derive(Debug, Clone)]
pub struct ConnectGateway {
    client: reqwest::Client,
    base: String,
}

impl ConnectGateway {
    /// Builds a client for the gateway at `config.addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::with_client(client, &config.addr))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    async fn call<Req, Resp>(
        &self,
        method: &'static str,
        token: Option<&str>,
        request: &Req,
    ) -> Result<Resp, GatewayError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{SERVICE}/{method}", self.base);
        debug!(method, "gateway call");

        let mut builder = self
            .client
            .post(url)
            .header(PROTOCOL_VERSION_HEADER, "1")
            .json(request);
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| GatewayError::Transport { method, source })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                method,
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|source| GatewayError::Decode { method, source })
    }
}

#[async_trait]
impl Gateway for ConnectGateway {
    async fn who_am_i(&self, token: &str) -> Result<WhoAmIResponse, GatewayError> {
        let request = WhoAmIRequest {
            token: token.to_string(),
        };
        self.call("WhoAmI", Some(token), &request).await
    }

    async fn stat(&self, token: &str, reference: &Reference) -> Result<StatResponse, GatewayError> {
        let request = StatRequest {
            reference: reference.clone(),
        };
        self.call("Stat", Some(token), &request).await
    }

    async fn get_lock(
        &self,
        token: &str,
        reference: &Reference,
    ) -> Result<GetLockResponse, GatewayError> {
        let request = GetLockRequest {
            reference: reference.clone(),
        };
        self.call("GetLock", Some(token), &request).await
    }

    async fn set_lock(
        &self,
        token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<SetLockResponse, GatewayError> {
        let request = SetLockRequest {
            reference: reference.clone(),
            lock,
        };
        self.call("SetLock", Some(token), &request).await
    }

    async fn unlock(
        &self,
        token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<UnlockResponse, GatewayError> {
        let request = UnlockRequest {
            reference: reference.clone(),
            lock,
        };
        self.call("Unlock", Some(token), &request).await
    }

    async fn initiate_file_download(
        &self,
        token: &str,
        reference: &Reference,
    ) -> Result<InitiateFileDownloadResponse, GatewayError> {
        let request = InitiateFileDownloadRequest {
            reference: reference.clone(),
        };
        self.call("InitiateFileDownload", Some(token), &request)
            .await
    }

    async fn initiate_file_upload(
        &self,
        token: &str,
        reference: &Reference,
        lock_id: &str,
    ) -> Result<InitiateFileUploadResponse, GatewayError> {
        let request = InitiateFileUploadRequest {
            reference: reference.clone(),
            lock_id: lock_id.to_string(),
        };
        self.call("InitiateFileUpload", Some(token), &request).await
    }

    async fn add_app_provider(
        &self,
        provider: ProviderInfo,
    ) -> Result<AddAppProviderResponse, GatewayError> {
        let request = AddAppProviderRequest { provider };
        self.call("AddAppProvider", None, &request).await
    }
}
