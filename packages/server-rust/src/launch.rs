//! Launching editor sessions and announcing the bridge to the backend.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::bail;
use tracing::{debug, info, warn};
use url::Url;
use wopibridge_core::messages::{
    Code, OpenInAppRequest, OpenInAppUrl, ProviderInfo, Reference, Status, User, ViewMode,
};
use wopibridge_core::{file_ref, WopiContext};

use crate::app::AppContext;
use crate::auth::{credential_expiry, CryptoError, TokenError};
use crate::discovery::AppAction;

/// Why a launch could not produce an editor URL.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("backend credential is not a token with an expiry: {0}")]
    Credential(#[source] TokenError),
    #[error("no editor handles extension {extension:?}")]
    NoEditor { extension: String },
    #[error("building editor URL failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("WOPISrc base URL cannot carry a path")]
    WopiSrcBase,
    #[error("encrypting credential failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("signing session token failed: {0}")]
    Sign(#[source] TokenError),
}

impl LaunchError {
    /// Status reported to the backend for this failure.
    #[must_use]
    pub fn status(&self) -> Status {
        let code = match self {
            Self::Credential(_) => Code::InvalidArgument,
            Self::NoEditor { .. } => Code::NotFound,
            Self::Url(_) | Self::WopiSrcBase | Self::Crypto(_) | Self::Sign(_) => Code::Internal,
        };
        Status::with_message(code, self.to_string())
    }
}

/// Extension of the last path component, including the dot.
///
/// Returns an empty string when the last component has no dot.
#[must_use]
pub fn file_extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rfind('.').map_or("", |i| &name[i..])
}

fn append_wopi_src(app_url: &str, wopi_src: &Url) -> Result<String, url::ParseError> {
    let mut url = Url::parse(app_url)?;
    url.query_pairs_mut().append_pair("WOPISrc", wopi_src.as_str());
    Ok(url.into())
}

impl AppContext {
    /// The callback URL an editor uses to reach the file `file_ref`.
    ///
    /// # Errors
    ///
    /// Fails if the configured base URL cannot carry a path.
    pub fn wopi_src(&self, file_ref: &str) -> Result<Url, LaunchError> {
        let mut url = self.config.wopi_src_base.clone();
        url.path_segments_mut()
            .map_err(|()| LaunchError::WopiSrcBase)?
            .pop_if_empty()
            .extend(["wopi", "files", file_ref]);
        Ok(url)
    }

    async fn lookup_user(&self, token: &str) -> Option<User> {
        match self.gateway.who_am_i(token).await {
            Ok(resp) if resp.status.is_ok() => resp.user,
            Ok(resp) => {
                debug!(status = %resp.status.code, "identity lookup declined; launching anonymously");
                None
            }
            Err(err) => {
                debug!(error = %err, "identity lookup failed; launching anonymously");
                None
            }
        }
    }

    /// Builds the editor URL and session token for a launch request.
    ///
    /// Nothing is returned unless every step succeeds.
    ///
    /// # Errors
    ///
    /// See [`LaunchError`]; [`LaunchError::status`] maps each case to the
    /// status reported to the backend.
    pub async fn open_in_app(&self, request: OpenInAppRequest) -> Result<OpenInAppUrl, LaunchError> {
        let OpenInAppRequest {
            resource_info,
            view_mode,
            access_token,
        } = request;

        let expires_at = credential_expiry(&access_token).map_err(LaunchError::Credential)?;
        let user = self.lookup_user(&access_token).await;

        let file_ref = file_ref(&resource_info.id);
        let extension = file_extension(&resource_info.path);

        let view_url = self.discovery.url(AppAction::View, extension);
        let edit_url = self.discovery.url(AppAction::Edit, extension).or(view_url);
        let launch_url = if view_mode == ViewMode::ReadWrite {
            edit_url
        } else {
            view_url
        };
        let Some(launch_url) = launch_url else {
            return Err(LaunchError::NoEditor {
                extension: extension.to_string(),
            });
        };

        let wopi_src = self.wopi_src(&file_ref)?;
        let with_src = |u: Option<&str>| {
            u.map_or(Ok(String::new()), |u| append_wopi_src(u, &wopi_src))
        };
        let edit_app_url = with_src(edit_url)?;
        let view_app_url = with_src(view_url)?;
        let app_url = append_wopi_src(launch_url, &wopi_src)?;

        let context = WopiContext {
            access_token: self.codec.encrypt(&access_token)?,
            file_reference: Reference::to_resource(resource_info.id),
            user,
            view_mode,
            edit_app_url,
            view_app_url,
        };
        let session_token = self
            .codec
            .issue(&context, expires_at)
            .map_err(LaunchError::Sign)?;

        info!(file_ref = %file_ref, ?view_mode, extension, "launching editor session");

        let form_parameters = BTreeMap::from([
            ("access_token".to_string(), session_token),
            (
                "access_token_ttl".to_string(),
                expires_at.saturating_mul(1000).to_string(),
            ),
        ]);
        Ok(OpenInAppUrl {
            app_url,
            method: "POST".to_string(),
            form_parameters,
        })
    }

    /// The app-provider record announced to the backend: one mime type per
    /// discovered extension, deduplicated and sorted.
    #[must_use]
    pub fn provider_info(&self) -> ProviderInfo {
        let mime_types: BTreeSet<String> = self
            .discovery
            .extensions()
            .into_iter()
            .filter_map(|ext| {
                let ext = ext.trim_start_matches('.');
                let mime = mime_guess::from_ext(ext).first_raw();
                if mime.is_none() {
                    debug!(ext, "no mime type known for extension");
                }
                mime
            })
            .map(str::to_string)
            .collect();

        let app = &self.config.app;
        ProviderInfo {
            name: app.name.clone(),
            description: app.description.clone(),
            icon: app.icon.clone(),
            address: app.address.clone(),
            mime_types: mime_types.into_iter().collect(),
        }
    }

    /// Registers the bridge in the backend's app registry.
    ///
    /// # Errors
    ///
    /// Fails on transport errors and on any non-OK status.
    pub async fn register_app_provider(&self) -> anyhow::Result<()> {
        let provider = self.provider_info();
        let count = provider.mime_types.len();
        if count == 0 {
            warn!("registering app provider without any mime types");
        }

        let resp = self.gateway.add_app_provider(provider).await?;
        if !resp.status.is_ok() {
            bail!(
                "app provider registration rejected: {} {}",
                resp.status.code,
                resp.status.message
            );
        }
        info!(name = %self.config.app.name, mime_types = count, "registered app provider");
        Ok(())
    }
}
