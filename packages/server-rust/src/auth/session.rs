//! Authentication of WOPI requests.
//!
//! Every WOPI route takes a [`WopiSession`] argument. Extraction reads the
//! `access_token` query parameter, verifies it, checks that it was issued
//! for the file named in the path, and decrypts the backend credential.
//! Any failure rejects the request with 401 before the handler runs.

use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use tracing::debug;
use wopibridge_core::{file_ref, WopiContext};

use crate::network::AppState;
use crate::wopi::WopiError;

#[derive(Debug, Deserialize)]
struct AccessTokenQuery {
    access_token: Option<String>,
}

/// An authenticated WOPI request.
///
/// The wrapped context's `access_token` is the plaintext backend credential.
#[derive(Debug, Clone)]
pub struct WopiSession {
    pub context: WopiContext,
    /// Hash of the session's resource, equal to the path's file id.
    pub file_ref: String,
}

impl FromRequestParts<AppState> for WopiSession {
    type Rejection = WopiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = Query::<AccessTokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                debug!("WOPI request without access_token");
                WopiError::Unauthorized
            })?;

        let mut context = state.app.codec.verify(&token).map_err(|err| {
            debug!(error = %err, "rejected session token");
            WopiError::Unauthorized
        })?;

        let Path(file_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WopiError::Unauthorized)?;
        let file_ref = file_ref(&context.file_reference.resource_id);
        if file_id != file_ref {
            debug!(file_id, file_ref, "session token issued for another file");
            return Err(WopiError::Unauthorized);
        }

        context.access_token = state
            .app
            .codec
            .decrypt(&context.access_token)
            .map_err(|err| {
                debug!(error = %err, file_ref, "embedded credential did not decrypt");
                WopiError::Unauthorized
            })?;

        Ok(Self { context, file_ref })
    }
}
