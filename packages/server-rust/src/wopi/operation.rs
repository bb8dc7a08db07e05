//! The closed set of WOPI `POST` operations.

use std::str::FromStr;

use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

/// Header naming the operation of a `POST` request.
pub const OVERRIDE_HEADER: &str = "X-WOPI-Override";
/// Header carrying lock ids in both directions.
pub const LOCK_HEADER: &str = "X-WOPI-Lock";

/// Encodes a lock id for [`LOCK_HEADER`].
///
/// Ids that are not valid header values (which editors cannot send) are
/// reported as empty.
#[must_use]
pub fn lock_header_value(lock_id: &str) -> HeaderValue {
    HeaderValue::from_str(lock_id).unwrap_or_else(|_| {
        warn!(
            lock_id = ?lock_id,
            "lock id is not a valid header value, reporting it as empty"
        );
        HeaderValue::from_static("")
    })
}

/// The lock id sent by the editor, if any.
#[must_use]
pub fn request_lock_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(LOCK_HEADER).and_then(|v| v.to_str().ok())
}

/// Operation selected by `X-WOPI-Override`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WopiOperation {
    Lock,
    GetLock,
    RefreshLock,
    Unlock,
    PutUserInfo,
    PutRelativeFile,
    RenameFile,
    Delete,
    Put,
}

impl WopiOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "LOCK",
            Self::GetLock => "GET_LOCK",
            Self::RefreshLock => "REFRESH_LOCK",
            Self::Unlock => "UNLOCK",
            Self::PutUserInfo => "PUT_USER_INFO",
            Self::PutRelativeFile => "PUT_RELATIVE",
            Self::RenameFile => "RENAME_FILE",
            Self::Delete => "DELETE",
            Self::Put => "PUT",
        }
    }

    /// Reads the operation from request headers.
    ///
    /// # Errors
    ///
    /// Returns the raw header value (empty if absent) when it names no
    /// known operation.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, String> {
        let raw = headers
            .get(OVERRIDE_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        raw.parse().map_err(|()| raw)
    }
}

impl FromStr for WopiOperation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "LOCK" => Self::Lock,
            "GET_LOCK" => Self::GetLock,
            "REFRESH_LOCK" => Self::RefreshLock,
            "UNLOCK" => Self::Unlock,
            "PUT_USER_INFO" => Self::PutUserInfo,
            "PUT_RELATIVE" => Self::PutRelativeFile,
            "RENAME_FILE" => Self::RenameFile,
            "DELETE" => Self::Delete,
            "PUT" => Self::Put,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for WopiOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
