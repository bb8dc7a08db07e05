//! Errors surfaced to WOPI clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::operation::{lock_header_value, LOCK_HEADER};

/// A failed WOPI request.
///
/// The response body is the status's reason phrase; backend detail is
/// logged where the error arises and never echoed to the editor.
#[derive(Debug, thiserror::Error)]
pub enum WopiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("not found")]
    NotFound,
    /// Lock conflict; carries the lock currently held (empty if none).
    #[error("lock conflict")]
    Conflict { current_lock: String },
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("internal error")]
    Internal,
}

impl WopiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            Self::UnsupportedOperation(_) | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A bare response whose body is the reason phrase of `status`.
#[must_use]
pub fn status_response(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

impl IntoResponse for WopiError {
    fn into_response(self) -> Response {
        let mut response = status_response(self.status_code());
        if let Self::Conflict { current_lock } = self {
            response
                .headers_mut()
                .insert(LOCK_HEADER, lock_header_value(&current_lock));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn body_is_reason_phrase() {
        let response = WopiError::NotImplemented("RefreshLock").into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_text(response).await, "Not Implemented");
    }

    #[tokio::test]
    async fn conflict_carries_lock_header() {
        let response = WopiError::Conflict {
            current_lock: "A".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[LOCK_HEADER], "A");
    }

    #[test]
    fn unsupported_operation_is_internal() {
        assert_eq!(
            WopiError::UnsupportedOperation("FOO".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(WopiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
    }
}
