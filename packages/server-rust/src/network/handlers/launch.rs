//! The backend-facing "open in app" endpoint.

use axum::extract::State;
use axum::Json;
use tracing::warn;
use wopibridge_core::file_ref;
use wopibridge_core::messages::{OpenInAppRequest, OpenInAppResponse, Status};

use super::AppState;

/// `POST /app/open`: mints a session and replies with the editor URL.
///
/// Replies 200 in every case; failures carry a non-OK status, as an RPC
/// reply would.
pub async fn open_in_app_handler(
    State(state): State<AppState>,
    Json(request): Json<OpenInAppRequest>,
) -> Json<OpenInAppResponse> {
    let file_ref = file_ref(&request.resource_info.id);
    let path = request.resource_info.path.clone();

    match state.app.open_in_app(request).await {
        Ok(app_url) => Json(OpenInAppResponse {
            status: Status::ok(),
            app_url: Some(app_url),
        }),
        Err(err) => {
            let status = err.status();
            warn!(file_ref, path, status = %status.code, error = %err, "open in app failed");
            Json(OpenInAppResponse::failed(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::{backend_credential, test_context, MANIFEST};

    async fn open(body: Value) -> Value {
        let (app, _gateway) = test_context(MANIFEST);
        let router = Router::new()
            .route("/app/open", post(open_in_app_handler))
            .with_state(AppState::new(Arc::new(app)));

        let resp = router
            .oneshot(
                Request::post("/app/open")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(path: &str, view_mode: &str, token: &str) -> Value {
        json!({
            "accessToken": token,
            "viewMode": view_mode,
            "resourceInfo": {
                "id": {"storageId": "s", "spaceId": "sp", "opaqueId": "o"},
                "path": path,
            },
        })
    }

    #[tokio::test]
    async fn launch_returns_editor_url_and_form() {
        let exp = chrono::Utc::now().timestamp() + 600;
        let reply = open(request(
            "/docs/a.odt",
            "VIEW_MODE_READ_WRITE",
            &backend_credential(exp),
        ))
        .await;

        assert_eq!(reply["status"]["code"], "CODE_OK");
        let url = &reply["appUrl"];
        assert!(url["appUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://editor.test/edit?WOPISrc="));
        assert_eq!(url["method"], "POST");
        assert_eq!(
            url["formParameters"]["access_token_ttl"],
            (exp * 1000).to_string()
        );
        assert!(!url["formParameters"]["access_token"]
            .as_str()
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn malformed_credential_is_invalid_argument() {
        let reply = open(request("/docs/a.odt", "VIEW_MODE_READ_ONLY", "opaque")).await;
        assert_eq!(reply["status"]["code"], "CODE_INVALID_ARGUMENT");
        assert!(reply.get("appUrl").is_none());
    }

    #[tokio::test]
    async fn unknown_extension_is_not_found() {
        let credential = backend_credential(chrono::Utc::now().timestamp() + 600);
        let reply = open(request("/docs/a.txt", "VIEW_MODE_READ_ONLY", &credential)).await;
        assert_eq!(reply["status"]["code"], "CODE_NOT_FOUND");
    }
}
