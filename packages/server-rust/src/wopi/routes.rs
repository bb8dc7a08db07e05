//! WOPI routes and operation dispatch.
//!
//! Routes:
//! - `GET /wopi/files/{file_id}` -- CheckFileInfo
//! - `POST /wopi/files/{file_id}` -- lock operations and stubs, by override
//! - `GET /wopi/files/{file_id}/contents` -- GetFile
//! - `POST /wopi/files/{file_id}/contents` -- PutFile (override `PUT`)
//!
//! Only the file endpoint is bounded by the request timeout. Contents
//! transfers run for as long as their bodies keep flowing.

use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;
use wopibridge_core::{validate_lock_id, FileInfo, LockIdError};

use super::contents::{get_file, put_file};
use super::error::status_response;
use super::file_info::check_file_info;
use super::locks::FileLocks;
use super::operation::{lock_header_value, request_lock_id};
use super::{WopiError, WopiOperation, LOCK_HEADER};
use crate::auth::WopiSession;
use crate::network::middleware::request_timeout_layer;
use crate::network::AppState;

/// Routes of the WOPI surface.
pub fn router(request_timeout: Duration) -> Router<AppState> {
    Router::new()
        .route(
            "/wopi/files/{file_id}",
            get(check_file_info_handler).post(file_operation_handler),
        )
        .route_layer(request_timeout_layer(request_timeout))
        .route(
            "/wopi/files/{file_id}/contents",
            get(get_file_handler).post(contents_operation_handler),
        )
}

fn required_lock_id(headers: &HeaderMap) -> Result<&str, WopiError> {
    validate_lock_id(request_lock_id(headers)).map_err(|err| match err {
        LockIdError::Missing => WopiError::BadRequest("missing X-WOPI-Lock"),
        LockIdError::TooLong => WopiError::BadRequest("X-WOPI-Lock too long"),
    })
}

fn operation(headers: &HeaderMap) -> Result<WopiOperation, WopiError> {
    WopiOperation::from_headers(headers).map_err(|raw| {
        debug!(operation = %raw, "unsupported X-WOPI-Override");
        WopiError::UnsupportedOperation(raw)
    })
}

async fn check_file_info_handler(
    State(state): State<AppState>,
    session: WopiSession,
) -> Result<Json<FileInfo>, WopiError> {
    check_file_info(&state.app, &session).await
}

async fn get_file_handler(
    State(state): State<AppState>,
    session: WopiSession,
) -> Result<Response, WopiError> {
    get_file(&state.app, &session).await
}

async fn file_operation_handler(
    State(state): State<AppState>,
    session: WopiSession,
    headers: HeaderMap,
) -> Result<Response, WopiError> {
    let op = operation(&headers)?;
    let app = &state.app;
    let ctx = &session.context;
    let locks = FileLocks::new(
        app.gateway.as_ref(),
        &ctx.access_token,
        &ctx.file_reference,
        &session.file_ref,
        &app.config.app.lock_name,
    );

    match op {
        WopiOperation::Lock => {
            let lock_id = required_lock_id(&headers)?;
            locks.lock(lock_id).await?;
            Ok(status_response(StatusCode::OK))
        }
        WopiOperation::GetLock => {
            let current = locks.get_lock().await?;
            let mut response = status_response(StatusCode::OK);
            response
                .headers_mut()
                .insert(LOCK_HEADER, lock_header_value(&current));
            Ok(response)
        }
        WopiOperation::Unlock => {
            let lock_id = required_lock_id(&headers)?;
            locks.unlock(lock_id).await?;
            Ok(status_response(StatusCode::OK))
        }
        WopiOperation::RefreshLock
        | WopiOperation::PutUserInfo
        | WopiOperation::PutRelativeFile
        | WopiOperation::RenameFile
        | WopiOperation::Delete => Err(WopiError::NotImplemented(op.as_str())),
        WopiOperation::Put => Err(WopiError::UnsupportedOperation(op.to_string())),
    }
}

async fn contents_operation_handler(
    State(state): State<AppState>,
    session: WopiSession,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, WopiError> {
    let op = operation(&headers)?;
    match op {
        WopiOperation::Put => {
            let lock_id = request_lock_id(&headers).unwrap_or_default();
            put_file(&state.app, &session, lock_id, body).await
        }
        WopiOperation::Lock
        | WopiOperation::GetLock
        | WopiOperation::RefreshLock
        | WopiOperation::Unlock
        | WopiOperation::PutUserInfo
        | WopiOperation::PutRelativeFile
        | WopiOperation::RenameFile
        | WopiOperation::Delete => Err(WopiError::UnsupportedOperation(op.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::Request;
    use tower::ServiceExt;
    use wopibridge_core::messages::{
        Lock, ResourceId, ResourceInfo, Timestamp, User, UserId, ViewMode,
    };
    use wopibridge_core::{file_ref, MAX_LOCK_ID_LEN};

    use crate::app::AppContext;
    use crate::gateway::InMemoryGateway;
    use crate::test_support::{backend_credential, test_context, MANIFEST};

    const TIMEOUT: Duration = Duration::from_secs(30);

    struct Harness {
        router: Router,
        gateway: Arc<InMemoryGateway>,
        app: Arc<AppContext>,
        file_ref: String,
        token: String,
    }

    fn file_id() -> ResourceId {
        ResourceId {
            storage_id: "storage-1".into(),
            space_id: "space-1".into(),
            opaque_id: "opaque-1".into(),
        }
    }

    async fn harness(view_mode: ViewMode) -> Harness {
        let (app, gateway) = test_context(MANIFEST);
        gateway.insert_file(
            ResourceInfo {
                id: file_id(),
                path: "/docs/report.odt".into(),
                mtime: Some(Timestamp::from_secs(1_700_000_000)),
                owner: Some(UserId {
                    idp: "idp".into(),
                    opaque_id: "owner".into(),
                }),
                ..ResourceInfo::default()
            },
            "original contents",
        );

        let credential = backend_credential(chrono::Utc::now().timestamp() + 3600);
        gateway.insert_user(
            credential.clone(),
            User {
                id: UserId {
                    idp: "idp".into(),
                    opaque_id: "einstein".into(),
                },
                display_name: "Albert Einstein".into(),
                ..User::default()
            },
        );

        let launch = app
            .open_in_app(wopibridge_core::messages::OpenInAppRequest {
                resource_info: ResourceInfo {
                    id: file_id(),
                    path: "/docs/report.odt".into(),
                    ..ResourceInfo::default()
                },
                view_mode,
                access_token: credential,
            })
            .await
            .unwrap();

        let app = Arc::new(app);
        let router = router(TIMEOUT).with_state(AppState::new(Arc::clone(&app)));
        Harness {
            router,
            gateway,
            app,
            file_ref: file_ref(&file_id()),
            token: launch.form_parameters["access_token"].clone(),
        }
    }

    impl Harness {
        fn uri(&self, suffix: &str) -> String {
            format!(
                "/wopi/files/{}{suffix}?access_token={}",
                self.file_ref, self.token
            )
        }

        async fn post(&self, op: &str, lock: Option<&str>) -> Response {
            let mut req = Request::post(self.uri("")).header("X-WOPI-Override", op);
            if let Some(lock) = lock {
                req = req.header(LOCK_HEADER, lock);
            }
            self.router
                .clone()
                .oneshot(req.body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        async fn get(&self, uri: String) -> Response {
            self.router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        /// Serves the in-memory data endpoints on a loopback port.
        async fn start_data_server(&self) {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let data = self.gateway.data_router();
            tokio::spawn(async move {
                axum::serve(listener, data).await.unwrap();
            });
            self.gateway.set_data_base(format!("http://{addr}"));
        }
    }

    fn lock_header(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(LOCK_HEADER)
            .map(|v| v.to_str().unwrap())
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    // ---- Authentication ----

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let h = harness(ViewMode::ReadWrite).await;
        let resp = h.get(format!("/wopi/files/{}", h.file_ref)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forged_token_is_unauthorized() {
        let h = harness(ViewMode::ReadWrite).await;
        let mut forged = h.token.clone();
        forged.push('x');
        let resp = h
            .get(format!("/wopi/files/{}?access_token={forged}", h.file_ref))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_for_another_file_is_unauthorized() {
        let h = harness(ViewMode::ReadWrite).await;
        let other = file_ref(&ResourceId {
            opaque_id: "other".into(),
            ..file_id()
        });
        let resp = h
            .get(format!("/wopi/files/{other}?access_token={}", h.token))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn undecryptable_credential_is_unauthorized() {
        let h = harness(ViewMode::ReadWrite).await;
        let mut ctx = h.app.codec.verify(&h.token).unwrap();
        ctx.access_token = "not-a-ciphertext".into();
        let token = h
            .app
            .codec
            .issue(&ctx, chrono::Utc::now().timestamp() + 60)
            .unwrap();
        let resp = h
            .get(format!("/wopi/files/{}?access_token={token}", h.file_ref))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    // ---- CheckFileInfo ----

    #[tokio::test]
    async fn check_file_info_projects_stat() {
        let h = harness(ViewMode::ReadWrite).await;
        let resp = h.get(h.uri("")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(json["BaseFileName"], "report.odt");
        assert_eq!(json["Size"], 17);
        assert_eq!(json["OwnerId"], "owner");
        assert_eq!(json["UserId"], "einstein");
        assert_eq!(json["UserFriendlyName"], "Albert Einstein");
        assert_eq!(json["UserCanWrite"], true);
        assert_eq!(json["SupportsLocks"], true);
        assert!(json["HostEditUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://editor.test/edit?WOPISrc="));
    }

    #[tokio::test]
    async fn check_file_info_for_vanished_file_is_not_found() {
        let h = harness(ViewMode::ReadOnly).await;
        let fresh = InMemoryGateway::new();
        let app = AppContext::new(
            h.app.config.clone(),
            h.app.discovery.clone(),
            Arc::new(fresh),
        )
        .unwrap();
        let router = router(TIMEOUT).with_state(AppState::new(Arc::new(app)));
        let resp = router
            .oneshot(Request::get(h.uri("")).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    // ---- Locks ----

    #[tokio::test]
    async fn lock_conflict_sequence() {
        let h = harness(ViewMode::ReadWrite).await;

        let resp = h.post("LOCK", Some("A")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = h.post("LOCK", Some("B")).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(lock_header(&resp), Some("A"));

        let resp = h.post("LOCK", Some("A")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = h.post("GET_LOCK", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(lock_header(&resp), Some("A"));

        let resp = h.post("UNLOCK", Some("A")).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = h.post("GET_LOCK", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(lock_header(&resp), Some(""));
    }

    #[tokio::test]
    async fn lock_is_owned_by_configured_name() {
        let h = harness(ViewMode::ReadWrite).await;
        h.post("LOCK", Some("A")).await;
        let held = h.gateway.current_lock(&file_id()).unwrap();
        assert_eq!(held.app_name, h.app.config.app.lock_name);
    }

    #[tokio::test]
    async fn lock_without_id_is_bad_request() {
        let h = harness(ViewMode::ReadWrite).await;
        assert_eq!(h.post("LOCK", None).await.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.post("UNLOCK", Some("")).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_lock_id_is_bad_request() {
        let h = harness(ViewMode::ReadWrite).await;
        let id = "x".repeat(MAX_LOCK_ID_LEN + 1);
        assert_eq!(h.post("LOCK", Some(&id)).await.status(), StatusCode::BAD_REQUEST);
        let id = "x".repeat(MAX_LOCK_ID_LEN);
        assert_eq!(h.post("LOCK", Some(&id)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unlock_mismatch_is_internal_error() {
        let h = harness(ViewMode::ReadWrite).await;
        h.post("LOCK", Some("A")).await;
        let resp = h.post("UNLOCK", Some("B")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ---- Dispatch ----

    #[tokio::test]
    async fn stubbed_operations_are_not_implemented() {
        let h = harness(ViewMode::ReadWrite).await;
        for op in ["REFRESH_LOCK", "PUT_USER_INFO", "PUT_RELATIVE", "RENAME_FILE", "DELETE"] {
            let resp = h.post(op, Some("A")).await;
            assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED, "{op}");
            assert_eq!(body_bytes(resp).await, b"Not Implemented");
        }
    }

    #[tokio::test]
    async fn unknown_or_misplaced_operations_are_internal_errors() {
        let h = harness(ViewMode::ReadWrite).await;
        for op in ["COBALT", "PUT", ""] {
            let resp = h.post(op, None).await;
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{op:?}");
        }

        let resp = h
            .router
            .clone()
            .oneshot(
                Request::post(h.uri("/contents"))
                    .header("X-WOPI-Override", "LOCK")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ---- Contents ----

    #[tokio::test]
    async fn get_file_streams_contents() {
        let h = harness(ViewMode::ReadOnly).await;
        h.start_data_server().await;

        let resp = h.get(h.uri("/contents")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_bytes(resp).await, b"original contents");
    }

    #[tokio::test]
    async fn get_file_without_transfer_endpoint_fails() {
        let h = harness(ViewMode::ReadOnly).await;
        let resp = h.get(h.uri("/contents")).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    async fn put(h: &Harness, lock: Option<&str>, body: &'static str) -> Response {
        let mut req = Request::post(h.uri("/contents")).header("X-WOPI-Override", "PUT");
        if let Some(lock) = lock {
            req = req.header(LOCK_HEADER, lock);
        }
        h.router
            .clone()
            .oneshot(req.body(Body::from(body)).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_file_under_own_lock_stores_contents() {
        let h = harness(ViewMode::ReadWrite).await;
        h.start_data_server().await;
        h.post("LOCK", Some("A")).await;

        let resp = put(&h, Some("A"), "new contents").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(h.gateway.content(&file_id()).unwrap(), "new contents");
    }

    #[tokio::test]
    async fn put_file_under_foreign_lock_conflicts() {
        let h = harness(ViewMode::ReadWrite).await;
        h.start_data_server().await;
        h.gateway.force_lock(
            &file_id(),
            Lock {
                lock_id: "other".into(),
                ..Lock::default()
            },
        );

        let resp = put(&h, Some("mine"), "clobber").await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(lock_header(&resp), Some("other"));
        assert_eq!(h.gateway.content(&file_id()).unwrap(), "original contents");
    }

    #[tokio::test]
    async fn put_file_on_unlocked_file_is_accepted() {
        let h = harness(ViewMode::ReadWrite).await;
        h.start_data_server().await;
        let resp = put(&h, None, "fresh").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(h.gateway.content(&file_id()).unwrap(), "fresh");
    }
}
