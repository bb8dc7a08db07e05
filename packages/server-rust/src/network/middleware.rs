//! HTTP middleware stack shared by both listeners.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use std::time::Duration;

use axum::http::header::HeaderName;
use axum::http::{Method, Request, StatusCode};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::Span;

use super::config::NetworkConfig;

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<
                    tower_http::classify::ServerErrorsAsFailures,
                >,
                RequestSpan,
            >,
            tower::layer::util::Stack<
                SetRequestIdLayer<MakeRequestUuid>,
                tower::layer::util::Identity,
            >,
        >,
    >,
>;

/// Builds the HTTP-level Tower middleware stack.
///
/// **Ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every request
/// 2. `Tracing` -- access log with structured spans, see [`RequestSpan`]
/// 3. `CORS` -- browser-hosted editors read `X-WOPI-Lock` from responses
/// 4. `PropagateRequestId` -- copies `X-Request-Id` onto the response
///
/// The request timeout is not part of the stack: routers attach
/// [`request_timeout_layer`] to the routes it may bound, leaving file
/// transfers to run as long as their bodies flow.
///
/// Responses are never compressed: `GetFile` streams the upstream body
/// as-is with its `Content-Length`.
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        .layer(build_cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Answers 408 once `timeout` passes without response headers.
#[must_use]
pub fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Span for one request: method, path and request id.
///
/// The query string is left out; WOPI requests carry the session token
/// in `access_token`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        tracing::debug_span!(
            "request",
            method = %request.method(),
            path = request.uri().path(),
            version = ?request.version(),
            request_id,
        )
    }
}

/// A wildcard `"*"` allows any origin; otherwise each entry is parsed into
/// an explicit allowlist and unparsable entries are skipped.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("x-wopi-lock")])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::test_support::CapturedLogs;
    use crate::wopi::LOCK_HEADER;

    fn app(origins: &[&str]) -> Router {
        let config = NetworkConfig {
            cors_origins: origins.iter().map(ToString::to_string).collect(),
            ..NetworkConfig::default()
        };
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(build_http_layers(&config))
    }

    #[tokio::test]
    async fn request_id_is_assigned_and_propagated() {
        let resp = app(&["*"])
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn cors_exposes_lock_header() {
        let resp = app(&["https://editor.example"])
            .oneshot(
                Request::get("/")
                    .header("origin", "https://editor.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let exposed = resp.headers()["access-control-expose-headers"]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(exposed.contains(&LOCK_HEADER.to_ascii_lowercase()));
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "https://editor.example"
        );
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_cors_grant() {
        let resp = app(&["https://editor.example"])
            .oneshot(
                Request::get("/")
                    .header("origin", "https://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!resp.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn access_log_omits_query_string() {
        let (logs, _guard) = CapturedLogs::install();
        let router = Router::new()
            .route("/wopi/files/{file_id}", get(|| async { "ok" }))
            .layer(build_http_layers(&NetworkConfig::default()));

        let resp = router
            .oneshot(
                Request::get("/wopi/files/abc123?access_token=session-secret-value")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let output = logs.contents();
        assert!(output.contains("/wopi/files/abc123"), "{output}");
        assert!(output.contains("request_id="), "{output}");
        assert!(!output.contains("session-secret-value"), "{output}");
        assert!(!output.contains("access_token"), "{output}");
    }

    #[tokio::test]
    async fn timeout_layer_answers_request_timeout() {
        let router = Router::new()
            .route(
                "/",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(50)));

        let resp = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
