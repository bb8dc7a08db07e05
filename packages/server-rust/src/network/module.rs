//! Network module with deferred startup lifecycle.
//!
//! `new()` allocates shared state, `start()` binds both TCP listeners, and
//! `serve()` accepts connections until shutdown. The split lets startup
//! report bound addresses (port 0 in tests) before traffic flows.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::{NetworkConfig, TlsConfig};
use super::handlers::{
    health_handler, liveness_handler, open_in_app_handler, readiness_handler, AppState,
};
use super::middleware::{build_http_layers, request_timeout_layer};
use super::shutdown::{track_in_flight, ShutdownController};
use crate::app::AppContext;

/// How long in-flight requests may run on after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Addresses the listeners actually bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAddrs {
    pub wopi: SocketAddr,
    pub launch: SocketAddr,
}

/// Manages both HTTP listeners.
///
/// 1. `new()` -- allocates the shared state and shutdown controller
/// 2. `start()` -- binds the WOPI and launch listeners
/// 3. `serve()` -- serves both until shutdown, then drains
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listeners: Option<(TcpListener, TcpListener)>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(config: NetworkConfig, app: Arc<AppContext>) -> Self {
        Self {
            config,
            state: AppState::new(app),
            listeners: None,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Router of the editor-facing listener.
    ///
    /// Routes:
    /// - `GET /health`, `GET /health/live`, `GET /health/ready`
    /// - the WOPI routes, see [`crate::wopi::routes`]
    ///
    /// The contents routes carry no request timeout.
    pub fn wopi_router(&self) -> Router {
        let wopi = crate::wopi::router(self.config.request_timeout).route_layer(
            from_fn_with_state(Arc::clone(&self.state.shutdown), track_in_flight),
        );

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route_layer(request_timeout_layer(self.config.request_timeout))
            .merge(wopi)
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Router of the backend-facing listener: `POST /app/open`.
    pub fn launch_router(&self) -> Router {
        Router::new()
            .route("/app/open", post(open_in_app_handler))
            .route_layer(from_fn_with_state(
                Arc::clone(&self.state.shutdown),
                track_in_flight,
            ))
            .route_layer(request_timeout_layer(self.config.request_timeout))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds both listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if either address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<BoundAddrs> {
        let wopi = TcpListener::bind(&self.config.wopi_bind)
            .await
            .with_context(|| format!("binding WOPI listener to {}", self.config.wopi_bind))?;
        let launch = TcpListener::bind(&self.config.launch_bind)
            .await
            .with_context(|| format!("binding launch listener to {}", self.config.launch_bind))?;

        let addrs = BoundAddrs {
            wopi: wopi.local_addr()?,
            launch: launch.local_addr()?,
        };
        info!(wopi = %addrs.wopi, launch = %addrs.launch, "listeners bound");

        self.listeners = Some((wopi, launch));
        Ok(addrs)
    }

    /// Serves both listeners until `shutdown` resolves.
    ///
    /// After the signal:
    /// 1. Health state transitions to Draining and new requests get 503
    /// 2. Both listeners stop accepting and finish open connections
    /// 3. Waits up to 30 seconds for in-flight requests to complete
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called, the TLS material
    /// cannot be loaded, or either server hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (wopi_listener, launch_listener) = self
            .listeners
            .take()
            .context("start() must be called before serve()")?;
        let wopi_router = self.wopi_router();
        let launch_router = self.launch_router();
        let ctrl = self.shutdown_controller();

        let trigger = Arc::clone(&ctrl);
        tokio::spawn(async move {
            shutdown.await;
            info!("shutdown requested");
            trigger.trigger_shutdown();
        });

        let wopi = async {
            match &self.config.tls {
                Some(tls) => serve_tls(wopi_listener, wopi_router, tls, &ctrl).await,
                None => serve_plain(wopi_listener, wopi_router, &ctrl).await,
            }
        };
        let launch = serve_plain(launch_listener, launch_router, &ctrl);

        ctrl.set_ready();
        let served = tokio::try_join!(wopi, launch);
        // Either listener failing takes the whole process down.
        ctrl.trigger_shutdown();
        served?;

        if ctrl.wait_for_drain(DRAIN_TIMEOUT).await {
            info!("all requests drained");
        } else {
            warn!(
                in_flight = ctrl.in_flight_count(),
                "drain timeout expired with requests remaining"
            );
        }
        Ok(())
    }
}

async fn serve_plain(
    listener: TcpListener,
    router: Router,
    ctrl: &ShutdownController,
) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "serving plain HTTP");

    axum::serve(listener, router)
        .with_graceful_shutdown(ctrl.shutdown_signal())
        .await?;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls, reusing the
/// pre-bound listener.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls: &TlsConfig,
    ctrl: &ShutdownController,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| format!("loading TLS material from {}", tls.cert_path.display()))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();

    let shutdown_handle = handle.clone();
    let signal = ctrl.shutdown_signal();
    tokio::spawn(async move {
        signal.await;
        shutdown_handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    info!(%addr, "serving TLS");

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;
    Ok(())
}
