//! wopibridge: WOPI host for office editors over a CS3 storage backend.
//!
//! Startup: fetch the editor's discovery manifest, connect the backend
//! gateway, register as an app provider, then serve the launch and WOPI
//! listeners until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use rand::distr::{Alphanumeric, SampleString};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use wopibridge_server::app::AppContext;
use wopibridge_server::config::{AppProviderConfig, BridgeConfig, EditorConfig, GatewayConfig};
use wopibridge_server::discovery;
use wopibridge_server::gateway::ConnectGateway;
use wopibridge_server::network::{NetworkConfig, NetworkModule, TlsConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// WOPI host bridging office editors to a CS3 storage backend
#[derive(Parser, Debug)]
#[command(name = "wopibridge", version)]
struct Cli {
    /// Signs session tokens and encrypts embedded credentials. Random if unset.
    #[arg(long, env = "WOPI_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[arg(long, env = "WOPI_APP_NAME", default_value = "WOPI app")]
    app_name: String,

    #[arg(
        long,
        env = "WOPI_APP_DESCRIPTION",
        default_value = "Open office documents with a WOPI app"
    )]
    app_description: String,

    #[arg(long, env = "WOPI_APP_ICON", default_value = "image-edit")]
    app_icon: String,

    /// Owner tag written into every lock.
    #[arg(
        long,
        env = "WOPI_APP_LOCK_NAME",
        default_value = "com.github.wkloucek.cs3-wopi-server"
    )]
    app_lock_name: String,

    /// Base URL of the office editor.
    #[arg(long, env = "WOPI_APP_ADDR", default_value = "https://127.0.0.1:8080")]
    app_addr: String,

    /// Skip certificate verification when fetching discovery.
    #[arg(long, env = "WOPI_APP_INSECURE")]
    app_insecure: bool,

    /// Host and port under which editors reach the WOPI listener.
    #[arg(long, env = "WOPI_HTTP_ADDR", default_value = "127.0.0.1:6789")]
    http_addr: String,

    #[arg(long, env = "WOPI_HTTP_BIND_ADDR", default_value = "127.0.0.1:6789")]
    http_bind_addr: String,

    #[arg(long, env = "WOPI_HTTP_SCHEME", default_value = "http")]
    http_scheme: String,

    /// Bind address of the launch listener, also announced to the backend.
    #[arg(long, env = "WOPI_GRPC_BIND_ADDR", default_value = "127.0.0.1:5678")]
    grpc_bind_addr: String,

    #[arg(long, env = "WOPI_CS3API_GATEWAY_ADDR", default_value = "http://127.0.0.1:9142")]
    gateway_addr: String,

    /// Skip certificate verification on data transfer endpoints.
    #[arg(long, env = "WOPI_CS3API_DATA_GATEWAY_INSECURE")]
    data_gateway_insecure: bool,

    /// PEM certificate for the WOPI listener; requires `--tls-key`.
    #[arg(long, env = "WOPI_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<PathBuf>,

    #[arg(long, env = "WOPI_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<PathBuf>,

    /// Time to response headers; file contents transfers are exempt.
    #[arg(long, env = "WOPI_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    #[arg(long, env = "WOPI_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    #[arg(long, env = "WOPI_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    fn bridge_config(&self, secret: String) -> anyhow::Result<BridgeConfig> {
        let wopi_src_base = Url::parse(&format!("{}://{}", self.http_scheme, self.http_addr))
            .with_context(|| format!("invalid WOPI address {}://{}", self.http_scheme, self.http_addr))?;

        Ok(BridgeConfig {
            secret,
            app: AppProviderConfig {
                name: self.app_name.clone(),
                description: self.app_description.clone(),
                icon: self.app_icon.clone(),
                lock_name: self.app_lock_name.clone(),
                address: self.grpc_bind_addr.clone(),
            },
            wopi_src_base,
            editor: EditorConfig {
                addr: self.app_addr.clone(),
                insecure: self.app_insecure,
            },
            gateway: GatewayConfig {
                addr: self.gateway_addr.clone(),
                data_insecure: self.data_gateway_insecure,
                ..GatewayConfig::default()
            },
        })
    }

    fn network_config(&self) -> NetworkConfig {
        let tls = match (&self.tls_cert, &self.tls_key) {
            (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            }),
            _ => None,
        };
        NetworkConfig {
            wopi_bind: self.http_bind_addr.clone(),
            launch_bind: self.grpc_bind_addr.clone(),
            tls,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let secret = match cli.secret.clone().filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None => {
            warn!("WOPI_SECRET is not set; using a random secret, sessions will not survive a restart");
            Alphanumeric.sample_string(&mut rand::rng(), 32)
        }
    };
    let config = cli.bridge_config(secret)?;

    let discovery = discovery::fetch(&config.editor)
        .await
        .with_context(|| format!("fetching discovery from {}", config.editor.addr))?;
    info!(extensions = discovery.extensions().len(), "loaded discovery manifest");

    let gateway = ConnectGateway::new(&config.gateway).context("building gateway client")?;
    let app = Arc::new(AppContext::new(config, discovery, Arc::new(gateway))?);
    app.register_app_provider().await?;

    let mut network = NetworkModule::new(cli.network_config(), app);
    network.start().await?;
    network.serve(shutdown_signal()).await?;

    info!("stopped");
    Ok(())
}
