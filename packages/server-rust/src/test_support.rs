//! Shared fixtures for the crate's unit tests.

use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::subscriber::DefaultGuard;

use crate::app::AppContext;
use crate::config::BridgeConfig;
use crate::discovery::DiscoveryTable;
use crate::gateway::InMemoryGateway;

pub(crate) const SECRET: &str = "test-secret";

/// `.odt` has both actions, `.pdf` is view-only.
pub(crate) const MANIFEST: &str = r#"<wopi-discovery>
  <net-zone name="external-https">
    <app name="writer">
      <action name="edit" ext="odt" urlsrc="https://editor.test/edit?"/>
      <action name="view" ext="odt" urlsrc="https://editor.test/view?"/>
      <action name="view" ext="pdf" urlsrc="https://editor.test/view?&lt;rs=DC_LLCC&amp;&gt;"/>
    </app>
  </net-zone>
</wopi-discovery>"#;

/// A backend-style credential signed with a key the bridge does not know.
pub(crate) fn backend_credential(exp: i64) -> String {
    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        aud: &'a str,
        exp: i64,
    }
    encode(
        &Header::new(Algorithm::HS256),
        &Claims {
            sub: "einstein",
            aud: "reva",
            exp,
        },
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .unwrap()
}

/// An application context over an in-memory gateway.
pub(crate) fn test_context(manifest: &str) -> (AppContext, Arc<InMemoryGateway>) {
    let gateway = Arc::new(InMemoryGateway::new());
    let config = BridgeConfig {
        secret: SECRET.to_string(),
        ..BridgeConfig::default()
    };
    let discovery = DiscoveryTable::parse(manifest).unwrap();
    let ctx = AppContext::new(config, discovery, gateway.clone()).unwrap();
    (ctx, gateway)
}

/// Formatted log output of the current thread, kept for assertions.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Installs a DEBUG-level subscriber for the current thread until the
    /// guard drops.
    pub(crate) fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
