//! WOPI discovery: which editor URL opens which file extension.
//!
//! The editor publishes an XML manifest at `/hosting/discovery`. Only
//! `net-zone` elements whose name contains `external` are considered;
//! within them every `action` maps an extension to a `urlsrc` for one of
//! the two actions the bridge uses, `view` and `edit`.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};
use url::Url;

use crate::config::EditorConfig;

const DISCOVERY_PATH: &str = "/hosting/discovery";

/// Editor action a URL template serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppAction {
    View,
    Edit,
}

impl AppAction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "view" => Some(Self::View),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("discovery endpoint answered HTTP {0}")]
    Status(u16),
    #[error("discovery document is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("discovery document root is <{0}>, expected <wopi-discovery>")]
    UnexpectedRoot(String),
}

/// Extension-to-URL lookup table built from a discovery manifest.
///
/// Extensions are keyed with their leading dot (`.docx`). URLs have
/// placeholder parameters stripped and are otherwise kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryTable {
    urls: HashMap<AppAction, HashMap<String, String>>,
}

impl DiscoveryTable {
    /// Parses a discovery manifest.
    ///
    /// Actions with an unknown name, no extension, or an unparseable
    /// `urlsrc` are skipped.
    ///
    /// # Errors
    ///
    /// Fails when the document is not XML or its root is not
    /// `wopi-discovery`.
    pub fn parse(xml: &str) -> Result<Self, DiscoveryError> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();
        if !root.has_tag_name("wopi-discovery") {
            return Err(DiscoveryError::UnexpectedRoot(
                root.tag_name().name().to_string(),
            ));
        }

        let mut table = Self::default();
        let zones = root
            .children()
            .filter(|n| n.has_tag_name("net-zone"))
            .filter(|n| n.attribute("name").is_some_and(|z| z.contains("external")));

        for zone in zones {
            for app in zone.children().filter(|n| n.has_tag_name("app")) {
                for action in app.children().filter(|n| n.has_tag_name("action")) {
                    let Some(kind) = action.attribute("name").and_then(AppAction::from_name)
                    else {
                        continue;
                    };
                    let ext = action.attribute("ext").unwrap_or_default();
                    if ext.is_empty() {
                        continue;
                    }
                    let Some(url) = action.attribute("urlsrc").and_then(strip_placeholders)
                    else {
                        debug!(ext, "skipping discovery action with invalid urlsrc");
                        continue;
                    };
                    table.insert(kind, ext, url);
                }
            }
        }
        Ok(table)
    }

    fn insert(&mut self, action: AppAction, ext: &str, url: String) {
        self.urls
            .entry(action)
            .or_default()
            .insert(format!(".{ext}"), url);
    }

    /// URL template for `action` on files with extension `ext` (`.docx`).
    #[must_use]
    pub fn url(&self, action: AppAction, ext: &str) -> Option<&str> {
        self.urls
            .get(&action)
            .and_then(|by_ext| by_ext.get(ext))
            .map(String::as_str)
    }

    /// All dotted extensions with at least one action, sorted.
    #[must_use]
    pub fn extensions(&self) -> BTreeSet<&str> {
        self.urls
            .values()
            .flat_map(HashMap::keys)
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.values().all(HashMap::is_empty)
    }
}

/// Drops query parameters whose key or value contains `<` or `>`.
///
/// Those are editor-specific placeholders like `<ui=UI_LLCC&>`. If no
/// parameters remain the query is removed entirely.
fn strip_placeholders(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    let is_placeholder = |s: &str| s.contains('<') || s.contains('>');

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, v)| !is_placeholder(k) && !is_placeholder(v))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&kept);
    }
    Some(url.into())
}

/// Downloads and parses the editor's discovery manifest.
///
/// # Errors
///
/// Fails on transport errors, non-2xx responses, and invalid documents.
pub async fn fetch(editor: &EditorConfig) -> Result<DiscoveryTable, DiscoveryError> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(editor.insecure)
        .build()?;
    let url = format!("{}{DISCOVERY_PATH}", editor.addr.trim_end_matches('/'));

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status(status.as_u16()));
    }
    let body = response.text().await?;
    let table = DiscoveryTable::parse(&body)?;

    info!(
        url = %url,
        extensions = table.extensions().len(),
        "loaded WOPI discovery"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<wopi-discovery>
  <net-zone name="external-http">
    <app name="writer" favIconUrl="https://x/fav.ico">
      <action name="edit" ext="docx" urlsrc="https://x/edit?x=&lt;foo&gt;"/>
      <action name="view" ext="docx" urlsrc="https://x/view?lang=en&amp;&lt;ui=UI_LLCC&amp;&gt;"/>
      <action name="view" ext="pdf" urlsrc="https://x/view-pdf?"/>
      <action name="view_comment" ext="docx" urlsrc="https://x/comment"/>
      <action name="edit" ext="" urlsrc="https://x/none"/>
      <action name="edit" ext="odt" urlsrc="not a url"/>
    </app>
  </net-zone>
  <net-zone name="internal-https">
    <app name="calc">
      <action name="edit" ext="xlsx" urlsrc="https://internal/edit"/>
    </app>
  </net-zone>
</wopi-discovery>"#;

    #[test]
    fn placeholder_params_are_stripped() {
        let table = DiscoveryTable::parse(MANIFEST).unwrap();
        assert_eq!(table.url(AppAction::Edit, ".docx"), Some("https://x/edit"));
    }

    #[test]
    fn real_params_survive() {
        let table = DiscoveryTable::parse(MANIFEST).unwrap();
        assert_eq!(
            table.url(AppAction::View, ".docx"),
            Some("https://x/view?lang=en")
        );
        assert_eq!(table.url(AppAction::View, ".pdf"), Some("https://x/view-pdf"));
    }

    #[test]
    fn only_external_zones_are_used() {
        let table = DiscoveryTable::parse(MANIFEST).unwrap();
        assert!(table.url(AppAction::Edit, ".xlsx").is_none());
    }

    #[test]
    fn unusable_actions_are_skipped() {
        let table = DiscoveryTable::parse(MANIFEST).unwrap();
        assert!(table.url(AppAction::Edit, ".").is_none());
        assert!(table.url(AppAction::Edit, ".odt").is_none());
        assert_eq!(
            table.extensions().into_iter().collect::<Vec<_>>(),
            vec![".docx", ".pdf"]
        );
    }

    #[test]
    fn wrong_root_is_rejected() {
        let err = DiscoveryTable::parse("<html/>").unwrap_err();
        assert!(matches!(err, DiscoveryError::UnexpectedRoot(ref r) if r == "html"));
        assert!(DiscoveryTable::parse("not xml").is_err());
    }

    #[test]
    fn empty_manifest_is_empty() {
        let table = DiscoveryTable::parse("<wopi-discovery/>").unwrap();
        assert!(table.is_empty());
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn fetch_reads_hosting_discovery() {
        let addr = serve(Router::new().route(DISCOVERY_PATH, get(|| async { MANIFEST }))).await;
        let editor = EditorConfig {
            addr: format!("{addr}/"),
            insecure: false,
        };
        let table = fetch(&editor).await.unwrap();
        assert!(table.url(AppAction::Edit, ".docx").is_some());
    }

    #[tokio::test]
    async fn fetch_fails_on_error_status() {
        let addr = serve(Router::new().route(
            DISCOVERY_PATH,
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let editor = EditorConfig {
            addr,
            insecure: true,
        };
        assert!(matches!(
            fetch(&editor).await,
            Err(DiscoveryError::Status(503))
        ));
    }
}
