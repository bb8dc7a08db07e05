use serde::{Deserialize, Serialize};

use crate::messages::{Reference, User, ViewMode};

/// Per-session routing context carried inside the signed session token.
///
/// Threaded explicitly into every WOPI handler once the token is verified.
/// While inside a token, `access_token` holds the *encrypted* backend
/// credential; after authentication it holds the decrypted credential that is
/// forwarded on every backend call made for the request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WopiContext {
    /// Backend credential (encrypted inside tokens, plaintext after auth).
    pub access_token: String,
    /// The file this session is bound to.
    pub file_reference: Reference,
    /// The user who opened the file. `None` for anonymous access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Access mode requested at launch.
    pub view_mode: ViewMode,
    /// Editor URL for editing, already carrying the `WOPISrc` callback.
    pub edit_app_url: String,
    /// Editor URL for viewing, already carrying the `WOPISrc` callback.
    pub view_app_url: String,
}

// The credential never reaches logs.
impl std::fmt::Debug for WopiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WopiContext")
            .field("access_token", &"<redacted>")
            .field("file_reference", &self.file_reference)
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("view_mode", &self.view_mode)
            .field("edit_app_url", &self.edit_app_url)
            .field("view_app_url", &self.view_app_url)
            .finish()
    }
}
