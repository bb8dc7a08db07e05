//! App-provider messages: registration and the "open in app" launch call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::provider::ResourceInfo;
use super::rpc::Status;

/// Access mode requested when a file is opened in an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    #[serde(rename = "VIEW_MODE_INVALID")]
    Invalid,
    /// View without download, print, or copy.
    #[serde(rename = "VIEW_MODE_VIEW_ONLY")]
    ViewOnly,
    #[serde(rename = "VIEW_MODE_READ_ONLY")]
    ReadOnly,
    #[serde(rename = "VIEW_MODE_READ_WRITE")]
    ReadWrite,
    #[serde(rename = "VIEW_MODE_PREVIEW")]
    Preview,
}

impl ViewMode {
    /// Whether sessions in this mode may write the file.
    #[must_use]
    pub fn can_write(self) -> bool {
        self == Self::ReadWrite
    }
}

/// Launch request sent by the backend when a user opens a file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenInAppRequest {
    pub resource_info: ResourceInfo,
    pub view_mode: ViewMode,
    /// The user's backend credential, delegated to the bridge.
    pub access_token: String,
}

/// Where and how the user agent should open the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenInAppUrl {
    pub app_url: String,
    pub method: String,
    pub form_parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OpenInAppResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_url: Option<OpenInAppUrl>,
}

impl OpenInAppResponse {
    /// A failed launch carrying only a status.
    #[must_use]
    pub fn failed(status: Status) -> Self {
        Self {
            status,
            app_url: None,
        }
    }
}

/// Description of this bridge as an app provider in the backend registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderInfo {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub address: String,
    pub mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddAppProviderRequest {
    pub provider: ProviderInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddAppProviderResponse {
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_app_request_parses_view_mode() {
        let json = r#"{
            "resourceInfo": { "id": { "storageId": "s", "spaceId": "sp", "opaqueId": "o" }, "path": "/doc.docx" },
            "viewMode": "VIEW_MODE_READ_WRITE",
            "accessToken": "backend-jwt"
        }"#;
        let req: OpenInAppRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.view_mode, ViewMode::ReadWrite);
        assert!(req.view_mode.can_write());
        assert_eq!(req.resource_info.path, "/doc.docx");
    }

    #[test]
    fn only_read_write_can_write() {
        for mode in [
            ViewMode::Invalid,
            ViewMode::ViewOnly,
            ViewMode::ReadOnly,
            ViewMode::Preview,
        ] {
            assert!(!mode.can_write(), "{mode:?}");
        }
    }

    #[test]
    fn failed_response_has_no_url() {
        let resp = OpenInAppResponse::failed(Status::new(super::super::Code::Internal));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("appUrl").is_none());
        assert_eq!(json["status"]["code"], "CODE_INTERNAL");
    }
}
