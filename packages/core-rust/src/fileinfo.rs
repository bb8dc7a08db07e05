//! The `CheckFileInfo` response body.
//!
//! Field names and omission rules are a compatibility surface shared with
//! existing WOPI clients and must stay stable. Strings, lists, and the
//! optional numeric fields are omitted when empty; booleans follow the
//! published contract, where most capability flags are always present and a
//! few vendor flags are omitted when false.
//!
//! References:
//! - <https://learn.microsoft.com/en-us/microsoft-365/cloud-storage-partner-program/rest/files/checkfileinfo>
//! - <https://sdk.collaboraonline.com/docs/advanced_integration.html>

use serde::{Deserialize, Serialize};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// File properties and host capabilities reported to a WOPI client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct FileInfo {
    // ---- Required properties ----
    /// File name including extension, without a path.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_file_name: String,
    /// Uniquely identifies the owner of the file.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner_id: String,
    /// Uniquely identifies the user accessing the file.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Current version; must change whenever the file changes.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    // ---- File and user metadata ----
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_friendly_name: String,
    /// Base64-encoded SHA-256 of the contents.
    #[serde(rename = "SHA256", skip_serializing_if = "String::is_empty")]
    pub sha256: String,
    /// Dot-prefixed extension; overrides the one parsed from `BaseFileName`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_extension: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub file_name_max_length: u32,
    /// ISO 8601 UTC time of the last modification.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_modified_time: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_info: String,

    // ---- User permissions ----
    pub read_only: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub temporarily_not_writable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sharing_status: String,
    pub restricted_web_view_only: bool,
    pub user_can_attend: bool,
    pub user_can_present: bool,
    pub user_can_not_write_relative: bool,
    pub user_can_rename: bool,
    pub user_can_write: bool,

    // ---- Client behavior ----
    pub close_button_closes_window: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub copy_paste_restrictions: String,
    pub disable_print: bool,
    pub disable_translation: bool,

    // ---- Host URLs ----
    #[serde(skip_serializing_if = "String::is_empty")]
    pub close_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub download_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_embed_command_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_sharing_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_version_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host_edit_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host_embedded_view_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub host_view_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signout_url: String,

    // ---- Breadcrumbs ----
    #[serde(skip_serializing_if = "String::is_empty")]
    pub breadcrumb_brand_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub breadcrumb_brand_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub breadcrumb_doc_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub breadcrumb_folder_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub breadcrumb_folder_url: String,

    // ---- Other miscellaneous properties ----
    pub allow_additional_microsoft_services: bool,
    pub allow_error_report_prompt: bool,
    pub allow_external_marketplace: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_throttling_protection: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub requested_call_throttling: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub supported_share_url_types: Vec<String>,

    // ---- Host capabilities ----
    pub supports_cobalt: bool,
    pub supports_containers: bool,
    pub supports_ecosystem: bool,
    /// Lock ids up to 1024 characters instead of 256.
    pub supports_extended_lock_length: bool,
    pub supports_folders: bool,
    pub supports_get_file_wopi_src: bool,
    pub supports_get_lock: bool,
    /// Lock, Unlock, RefreshLock, and UnlockAndRelock.
    pub supports_locks: bool,
    pub supports_rename: bool,
    /// PutFile and PutRelativeFile.
    pub supports_update: bool,
    pub supports_delete_file: bool,
    pub supports_user_info: bool,

    // ---- User metadata flags ----
    #[serde(skip_serializing_if = "is_false")]
    pub is_anonymous_user: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub is_edu_user: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub license_check_for_edit_is_enabled: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub supports_add_activities: bool,

    // ---- Collabora Online extensions ----
    /// Lets the owner close the document for everyone.
    #[serde(skip_serializing_if = "is_false")]
    pub enable_owner_termination: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_export: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub disable_copy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_info_emits_only_always_present_flags() {
        let json = serde_json::to_value(FileInfo::default()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["ReadOnly"], false);
        assert_eq!(obj["SupportsLocks"], false);
        assert!(!obj.contains_key("BaseFileName"));
        assert!(!obj.contains_key("Size"));
        assert!(!obj.contains_key("FileNameMaxLength"));
        assert!(!obj.contains_key("IsAnonymousUser"));
        assert!(!obj.contains_key("DisableExport"));
        assert!(!obj.contains_key("SupportedShareUrlTypes"));
        assert!(obj.values().all(|v| !v.is_null()));
    }

    #[test]
    fn field_names_follow_the_wire_contract() {
        let info = FileInfo {
            base_file_name: "doc.docx".into(),
            owner_id: "owner".into(),
            user_id: "user".into(),
            size: Some(0),
            sha256: "abc=".into(),
            host_edit_url: "https://edit".into(),
            supports_get_file_wopi_src: true,
            is_anonymous_user: true,
            enable_owner_termination: true,
            ..FileInfo::default()
        };
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["BaseFileName"], "doc.docx");
        assert_eq!(json["OwnerId"], "owner");
        assert_eq!(json["UserId"], "user");
        assert_eq!(json["Size"], 0);
        assert_eq!(json["SHA256"], "abc=");
        assert_eq!(json["HostEditUrl"], "https://edit");
        assert_eq!(json["SupportsGetFileWopiSrc"], true);
        assert_eq!(json["IsAnonymousUser"], true);
        assert_eq!(json["EnableOwnerTermination"], true);
    }

    #[test]
    fn always_present_flag_count() {
        let json = serde_json::to_value(FileInfo::default()).unwrap();
        // Booleans published without omitempty.
        assert_eq!(json.as_object().unwrap().len(), 25);
    }

    #[test]
    fn parses_back_with_missing_fields() {
        let info: FileInfo =
            serde_json::from_str(r#"{"BaseFileName":"a.odt","UserCanWrite":true}"#).unwrap();
        assert_eq!(info.base_file_name, "a.odt");
        assert!(info.user_can_write);
        assert!(info.size.is_none());
    }
}
