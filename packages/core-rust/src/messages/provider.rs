//! Storage provider messages: references, stat, locks, and transfers.

use serde::{Deserialize, Serialize};

use super::identity::UserId;
use super::rpc::Status;

// ---------------------------------------------------------------------------
// Resource identity
// ---------------------------------------------------------------------------

/// Identifies a resource independently of its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceId {
    pub storage_id: String,
    pub space_id: String,
    pub opaque_id: String,
}

/// Reference to a resource: an id plus a path relative to it.
///
/// The bridge always addresses files by id with the relative path `"."`,
/// which is what [`Reference::to_resource`] produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reference {
    pub resource_id: ResourceId,
    pub path: String,
}

impl Reference {
    /// Builds a reference pointing at the resource itself.
    #[must_use]
    pub fn to_resource(resource_id: ResourceId) -> Self {
        Self {
            resource_id,
            path: ".".to_string(),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = &self.resource_id;
        write!(
            f,
            "{}${}!{}:{}",
            id.storage_id, id.space_id, id.opaque_id, self.path
        )
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamp {
    #[serde(with = "super::u64_string")]
    pub seconds: u64,
    pub nanos: u32,
}

impl Timestamp {
    #[must_use]
    pub fn from_secs(seconds: u64) -> Self {
        Self { seconds, nanos: 0 }
    }
}

/// Metadata of a resource as returned by `Stat`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceInfo {
    pub id: ResourceId,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(with = "super::u64_string")]
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime: Option<Timestamp>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub etag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ResourceInfo>,
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockType {
    #[default]
    #[serde(rename = "LOCK_TYPE_INVALID")]
    Invalid,
    #[serde(rename = "LOCK_TYPE_SHARED")]
    Shared,
    #[serde(rename = "LOCK_TYPE_WRITE")]
    Write,
    #[serde(rename = "LOCK_TYPE_EXCL")]
    Exclusive,
}

/// A lock held on a resource, owned by an application or a user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Lock {
    pub lock_id: String,
    #[serde(rename = "type")]
    pub lock_type: LockType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetLockRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GetLockResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<Lock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetLockRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
    pub lock: Lock,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SetLockResponse {
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnlockRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
    pub lock: Lock,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnlockResponse {
    pub status: Status,
}

// ---------------------------------------------------------------------------
// Transfer negotiation
// ---------------------------------------------------------------------------

/// One way of downloading a file, as offered by `InitiateFileDownload`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileDownloadProtocol {
    pub protocol: String,
    pub download_endpoint: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expose: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

/// One way of uploading a file, as offered by `InitiateFileUpload`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileUploadProtocol {
    pub protocol: String,
    pub upload_endpoint: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expose: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitiateFileDownloadRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitiateFileDownloadResponse {
    pub status: Status,
    pub protocols: Vec<FileDownloadProtocol>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitiateFileUploadRequest {
    #[serde(rename = "ref")]
    pub reference: Reference,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lock_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitiateFileUploadResponse {
    pub status: Status,
    pub protocols: Vec<FileUploadProtocol>,
}

/// Protocol names the bridge can drive with a plain HTTP request.
pub const SIMPLE_TRANSFER_PROTOCOLS: [&str; 2] = ["simple", "spaces"];

impl InitiateFileDownloadResponse {
    /// Picks the transfer endpoint and token of a supported protocol.
    ///
    /// When several supported protocols are offered the last one wins.
    #[must_use]
    pub fn simple_endpoint(&self) -> Option<(&str, &str)> {
        self.protocols
            .iter()
            .rev()
            .find(|p| SIMPLE_TRANSFER_PROTOCOLS.contains(&p.protocol.as_str()))
            .filter(|p| !p.download_endpoint.is_empty())
            .map(|p| (p.download_endpoint.as_str(), p.token.as_str()))
    }
}

impl InitiateFileUploadResponse {
    /// Picks the transfer endpoint and token of a supported protocol.
    ///
    /// When several supported protocols are offered the last one wins.
    #[must_use]
    pub fn simple_endpoint(&self) -> Option<(&str, &str)> {
        self.protocols
            .iter()
            .rev()
            .find(|p| SIMPLE_TRANSFER_PROTOCOLS.contains(&p.protocol.as_str()))
            .filter(|p| !p.upload_endpoint.is_empty())
            .map(|p| (p.upload_endpoint.as_str(), p.token.as_str()))
    }
}
