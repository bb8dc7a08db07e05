//! Identity messages: users and the `WhoAmI` lookup.

use serde::{Deserialize, Serialize};

use super::rpc::Status;

/// Globally unique user identifier: identity provider plus opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserId {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub idp: String,
    pub opaque_id: String,
}

/// A backend user as returned by identity lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mail: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WhoAmIRequest {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}
