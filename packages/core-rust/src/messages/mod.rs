//! Backend gateway message schemas.
//!
//! These types mirror the CS3 API messages the bridge exchanges with the
//! storage backend, in their proto3 JSON form: `camelCase` field names,
//! enums by name, and 64-bit integers carried as strings. Every field has a
//! default because proto3 JSON omits fields holding their default value.
//!
//! - [`rpc`]: status envelope shared by every response
//! - [`identity`]: users and the `WhoAmI` call
//! - [`provider`]: resource references, stat, locks, and transfer negotiation
//! - [`app`]: app-provider registration and the "open in app" launch call

pub mod app;
pub mod identity;
pub mod provider;
pub mod rpc;

pub use app::{
    AddAppProviderRequest, AddAppProviderResponse, OpenInAppRequest, OpenInAppResponse,
    OpenInAppUrl, ProviderInfo, ViewMode,
};
pub use identity::{User, UserId, WhoAmIRequest, WhoAmIResponse};
pub use provider::{
    FileDownloadProtocol, FileUploadProtocol, GetLockRequest, GetLockResponse,
    InitiateFileDownloadRequest, InitiateFileDownloadResponse, InitiateFileUploadRequest,
    InitiateFileUploadResponse, Lock, LockType, Reference, ResourceId, ResourceInfo,
    SetLockRequest, SetLockResponse, StatRequest, StatResponse, Timestamp, UnlockRequest,
    UnlockResponse,
};
pub use rpc::{Code, Status};

/// Serde adapter for proto3 JSON 64-bit integers.
///
/// Serializes as a decimal string and accepts either a string or a bare
/// number when deserializing, since some encoders emit numbers.
pub mod u64_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        struct U64Visitor;

        impl Visitor<'_> for U64Visitor {
            type Value = u64;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an unsigned 64-bit integer or its decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
                u64::try_from(v).map_err(|_| E::custom("negative value for u64 field"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(U64Visitor)
    }
}
