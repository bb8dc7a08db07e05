//! RPC status envelope returned by every backend call.

use serde::{Deserialize, Serialize};

/// Backend RPC status code, serialized by its proto enum name.
///
/// Unknown names deserialize to [`Code::Unrecognized`] so a newer backend
/// cannot make a response unparseable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Code {
    #[default]
    #[serde(rename = "CODE_INVALID")]
    Invalid,
    #[serde(rename = "CODE_OK")]
    Ok,
    #[serde(rename = "CODE_CANCELLED")]
    Cancelled,
    #[serde(rename = "CODE_UNKNOWN")]
    Unknown,
    #[serde(rename = "CODE_INVALID_ARGUMENT")]
    InvalidArgument,
    #[serde(rename = "CODE_DEADLINE_EXCEEDED")]
    DeadlineExceeded,
    #[serde(rename = "CODE_NOT_FOUND")]
    NotFound,
    #[serde(rename = "CODE_ALREADY_EXISTS")]
    AlreadyExists,
    #[serde(rename = "CODE_PERMISSION_DENIED")]
    PermissionDenied,
    #[serde(rename = "CODE_UNAUTHENTICATED")]
    Unauthenticated,
    #[serde(rename = "CODE_RESOURCE_EXHAUSTED")]
    ResourceExhausted,
    #[serde(rename = "CODE_FAILED_PRECONDITION")]
    FailedPrecondition,
    #[serde(rename = "CODE_ABORTED")]
    Aborted,
    #[serde(rename = "CODE_OUT_OF_RANGE")]
    OutOfRange,
    #[serde(rename = "CODE_UNIMPLEMENTED")]
    Unimplemented,
    #[serde(rename = "CODE_INTERNAL")]
    Internal,
    #[serde(rename = "CODE_UNAVAILABLE")]
    Unavailable,
    #[serde(rename = "CODE_DATA_LOSS")]
    DataLoss,
    #[serde(rename = "CODE_LOCKED")]
    Locked,
    #[serde(other, rename = "CODE_UNRECOGNIZED")]
    Unrecognized,
}

impl Code {
    /// Returns the proto enum name, used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "CODE_INVALID",
            Self::Ok => "CODE_OK",
            Self::Cancelled => "CODE_CANCELLED",
            Self::Unknown => "CODE_UNKNOWN",
            Self::InvalidArgument => "CODE_INVALID_ARGUMENT",
            Self::DeadlineExceeded => "CODE_DEADLINE_EXCEEDED",
            Self::NotFound => "CODE_NOT_FOUND",
            Self::AlreadyExists => "CODE_ALREADY_EXISTS",
            Self::PermissionDenied => "CODE_PERMISSION_DENIED",
            Self::Unauthenticated => "CODE_UNAUTHENTICATED",
            Self::ResourceExhausted => "CODE_RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "CODE_FAILED_PRECONDITION",
            Self::Aborted => "CODE_ABORTED",
            Self::OutOfRange => "CODE_OUT_OF_RANGE",
            Self::Unimplemented => "CODE_UNIMPLEMENTED",
            Self::Internal => "CODE_INTERNAL",
            Self::Unavailable => "CODE_UNAVAILABLE",
            Self::DataLoss => "CODE_DATA_LOSS",
            Self::Locked => "CODE_LOCKED",
            Self::Unrecognized => "CODE_UNRECOGNIZED",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status attached to every backend response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
    pub code: Code,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub trace: String,
}

impl Status {
    /// A bare status with the given code and no message.
    #[must_use]
    pub fn new(code: Code) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// A status with the given code and message.
    #[must_use]
    pub fn with_message(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace: String::new(),
        }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::new(Code::Ok)
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }
}
