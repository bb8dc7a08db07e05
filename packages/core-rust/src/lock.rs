//! WOPI lock constants and lock-id validation.

use std::time::Duration;

/// How long a WOPI lock lasts after acquisition.
///
/// Editors refresh their locks before this elapses.
pub const LOCK_DURATION: Duration = Duration::from_secs(30 * 60);

/// Longest lock id accepted, matching `SupportsExtendedLockLength`.
pub const MAX_LOCK_ID_LEN: usize = 1024;

/// Why a client-supplied lock id was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockIdError {
    #[error("lock id is missing")]
    Missing,
    #[error("lock id exceeds {MAX_LOCK_ID_LEN} characters")]
    TooLong,
}

/// Validates a lock id taken from the `X-WOPI-Lock` header.
///
/// # Errors
///
/// Returns [`LockIdError::Missing`] for an absent or empty id and
/// [`LockIdError::TooLong`] for ids over [`MAX_LOCK_ID_LEN`] characters.
pub fn validate_lock_id(lock_id: Option<&str>) -> Result<&str, LockIdError> {
    match lock_id {
        None | Some("") => Err(LockIdError::Missing),
        Some(id) if id.chars().count() > MAX_LOCK_ID_LEN => Err(LockIdError::TooLong),
        Some(id) => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_duration_is_thirty_minutes() {
        assert_eq!(LOCK_DURATION.as_secs(), 1800);
    }

    #[test]
    fn missing_and_empty_rejected() {
        assert_eq!(validate_lock_id(None), Err(LockIdError::Missing));
        assert_eq!(validate_lock_id(Some("")), Err(LockIdError::Missing));
    }

    #[test]
    fn length_bound_is_inclusive() {
        let max = "a".repeat(MAX_LOCK_ID_LEN);
        assert_eq!(validate_lock_id(Some(&max)), Ok(max.as_str()));
        let over = "a".repeat(MAX_LOCK_ID_LEN + 1);
        assert_eq!(validate_lock_id(Some(&over)), Err(LockIdError::TooLong));
    }

    #[test]
    fn opaque_ids_pass_through() {
        let id = r#"{"S":"session","F":4}"#;
        assert_eq!(validate_lock_id(Some(id)), Ok(id));
    }
}
