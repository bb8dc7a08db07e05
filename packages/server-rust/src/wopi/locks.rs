//! WOPI lock operations on top of backend locks.
//!
//! The bridge keeps no lock state of its own; every decision is made from
//! backend responses. Locks are write locks owned by the configured lock
//! name and expire [`LOCK_DURATION`] after they are set.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};
use wopibridge_core::messages::{Code, Lock, LockType, Reference, Timestamp};
use wopibridge_core::LOCK_DURATION;

use super::WopiError;
use crate::gateway::Gateway;

/// Result of a Lock request that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock was newly acquired.
    Acquired,
    /// The same lock id was already held.
    AlreadyHeld,
}

/// Lock operations for one file, on behalf of one session.
pub struct FileLocks<'a> {
    gateway: &'a dyn Gateway,
    token: &'a str,
    reference: &'a Reference,
    file_ref: &'a str,
    owner: &'a str,
}

fn expiry_from_now() -> Timestamp {
    let at = SystemTime::now()
        .checked_add(LOCK_DURATION)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .unwrap_or_default();
    Timestamp {
        seconds: at.as_secs(),
        nanos: at.subsec_nanos(),
    }
}

impl<'a> FileLocks<'a> {
    #[must_use]
    pub fn new(
        gateway: &'a dyn Gateway,
        token: &'a str,
        reference: &'a Reference,
        file_ref: &'a str,
        owner: &'a str,
    ) -> Self {
        Self {
            gateway,
            token,
            reference,
            file_ref,
            owner,
        }
    }

    fn lock_with_id(&self, lock_id: &str) -> Lock {
        Lock {
            lock_id: lock_id.to_string(),
            lock_type: LockType::Write,
            user: None,
            app_name: self.owner.to_string(),
            expiration: Some(expiry_from_now()),
        }
    }

    /// The id of the current lock, empty when the file is unlocked.
    ///
    /// A backend `NOT_FOUND` is reported as unlocked.
    ///
    /// # Errors
    ///
    /// [`WopiError::Internal`] on transport failures and other non-OK
    /// statuses.
    pub async fn get_lock(&self) -> Result<String, WopiError> {
        let resp = self
            .gateway
            .get_lock(self.token, self.reference)
            .await
            .map_err(|err| {
                error!(file_ref = self.file_ref, error = %err, "GetLock failed");
                WopiError::Internal
            })?;

        match resp.status.code {
            Code::Ok => Ok(resp.lock.map(|l| l.lock_id).unwrap_or_default()),
            Code::NotFound => {
                debug!(file_ref = self.file_ref, "GetLock: backend reports no lock");
                Ok(String::new())
            }
            code => {
                error!(
                    file_ref = self.file_ref,
                    status = %code,
                    status_msg = %resp.status.message,
                    "GetLock failed"
                );
                Err(WopiError::Internal)
            }
        }
    }

    /// Acquires the lock `lock_id`.
    ///
    /// When the backend refuses because the file is already locked, the
    /// current lock decides: the same id succeeds, another id is a conflict,
    /// and no lock at all is reported as not found.
    ///
    /// # Errors
    ///
    /// [`WopiError::Conflict`], [`WopiError::NotFound`], or
    /// [`WopiError::Internal`].
    pub async fn lock(&self, lock_id: &str) -> Result<LockOutcome, WopiError> {
        let resp = self
            .gateway
            .set_lock(self.token, self.reference, self.lock_with_id(lock_id))
            .await
            .map_err(|err| {
                error!(file_ref = self.file_ref, lock_id, error = %err, "SetLock failed");
                WopiError::Internal
            })?;

        match resp.status.code {
            Code::Ok => {
                info!(file_ref = self.file_ref, lock_id, "lock acquired");
                Ok(LockOutcome::Acquired)
            }
            Code::FailedPrecondition | Code::Aborted => {
                let current = self.get_lock().await?;
                if current.is_empty() {
                    warn!(file_ref = self.file_ref, lock_id, "SetLock refused but no lock is held");
                    Err(WopiError::NotFound)
                } else if current == lock_id {
                    debug!(file_ref = self.file_ref, lock_id, "lock already held");
                    Ok(LockOutcome::AlreadyHeld)
                } else {
                    info!(
                        file_ref = self.file_ref,
                        lock_id,
                        current_lock = %current,
                        "lock conflict"
                    );
                    Err(WopiError::Conflict {
                        current_lock: current,
                    })
                }
            }
            code => {
                error!(
                    file_ref = self.file_ref,
                    lock_id,
                    status = %code,
                    status_msg = %resp.status.message,
                    "SetLock failed"
                );
                Err(WopiError::Internal)
            }
        }
    }

    /// Releases the lock `lock_id`.
    ///
    /// # Errors
    ///
    /// [`WopiError::Internal`] for any failure, including a lock mismatch.
    pub async fn unlock(&self, lock_id: &str) -> Result<(), WopiError> {
        let resp = self
            .gateway
            .unlock(self.token, self.reference, self.lock_with_id(lock_id))
            .await
            .map_err(|err| {
                error!(file_ref = self.file_ref, lock_id, error = %err, "Unlock failed");
                WopiError::Internal
            })?;

        if resp.status.is_ok() {
            info!(file_ref = self.file_ref, lock_id, "lock released");
            Ok(())
        } else {
            error!(
                file_ref = self.file_ref,
                lock_id,
                status = %resp.status.code,
                status_msg = %resp.status.message,
                "Unlock failed"
            );
            Err(WopiError::Internal)
        }
    }
}
