//! wopibridge core: backend message schemas, WOPI session context, and the
//! `CheckFileInfo` schema. Contains no I/O.

pub mod context;
pub mod fileinfo;
pub mod hash;
pub mod lock;
pub mod messages;

pub use context::WopiContext;
pub use fileinfo::FileInfo;
pub use hash::file_ref;
pub use lock::{validate_lock_id, LockIdError, LOCK_DURATION, MAX_LOCK_ID_LEN};
