//! The WOPI REST surface consumed by office editors.

pub mod contents;
pub mod error;
pub mod file_info;
pub mod locks;
pub mod operation;
pub mod routes;

pub use error::WopiError;
pub use operation::{WopiOperation, LOCK_HEADER, OVERRIDE_HEADER};
pub use routes::router;
