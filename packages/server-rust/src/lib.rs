//! wopibridge server: a WOPI host that serves office editors from a CS3
//! storage backend.
//!
//! Two listeners share one [`app::AppContext`]: the launch surface, where the
//! backend asks for editor URLs, and the WOPI surface, where editors read,
//! write, and lock files using the session tokens minted at launch.

pub mod app;
pub mod auth;
pub mod config;
pub mod discovery;
pub mod gateway;
pub mod launch;
pub mod network;
pub mod wopi;

#[cfg(test)]
pub(crate) mod test_support;
