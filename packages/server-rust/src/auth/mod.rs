//! Session tokens, credential encryption, and WOPI request authentication.

pub mod cipher;
pub mod codec;
pub mod session;

pub use cipher::{CredentialCipher, CryptoError};
pub use codec::{credential_expiry, TokenCodec, TokenError};
pub use session::WopiSession;
