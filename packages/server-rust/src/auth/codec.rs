//! Session token issuing and verification.
//!
//! A session token is an HS256 JWT with two claims: `WopiContext` (the
//! routing context, with the backend credential already encrypted) and
//! `exp`. The same shared secret keys both the JWT signature and the
//! credential cipher.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use wopibridge_core::WopiContext;

use super::cipher::{CredentialCipher, CryptoError};

/// Failure issuing or verifying a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("token signed with an unexpected algorithm")]
    Algorithm,
    #[error("token signature invalid")]
    Signature,
    #[error("token malformed: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidAlgorithm => Self::Algorithm,
            ErrorKind::InvalidSignature => Self::Signature,
            _ => Self::Malformed(err),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(rename = "WopiContext")]
    wopi_context: WopiContext,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Issues and verifies session tokens and seals backend credentials.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: CredentialCipher,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Builds a codec keyed by `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Key`] if the cipher cannot be initialized.
    pub fn new(secret: &str) -> Result<Self, CryptoError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            cipher: CredentialCipher::new(secret.as_bytes())?,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Encrypts a backend credential for embedding in a session token.
    ///
    /// # Errors
    ///
    /// See [`CredentialCipher::encrypt`].
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        self.cipher.encrypt(plaintext)
    }

    /// Decrypts a credential taken from a verified session token.
    ///
    /// # Errors
    ///
    /// See [`CredentialCipher::decrypt`].
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        self.cipher.decrypt(ciphertext)
    }

    /// Signs `context` into a session token expiring at `expires_at`
    /// (seconds since the Unix epoch).
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Sign`] if the claims cannot be encoded.
    pub fn issue(&self, context: &WopiContext, expires_at: i64) -> Result<String, TokenError> {
        let claims = SessionClaims {
            wopi_context: context.clone(),
            exp: expires_at,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Sign)
    }

    /// Verifies a session token and returns its routing context.
    ///
    /// Only HS256 is accepted; the expiry is checked without leeway.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<WopiContext, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims.wopi_context)
    }
}

/// Reads the `exp` claim of a backend credential without verifying it.
///
/// The bridge cannot verify backend-issued tokens; the expiry is only used
/// so the session token never outlives the credential it carries.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] if `token` is not a JWT with a numeric
/// `exp` claim.
pub fn credential_expiry(token: &str) -> Result<i64, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims(&["exp"]);

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(TokenError::Malformed)?;
    Ok(data.claims.exp)
}
