//! Symmetric encryption of backend credentials.
//!
//! AES-256-GCM with a key derived as SHA-256 of the shared secret. The
//! output is URL-safe base64 (no padding) of `nonce || ciphertext || tag`,
//! so it can sit inside a JWT claim and travel through query strings.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Failure inside the credential cipher.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("cipher key could not be initialized")]
    Key,
    #[error("random source unavailable")]
    RandomSource,
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext is not valid base64")]
    Encoding,
    #[error("ciphertext shorter than its nonce")]
    Truncated,
    #[error("ciphertext failed authentication")]
    Authentication,
    #[error("decrypted credential is not UTF-8")]
    Utf8,
}

/// AES-256-GCM cipher keyed by a shared secret.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

impl CredentialCipher {
    /// Derives the cipher key from `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Key`] if the cipher rejects the derived key.
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        let key = Sha256::digest(secret);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Key)?;
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RandomSource`] if no nonce can be drawn and
    /// [`CryptoError::Encrypt`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|_| CryptoError::RandomSource)?;

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Reverses [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Fails on malformed encoding, truncated input, a wrong key, any
    /// tampering with the ciphertext, or non-UTF-8 plaintext.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let raw = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|_| CryptoError::Encoding)?;
        if raw.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);

        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CryptoError::Authentication)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Utf8)
    }
}
