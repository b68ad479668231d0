//! Credential Vault: encryption at rest for provider API keys.
//!
//! Uses AES-256-GCM under a key derived once from the configured secret and a
//! fixed application salt (Argon2id). Every encryption draws a fresh random
//! nonce and stores it next to the ciphertext as
//! `base64(nonce):base64(ciphertext)`, so decryption needs nothing but the
//! vault key.
//!
//! The vault is built once at startup and shared; it holds no mutable state.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;
use tracing::debug;

/// Application salt for key derivation.
const KEY_SALT: &[u8] = b"outreach.credential-vault.v1";

/// AES-GCM nonce size (96 bits).
const NONCE_SIZE: usize = 12;

/// Separates the nonce from the ciphertext.
const SEPARATOR: char = ':';

/// Errors from the Credential Vault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The vault key could not be derived from the secret.
    #[error("Failed to derive vault key: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Input was malformed, tampered with or encrypted under another key.
    #[error("Decryption failed: {0}")]
    Decryption(String),
}

/// Result type for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// Symmetric encryption for credentials at rest.
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    /// Derives the vault key from `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty or key derivation fails.
    pub fn new(secret: &str) -> VaultResult<Self> {
        if secret.is_empty() {
            return Err(VaultError::KeyDerivation("secret must not be empty".into()));
        }

        let key = derive_key(secret)?;
        let cipher = Aes256Gcm::new(&key.into());
        debug!("Initialized credential vault");
        Ok(Self { cipher })
    }

    /// Encrypts `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Encryption`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

        Ok(format!(
            "{}{SEPARATOR}{}",
            BASE64.encode(nonce),
            BASE64.encode(ciphertext)
        ))
    }

    /// Decrypts a value produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Decryption`] if the value is malformed, was
    /// modified, or was encrypted under a different key.
    pub fn decrypt(&self, encrypted: &str) -> VaultResult<String> {
        let (nonce_part, cipher_part) = encrypted
            .split_once(SEPARATOR)
            .ok_or_else(|| VaultError::Decryption("missing nonce separator".into()))?;

        let nonce_bytes = BASE64
            .decode(nonce_part)
            .map_err(|e| VaultError::Decryption(format!("invalid nonce encoding: {e}")))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(VaultError::Decryption(format!(
                "nonce must be {NONCE_SIZE} bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let ciphertext = BASE64
            .decode(cipher_part)
            .map_err(|e| VaultError::Decryption(format!("invalid ciphertext encoding: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| {
                VaultError::Decryption("authentication failed (wrong key or corrupted data)".into())
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| VaultError::Decryption(format!("plaintext is not valid UTF-8: {e}")))
    }
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

/// Argon2id with the OWASP baseline parameters (19 MiB, 2 passes).
fn derive_key(secret: &str) -> VaultResult<[u8; 32]> {
    let params = Params::new(19 * 1024, 2, 1, Some(32))
        .map_err(|e| VaultError::KeyDerivation(format!("invalid Argon2 parameters: {e}")))?;

    let mut key = [0u8; 32];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(secret.as_bytes(), KEY_SALT, &mut key)
        .map_err(|e| VaultError::KeyDerivation(format!("Argon2 key derivation failed: {e}")))?;

    Ok(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_support::{other_vault, vault};

    #[test]
    fn round_trip() {
        let encrypted = vault().encrypt("SG.abc123").unwrap();
        assert_ne!(encrypted, "SG.abc123");
        assert_eq!(vault().decrypt(&encrypted).unwrap(), "SG.abc123");
    }

    #[test]
    fn empty_string_round_trips() {
        let encrypted = vault().encrypt("").unwrap();
        assert_eq!(vault().decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn every_encryption_uses_a_fresh_nonce() {
        let first = vault().encrypt("same key").unwrap();
        let second = vault().encrypt("same key").unwrap();

        assert_ne!(first, second);
        let first_nonce = first.split_once(SEPARATOR).unwrap().0;
        let second_nonce = second.split_once(SEPARATOR).unwrap().0;
        assert_ne!(first_nonce, second_nonce);
        assert_eq!(BASE64.decode(first_nonce).unwrap().len(), NONCE_SIZE);
    }

    #[test]
    fn same_secret_derives_same_key() {
        let encrypted = vault().encrypt("portable").unwrap();
        let rebuilt = CredentialVault::new(crate::test_support::VAULT_SECRET).unwrap();
        assert_eq!(rebuilt.decrypt(&encrypted).unwrap(), "portable");
    }

    #[test]
    fn different_key_fails_to_decrypt() {
        let encrypted = vault().encrypt("SG.abc123").unwrap();
        let err = other_vault().decrypt(&encrypted).unwrap_err();
        assert!(matches!(err, VaultError::Decryption(_)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let encrypted = vault().encrypt("SG.abc123").unwrap();
        let (nonce, cipher) = encrypted.split_once(SEPARATOR).unwrap();
        let mut bytes = BASE64.decode(cipher).unwrap();
        bytes[0] ^= 0xff;
        let tampered = format!("{nonce}{SEPARATOR}{}", BASE64.encode(bytes));

        assert!(matches!(
            vault().decrypt(&tampered),
            Err(VaultError::Decryption(_))
        ));
    }

    #[test]
    fn malformed_input_fails() {
        for input in ["", "no-separator", "!!!:AAAA", "AAAA:AAAA", "AAAAAAAAAAAAAAAA:%%%"] {
            assert!(
                matches!(vault().decrypt(input), Err(VaultError::Decryption(_))),
                "expected decryption error for {input:?}"
            );
        }
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            CredentialVault::new(""),
            Err(VaultError::KeyDerivation(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        assert_eq!(format!("{:?}", vault()), "CredentialVault { .. }");
    }

    proptest! {
        #[test]
        fn decrypt_inverts_encrypt(plaintext in any::<String>()) {
            let encrypted = vault().encrypt(&plaintext).unwrap();
            prop_assert_eq!(vault().decrypt(&encrypted).unwrap(), plaintext);
        }
    }
}
