// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Encryption of stored location credentials.
//!
//! Passwords are sealed with XChaCha20-Poly1305 before they reach the
//! database and stored as `enc:v1:<hex nonce>:<hex ciphertext>`. The 256-bit
//! key lives in its own file next to the database, created on first use.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use zeroize::Zeroize;

use crate::error::{Error, Result};

const PREFIX: &str = "enc:v1:";
const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 24;

/// A secret string: redacted in `Debug`, zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Returns the plaintext. Keep the borrow short.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Seals and opens stored credentials with a local key.
pub struct CredentialCipher {
    cipher: XChaCha20Poly1305,
}

impl CredentialCipher {
    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        let key = Key::from(key);
        CredentialCipher {
            cipher: XChaCha20Poly1305::new(&key),
        }
    }

    /// A cipher with a fresh random key that is never written anywhere.
    pub fn ephemeral() -> Self {
        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        CredentialCipher {
            cipher: XChaCha20Poly1305::new(&key),
        }
    }

    /// Loads the hex-encoded key at `path`, generating it if the file is absent.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let text = fs::read_to_string(path)?;
            let bytes = hex::decode(text.trim())
                .map_err(|e| Error::Credential(format!("invalid key file {}: {e}", path.display())))?;
            let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
                Error::Credential(format!("key file {} must hold {KEY_SIZE} bytes", path.display()))
            })?;
            return Ok(Self::from_key(key));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let key = XChaCha20Poly1305::generate_key(&mut OsRng);
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        writeln!(file, "{}", hex::encode(key.as_slice()))?;
        file.sync_all()?;
        tracing::info!(path = %path.display(), "generated credential key");

        Ok(CredentialCipher {
            cipher: XChaCha20Poly1305::new(&key),
        })
    }

    /// Seals a secret for storage.
    pub fn encrypt(&self, secret: &Secret) -> Result<String> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, secret.expose().as_bytes())
            .map_err(|_| Error::Credential("encryption failed".to_string()))?;
        Ok(format!(
            "{PREFIX}{}:{}",
            hex::encode(nonce.as_slice()),
            hex::encode(ciphertext)
        ))
    }

    /// Opens a stored value produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, stored: &str) -> Result<Secret> {
        let body = stored
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::Credential("stored password is not encrypted".to_string()))?;
        let (nonce_hex, ciphertext_hex) = body
            .split_once(':')
            .ok_or_else(|| Error::Credential("malformed stored password".to_string()))?;

        let nonce_bytes = hex::decode(nonce_hex)
            .map_err(|_| Error::Credential("malformed password nonce".to_string()))?;
        if nonce_bytes.len() != NONCE_SIZE {
            return Err(Error::Credential("malformed password nonce".to_string()));
        }
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|_| Error::Credential("malformed password ciphertext".to_string()))?;

        let mut plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| {
                Error::Credential("cannot decrypt stored password (wrong key file?)".to_string())
            })?;
        let text = String::from_utf8(plaintext.clone())
            .map_err(|_| Error::Credential("stored password is not UTF-8".to_string()));
        plaintext.zeroize();
        Ok(Secret(text?))
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
