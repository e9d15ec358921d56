//! Master password digests using Argon2id.

use argon2::{Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that can occur while hashing or checking the master password.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid base64 encoding")]
    InvalidBase64,
    #[error("Invalid salt length")]
    InvalidSaltLength,
    #[error("Key derivation failed")]
    KeyDerivationFailed,
}

/// A stored master password digest, base64 encoded for the data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterDigest {
    pub salt: String,
    pub hash: String,
}

/// Hashes and verifies master passwords.
pub struct MasterCrypto {
    // Argon2id parameters (tuned for desktop use)
    argon2_time_cost: u32,
    argon2_memory_cost: u32,
    argon2_parallelism: u32,
    argon2_hash_len: usize,
    argon2_salt_len: usize,
}

impl Default for MasterCrypto {
    fn default() -> Self {
        Self {
            argon2_time_cost: 2,
            argon2_memory_cost: 19456, // 19 MiB
            argon2_parallelism: 1,
            argon2_hash_len: 32,
            argon2_salt_len: 16,
        }
    }
}

impl MasterCrypto {
    /// Create a new MasterCrypto instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new random salt.
    pub fn generate_salt(&self) -> Vec<u8> {
        let mut salt = vec![0u8; self.argon2_salt_len];
        OsRng.fill_bytes(&mut salt);
        salt
    }

    /// Derive a digest from password and salt.
    /// The returned bytes are zeroed on drop.
    pub fn derive(&self, password: &str, salt: &[u8]) -> Result<DerivedKey, CryptoError> {
        if salt.len() != self.argon2_salt_len {
            return Err(CryptoError::InvalidSaltLength);
        }

        let params = Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            Some(self.argon2_hash_len),
        )
        .map_err(|_| CryptoError::KeyDerivationFailed)?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

        let mut output = vec![0u8; self.argon2_hash_len];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut output)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;

        Ok(DerivedKey(output))
    }

    /// Hash a new master password with a fresh salt.
    pub fn hash(&self, password: &str) -> Result<MasterDigest, CryptoError> {
        let salt = self.generate_salt();
        let key = self.derive(password, &salt)?;
        Ok(MasterDigest {
            salt: STANDARD.encode(&salt),
            hash: STANDARD.encode(key.as_bytes()),
        })
    }

    /// Check a candidate password against a stored digest.
    pub fn verify(&self, password: &str, digest: &MasterDigest) -> Result<bool, CryptoError> {
        let salt = STANDARD
            .decode(&digest.salt)
            .map_err(|_| CryptoError::InvalidBase64)?;
        let mut expected = STANDARD
            .decode(&digest.hash)
            .map_err(|_| CryptoError::InvalidBase64)?;

        let candidate = self.derive(password, &salt)?;
        let matches: bool = candidate.as_bytes().ct_eq(&expected).into();
        expected.zeroize();
        Ok(matches)
    }
}

/// Derived bytes that zero themselves on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey(Vec<u8>);

impl DerivedKey {
    /// Get a reference to the derived bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
