//! Credential store
//!
//! Password hashing and verification behind a small trait so the rest of
//! the crate never touches the hashing algorithm directly.

use anyhow::Result;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use rand::rngs::OsRng;

use crate::config::AuthConfig;

pub trait CredentialStore: Send + Sync {
    /// Produce a salted digest of `password`
    fn hash(&self, password: &str) -> Result<String>;

    /// Check `password` against `digest`; malformed digests never verify
    fn verify(&self, digest: &str, password: &str) -> bool;

    /// Spend the same effort as `verify` when there is no digest to check.
    ///
    /// Keeps "unknown account" and "wrong password" indistinguishable by timing.
    fn verify_absent(&self, password: &str);
}

/// Argon2id credential store
pub struct Argon2Credentials {
    params: Params,
    dummy_digest: OnceCell<String>,
}

impl Argon2Credentials {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            dummy_digest: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
            1,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid password hashing parameters: {}", e))?;
        Ok(Self::new(params))
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Credentials {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl CredentialStore for Argon2Credentials {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    fn verify(&self, digest: &str, password: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(digest) else {
            return false;
        };
        // Parameters embedded in the digest take precedence over our own.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn verify_absent(&self, password: &str) {
        let digest = self
            .dummy_digest
            .get_or_try_init(|| self.hash("appzero-absent-account"));
        if let Ok(digest) = digest {
            let _ = self.verify(digest, password);
        }
    }
}
