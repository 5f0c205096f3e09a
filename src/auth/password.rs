// Password hashing and verification service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::OnceLock;

use crate::auth::error::AuthError;

/// Argon2id cost parameters, fixed for the lifetime of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordParams {
    /// OWASP minimum Argon2id params: m=19456 KiB, t=2 iterations, p=1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Password service for hashing and verification
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Build the hasher once; invalid parameters are a configuration error
    pub fn new(params: PasswordParams) -> Result<Self, AuthError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::ConfigError(format!("invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password using Argon2id with a random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }

    /// Verify a password against a stored PHC hash
    ///
    /// Returns false for a mismatch and for hashes this service cannot parse
    /// or was not built to check.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Burn one verification's worth of work for an identity that does not exist,
    /// so unknown usernames take as long to reject as wrong passwords
    pub fn verify_dummy(&self, password: &str) {
        static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
        let hash = DUMMY_HASH.get_or_init(|| self.hash("inkwell-dummy-password").ok());
        if let Some(hash) = hash {
            let _ = self.verify(hash, password);
        }
    }
}
