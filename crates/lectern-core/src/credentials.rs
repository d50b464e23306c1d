//! Credential hashing and verification using Argon2id.
//!
//! Profiles store a PHC string; the parameters used to hash travel inside it,
//! so verification never needs the hasher that produced it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::profile::UserProfile;

/// Email/password pair presented with a request.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Check the password against the profile's stored hash.
    /// A malformed stored hash never verifies.
    pub fn verify(&self, profile: &UserProfile) -> bool {
        match PasswordHash::new(&profile.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(self.password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Produces Argon2id hashes for new profiles.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher {
    /// Hasher with explicit memory (KiB), iteration and parallelism costs.
    pub fn with_costs(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, ValidationError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| ValidationError::PasswordHash(e.to_string()))?;
        Ok(Self { params })
    }

    /// Cheapest parameters Argon2 accepts. Only for tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn insecure_fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST, 1, 1, None)
                .unwrap_or_else(|_| Params::default()),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, ValidationError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ValidationError::PasswordHash(e.to_string()))
    }
}
