//! Argon2id password hashing
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...`) so the parameters travel with
//! each hash; changing the configured cost only affects new hashes.

use crate::core::error::CatalogError;
use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Hashes and verifies passwords off the async executor
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    /// Hash checked against when the account does not exist, so unknown
    /// usernames cost the same as wrong passwords
    decoy_hash: String,
}

impl PasswordService {
    pub fn new(cost: HashCost) -> anyhow::Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid Argon2 parameters: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_hash = hash_with(&argon2, "decoy-password")
            .map_err(|e| anyhow::anyhow!("failed to prepare decoy hash: {}", e))?;

        Ok(Self { argon2, decoy_hash })
    }

    /// Produce a salted PHC hash of `password`
    pub async fn hash(&self, password: &str) -> Result<String, CatalogError> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_with(&argon2, &password))
            .await
            .map_err(|e| CatalogError::Fatal(format!("password hashing task failed: {}", e)))?
    }

    /// Check `password` against a stored PHC hash; unparsable hashes never match
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, CatalogError> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
            Ok(parsed) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
                false
            }
        })
        .await
        .map_err(|e| CatalogError::Fatal(format!("password verification task failed: {}", e)))
    }

    /// Burn one verification for a login attempt on an unknown account
    pub async fn verify_decoy(&self, password: &str) -> Result<(), CatalogError> {
        self.verify(password, &self.decoy_hash).await.map(|_| ())
    }
}

fn hash_with(argon2: &Argon2<'static>, password: &str) -> Result<String, CatalogError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| CatalogError::Fatal(format!("failed to generate salt: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CatalogError::Fatal(format!("failed to encode salt: {}", e)))?;

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CatalogError::Fatal(format!("failed to hash password: {}", e)))
}
