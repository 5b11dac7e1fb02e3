//! Configuration loading and management

use crate::auth::directory::{DEFAULT_MAX_FAILED_LOGINS, Registration};
use crate::auth::password::HashCost;
use crate::auth::session::SessionTtl;
use crate::auth::token::MIN_KEY_LEN;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable that overrides `auth.token_secret`
pub const TOKEN_SECRET_ENV: &str = "BOOKREVIEW_TOKEN_SECRET";

/// Token and login settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing key, at least 32 bytes
    pub token_secret: String,

    pub access_token_ttl_secs: u64,

    pub refresh_token_ttl_secs: u64,

    /// Failed password attempts before the account is locked
    pub max_failed_logins: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let ttl = SessionTtl::default();
        Self {
            token_secret: String::new(),
            access_token_ttl_secs: ttl.access.as_secs(),
            refresh_token_ttl_secs: ttl.refresh.as_secs(),
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
        }
    }
}

/// Argon2id cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        let cost = HashCost::default();
        Self {
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Administrator provisioned at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminConfig {
    pub fn registration(&self) -> Registration {
        Registration {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            first_name: "Catalog".to_string(),
            last_name: "Administrator".to_string(),
        }
    }
}

/// Complete configuration of the catalog service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub auth: AuthConfig,
    pub password: PasswordConfig,
    pub server: ServerConfig,
    pub admin: Option<AdminConfig>,
}

impl CatalogConfig {
    /// Load configuration from a YAML file, applying environment overrides
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string, applying environment overrides
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Some(secret) = std::env::var(TOKEN_SECRET_ENV).ok().filter(|s| !s.is_empty()) {
            self.auth.token_secret = secret;
        }
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.len() < MIN_KEY_LEN {
            bail!(
                "auth.token_secret must be at least {} bytes (set it in the file or via {})",
                MIN_KEY_LEN,
                TOKEN_SECRET_ENV
            );
        }
        if self.auth.access_token_ttl_secs == 0 || self.auth.refresh_token_ttl_secs == 0 {
            bail!("token lifetimes must be positive");
        }
        if self.auth.refresh_token_ttl_secs < self.auth.access_token_ttl_secs {
            bail!("auth.refresh_token_ttl_secs must not be shorter than the access token lifetime");
        }
        if self.auth.max_failed_logins == 0 {
            bail!("auth.max_failed_logins must be at least 1");
        }
        if self.password.iterations == 0 || self.password.parallelism == 0 {
            bail!("password.iterations and password.parallelism must be at least 1");
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> SessionTtl {
        SessionTtl {
            access: Duration::from_secs(self.auth.access_token_ttl_secs),
            refresh: Duration::from_secs(self.auth.refresh_token_ttl_secs),
        }
    }

    pub fn hash_cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.password.memory_kib,
            iterations: self.password.iterations,
            parallelism: self.password.parallelism,
        }
    }
}
