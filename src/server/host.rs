//! Transport-agnostic server host
//!
//! The host wires every service from a [`CatalogConfig`] and a storage
//! backend. Exposures (currently REST) consume it to produce routers.

use crate::auth::directory::IdentityDirectory;
use crate::auth::password::PasswordService;
use crate::auth::session::SessionService;
use crate::auth::token::{Clock, CredentialService};
use crate::catalog::CatalogService;
use crate::config::CatalogConfig;
use crate::core::error::CatalogError;
use crate::core::service::Storage;
use crate::entities::AccountProfile;
use anyhow::Result;
use std::sync::Arc;

/// Services shared by every request
#[derive(Clone)]
pub struct ServerHost {
    pub catalog: CatalogService,
    pub sessions: SessionService,
}

impl ServerHost {
    /// Validate `config` and build the services on top of `storage`
    pub fn new(config: &CatalogConfig, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let passwords = PasswordService::new(config.hash_cost())?;
        let credentials = CredentialService::new(config.auth.token_secret.as_bytes(), clock)?;
        let directory = IdentityDirectory::new(storage.clone(), passwords)
            .with_max_failed_logins(config.auth.max_failed_logins);

        Ok(Self {
            catalog: CatalogService::new(storage.clone()),
            sessions: SessionService::new(storage, directory, credentials, config.session_ttl()),
        })
    }

    pub fn directory(&self) -> &IdentityDirectory {
        self.sessions.directory()
    }

    /// Provision the configured administrator, if any
    pub async fn provision_admin(&self, config: &CatalogConfig) -> Result<Option<AccountProfile>, CatalogError> {
        match &config.admin {
            Some(admin) => self.directory().ensure_admin(admin.registration()).await.map(Some),
            None => Ok(None),
        }
    }
}
