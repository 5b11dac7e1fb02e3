//! Account registration, authentication and role management

use crate::auth::password::PasswordService;
use crate::auth::policy::{Action, AuthorizationEngine, Principal, Resource};
use crate::core::entity::EntityKind;
use crate::core::error::{CatalogError, StorageError};
use crate::core::query::Predicate;
use crate::core::service::{Storage, StorageExt, WriteOp};
use crate::core::validation::FieldErrors;
use crate::entities::{Account, AccountChange, AccountProfile, Role};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Failed password attempts before an account is locked, unless configured
pub const DEFAULT_MAX_FAILED_LOGINS: u32 = 5;

/// Self-service sign-up request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(max = 50, message = "must not exceed 50 characters"))]
    pub username: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "must not exceed 100 characters"))]
    pub first_name: String,

    #[validate(length(max = 100, message = "must not exceed 100 characters"))]
    pub last_name: String,
}

impl Registration {
    fn validate_all(&self) -> Result<(), CatalogError> {
        FieldErrors::of(self)
            .not_blank("username", &self.username)
            .not_blank("email", &self.email)
            .not_blank("password", &self.password)
            .not_blank("first_name", &self.first_name)
            .not_blank("last_name", &self.last_name)
            .finish()
    }
}

/// Resolves usernames to stored accounts and keeps login bookkeeping
#[derive(Clone)]
pub struct IdentityDirectory {
    storage: Arc<dyn Storage>,
    passwords: PasswordService,
    policy: AuthorizationEngine,
    max_failed_logins: u32,
}

impl IdentityDirectory {
    pub fn new(storage: Arc<dyn Storage>, passwords: PasswordService) -> Self {
        Self {
            storage,
            passwords,
            policy: AuthorizationEngine::new(),
            max_failed_logins: DEFAULT_MAX_FAILED_LOGINS,
        }
    }

    pub fn with_max_failed_logins(mut self, max: u32) -> Self {
        self.max_failed_logins = max.max(1);
        self
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, CatalogError> {
        Ok(self
            .storage
            .find_one_as::<Account>(&Predicate::eq("username", username))
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, CatalogError> {
        Ok(self
            .storage
            .find_one_as::<Account>(&Predicate::eq("email", email))
            .await?)
    }

    /// Create a `READER` account; fails with `AlreadyExists` if the username or email is taken
    pub async fn register(&self, registration: Registration) -> Result<AccountProfile, CatalogError> {
        registration.validate_all()?;
        let email = registration.email.trim().to_lowercase();

        if self.find_by_username(&registration.username).await?.is_some() {
            return Err(CatalogError::already_exists("Username is already taken"));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(CatalogError::already_exists("Email is already registered"));
        }

        let hash = self.passwords.hash(&registration.password).await?;
        let account = Account::new(
            registration.username,
            email,
            hash,
            registration.first_name,
            registration.last_name,
        );
        let profile = account.profile();

        self.storage
            .commit(vec![WriteOp::insert(account)])
            .await
            .map_err(|err| match err.violated_constraint() {
                Some("account.username") => CatalogError::already_exists("Username is already taken"),
                Some("account.email") => CatalogError::already_exists("Email is already registered"),
                _ => err.into(),
            })?;

        tracing::info!(account_id = %profile.id, username = %profile.username, "account registered");
        Ok(profile)
    }

    /// Check a username/password pair
    ///
    /// Unknown users, wrong passwords, locked and inactive accounts all fail
    /// with the same `InvalidCredentials`. Login bookkeeping is applied by the
    /// backend to the stored account, so parallel attempts all count.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Account, CatalogError> {
        let Some(account) = self.find_by_username(username).await? else {
            self.passwords.verify_decoy(password).await?;
            tracing::warn!(username = %username, "login failed: unknown user");
            return Err(CatalogError::InvalidCredentials);
        };

        if !account.can_authenticate() {
            tracing::warn!(
                username = %username,
                locked = account.locked,
                active = account.active,
                "login refused for disabled account"
            );
            return Err(CatalogError::InvalidCredentials);
        }

        if !self.passwords.verify(password, &account.password_hash).await? {
            let change = AccountChange::LoginFailed {
                max_failures: self.max_failed_logins,
            };
            let stored = self.apply(account.id, change).await?;
            tracing::warn!(
                username = %username,
                attempts = stored.failed_login_attempts,
                locked = stored.locked,
                "login failed: wrong password"
            );
            return Err(CatalogError::InvalidCredentials);
        }

        let change = AccountChange::LoginSucceeded { at: Utc::now() };
        let account = match self.apply(account.id, change).await {
            Ok(account) => account,
            Err(CatalogError::InvalidCredentials) => {
                tracing::warn!(username = %username, "login refused: account locked during sign-in");
                return Err(CatalogError::InvalidCredentials);
            }
            Err(other) => return Err(other),
        };

        tracing::info!(account_id = %account.id, username = %username, "login succeeded");
        Ok(account)
    }

    /// Apply `change` to the stored account and return the result
    ///
    /// A change the account refuses surfaces as `InvalidCredentials`.
    async fn apply(&self, account_id: Uuid, change: AccountChange) -> Result<Account, CatalogError> {
        self.storage
            .commit(vec![WriteOp::UpdateAccount { account_id, change }])
            .await
            .map_err(|err| match err {
                StorageError::Conflict(_) => CatalogError::InvalidCredentials,
                StorageError::NotFound { kind, id } => CatalogError::not_found(kind, id),
                other => other.into(),
            })?;
        self.load(account_id).await
    }

    /// Turn a verified token subject into a principal
    pub async fn resolve_principal(&self, subject: &str) -> Result<Principal, CatalogError> {
        match self.find_by_username(subject).await? {
            Some(account) if account.can_authenticate() => Ok(Principal::from(&account)),
            _ => Err(CatalogError::InvalidCredentials),
        }
    }

    async fn load(&self, account_id: Uuid) -> Result<Account, CatalogError> {
        self.storage
            .load::<Account>(&account_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Account, account_id))
    }

    pub async fn profile(&self, account_id: Uuid) -> Result<AccountProfile, CatalogError> {
        Ok(self.load(account_id).await?.profile())
    }

    pub async fn grant_role(
        &self,
        actor: &Principal,
        account_id: Uuid,
        role: Role,
    ) -> Result<AccountProfile, CatalogError> {
        let account = self.load(account_id).await?;
        self.policy
            .require(actor, Action::ManageRoles, &Resource::Account(&account))?;

        let account = self.apply(account.id, AccountChange::GrantRole(role)).await?;
        tracing::info!(account_id = %account.id, role = %role, granted_by = %actor.username, "role granted");
        Ok(account.profile())
    }

    /// Remove a role; `READER` is permanent
    pub async fn revoke_role(
        &self,
        actor: &Principal,
        account_id: Uuid,
        role: Role,
    ) -> Result<AccountProfile, CatalogError> {
        let account = self.load(account_id).await?;
        self.policy
            .require(actor, Action::ManageRoles, &Resource::Account(&account))?;

        if role == Role::Reader {
            return Err(CatalogError::invalid_field("role", "READER cannot be revoked"));
        }
        let account = self.apply(account.id, AccountChange::RevokeRole(role)).await?;
        tracing::info!(account_id = %account.id, role = %role, revoked_by = %actor.username, "role revoked");
        Ok(account.profile())
    }

    /// Clear the lock and failed-attempt counter
    pub async fn unlock(&self, actor: &Principal, account_id: Uuid) -> Result<AccountProfile, CatalogError> {
        let account = self.load(account_id).await?;
        self.policy
            .require(actor, Action::ManageRoles, &Resource::Account(&account))?;

        let account = self.apply(account.id, AccountChange::Unlock).await?;
        tracing::info!(account_id = %account.id, unlocked_by = %actor.username, "account unlocked");
        Ok(account.profile())
    }

    /// Make sure an `ADMIN` account exists, registering it on first start
    ///
    /// An existing account with the same username is promoted instead; its
    /// password is left untouched.
    pub async fn ensure_admin(&self, registration: Registration) -> Result<AccountProfile, CatalogError> {
        let account = match self.find_by_username(&registration.username).await? {
            Some(account) => account,
            None => {
                let profile = self.register(registration).await?;
                self.load(profile.id).await?
            }
        };
        if account.has_role(Role::Admin) {
            return Ok(account.profile());
        }

        let account = self.apply(account.id, AccountChange::GrantRole(Role::Admin)).await?;
        tracing::info!(account_id = %account.id, username = %account.username, "administrator provisioned");
        Ok(account.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::HashCost;
    use crate::storage::InMemoryStorage;

    fn directory() -> IdentityDirectory {
        let passwords = PasswordService::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        IdentityDirectory::new(Arc::new(InMemoryStorage::new()), passwords)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: "secret1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn test_register_lowercases_email() {
        let dir = directory();
        let profile = dir.register(registration("ada", "Ada@Example.COM")).await.unwrap();

        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.roles, [Role::Reader].into());
    }

    #[tokio::test]
    async fn test_register_collects_field_errors() {
        let dir = directory();
        let mut bad = registration(" ", "nope");
        bad.password = "123".into();

        match dir.register(bad).await {
            Err(CatalogError::ValidationFailed(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"username"));
                assert!(fields.contains(&"email"));
                assert!(fields.contains(&"password"));
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_success_resets_counter() {
        let dir = directory();
        dir.register(registration("ada", "ada@example.com")).await.unwrap();

        assert!(dir.authenticate("ada", "wrong!!").await.is_err());
        let account = dir.authenticate("ada", "secret1").await.unwrap();

        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_reader_rejected() {
        let dir = directory();
        let profile = dir.register(registration("ada", "ada@example.com")).await.unwrap();
        let admin = Principal {
            account_id: Uuid::new_v4(),
            username: "root".into(),
            roles: [Role::Reader, Role::Admin].into(),
        };

        let result = dir.revoke_role(&admin, profile.id, Role::Reader).await;
        assert!(matches!(result, Err(CatalogError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let dir = directory();
        let first = dir.ensure_admin(registration("root", "root@example.com")).await.unwrap();
        let second = dir.ensure_admin(registration("root", "root@example.com")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.roles, [Role::Reader, Role::Admin].into());
    }
}
