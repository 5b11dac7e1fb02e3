//! Login, refresh-token rotation and logout

use crate::auth::directory::IdentityDirectory;
use crate::auth::policy::Principal;
use crate::auth::token::CredentialService;
use crate::core::error::{CatalogError, StorageError};
use crate::core::query::Predicate;
use crate::core::service::{Storage, StorageExt, WriteOp};
use crate::entities::{Account, RefreshToken};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Tokens handed to a client after login or refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Session lifetimes
#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(15 * 60),
            refresh: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn Storage>,
    directory: IdentityDirectory,
    credentials: CredentialService,
    ttl: SessionTtl,
}

impl SessionService {
    pub fn new(
        storage: Arc<dyn Storage>,
        directory: IdentityDirectory,
        credentials: CredentialService,
        ttl: SessionTtl,
    ) -> Self {
        Self {
            storage,
            directory,
            credentials,
            ttl,
        }
    }

    pub fn directory(&self) -> &IdentityDirectory {
        &self.directory
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    /// Authenticate and open a session
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens, CatalogError> {
        let account = self.directory.authenticate(username, password).await?;
        let refresh = self.new_refresh_token(&account)?;
        let refresh_token = refresh.token.clone();

        self.storage.commit(vec![WriteOp::insert(refresh)]).await?;
        self.tokens_for(&account, refresh_token)
    }

    /// Exchange a refresh token for a new pair; the presented token is revoked
    ///
    /// Presenting an already revoked token revokes every live token of its
    /// owner, since only a leaked copy can still be in circulation. Of two
    /// concurrent refreshes with the same token, the loser is treated the same.
    pub async fn refresh(&self, presented: &str) -> Result<SessionTokens, CatalogError> {
        let Some(current) = self
            .storage
            .find_one_as::<RefreshToken>(&Predicate::eq("token", presented))
            .await?
        else {
            return Err(CatalogError::TokenInvalid);
        };

        if current.revoked {
            return self.reject_reuse(current.account_id).await;
        }
        if !current.is_usable(self.credentials.clock().now()) {
            return Err(CatalogError::TokenExpired);
        }

        let account = self
            .storage
            .load::<Account>(&current.account_id)
            .await?
            .filter(Account::can_authenticate)
            .ok_or(CatalogError::InvalidCredentials)?;

        let next = self.new_refresh_token(&account)?;
        let next_token = next.token.clone();
        let rotated = self
            .storage
            .commit(vec![
                WriteOp::RevokeRefreshToken { token_id: current.id },
                WriteOp::insert(next),
            ])
            .await;
        match rotated {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => return self.reject_reuse(account.id).await,
            Err(err) => return Err(err.into()),
        }

        tracing::info!(account_id = %account.id, "session refreshed");
        self.tokens_for(&account, next_token)
    }

    /// Revoke a refresh token; unknown or already revoked tokens are ignored
    pub async fn logout(&self, presented: &str) -> Result<(), CatalogError> {
        let token = self
            .storage
            .find_one_as::<RefreshToken>(&Predicate::eq("token", presented))
            .await?;
        let Some(token) = token.filter(|token| !token.revoked) else {
            return Ok(());
        };

        match self
            .storage
            .commit(vec![WriteOp::RevokeRefreshToken { token_id: token.id }])
            .await
        {
            Ok(()) => {
                tracing::info!(account_id = %token.account_id, "session closed");
                Ok(())
            }
            Err(StorageError::Conflict(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolve a bearer access token to its principal
    pub async fn principal(&self, access_token: &str) -> Result<Principal, CatalogError> {
        let claims = self.credentials.verify(access_token)?;
        self.directory.resolve_principal(&claims.sub).await
    }

    async fn reject_reuse(&self, account_id: uuid::Uuid) -> Result<SessionTokens, CatalogError> {
        tracing::warn!(account_id = %account_id, "revoked refresh token presented");
        self.storage
            .commit(vec![WriteOp::RevokeAccountTokens { account_id }])
            .await?;
        Err(CatalogError::TokenInvalid)
    }

    fn new_refresh_token(&self, account: &Account) -> Result<RefreshToken, CatalogError> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| CatalogError::Fatal(format!("failed to generate refresh token: {}", e)))?;
        let ttl = ChronoDuration::from_std(self.ttl.refresh)
            .map_err(|e| CatalogError::Fatal(format!("refresh ttl out of range: {}", e)))?;
        let expires_at = self.credentials.clock().now() + ttl;

        Ok(RefreshToken::new(
            URL_SAFE_NO_PAD.encode(bytes),
            account.id,
            expires_at,
        ))
    }

    fn tokens_for(&self, account: &Account, refresh_token: String) -> Result<SessionTokens, CatalogError> {
        Ok(SessionTokens {
            access_token: self.credentials.issue(&account.username, self.ttl.access)?,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.access.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::directory::Registration;
    use crate::auth::password::{HashCost, PasswordService};
    use crate::auth::token::ManualClock;
    use crate::storage::InMemoryStorage;

    async fn sessions() -> (SessionService, Arc<ManualClock>) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let passwords = PasswordService::new(HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let directory = IdentityDirectory::new(storage.clone(), passwords);
        directory
            .register(Registration {
                username: "ada".into(),
                email: "ada@example.com".into(),
                password: "secret1".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            })
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::default());
        let credentials =
            CredentialService::new(b"0123456789abcdef0123456789abcdef", clock.clone()).unwrap();
        let service = SessionService::new(storage, directory, credentials, SessionTtl::default());
        (service, clock)
    }

    #[tokio::test]
    async fn test_login_issues_usable_access_token() {
        let (service, _) = sessions().await;
        let tokens = service.login("ada", "secret1").await.unwrap();

        let principal = service.principal(&tokens.access_token).await.unwrap();
        assert_eq!(principal.username, "ada");
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 900);
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let (service, _) = sessions().await;
        let first = service.login("ada", "secret1").await.unwrap();

        let second = service.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        let reuse = service.refresh(&first.refresh_token).await;
        assert!(matches!(reuse, Err(CatalogError::TokenInvalid)));

        // reuse revoked the whole family
        let after = service.refresh(&second.refresh_token).await;
        assert!(matches!(after, Err(CatalogError::TokenInvalid)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_refresh_yields_one_session() {
        let (service, _) = sessions().await;
        let tokens = service.login("ada", "secret1").await.unwrap();

        let spawn_refresh = || {
            let service = service.clone();
            let presented = tokens.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&presented).await })
        };
        let (a, b) = tokio::join!(spawn_refresh(), spawn_refresh());
        let results = [a.unwrap(), b.unwrap()];

        let winners: Vec<&SessionTokens> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(CatalogError::TokenInvalid)))
        );

        let after = service.refresh(&winners[0].refresh_token).await;
        assert!(matches!(after, Err(CatalogError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_expired_refresh_token() {
        let (service, clock) = sessions().await;
        let tokens = service.login("ada", "secret1").await.unwrap();

        clock.advance(Duration::from_secs(8 * 24 * 60 * 60));
        let result = service.refresh(&tokens.refresh_token).await;
        assert!(matches!(result, Err(CatalogError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_logout_revokes() {
        let (service, _) = sessions().await;
        let tokens = service.login("ada", "secret1").await.unwrap();

        service.logout(&tokens.refresh_token).await.unwrap();
        service.logout(&tokens.refresh_token).await.unwrap();
        let result = service.refresh(&tokens.refresh_token).await;
        assert!(matches!(result, Err(CatalogError::TokenInvalid)));
    }

    #[tokio::test]
    async fn test_expired_access_token() {
        let (service, clock) = sessions().await;
        let tokens = service.login("ada", "secret1").await.unwrap();

        clock.advance(Duration::from_secs(16 * 60));
        let result = service.principal(&tokens.access_token).await;
        assert!(matches!(result, Err(CatalogError::TokenExpired)));
    }
}
