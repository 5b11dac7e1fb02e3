//! Signed, stateless session tokens
//!
//! Wire shape: `base64url(header).base64url(claims).base64url(signature)`, where
//! the signature is HMAC-SHA256 over the first two segments joined by a dot.
//! Claim timestamps are Unix milliseconds.

use crate::core::error::{CatalogError, TokenError};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Minimum signing key length in bytes
pub const MIN_KEY_LEN: usize = 32;

const ALGORITHM: &str = "HS256";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = ChronoDuration::from_std(by).unwrap_or(ChronoDuration::MAX);
        let mut now = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account username)
    pub sub: String,
    /// Issued at, Unix milliseconds
    pub iat: i64,
    /// Expires at, Unix milliseconds
    pub exp: i64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp)
    }
}

/// Issues and verifies session tokens with a shared secret
#[derive(Clone)]
pub struct CredentialService {
    key: Arc<[u8]>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl CredentialService {
    /// Create a service signing with `key`; keys shorter than [`MIN_KEY_LEN`] are rejected
    pub fn new(key: impl AsRef<[u8]>, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let key = key.as_ref();
        if key.len() < MIN_KEY_LEN {
            anyhow::bail!(
                "token signing key must be at least {} bytes, got {}",
                MIN_KEY_LEN,
                key.len()
            );
        }

        Ok(Self {
            key: Arc::from(key),
            clock,
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a token for `subject` valid for `ttl` from now
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, CatalogError> {
        let now = self.clock.now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_ms),
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let header = serde_json::to_vec(&header)
            .map_err(|e| CatalogError::Fatal(format!("token header encoding failed: {}", e)))?;
        let claims = serde_json::to_vec(&claims)
            .map_err(|e| CatalogError::Fatal(format!("token claims encoding failed: {}", e)))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a token and return its claims
    ///
    /// Expiry is only checked once the signature is known to be good, so a
    /// forged token never reports [`TokenError::Expired`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_b64, claims_b64, signature_b64] = segments[..] else {
            return Err(TokenError::Malformed);
        };

        let header = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        self.mac(&token.as_bytes()[..signing_input_len])
            .map_err(|_| TokenError::Invalid)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let header: Header = serde_json::from_slice(&header).map_err(|_| TokenError::Invalid)?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Invalid);
        }
        let claims: Claims = serde_json::from_slice(&claims).map_err(|_| TokenError::Invalid)?;

        if self.clock.now().timestamp_millis() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verify a token and return only its subject
    pub fn subject(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token).map(|claims| claims.sub)
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, CatalogError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CatalogError::Fatal(format!("invalid signing key: {}", e)))?;
        mac.update(data);
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> (CredentialService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let service = CredentialService::new(KEY, clock.clone()).unwrap();
        (service, clock)
    }

    #[test]
    fn test_issue_then_verify_round_trips_subject() {
        let (service, _) = service();
        let token = service.issue("alice", Duration::from_secs(60)).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 60_000);
        assert_eq!(service.subject(&token).unwrap(), "alice");
    }

    #[test]
    fn test_expired_after_ttl() {
        let (service, clock) = service();
        let token = service.issue("alice", Duration::from_secs(1)).unwrap();

        clock.advance(Duration::from_secs(2));
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_sub_second_ttl() {
        let (service, clock) = service();
        let token = service.issue("alice", Duration::from_millis(500)).unwrap();

        clock.advance(Duration::from_millis(499));
        assert!(service.verify(&token).is_ok());
        clock.advance(Duration::from_millis(1));
        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_tampered_claims_are_invalid() {
        let (service, _) = service();
        let token = service.issue("alice", Duration::from_secs(60)).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","iat":0,"exp":99999999999999}"#);
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);

        assert_eq!(service.verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn test_expired_forgery_is_invalid_not_expired() {
        let (service, clock) = service();
        let other = CredentialService::new(b"ffffffffffffffffffffffffffffffff", clock.clone()).unwrap();
        let token = service.issue("alice", Duration::from_secs(1)).unwrap();
        let foreign = other.issue("alice", Duration::from_secs(1)).unwrap();
        clock.advance(Duration::from_secs(5));

        let parts: Vec<&str> = token.split('.').collect();
        let foreign_signature = foreign.rsplit('.').next().unwrap();
        let forged = format!("{}.{}.{}", parts[0], parts[1], foreign_signature);

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
        assert_eq!(service.verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn test_other_key_is_invalid() {
        let (service, _) = service();
        let other = CredentialService::new(
            b"ffffffffffffffffffffffffffffffff",
            Arc::new(SystemClock),
        )
        .unwrap();
        let token = other.issue("alice", Duration::from_secs(60)).unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_structural_damage_is_malformed() {
        let (service, _) = service();

        assert_eq!(service.verify(""), Err(TokenError::Malformed));
        assert_eq!(service.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(service.verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(service.verify("***.***.***"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(CredentialService::new(b"short", Arc::new(SystemClock)).is_err());
    }
}
