//! Persisted refresh tokens, the only server-side session state

use crate::core::entity::UniqueKey;
use crate::core::field::FieldValue;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub token: String,
    pub account_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(token: impl Into<String>, account_id: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
            account_id,
            expires_at,
            revoked: false,
            created_at: Utc::now(),
        }
    }

    /// Usable for a refresh at `now`
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "token" => Some(FieldValue::String(self.token.clone())),
            "account_id" => Some(FieldValue::Uuid(self.account_id)),
            "revoked" => Some(FieldValue::Boolean(self.revoked)),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("refresh_token.token", self.token.clone())]
    }
}

impl_entity!(RefreshToken);
