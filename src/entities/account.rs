//! User accounts, roles and public profiles

use crate::core::entity::UniqueKey;
use crate::core::field::FieldValue;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role; a principal may hold several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Reader,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "READER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READER" => Ok(Role::Reader),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// In-place change to a stored account
#[derive(Debug, Clone, PartialEq)]
pub enum AccountChange {
    /// Wrong password; locks the account once `max_failures` is reached
    LoginFailed { max_failures: u32 },
    /// Correct password; refused if the account was locked meanwhile
    LoginSucceeded { at: DateTime<Utc> },
    Unlock,
    GrantRole(Role),
    RevokeRole(Role),
}

/// A stored account. Never hard-deleted; `active` and `locked` carry its state.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    /// Lowercased at registration
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: BTreeSet<Role>,
    pub active: bool,
    pub locked: bool,
    pub failed_login_attempts: u32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create an active, unlocked account holding only the `READER` role
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            roles: BTreeSet::from([Role::Reader]),
            active: true,
            locked: false,
            failed_login_attempts: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether the account may sign in at all
    pub fn can_authenticate(&self) -> bool {
        self.active && !self.locked
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Apply `change` to this account; `Err` means the account refuses it
    pub fn apply_change(&mut self, change: &AccountChange) -> Result<(), String> {
        match change {
            AccountChange::LoginFailed { max_failures } => {
                self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
                if self.failed_login_attempts >= *max_failures {
                    self.locked = true;
                }
            }
            AccountChange::LoginSucceeded { at } => {
                if !self.can_authenticate() {
                    return Err(format!("account {} can no longer sign in", self.id));
                }
                self.failed_login_attempts = 0;
                self.last_login_at = Some(*at);
            }
            AccountChange::Unlock => {
                self.locked = false;
                self.failed_login_attempts = 0;
            }
            AccountChange::GrantRole(role) => {
                self.roles.insert(*role);
            }
            AccountChange::RevokeRole(role) => {
                self.roles.remove(role);
            }
        }
        self.touch();
        Ok(())
    }

    /// Public projection without credentials
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            roles: self.roles.clone(),
            created_at: self.created_at,
        }
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "username" => Some(FieldValue::String(self.username.clone())),
            "email" => Some(FieldValue::String(self.email.clone())),
            "active" => Some(FieldValue::Boolean(self.active)),
            "locked" => Some(FieldValue::Boolean(self.locked)),
            "roles" => Some(FieldValue::List(
                self.roles
                    .iter()
                    .map(|r| FieldValue::String(r.as_str().to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("account.username", self.username.clone()),
            UniqueKey::new("account.email", self.email.clone()),
        ]
    }
}

impl_entity!(Account);

/// Account as returned to callers; never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: BTreeSet<Role>,
    pub created_at: DateTime<Utc>,
}
