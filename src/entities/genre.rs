//! Genres

use crate::core::entity::UniqueKey;
use crate::core::field::FieldValue;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A genre. Name and slug are both unique; inactive genres stay assignable
/// to existing books but are hidden from the active listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Genre {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            description,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "name" => Some(FieldValue::String(self.name.clone())),
            "slug" => Some(FieldValue::String(self.slug.clone())),
            "active" => Some(FieldValue::Boolean(self.active)),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("genre.name", self.name.clone()),
            UniqueKey::new("genre.slug", self.slug.clone()),
        ]
    }
}

impl_entity!(Genre);
