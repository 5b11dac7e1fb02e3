//! Entity traits defining the storage abstraction for all catalog types

use crate::core::field::FieldValue;
use crate::entities::{Account, Book, Genre, HelpfulnessVote, RefreshToken, Review};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Discriminant for every stored entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Account,
    Book,
    Genre,
    Review,
    RefreshToken,
    HelpfulnessVote,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Book => "book",
            EntityKind::Genre => "genre",
            EntityKind::Review => "review",
            EntityKind::RefreshToken => "refresh_token",
            EntityKind::HelpfulnessVote => "helpfulness_vote",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that must be unique across all records of one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    /// Constraint name, e.g. `"review.author_book"`
    pub constraint: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(constraint: &'static str, value: impl Into<String>) -> Self {
        Self {
            constraint,
            value: value.into(),
        }
    }
}

/// Base trait for all entities in the catalog.
///
/// Entities reference each other by id only; loading a related entity is always
/// an explicit storage call.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Storage discriminant for this type
    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    fn created_at(&self) -> DateTime<Utc>;

    /// Get the value of a specific field by name, for predicate matching
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Values that storage must keep unique for this kind
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    fn into_record(self) -> Record;

    fn from_record(record: Record) -> Option<Self>;
}

/// Type-erased entity as held by a storage backend
#[derive(Debug, Clone)]
pub enum Record {
    Account(Account),
    Book(Book),
    Genre(Genre),
    Review(Review),
    RefreshToken(RefreshToken),
    HelpfulnessVote(HelpfulnessVote),
}

/// Dispatch a method call to the entity held by a record
macro_rules! with_entity {
    ($record:expr, $entity:ident => $body:expr) => {
        match $record {
            Record::Account($entity) => $body,
            Record::Book($entity) => $body,
            Record::Genre($entity) => $body,
            Record::Review($entity) => $body,
            Record::RefreshToken($entity) => $body,
            Record::HelpfulnessVote($entity) => $body,
        }
    };
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Account(_) => EntityKind::Account,
            Record::Book(_) => EntityKind::Book,
            Record::Genre(_) => EntityKind::Genre,
            Record::Review(_) => EntityKind::Review,
            Record::RefreshToken(_) => EntityKind::RefreshToken,
            Record::HelpfulnessVote(_) => EntityKind::HelpfulnessVote,
        }
    }

    pub fn id(&self) -> Uuid {
        with_entity!(self, e => e.id())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        with_entity!(self, e => e.created_at())
    }

    pub fn field_value(&self, field: &str) -> Option<FieldValue> {
        with_entity!(self, e => e.field_value(field))
    }

    pub fn unique_keys(&self) -> Vec<UniqueKey> {
        with_entity!(self, e => e.unique_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Genre, Review};

    #[test]
    fn test_record_round_trip_keeps_kind() {
        let genre = Genre::new("Poetry", "poetry", None);
        let id = genre.id;
        let record = genre.into_record();

        assert_eq!(record.kind(), EntityKind::Genre);
        assert_eq!(record.id(), id);
        assert!(Review::from_record(record.clone()).is_none());
        assert_eq!(Genre::from_record(record).map(|g| g.id), Some(id));
    }

    #[test]
    fn test_record_unique_keys_dispatch() {
        let genre = Genre::new("Poetry", "poetry", None);
        let keys = genre.into_record().unique_keys();

        assert!(keys.contains(&UniqueKey::new("genre.name", "Poetry")));
        assert!(keys.contains(&UniqueKey::new("genre.slug", "poetry")));
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::RefreshToken.to_string(), "refresh_token");
        assert_eq!(EntityKind::Book.as_str(), "book");
    }
}
