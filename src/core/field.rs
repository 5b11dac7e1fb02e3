//! Field value types and format validation

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// A polymorphic field value used by storage predicates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    /// Multi-valued field (co-authors, genres)
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a UUID if possible
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Whether a multi-valued field holds `needle`
    ///
    /// Scalars behave like a one-element list.
    pub fn contains(&self, needle: &FieldValue) -> bool {
        match self {
            FieldValue::List(items) => items.contains(needle),
            other => other == needle,
        }
    }

    /// Build a list value from an iterator of ids
    pub fn uuid_list<'a>(ids: impl IntoIterator<Item = &'a Uuid>) -> Self {
        FieldValue::List(ids.into_iter().copied().map(FieldValue::Uuid).collect())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// Field format validators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Lowercase words joined by single dashes (`science-fiction`)
    Slug,
    /// ISBN-10 or ISBN-13, dashes and spaces allowed
    Isbn,
}

impl FieldFormat {
    /// Validate a raw string against this format
    pub fn validate(&self, value: &str) -> bool {
        match self {
            FieldFormat::Slug => Self::slug_regex().is_match(value),
            FieldFormat::Isbn => Self::is_valid_isbn(value),
        }
    }

    fn slug_regex() -> &'static Regex {
        static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();
        SLUG_REGEX.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap())
    }

    fn is_valid_isbn(isbn: &str) -> bool {
        static ISBN_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = ISBN_REGEX.get_or_init(|| Regex::new(r"^(?:\d{9}[\dX]|\d{13})$").unwrap());
        let compact: String = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
        regex.is_match(&compact)
    }
}

/// Derive a slug from a display name (`"Science Fiction"` → `"science-fiction"`)
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
