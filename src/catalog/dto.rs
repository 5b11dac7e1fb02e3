//! Request payloads accepted by the catalog façade

use crate::core::error::CatalogError;
use crate::core::field::FieldFormat;
use crate::core::validation::FieldErrors;
use crate::entities::BookStatus;
use crate::entities::book::MAX_TITLE_LEN;
use crate::entities::review::{MAX_RATING, MIN_RATING};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

const MAX_TEXT_LEN: usize = 255;
const MAX_LONG_TEXT_LEN: usize = 2000;
const MAX_GENRE_FIELD_LEN: usize = 100;

/// Distinguish an explicit `null` (`Some(None)`) from an absent field (`None`)
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Report every `(field, nulled)` pair where a non-nullable field was sent as `null`
fn reject_nulls<const N: usize>(errors: &mut FieldErrors, fields: [(&str, bool); N]) {
    for (field, nulled) in fields {
        if nulled {
            errors.push(field, "must not be null");
        }
    }
}

fn check_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.push(field, format!("must not exceed {} characters", max));
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookCreate {
    #[validate(length(max = 500, message = "must not exceed 500 characters"))]
    pub title: String,

    #[validate(length(max = 255, message = "must not exceed 255 characters"))]
    pub subtitle: Option<String>,

    pub isbn: Option<String>,

    #[validate(length(max = 2000, message = "must not exceed 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 255, message = "must not exceed 255 characters"))]
    pub publisher: Option<String>,

    pub publication_date: Option<NaiveDate>,

    pub status: Option<BookStatus>,

    #[serde(default)]
    pub genre_ids: Vec<Uuid>,

    #[serde(default)]
    pub co_author_ids: Vec<Uuid>,
}

impl BookCreate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::of(self);
        errors.not_blank("title", &self.title);
        if let Some(isbn) = &self.isbn {
            errors.format("isbn", isbn, &FieldFormat::Isbn);
        }
        errors.finish()
    }
}

/// Partial book update
///
/// Absent fields are left alone. On nullable fields an explicit `null` clears
/// the value; on the others it is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "explicit_null")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub subtitle: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub isbn: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub publisher: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub publication_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub status: Option<Option<BookStatus>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub genre_ids: Option<Option<Vec<Uuid>>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub co_author_ids: Option<Option<Vec<Uuid>>>,
}

impl BookPatch {
    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::default();

        reject_nulls(
            &mut errors,
            [
                ("title", matches!(self.title, Some(None))),
                ("status", matches!(self.status, Some(None))),
                ("genre_ids", matches!(self.genre_ids, Some(None))),
                ("co_author_ids", matches!(self.co_author_ids, Some(None))),
            ],
        );

        if let Some(Some(title)) = &self.title {
            errors.not_blank("title", title);
            check_len(&mut errors, "title", title, MAX_TITLE_LEN);
        }
        if let Some(Some(subtitle)) = &self.subtitle {
            check_len(&mut errors, "subtitle", subtitle, MAX_TEXT_LEN);
        }
        if let Some(Some(isbn)) = &self.isbn {
            errors.format("isbn", isbn, &FieldFormat::Isbn);
        }
        if let Some(Some(description)) = &self.description {
            check_len(&mut errors, "description", description, MAX_LONG_TEXT_LEN);
        }
        if let Some(Some(publisher)) = &self.publisher {
            check_len(&mut errors, "publisher", publisher, MAX_TEXT_LEN);
        }

        errors.finish()
    }
}

/// Filters for book listings; all present filters must match
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    pub status: Option<BookStatus>,
    pub author_id: Option<Uuid>,
    pub genre_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewCreate {
    pub book_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: u8,

    #[validate(length(max = 255, message = "must not exceed 255 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "must not exceed 2000 characters"))]
    pub content: String,
}

impl ReviewCreate {
    pub fn new(book_id: Uuid, rating: u8, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            book_id,
            rating,
            title: title.into(),
            content: content.into(),
        }
    }

    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        FieldErrors::of(self).not_blank("title", &self.title).finish()
    }
}

/// Partial review update
///
/// Absent fields are left alone; every field rejects an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    #[serde(default, deserialize_with = "explicit_null")]
    pub rating: Option<Option<u8>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub title: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub content: Option<Option<String>>,
}

impl ReviewUpdate {
    pub fn rating(rating: u8) -> Self {
        Self {
            rating: Some(Some(rating)),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(Some(content.into())),
            ..Default::default()
        }
    }

    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::default();
        reject_nulls(
            &mut errors,
            [
                ("rating", matches!(self.rating, Some(None))),
                ("title", matches!(self.title, Some(None))),
                ("content", matches!(self.content, Some(None))),
            ],
        );
        if self
            .rating
            .flatten()
            .is_some_and(|rating| !(MIN_RATING..=MAX_RATING).contains(&rating))
        {
            errors.push("rating", "must be between 1 and 5");
        }
        if let Some(Some(title)) = &self.title {
            errors.not_blank("title", title);
            check_len(&mut errors, "title", title, MAX_TEXT_LEN);
        }
        if let Some(Some(content)) = &self.content {
            errors.not_blank("content", content);
            check_len(&mut errors, "content", content, MAX_LONG_TEXT_LEN);
        }
        errors.finish()
    }
}

/// Helpful / not-helpful verdict on a review
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VoteRequest {
    pub helpful: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenreCreate {
    #[validate(length(max = 100, message = "must not exceed 100 characters"))]
    pub name: String,

    /// Derived from the name when absent
    #[validate(length(max = 100, message = "must not exceed 100 characters"))]
    pub slug: Option<String>,

    #[validate(length(max = 2000, message = "must not exceed 2000 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl GenreCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: None,
            active: true,
        }
    }

    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::of(self);
        errors.not_blank("name", &self.name);
        if let Some(slug) = &self.slug {
            errors.format("slug", slug, &FieldFormat::Slug);
        }
        errors.finish()
    }
}

/// Partial genre update
///
/// Absent fields are left alone. An explicit `null` clears `description` and
/// is rejected everywhere else.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreUpdate {
    #[serde(default, deserialize_with = "explicit_null")]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub slug: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "explicit_null")]
    pub active: Option<Option<bool>>,
}

impl GenreUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(Some(name.into())),
            ..Default::default()
        }
    }

    pub fn active(active: bool) -> Self {
        Self {
            active: Some(Some(active)),
            ..Default::default()
        }
    }

    pub(crate) fn validate_all(&self) -> Result<(), CatalogError> {
        let mut errors = FieldErrors::default();
        reject_nulls(
            &mut errors,
            [
                ("name", matches!(self.name, Some(None))),
                ("slug", matches!(self.slug, Some(None))),
                ("active", matches!(self.active, Some(None))),
            ],
        );
        if let Some(Some(name)) = &self.name {
            errors.not_blank("name", name);
            check_len(&mut errors, "name", name, MAX_GENRE_FIELD_LEN);
        }
        if let Some(Some(slug)) = &self.slug {
            errors.format("slug", slug, &FieldFormat::Slug);
            check_len(&mut errors, "slug", slug, MAX_GENRE_FIELD_LEN);
        }
        if let Some(Some(description)) = &self.description {
            check_len(&mut errors, "description", description, MAX_LONG_TEXT_LEN);
        }
        errors.finish()
    }
}
