//! Books and their aggregate rating

use crate::core::entity::UniqueKey;
use crate::core::field::FieldValue;
use crate::impl_entity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 500;

/// Publication lifecycle of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    Draft,
    #[default]
    Published,
    Archived,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Draft => "DRAFT",
            BookStatus::Published => "PUBLISHED",
            BookStatus::Archived => "ARCHIVED",
        }
    }
}

/// A catalog book.
///
/// The rating aggregate is kept as two counters only; [`Book::average_rating`]
/// derives the mean on demand so it can never drift from them.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub status: BookStatus,
    pub author_id: Uuid,
    pub co_author_ids: BTreeSet<Uuid>,
    pub genre_ids: BTreeSet<Uuid>,
    pub review_count: u64,
    pub total_rating_sum: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(title: impl Into<String>, author_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            subtitle: None,
            isbn: None,
            description: None,
            publisher: None,
            publication_date: None,
            status: BookStatus::default(),
            author_id,
            co_author_ids: BTreeSet::new(),
            genre_ids: BTreeSet::new(),
            review_count: 0,
            total_rating_sum: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mean rating, `None` while the book has no reviews
    pub fn average_rating(&self) -> Option<f64> {
        if self.review_count == 0 {
            None
        } else {
            Some(self.total_rating_sum as f64 / self.review_count as f64)
        }
    }

    /// Apply signed deltas to the rating counters.
    ///
    /// Fails without modifying the book if either counter would go negative,
    /// or if reviews remain while the sum drops to zero.
    pub fn apply_rating_delta(&mut self, review_delta: i64, rating_delta: i64) -> Result<(), String> {
        let count = self.review_count.checked_add_signed(review_delta).ok_or_else(|| {
            format!(
                "review_count {} cannot move by {} on book {}",
                self.review_count, review_delta, self.id
            )
        })?;
        let sum = self.total_rating_sum.checked_add_signed(rating_delta).ok_or_else(|| {
            format!(
                "total_rating_sum {} cannot move by {} on book {}",
                self.total_rating_sum, rating_delta, self.id
            )
        })?;
        if (count == 0) != (sum == 0) {
            return Err(format!(
                "inconsistent rating aggregate on book {}: count={} sum={}",
                self.id, count, sum
            ));
        }

        self.review_count = count;
        self.total_rating_sum = sum;
        self.touch();
        Ok(())
    }

    pub fn is_author(&self, account_id: Uuid) -> bool {
        self.author_id == account_id
    }

    pub fn is_co_author(&self, account_id: Uuid) -> bool {
        self.co_author_ids.contains(&account_id)
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "title" => Some(FieldValue::String(self.title.clone())),
            "status" => Some(FieldValue::String(self.status.as_str().to_string())),
            "author_id" => Some(FieldValue::Uuid(self.author_id)),
            "co_author_ids" => Some(FieldValue::uuid_list(&self.co_author_ids)),
            "genre_ids" => Some(FieldValue::uuid_list(&self.genre_ids)),
            "isbn" => Some(
                self.isbn
                    .clone()
                    .map(FieldValue::String)
                    .unwrap_or(FieldValue::Null),
            ),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("book.title", self.title.clone())]
    }
}

impl_entity!(Book);

/// Book as returned to callers, with the derived average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookView {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub status: BookStatus,
    pub author_id: Uuid,
    pub co_author_ids: Vec<Uuid>,
    pub genre_ids: Vec<Uuid>,
    pub review_count: u64,
    pub total_rating_sum: u64,
    pub average_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Book> for BookView {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            subtitle: book.subtitle.clone(),
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            publisher: book.publisher.clone(),
            publication_date: book.publication_date,
            status: book.status,
            author_id: book.author_id,
            co_author_ids: book.co_author_ids.iter().copied().collect(),
            genre_ids: book.genre_ids.iter().copied().collect(),
            review_count: book.review_count,
            total_rating_sum: book.total_rating_sum,
            average_rating: book.average_rating(),
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

impl From<Book> for BookView {
    fn from(book: Book) -> Self {
        BookView::from(&book)
    }
}
