//! Reviews and helpfulness votes

use crate::core::entity::UniqueKey;
use crate::core::field::FieldValue;
use crate::impl_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A review of one book by one account; at most one per (author, book)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub author_id: Uuid,
    pub book_id: Uuid,
    pub rating: u8,
    pub title: String,
    pub content: String,
    pub helpful_count: u64,
    pub not_helpful_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        author_id: Uuid,
        book_id: Uuid,
        rating: u8,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            book_id,
            rating,
            title: title.into(),
            content: content.into(),
            helpful_count: 0,
            not_helpful_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_author(&self, account_id: Uuid) -> bool {
        self.author_id == account_id
    }

    /// Apply signed deltas to the helpfulness counters
    pub fn apply_vote_delta(&mut self, helpful_delta: i64, not_helpful_delta: i64) -> Result<(), String> {
        let helpful = self.helpful_count.checked_add_signed(helpful_delta);
        let not_helpful = self.not_helpful_count.checked_add_signed(not_helpful_delta);
        match (helpful, not_helpful) {
            (Some(helpful), Some(not_helpful)) => {
                self.helpful_count = helpful;
                self.not_helpful_count = not_helpful;
                Ok(())
            }
            _ => Err(format!(
                "vote counters on review {} cannot move by ({}, {})",
                self.id, helpful_delta, not_helpful_delta
            )),
        }
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "author_id" => Some(FieldValue::Uuid(self.author_id)),
            "book_id" => Some(FieldValue::Uuid(self.book_id)),
            "rating" => Some(FieldValue::Integer(i64::from(self.rating))),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "review.author_book",
            format!("{}:{}", self.author_id, self.book_id),
        )]
    }
}

impl_entity!(Review);

/// One account's helpful/not-helpful verdict on one review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpfulnessVote {
    pub id: Uuid,
    pub voter_id: Uuid,
    pub review_id: Uuid,
    pub helpful: bool,
    pub created_at: DateTime<Utc>,
}

impl HelpfulnessVote {
    pub fn new(voter_id: Uuid, review_id: Uuid, helpful: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            voter_id,
            review_id,
            helpful,
            created_at: Utc::now(),
        }
    }

    fn indexed_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Uuid(self.id)),
            "voter_id" => Some(FieldValue::Uuid(self.voter_id)),
            "review_id" => Some(FieldValue::Uuid(self.review_id)),
            "helpful" => Some(FieldValue::Boolean(self.helpful)),
            _ => None,
        }
    }

    fn constraint_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "vote.voter_review",
            format!("{}:{}", self.voter_id, self.review_id),
        )]
    }
}

impl_entity!(HelpfulnessVote);
