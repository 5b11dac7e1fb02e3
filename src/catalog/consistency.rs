//! Uniqueness and aggregate invariants over books, reviews and genres
//!
//! Every mutation that touches a rating or vote counter is submitted as one
//! [`Storage::commit`] batch together with the row that caused it, so a book's
//! counters always equal the sum over its stored reviews. Deltas are derived by
//! the backend from its stored rows, never from a snapshot loaded here.
//! Pre-checks only produce friendlier errors; the storage unique constraints
//! decide races.

use crate::core::entity::{EntityKind, Record};
use crate::core::error::{CatalogError, StorageError};
use crate::core::query::Predicate;
use crate::core::service::{Storage, StorageExt, WriteOp};
use crate::entities::{Account, Book, Genre, HelpfulnessVote, Review};
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct ConsistencyManager {
    storage: Arc<dyn Storage>,
}

impl ConsistencyManager {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Commit a batch, translating storage failures with `on_unique` for
    /// constraint violations
    async fn commit(
        &self,
        ops: Vec<WriteOp>,
        on_unique: impl FnOnce(&'static str) -> Option<CatalogError>,
    ) -> Result<(), CatalogError> {
        self.storage.commit(ops).await.map_err(|err| match err {
            StorageError::UniqueViolation { constraint, .. } => {
                on_unique(constraint).unwrap_or_else(|| CatalogError::Fatal(err.to_string()))
            }
            StorageError::NotFound { kind, id } => CatalogError::not_found(kind, id),
            other => other.into(),
        })
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Insert a review and add it to its book's aggregate
    pub async fn create_review(&self, review: Review) -> Result<Review, CatalogError> {
        let (author_id, book_id) = (review.author_id, review.book_id);
        let existing = self
            .storage
            .find_one_as::<Review>(
                &Predicate::eq("author_id", author_id).and(Predicate::eq("book_id", book_id)),
            )
            .await?;
        if existing.is_some() {
            return Err(CatalogError::DuplicateReview { author_id, book_id });
        }

        let ops = vec![
            WriteOp::insert(review.clone()),
            WriteOp::AdjustBookRatings {
                book_id,
                review_delta: 1,
                rating_delta: i64::from(review.rating),
            },
        ];
        self.commit(ops, |constraint| {
            (constraint == "review.author_book")
                .then_some(CatalogError::DuplicateReview { author_id, book_id })
        })
        .await?;

        Ok(review)
    }

    /// Persist an edited review; the book's rating sum moves by the difference
    /// to whatever rating is stored when the batch runs
    pub async fn update_review(&self, review: Review) -> Result<Review, CatalogError> {
        let id = review.id;
        self.commit(vec![WriteOp::ReviseReview(review)], |_| None).await?;
        self.reload_review(id).await
    }

    /// Delete a review with its votes and remove it from the book's aggregate
    pub async fn delete_review(&self, review: &Review) -> Result<(), CatalogError> {
        self.commit(vec![WriteOp::RemoveReview { review_id: review.id }], |_| None)
            .await
    }

    /// Record `voter`'s verdict on a review
    ///
    /// A first vote bumps one counter, a changed vote moves one count across,
    /// and repeating the same vote changes nothing.
    pub async fn cast_vote(&self, voter_id: Uuid, review: &Review, helpful: bool) -> Result<Review, CatalogError> {
        let vote = HelpfulnessVote::new(voter_id, review.id, helpful);
        self.commit(vec![WriteOp::CastVote(vote)], |constraint| {
            (constraint == "vote.voter_review")
                .then(|| CatalogError::already_exists("Vote is already being recorded"))
        })
        .await?;

        self.reload_review(review.id).await
    }

    async fn reload_review(&self, id: Uuid) -> Result<Review, CatalogError> {
        self.storage
            .load::<Review>(&id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Review, id))
    }

    // =========================================================================
    // Books
    // =========================================================================

    async fn ensure_title_free(&self, title: &str, except: Option<Uuid>) -> Result<(), CatalogError> {
        let holder = self
            .storage
            .find_one_as::<Book>(&Predicate::eq("title", title))
            .await?;
        match holder {
            Some(book) if Some(book.id) != except => Err(CatalogError::DuplicateBook {
                title: title.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub async fn create_book(&self, book: Book) -> Result<Book, CatalogError> {
        self.ensure_title_free(&book.title, None).await?;

        let title = book.title.clone();
        self.commit(vec![WriteOp::insert(book.clone())], |constraint| {
            (constraint == "book.title").then_some(CatalogError::DuplicateBook { title })
        })
        .await?;

        Ok(book)
    }

    /// Persist an edited book
    pub async fn update_book(&self, previous_title: &str, book: Book) -> Result<Book, CatalogError> {
        if book.title != previous_title {
            self.ensure_title_free(&book.title, Some(book.id)).await?;
        }

        let title = book.title.clone();
        self.commit(vec![WriteOp::update(book.clone())], |constraint| {
            (constraint == "book.title").then_some(CatalogError::DuplicateBook { title })
        })
        .await?;

        Ok(book)
    }

    /// Delete a book together with its reviews and their votes
    ///
    /// The cascade runs inside the backend, so a review committed after this
    /// call started is removed along with the rest.
    pub async fn delete_book(&self, book: &Book) -> Result<(), CatalogError> {
        self.commit(vec![WriteOp::RemoveBook { book_id: book.id }], |_| None)
            .await
    }

    /// Check that every genre id exists; all missing ids are reported together
    pub async fn resolve_genres(&self, ids: &[Uuid]) -> Result<BTreeSet<Uuid>, CatalogError> {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let found = try_join_all(unique.iter().map(|id| self.storage.get(EntityKind::Genre, id))).await?;
        let missing: Vec<Uuid> = unique
            .iter()
            .zip(&found)
            .filter(|(_, record)| !matches!(record, Some(Record::Genre(_))))
            .map(|(id, _)| *id)
            .collect();

        if !missing.is_empty() {
            return Err(CatalogError::GenreNotFound { ids: missing });
        }
        Ok(unique.into_iter().collect())
    }

    /// Check that every co-author exists; the author is dropped from the set
    pub async fn resolve_co_authors(&self, author_id: Uuid, ids: &[Uuid]) -> Result<BTreeSet<Uuid>, CatalogError> {
        let wanted: BTreeSet<Uuid> = ids.iter().copied().filter(|id| *id != author_id).collect();

        let found = try_join_all(wanted.iter().map(|id| self.storage.load::<Account>(id))).await?;
        if let Some((id, _)) = wanted.iter().zip(&found).find(|(_, account)| account.is_none()) {
            return Err(CatalogError::not_found(EntityKind::Account, id));
        }
        Ok(wanted)
    }

    // =========================================================================
    // Genres
    // =========================================================================

    async fn ensure_genre_keys_free(&self, genre: &Genre) -> Result<(), CatalogError> {
        let by_name = self
            .storage
            .find_one_as::<Genre>(&Predicate::eq("name", genre.name.as_str()))
            .await?;
        if by_name.is_some_and(|other| other.id != genre.id) {
            return Err(genre_name_taken(&genre.name));
        }

        let by_slug = self
            .storage
            .find_one_as::<Genre>(&Predicate::eq("slug", genre.slug.as_str()))
            .await?;
        if by_slug.is_some_and(|other| other.id != genre.id) {
            return Err(genre_slug_taken(&genre.slug));
        }
        Ok(())
    }

    pub async fn create_genre(&self, genre: Genre) -> Result<Genre, CatalogError> {
        self.ensure_genre_keys_free(&genre).await?;
        self.commit(vec![WriteOp::insert(genre.clone())], |constraint| {
            genre_conflict(constraint, &genre)
        })
        .await?;
        Ok(genre)
    }

    pub async fn update_genre(&self, genre: Genre) -> Result<Genre, CatalogError> {
        self.ensure_genre_keys_free(&genre).await?;
        self.commit(vec![WriteOp::update(genre.clone())], |constraint| {
            genre_conflict(constraint, &genre)
        })
        .await?;
        Ok(genre)
    }

    /// Delete a genre no book references
    pub async fn delete_genre(&self, genre: &Genre) -> Result<(), CatalogError> {
        let referencing = self
            .storage
            .find_one_as::<Book>(&Predicate::contains("genre_ids", genre.id))
            .await?;
        if referencing.is_some() {
            return Err(CatalogError::GenreInUse { id: genre.id });
        }

        self.commit(vec![WriteOp::delete::<Genre>(genre.id)], |_| None).await
    }
}

fn genre_name_taken(name: &str) -> CatalogError {
    CatalogError::already_exists(format!("Genre name '{}' is already taken", name))
}

fn genre_slug_taken(slug: &str) -> CatalogError {
    CatalogError::already_exists(format!("Genre slug '{}' is already taken", slug))
}

fn genre_conflict(constraint: &str, genre: &Genre) -> Option<CatalogError> {
    match constraint {
        "genre.name" => Some(genre_name_taken(&genre.name)),
        "genre.slug" => Some(genre_slug_taken(&genre.slug)),
        _ => None,
    }
}
