//! In-memory implementation of Storage for testing and development

use crate::core::entity::{Entity, EntityKind, Record};
use crate::core::error::StorageError;
use crate::core::query::Predicate;
use crate::core::service::{Storage, StorageResult, WriteOp};
use crate::entities::{Account, Book, RefreshToken, Review};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Previous state of one record touched by a batch
type UndoEntry = (EntityKind, Uuid, Option<Record>);

#[derive(Default)]
struct Tables {
    records: HashMap<EntityKind, HashMap<Uuid, Record>>,
}

impl Tables {
    fn table(&self, kind: EntityKind) -> Option<&HashMap<Uuid, Record>> {
        self.records.get(&kind)
    }

    fn get(&self, kind: EntityKind, id: &Uuid) -> Option<&Record> {
        self.table(kind).and_then(|table| table.get(id))
    }

    /// Stored entity of type `T`, or `NotFound`
    fn stored<T: Entity>(&self, id: Uuid) -> StorageResult<T> {
        self.get(T::KIND, &id)
            .cloned()
            .and_then(T::from_record)
            .ok_or(StorageError::NotFound { kind: T::KIND, id })
    }

    /// Ids of stored records of `kind` accepted by `select`
    fn ids_where(&self, kind: EntityKind, select: impl Fn(&Record) -> bool) -> Vec<Uuid> {
        self.table(kind)
            .map(|table| table.values().filter(|r| select(r)).map(Record::id).collect())
            .unwrap_or_default()
    }

    /// Matching records ordered by creation time then id
    fn matching(&self, kind: EntityKind, predicate: &Predicate) -> Vec<&Record> {
        let mut found: Vec<&Record> = self
            .table(kind)
            .map(|table| {
                table
                    .values()
                    .filter(|record| predicate.matches(&|field: &str| record.field_value(field)))
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|record| (record.created_at(), record.id()));
        found
    }

    /// Reject `record` if another record of its kind holds one of its unique keys
    fn check_unique(&self, record: &Record) -> StorageResult<()> {
        let keys = record.unique_keys();
        if keys.is_empty() {
            return Ok(());
        }
        let id = record.id();
        let Some(table) = self.table(record.kind()) else {
            return Ok(());
        };

        for other in table.values().filter(|other| other.id() != id) {
            let other_keys = other.unique_keys();
            if let Some(clash) = keys.iter().find(|key| other_keys.contains(key)) {
                return Err(StorageError::UniqueViolation {
                    constraint: clash.constraint,
                    value: clash.value.clone(),
                });
            }
        }
        Ok(())
    }

    fn put(&mut self, record: Record, undo: &mut Vec<UndoEntry>) {
        let kind = record.kind();
        let id = record.id();
        let previous = self.records.entry(kind).or_default().insert(id, record);
        undo.push((kind, id, previous));
    }

    fn remove(&mut self, kind: EntityKind, id: Uuid, undo: &mut Vec<UndoEntry>) -> Option<Record> {
        let removed = self.records.get_mut(&kind).and_then(|table| table.remove(&id))?;
        undo.push((kind, id, Some(removed.clone())));
        Some(removed)
    }

    fn remove_votes(&mut self, review_ids: &[Uuid], undo: &mut Vec<UndoEntry>) {
        let votes = self.ids_where(EntityKind::HelpfulnessVote, |record| {
            matches!(record, Record::HelpfulnessVote(vote) if review_ids.contains(&vote.review_id))
        });
        for id in votes {
            self.remove(EntityKind::HelpfulnessVote, id, undo);
        }
    }

    fn adjust_book(
        &mut self,
        book_id: Uuid,
        review_delta: i64,
        rating_delta: i64,
        undo: &mut Vec<UndoEntry>,
    ) -> StorageResult<()> {
        let mut book: Book = self.stored(book_id)?;
        book.apply_rating_delta(review_delta, rating_delta)
            .map_err(StorageError::Integrity)?;
        self.put(book.into_record(), undo);
        Ok(())
    }

    fn apply(&mut self, op: WriteOp, undo: &mut Vec<UndoEntry>) -> StorageResult<()> {
        match op {
            WriteOp::Insert(record) => {
                if self.get(record.kind(), &record.id()).is_some() {
                    return Err(StorageError::Duplicate {
                        kind: record.kind(),
                        id: record.id(),
                    });
                }
                self.check_unique(&record)?;
                self.put(record, undo);
            }
            WriteOp::Update(mut record) => {
                let Some(stored) = self.get(record.kind(), &record.id()) else {
                    return Err(StorageError::NotFound {
                        kind: record.kind(),
                        id: record.id(),
                    });
                };
                keep_counters(&mut record, stored);
                self.check_unique(&record)?;
                self.put(record, undo);
            }
            WriteOp::Delete { kind, id } => {
                self.remove(kind, id, undo)
                    .ok_or(StorageError::NotFound { kind, id })?;
            }
            WriteOp::AdjustBookRatings {
                book_id,
                review_delta,
                rating_delta,
            } => self.adjust_book(book_id, review_delta, rating_delta, undo)?,
            WriteOp::ReviseReview(mut review) => {
                let stored: Review = self.stored(review.id)?;
                review.author_id = stored.author_id;
                review.book_id = stored.book_id;
                review.helpful_count = stored.helpful_count;
                review.not_helpful_count = stored.not_helpful_count;

                let rating_delta = i64::from(review.rating) - i64::from(stored.rating);
                if rating_delta != 0 {
                    self.adjust_book(stored.book_id, 0, rating_delta, undo)?;
                }
                self.put(review.into_record(), undo);
            }
            WriteOp::RemoveReview { review_id } => {
                let review: Review = self.stored(review_id)?;
                self.remove_votes(&[review_id], undo);
                self.remove(EntityKind::Review, review_id, undo);
                self.adjust_book(review.book_id, -1, -i64::from(review.rating), undo)?;
            }
            WriteOp::RemoveBook { book_id } => {
                self.remove(EntityKind::Book, book_id, undo)
                    .ok_or(StorageError::NotFound {
                        kind: EntityKind::Book,
                        id: book_id,
                    })?;
                let reviews = self.ids_where(EntityKind::Review, |record| {
                    matches!(record, Record::Review(review) if review.book_id == book_id)
                });
                self.remove_votes(&reviews, undo);
                for id in reviews {
                    self.remove(EntityKind::Review, id, undo);
                }
            }
            WriteOp::CastVote(vote) => {
                let mut review: Review = self.stored(vote.review_id)?;
                let existing = self
                    .ids_where(EntityKind::HelpfulnessVote, |record| {
                        matches!(
                            record,
                            Record::HelpfulnessVote(other)
                                if other.voter_id == vote.voter_id && other.review_id == vote.review_id
                        )
                    })
                    .first()
                    .and_then(|id| self.get(EntityKind::HelpfulnessVote, id))
                    .cloned();

                let helpful = vote.helpful;
                let (helpful_delta, not_helpful_delta) = match existing {
                    Some(Record::HelpfulnessVote(stored)) if stored.helpful == helpful => return Ok(()),
                    Some(Record::HelpfulnessVote(mut stored)) => {
                        stored.helpful = helpful;
                        self.put(stored.into_record(), undo);
                        if helpful { (1, -1) } else { (-1, 1) }
                    }
                    _ => {
                        let record = vote.into_record();
                        self.check_unique(&record)?;
                        self.put(record, undo);
                        if helpful { (1, 0) } else { (0, 1) }
                    }
                };

                review
                    .apply_vote_delta(helpful_delta, not_helpful_delta)
                    .map_err(StorageError::Integrity)?;
                self.put(review.into_record(), undo);
            }
            WriteOp::UpdateAccount { account_id, change } => {
                let mut account: Account = self.stored(account_id)?;
                account.apply_change(&change).map_err(StorageError::Conflict)?;
                self.put(account.into_record(), undo);
            }
            WriteOp::RevokeRefreshToken { token_id } => {
                let mut token: RefreshToken = self.stored(token_id)?;
                if token.revoked {
                    return Err(StorageError::Conflict(format!(
                        "refresh token {} is already revoked",
                        token_id
                    )));
                }
                token.revoked = true;
                self.put(token.into_record(), undo);
            }
            WriteOp::RevokeAccountTokens { account_id } => {
                let live = self.ids_where(EntityKind::RefreshToken, |record| {
                    matches!(
                        record,
                        Record::RefreshToken(token) if token.account_id == account_id && !token.revoked
                    )
                });
                for id in live {
                    let mut token: RefreshToken = self.stored(id)?;
                    token.revoked = true;
                    self.put(token.into_record(), undo);
                }
            }
        }
        Ok(())
    }

    fn rollback(&mut self, undo: Vec<UndoEntry>) {
        for (kind, id, previous) in undo.into_iter().rev() {
            let table = self.records.entry(kind).or_default();
            match previous {
                Some(record) => {
                    table.insert(id, record);
                }
                None => {
                    table.remove(&id);
                }
            }
        }
    }
}

/// Carry aggregate counters over from the stored version of a record
fn keep_counters(record: &mut Record, stored: &Record) {
    match (record, stored) {
        (Record::Book(book), Record::Book(current)) => {
            book.review_count = current.review_count;
            book.total_rating_sum = current.total_rating_sum;
        }
        (Record::Review(review), Record::Review(current)) => {
            review.helpful_count = current.helpful_count;
            review.not_helpful_count = current.not_helpful_count;
        }
        _ => {}
    }
}

/// In-memory storage implementation
///
/// Useful for testing and development. Uses RwLock for thread-safe access; a
/// whole batch runs under one write lock, which makes `commit` atomic and
/// serializes concurrent unique checks.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of one kind
    pub fn count(&self, kind: EntityKind) -> StorageResult<usize> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire read lock: {}", e)))?;
        Ok(tables.table(kind).map_or(0, HashMap::len))
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, kind: EntityKind, id: &Uuid) -> StorageResult<Option<Record>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tables.get(kind, id).cloned())
    }

    async fn find_one(&self, kind: EntityKind, predicate: &Predicate) -> StorageResult<Option<Record>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tables.matching(kind, predicate).first().map(|r| (*r).clone()))
    }

    async fn find_many(&self, kind: EntityKind, predicate: &Predicate) -> StorageResult<Vec<Record>> {
        let tables = self
            .tables
            .read()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire read lock: {}", e)))?;

        Ok(tables
            .matching(kind, predicate)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn save(&self, record: Record) -> StorageResult<Record> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire write lock: {}", e)))?;

        tables.check_unique(&record)?;
        tables
            .records
            .entry(record.kind())
            .or_default()
            .insert(record.id(), record.clone());

        Ok(record)
    }

    async fn delete(&self, kind: EntityKind, id: &Uuid) -> StorageResult<bool> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire write lock: {}", e)))?;

        Ok(tables
            .records
            .get_mut(&kind)
            .and_then(|table| table.remove(id))
            .is_some())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> StorageResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|e| StorageError::Unavailable(format!("Failed to acquire write lock: {}", e)))?;

        let mut undo = Vec::with_capacity(ops.len());
        for op in ops {
            if let Err(err) = tables.apply(op, &mut undo) {
                tables.rollback(undo);
                tracing::debug!(error = %err, "batch rolled back");
                return Err(err);
            }
        }

        Ok(())
    }
}
