//! Storage trait and typed helpers over it

use crate::core::entity::{Entity, EntityKind, Record};
use crate::core::error::StorageError;
use crate::core::query::Predicate;
use crate::entities::{AccountChange, HelpfulnessVote, Review};
use async_trait::async_trait;
use uuid::Uuid;

pub type StorageResult<T> = Result<T, StorageError>;

/// One write inside an atomic [`Storage::commit`] batch
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create a record; fails with [`StorageError::Duplicate`] if the id exists
    Insert(Record),

    /// Replace an existing record; fails with [`StorageError::NotFound`] otherwise.
    /// Aggregate counters (book ratings, review votes) keep their stored values;
    /// only the review and vote operations below move them.
    Update(Record),

    /// Remove an existing record; fails with [`StorageError::NotFound`] otherwise
    Delete { kind: EntityKind, id: Uuid },

    /// Increment a book's rating counters in place
    AdjustBookRatings {
        book_id: Uuid,
        review_delta: i64,
        rating_delta: i64,
    },

    /// Replace a stored review, moving its book's rating sum by the difference
    /// between the stored rating and the new one
    ReviseReview(Review),

    /// Remove a review with its votes and take its stored rating off the book
    RemoveReview { review_id: Uuid },

    /// Remove a book together with every review and vote on it
    RemoveBook { book_id: Uuid },

    /// Record a vote: a first vote bumps one counter, a changed vote moves one
    /// count across, repeating the stored vote changes nothing
    CastVote(HelpfulnessVote),

    /// Apply a login outcome or role change to the stored account; fails with
    /// [`StorageError::Conflict`] if the account refuses it
    UpdateAccount {
        account_id: Uuid,
        change: AccountChange,
    },

    /// Mark one refresh token revoked; fails with [`StorageError::Conflict`]
    /// if it already is
    RevokeRefreshToken { token_id: Uuid },

    /// Mark every live refresh token of an account revoked
    RevokeAccountTokens { account_id: Uuid },
}

impl WriteOp {
    pub fn insert<T: Entity>(entity: T) -> Self {
        WriteOp::Insert(entity.into_record())
    }

    pub fn update<T: Entity>(entity: T) -> Self {
        WriteOp::Update(entity.into_record())
    }

    pub fn delete<T: Entity>(id: Uuid) -> Self {
        WriteOp::Delete { kind: T::KIND, id }
    }
}

/// Object store used by the catalog core
///
/// Implementations must enforce every [`UniqueKey`](crate::core::entity::UniqueKey)
/// a record declares, and `commit` must apply a batch all-or-nothing. Every op
/// other than `Insert`, `Update` and `Delete` is a read-modify-write the backend
/// performs against its own stored state, so concurrent batches never lose an
/// increment or act on a stale snapshot.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a record by kind and id
    async fn get(&self, kind: EntityKind, id: &Uuid) -> StorageResult<Option<Record>>;

    /// First record matching the predicate, in creation order
    async fn find_one(&self, kind: EntityKind, predicate: &Predicate) -> StorageResult<Option<Record>>;

    /// Every matching record, ordered by creation time then id
    async fn find_many(&self, kind: EntityKind, predicate: &Predicate) -> StorageResult<Vec<Record>>;

    /// Insert or replace a single record
    async fn save(&self, record: Record) -> StorageResult<Record>;

    /// Delete a record, returning whether it existed
    async fn delete(&self, kind: EntityKind, id: &Uuid) -> StorageResult<bool>;

    /// Apply a batch atomically
    async fn commit(&self, ops: Vec<WriteOp>) -> StorageResult<()>;
}

/// Typed access on top of [`Storage`]
#[async_trait]
pub trait StorageExt: Storage {
    async fn load<T: Entity>(&self, id: &Uuid) -> StorageResult<Option<T>> {
        let record = self.get(T::KIND, id).await?;
        record.map(downcast::<T>).transpose()
    }

    async fn find_one_as<T: Entity>(&self, predicate: &Predicate) -> StorageResult<Option<T>> {
        let record = self.find_one(T::KIND, predicate).await?;
        record.map(downcast::<T>).transpose()
    }

    async fn find_many_as<T: Entity>(&self, predicate: &Predicate) -> StorageResult<Vec<T>> {
        self.find_many(T::KIND, predicate)
            .await?
            .into_iter()
            .map(downcast::<T>)
            .collect()
    }

    async fn save_entity<T: Entity>(&self, entity: T) -> StorageResult<T> {
        let record = self.save(entity.into_record()).await?;
        downcast::<T>(record)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

fn downcast<T: Entity>(record: Record) -> StorageResult<T> {
    let kind = record.kind();
    T::from_record(record).ok_or_else(|| {
        StorageError::Integrity(format!(
            "expected {} record, backend returned {}",
            T::KIND,
            kind
        ))
    })
}
