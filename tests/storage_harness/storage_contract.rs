//! Macro-generated test suite for `Storage` contract validation.
//!
//! The `storage_contract_tests!` macro generates a test module that validates
//! any `Storage` implementation against the behavior the catalog relies on:
//! record CRUD, predicate queries, unique constraints, atomic batches and
//! in-place counter adjustments under concurrency.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use bookreview::storage::InMemoryStorage;
//!
//! storage_contract_tests!(InMemoryStorage::new());
//! ```
//!
//! # Generated Tests
//!
//! ## CRUD
//! - `test_save_and_get`: save then retrieve, verify all fields
//! - `test_get_nonexistent`: unknown id returns None
//! - `test_delete_reports_existence`: delete returns whether the record existed
//!
//! ## Queries
//! - `test_find_many_by_field`: equality predicates select the right records
//! - `test_find_many_contains`: list fields match by membership
//! - `test_find_one_none`: no match returns None
//!
//! ## Constraints and batches
//! - `test_unique_constraint_on_save`: genre slug clash rejected
//! - `test_unique_constraint_in_batch`: review (author, book) clash rejected
//! - `test_insert_existing_id_rejected`: Insert on a present id fails
//! - `test_update_missing_rejected`: Update on an absent id fails
//! - `test_batch_is_atomic`: a failing op undoes the earlier ones
//! - `test_update_keeps_counters`: Update never overwrites counters
//!
//! ## Stored-state operations
//! - `test_revise_review_diffs_against_stored_rating`: stale edits keep the sum exact
//! - `test_remove_review_uses_stored_rating`: removal subtracts what is stored
//! - `test_remove_book_cascades`: reviews and votes go with the book
//! - `test_cast_vote_transitions`: first vote, repeat and flip
//! - `test_revoke_refresh_token_once`: a second revocation conflicts
//! - `test_revoke_account_tokens`: only the account's live tokens are revoked
//!
//! ## Concurrency
//! - `test_concurrent_rating_adjustments`: no lost increments
//! - `test_concurrent_unique_inserts`: exactly one of two clashing inserts wins
//! - `test_concurrent_login_failures`: every failure counts toward the lock
//! - `test_concurrent_votes_by_one_voter`: one voter moves the counters once

/// Generate a full `Storage` conformance test suite.
///
/// `$factory` must evaluate to a fresh `Storage + Clone + 'static` instance.
/// It is re-evaluated for each test to ensure isolation.
#[macro_export]
macro_rules! storage_contract_tests {
    ($factory:expr) => {
        mod storage_contract_tests {
            use super::*;
            use bookreview::core::{
                Entity, EntityKind, Predicate, Storage, StorageError, StorageExt, WriteOp,
            };
            use bookreview::entities::{
                Account, AccountChange, Book, Genre, HelpfulnessVote, RefreshToken, Review,
            };
            use std::sync::Arc;
            use uuid::Uuid;

            fn storage() -> Arc<dyn Storage> {
                Arc::new($factory)
            }

            async fn stored_book(storage: &Arc<dyn Storage>, id: Uuid) -> Book {
                storage.load::<Book>(&id).await.unwrap().unwrap()
            }

            async fn stored_review(storage: &Arc<dyn Storage>, id: Uuid) -> Review {
                storage.load::<Review>(&id).await.unwrap().unwrap()
            }

            /// Book holding one review with `rating`, counted in its aggregate
            async fn reviewed_book(storage: &Arc<dyn Storage>, rating: u8) -> (Book, Review) {
                let book = storage
                    .save_entity(Book::new("Dune", Uuid::new_v4()))
                    .await
                    .unwrap();
                let review = Review::new(Uuid::new_v4(), book.id, rating, "t", "c");
                storage
                    .commit(vec![
                        WriteOp::insert(review.clone()),
                        WriteOp::AdjustBookRatings {
                            book_id: book.id,
                            review_delta: 1,
                            rating_delta: i64::from(rating),
                        },
                    ])
                    .await
                    .unwrap();
                (book, review)
            }

            // ==================================================================
            // CRUD
            // ==================================================================

            #[tokio::test]
            async fn test_save_and_get() {
                let storage = storage();
                let genre = Genre::new("Poetry", "poetry", Some("Verse".into()));

                storage.save_entity(genre.clone()).await.unwrap();

                let loaded: Genre = storage.load(&genre.id).await.unwrap().unwrap();
                assert_eq!(loaded, genre);
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let storage = storage();
                let record = storage.get(EntityKind::Book, &Uuid::new_v4()).await.unwrap();
                assert!(record.is_none());
            }

            #[tokio::test]
            async fn test_delete_reports_existence() {
                let storage = storage();
                let genre = storage
                    .save_entity(Genre::new("Poetry", "poetry", None))
                    .await
                    .unwrap();

                assert!(storage.delete(Genre::KIND, &genre.id).await.unwrap());
                assert!(!storage.delete(Genre::KIND, &genre.id).await.unwrap());
                assert!(storage.load::<Genre>(&genre.id).await.unwrap().is_none());
            }

            // ==================================================================
            // Queries
            // ==================================================================

            #[tokio::test]
            async fn test_find_many_by_field() {
                let storage = storage();
                let book = Book::new("Dune", Uuid::new_v4());
                storage.save_entity(book.clone()).await.unwrap();

                let author = Uuid::new_v4();
                for (i, rating) in [5u8, 3, 4].into_iter().enumerate() {
                    let reviewer = if i == 0 { author } else { Uuid::new_v4() };
                    storage
                        .save_entity(Review::new(reviewer, book.id, rating, "t", "c"))
                        .await
                        .unwrap();
                }

                let for_book: Vec<Review> = storage
                    .find_many_as(&Predicate::eq("book_id", book.id))
                    .await
                    .unwrap();
                assert_eq!(for_book.len(), 3);

                let by_author: Vec<Review> = storage
                    .find_many_as(
                        &Predicate::eq("book_id", book.id).and(Predicate::eq("author_id", author)),
                    )
                    .await
                    .unwrap();
                assert_eq!(by_author.len(), 1);
                assert_eq!(by_author[0].rating, 5);
            }

            #[tokio::test]
            async fn test_find_many_contains() {
                let storage = storage();
                let genre = Uuid::new_v4();
                let mut tagged = Book::new("Odes", Uuid::new_v4());
                tagged.genre_ids.insert(genre);
                storage.save_entity(tagged.clone()).await.unwrap();
                storage
                    .save_entity(Book::new("Untagged", Uuid::new_v4()))
                    .await
                    .unwrap();

                let found: Vec<Book> = storage
                    .find_many_as(&Predicate::contains("genre_ids", genre))
                    .await
                    .unwrap();
                assert_eq!(found.len(), 1);
                assert_eq!(found[0].id, tagged.id);
            }

            #[tokio::test]
            async fn test_find_one_none() {
                let storage = storage();
                let found = storage
                    .find_one_as::<Genre>(&Predicate::eq("slug", "missing"))
                    .await
                    .unwrap();
                assert!(found.is_none());
            }

            // ==================================================================
            // Constraints and batches
            // ==================================================================

            #[tokio::test]
            async fn test_unique_constraint_on_save() {
                let storage = storage();
                storage
                    .save_entity(Genre::new("Poetry", "poetry", None))
                    .await
                    .unwrap();

                let err = storage
                    .save_entity(Genre::new("Verse", "poetry", None))
                    .await
                    .unwrap_err();
                assert_eq!(err.violated_constraint(), Some("genre.slug"));
            }

            #[tokio::test]
            async fn test_unique_constraint_in_batch() {
                let storage = storage();
                let (author, book) = (Uuid::new_v4(), Uuid::new_v4());
                storage
                    .commit(vec![WriteOp::insert(Review::new(author, book, 4, "a", ""))])
                    .await
                    .unwrap();

                let err = storage
                    .commit(vec![WriteOp::insert(Review::new(author, book, 2, "b", ""))])
                    .await
                    .unwrap_err();
                assert_eq!(err.violated_constraint(), Some("review.author_book"));
            }

            #[tokio::test]
            async fn test_insert_existing_id_rejected() {
                let storage = storage();
                let genre = Genre::new("Poetry", "poetry", None);
                storage.commit(vec![WriteOp::insert(genre.clone())]).await.unwrap();

                let result = storage.commit(vec![WriteOp::insert(genre)]).await;
                assert!(matches!(result, Err(StorageError::Duplicate { .. })));
            }

            #[tokio::test]
            async fn test_update_missing_rejected() {
                let storage = storage();
                let result = storage
                    .commit(vec![WriteOp::update(Genre::new("Poetry", "poetry", None))])
                    .await;
                assert!(matches!(result, Err(StorageError::NotFound { .. })));
            }

            #[tokio::test]
            async fn test_batch_is_atomic() {
                let storage = storage();
                let book = storage
                    .save_entity(Book::new("Dune", Uuid::new_v4()))
                    .await
                    .unwrap();
                let review = Review::new(Uuid::new_v4(), book.id, 4, "t", "");

                let result = storage
                    .commit(vec![
                        WriteOp::insert(review.clone()),
                        WriteOp::AdjustBookRatings {
                            book_id: book.id,
                            review_delta: 1,
                            rating_delta: 4,
                        },
                        WriteOp::AdjustBookRatings {
                            book_id: Uuid::new_v4(),
                            review_delta: 1,
                            rating_delta: 4,
                        },
                    ])
                    .await;

                assert!(result.is_err());
                assert!(storage.load::<Review>(&review.id).await.unwrap().is_none());
                let book = stored_book(&storage, book.id).await;
                assert_eq!((book.review_count, book.total_rating_sum), (0, 0));
            }

            #[tokio::test]
            async fn test_update_keeps_counters() {
                let storage = storage();
                let book = storage
                    .save_entity(Book::new("Dune", Uuid::new_v4()))
                    .await
                    .unwrap();
                storage
                    .commit(vec![WriteOp::AdjustBookRatings {
                        book_id: book.id,
                        review_delta: 2,
                        rating_delta: 7,
                    }])
                    .await
                    .unwrap();

                let mut edited = book.clone();
                edited.subtitle = Some("Book One".into());
                storage.commit(vec![WriteOp::update(edited)]).await.unwrap();

                let stored = stored_book(&storage, book.id).await;
                assert_eq!(stored.subtitle.as_deref(), Some("Book One"));
                assert_eq!((stored.review_count, stored.total_rating_sum), (2, 7));
            }

            // ==================================================================
            // Stored-state operations
            // ==================================================================

            #[tokio::test]
            async fn test_revise_review_diffs_against_stored_rating() {
                let storage = storage();
                let (book, loaded) = reviewed_book(&storage, 3).await;

                let mut first = loaded.clone();
                first.rating = 5;
                let mut second = loaded.clone();
                second.rating = 4;
                storage.commit(vec![WriteOp::ReviseReview(first)]).await.unwrap();
                storage.commit(vec![WriteOp::ReviseReview(second)]).await.unwrap();

                assert_eq!(stored_review(&storage, loaded.id).await.rating, 4);
                let book = stored_book(&storage, book.id).await;
                assert_eq!((book.review_count, book.total_rating_sum), (1, 4));
            }

            #[tokio::test]
            async fn test_remove_review_uses_stored_rating() {
                let storage = storage();
                let (book, loaded) = reviewed_book(&storage, 2).await;
                let mut edited = loaded.clone();
                edited.rating = 5;
                storage.commit(vec![WriteOp::ReviseReview(edited)]).await.unwrap();
                storage
                    .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(Uuid::new_v4(), loaded.id, true))])
                    .await
                    .unwrap();

                storage
                    .commit(vec![WriteOp::RemoveReview { review_id: loaded.id }])
                    .await
                    .unwrap();

                let book = stored_book(&storage, book.id).await;
                assert_eq!((book.review_count, book.total_rating_sum), (0, 0));
                let votes: Vec<HelpfulnessVote> = storage
                    .find_many_as(&Predicate::eq("review_id", loaded.id))
                    .await
                    .unwrap();
                assert!(votes.is_empty());
            }

            #[tokio::test]
            async fn test_remove_book_cascades() {
                let storage = storage();
                let (book, review) = reviewed_book(&storage, 4).await;
                let (other_book, other_review) = reviewed_book(&storage, 5).await;
                for target in [review.id, other_review.id] {
                    storage
                        .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(Uuid::new_v4(), target, false))])
                        .await
                        .unwrap();
                }

                storage
                    .commit(vec![WriteOp::RemoveBook { book_id: book.id }])
                    .await
                    .unwrap();

                assert!(storage.load::<Book>(&book.id).await.unwrap().is_none());
                assert!(storage.load::<Review>(&review.id).await.unwrap().is_none());
                let votes: Vec<HelpfulnessVote> = storage.find_many_as(&Predicate::All).await.unwrap();
                assert_eq!(votes.len(), 1);
                assert_eq!(votes[0].review_id, other_review.id);
                assert_eq!(stored_book(&storage, other_book.id).await.review_count, 1);

                let again = storage.commit(vec![WriteOp::RemoveBook { book_id: book.id }]).await;
                assert!(matches!(again, Err(StorageError::NotFound { .. })));
            }

            #[tokio::test]
            async fn test_cast_vote_transitions() {
                let storage = storage();
                let (_, review) = reviewed_book(&storage, 4).await;
                let voter = Uuid::new_v4();
                let counts = |r: Review| (r.helpful_count, r.not_helpful_count);

                storage
                    .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(voter, review.id, true))])
                    .await
                    .unwrap();
                assert_eq!(counts(stored_review(&storage, review.id).await), (1, 0));

                storage
                    .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(voter, review.id, true))])
                    .await
                    .unwrap();
                assert_eq!(counts(stored_review(&storage, review.id).await), (1, 0));

                storage
                    .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(voter, review.id, false))])
                    .await
                    .unwrap();
                assert_eq!(counts(stored_review(&storage, review.id).await), (0, 1));

                let votes: Vec<HelpfulnessVote> = storage.find_many_as(&Predicate::All).await.unwrap();
                assert_eq!(votes.len(), 1);
                assert!(!votes[0].helpful);
            }

            #[tokio::test]
            async fn test_revoke_refresh_token_once() {
                let storage = storage();
                let token = storage
                    .save_entity(RefreshToken::new("t1", Uuid::new_v4(), chrono::Utc::now()))
                    .await
                    .unwrap();

                storage
                    .commit(vec![WriteOp::RevokeRefreshToken { token_id: token.id }])
                    .await
                    .unwrap();
                let again = storage
                    .commit(vec![WriteOp::RevokeRefreshToken { token_id: token.id }])
                    .await;
                assert!(matches!(again, Err(StorageError::Conflict(_))));
            }

            #[tokio::test]
            async fn test_revoke_account_tokens() {
                let storage = storage();
                let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());
                let expires = chrono::Utc::now();
                for (token, account) in [("a", owner), ("b", owner), ("c", stranger)] {
                    storage
                        .save_entity(RefreshToken::new(token, account, expires))
                        .await
                        .unwrap();
                }

                storage
                    .commit(vec![WriteOp::RevokeAccountTokens { account_id: owner }])
                    .await
                    .unwrap();

                let live: Vec<RefreshToken> = storage
                    .find_many_as(&Predicate::eq("revoked", false))
                    .await
                    .unwrap();
                assert_eq!(live.len(), 1);
                assert_eq!(live[0].account_id, stranger);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_rating_adjustments() {
                let storage = storage();
                let book = storage
                    .save_entity(Book::new("Dune", Uuid::new_v4()))
                    .await
                    .unwrap();
                let book_id = book.id;

                let handles: Vec<_> = (0..20)
                    .map(|_| {
                        let storage = storage.clone();
                        tokio::spawn(async move {
                            storage
                                .commit(vec![WriteOp::AdjustBookRatings {
                                    book_id,
                                    review_delta: 1,
                                    rating_delta: 3,
                                }])
                                .await
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap().unwrap();
                }

                let book = stored_book(&storage, book_id).await;
                assert_eq!((book.review_count, book.total_rating_sum), (20, 60));
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_concurrent_unique_inserts() {
                let storage = storage();
                let (author, book) = (Uuid::new_v4(), Uuid::new_v4());

                let spawn_insert = |rating: u8| {
                    let storage = storage.clone();
                    tokio::spawn(async move {
                        storage
                            .commit(vec![WriteOp::insert(Review::new(author, book, rating, "t", ""))])
                            .await
                    })
                };
                let (a, b) = tokio::join!(spawn_insert(1), spawn_insert(5));
                let results = [a.unwrap(), b.unwrap()];

                assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
                let stored: Vec<Review> = storage
                    .find_many_as(&Predicate::eq("book_id", book))
                    .await
                    .unwrap();
                assert_eq!(stored.len(), 1);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_login_failures() {
                let storage = storage();
                let account = storage
                    .save_entity(Account::new("ada", "ada@example.com", "h", "Ada", "L"))
                    .await
                    .unwrap();
                let account_id = account.id;

                let handles: Vec<_> = (0..20)
                    .map(|_| {
                        let storage = storage.clone();
                        tokio::spawn(async move {
                            storage
                                .commit(vec![WriteOp::UpdateAccount {
                                    account_id,
                                    change: AccountChange::LoginFailed { max_failures: 5 },
                                }])
                                .await
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap().unwrap();
                }

                let account: Account = storage.load(&account_id).await.unwrap().unwrap();
                assert_eq!(account.failed_login_attempts, 20);
                assert!(account.locked);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
            async fn test_concurrent_votes_by_one_voter() {
                let storage = storage();
                let (_, review) = reviewed_book(&storage, 4).await;
                let (voter, review_id) = (Uuid::new_v4(), review.id);

                let spawn_vote = || {
                    let storage = storage.clone();
                    tokio::spawn(async move {
                        storage
                            .commit(vec![WriteOp::CastVote(HelpfulnessVote::new(voter, review_id, true))])
                            .await
                    })
                };
                let (a, b) = tokio::join!(spawn_vote(), spawn_vote());
                a.unwrap().unwrap();
                b.unwrap().unwrap();

                let review = stored_review(&storage, review_id).await;
                assert_eq!((review.helpful_count, review.not_helpful_count), (1, 0));
            }
        }
    };
}
