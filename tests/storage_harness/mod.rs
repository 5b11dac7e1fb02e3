//! Shared test harness for catalog integration tests
//!
//! Provides account seeding, cheap password hashing, a ready-made
//! [`TestCatalog`] and the `storage_contract_tests!` macro that validates any
//! [`Storage`] backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod storage_contract;

use std::sync::Arc;
use uuid::Uuid;

use bookreview::auth::{HashCost, PasswordService, Principal};
use bookreview::catalog::{BookCreate, CatalogService, GenreCreate};
use bookreview::config::CatalogConfig;
use bookreview::core::{Storage, StorageExt};
use bookreview::entities::{Account, BookView, Genre, Role};
use bookreview::storage::InMemoryStorage;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "secret1";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Argon2 parameters small enough for tests
pub fn cheap_cost() -> HashCost {
    HashCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn cheap_passwords() -> PasswordService {
    PasswordService::new(cheap_cost()).unwrap()
}

/// Valid configuration with a test secret and cheap hashing
pub fn test_config() -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.auth.token_secret = TEST_SECRET.to_string();
    let cost = cheap_cost();
    config.password.memory_kib = cost.memory_kib;
    config.password.iterations = cost.iterations;
    config.password.parallelism = cost.parallelism;
    config
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Store an account holding `READER` plus `extra_roles` and return its principal
///
/// The stored hash is not a real password hash; use the directory to create
/// accounts that must log in.
pub async fn seed_account(storage: &Arc<dyn Storage>, username: &str, extra_roles: &[Role]) -> Principal {
    let mut account = Account::new(
        username,
        format!("{}@example.com", username),
        "not-a-hash",
        "Test",
        "User",
    );
    account.roles.extend(extra_roles.iter().copied());
    let account = storage.save_entity(account).await.unwrap();
    Principal::from(&account)
}

// ---------------------------------------------------------------------------
// Catalog fixture
// ---------------------------------------------------------------------------

/// Catalog over a fresh in-memory store with one account per role
pub struct TestCatalog {
    pub storage: Arc<dyn Storage>,
    pub catalog: CatalogService,
    pub author: Principal,
    pub reader: Principal,
    pub moderator: Principal,
    pub admin: Principal,
}

impl TestCatalog {
    pub async fn new() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let author = seed_account(&storage, "author", &[]).await;
        let reader = seed_account(&storage, "reader", &[]).await;
        let moderator = seed_account(&storage, "moderator", &[Role::Moderator]).await;
        let admin = seed_account(&storage, "admin", &[Role::Admin]).await;

        Self {
            catalog: CatalogService::new(storage.clone()),
            storage,
            author,
            reader,
            moderator,
            admin,
        }
    }

    /// Another plain `READER` account
    pub async fn extra_reader(&self, username: &str) -> Principal {
        seed_account(&self.storage, username, &[]).await
    }

    /// Book owned by `self.author`
    pub async fn book(&self, title: &str) -> BookView {
        self.catalog
            .create_book(&self.author, BookCreate::new(title))
            .await
            .unwrap()
    }

    pub async fn genre(&self, name: &str) -> Genre {
        self.catalog
            .create_genre(&self.admin, GenreCreate::new(name))
            .await
            .unwrap()
    }
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// Assert a book's rating aggregate as (review_count, total_rating_sum)
pub fn assert_aggregate(book: &BookView, count: u64, sum: u64) {
    assert_eq!(
        (book.review_count, book.total_rating_sum),
        (count, sum),
        "unexpected aggregate on book '{}'",
        book.title
    );
    match count {
        0 => assert_eq!(book.average_rating, None),
        n => assert_eq!(book.average_rating, Some(sum as f64 / n as f64)),
    }
}

pub fn random_id() -> Uuid {
    Uuid::new_v4()
}
