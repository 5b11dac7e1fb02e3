//! # Book Review Catalog
//!
//! Authorization and consistency core of a book-review catalog: accounts post
//! books, other accounts review them once per book, and every book carries an
//! aggregate rating that always matches its reviews.
//!
//! ## Features
//!
//! - **Signed Sessions**: HMAC-SHA256 access tokens with rotating refresh tokens
//! - **Central Authorization**: one rule table for books, reviews, genres and roles
//! - **Consistent Aggregates**: rating and vote counters move in the same atomic
//!   batch as the rows that cause them
//! - **Typed Errors**: every operation returns [`CatalogError`](core::CatalogError)
//!   with a fixed HTTP mapping
//! - **Pluggable Storage**: anything implementing [`Storage`](core::Storage)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookreview::prelude::*;
//!
//! let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
//! let catalog = CatalogService::new(storage.clone());
//!
//! let book = catalog
//!     .create_book(&principal, BookCreate::new("The Left Hand of Darkness"))
//!     .await?;
//! let review = catalog
//!     .create_review(&reader, ReviewCreate::new(book.id, 5, "Remarkable", "A classic."))
//!     .await?;
//!
//! assert_eq!(catalog.get_book(book.id).await?.average_rating, Some(5.0));
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        CatalogError, Entity, EntityKind, FieldFormat, FieldValue, PageRequest, Paginated,
        PaginationMeta, Predicate, Record, Storage, StorageError, StorageExt, TokenError, WriteOp,
    };

    // === Entities ===
    pub use crate::entities::{
        Account, AccountChange, AccountProfile, Book, BookStatus, BookView, Genre, HelpfulnessVote,
        RefreshToken, Review, Role,
    };

    // === Auth ===
    pub use crate::auth::{
        Action, AuthorizationEngine, Clock, CredentialService, HashCost, IdentityDirectory,
        ManualClock, PasswordService, Principal, Registration, Resource, SessionService,
        SessionTokens, SessionTtl, SystemClock,
    };

    // === Catalog ===
    pub use crate::catalog::{
        BookCreate, BookFilter, BookPatch, CatalogService, ConsistencyManager, GenreCreate,
        GenreUpdate, ReviewCreate, ReviewUpdate,
    };

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStorage;

    // === Config ===
    pub use crate::config::CatalogConfig;

    // === Server ===
    pub use crate::server::{Authenticated, RestExposure, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
    pub use uuid::Uuid;
}
