//! Catalog use cases and the invariants behind them

pub mod consistency;
pub mod dto;
pub mod service;

pub use consistency::ConsistencyManager;
pub use dto::{
    BookCreate, BookFilter, BookPatch, GenreCreate, GenreUpdate, ReviewCreate, ReviewUpdate,
    VoteRequest,
};
pub use service::CatalogService;
