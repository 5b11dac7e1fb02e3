//! Core module containing fundamental traits and types for the catalog

pub mod entity;
pub mod error;
pub mod field;
pub mod query;
pub mod service;
pub mod validation;

pub use entity::{Entity, EntityKind, Record, UniqueKey};
pub use error::{CatalogError, ErrorResponse, FieldValidationError, StorageError, TokenError};
pub use field::{FieldFormat, FieldValue};
pub use query::{PageRequest, Paginated, PaginationMeta, Predicate};
pub use service::{Storage, StorageExt, StorageResult, WriteOp};
pub use validation::FieldErrors;
