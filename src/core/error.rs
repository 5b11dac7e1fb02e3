//! Typed error handling for the catalog core
//!
//! Every operation of the façade returns [`CatalogError`], so callers (the REST
//! layer included) match on specific failures instead of string messages.
//!
//! # Error Categories
//!
//! - [`CatalogError`]: domain failures surfaced to clients
//! - [`StorageError`]: failures reported by a storage backend
//! - [`TokenError`]: failures verifying a session token
//!
//! Storage errors only reach clients through [`CatalogError`]. Unique-constraint
//! violations are mapped to the matching domain error by the consistency layer;
//! everything else becomes [`CatalogError::Fatal`].
//!
//! # Example
//!
//! ```rust,ignore
//! match catalog.create_review(&principal, request).await {
//!     Ok(review) => println!("Created {}", review.id),
//!     Err(CatalogError::DuplicateReview { book_id, .. }) => {
//!         println!("Already reviewed {}", book_id);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::core::entity::EntityKind;

/// The error type returned by every catalog operation
#[derive(Debug)]
pub enum CatalogError {
    /// Entity does not exist; `id` is the key it was looked up by
    NotFound { entity: EntityKind, id: String },

    /// Principal is not allowed to perform the action
    Forbidden { message: String },

    /// Username, email, genre name or slug already taken
    AlreadyExists { message: String },

    /// A book with this title already exists
    DuplicateBook { title: String },

    /// The author already reviewed this book
    DuplicateReview { author_id: Uuid, book_id: Uuid },

    /// One or more genre ids did not resolve
    GenreNotFound { ids: Vec<Uuid> },

    /// Genre is still referenced by at least one book
    GenreInUse { id: Uuid },

    /// Unknown user, wrong password, locked or inactive account
    InvalidCredentials,

    /// Session token was valid but has expired
    TokenExpired,

    /// Session token is malformed, tampered with, or revoked
    TokenInvalid,

    /// Input failed validation
    ValidationFailed(Vec<FieldValidationError>),

    /// Unexpected internal failure; details are logged, never returned
    Fatal(String),
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotFound { entity, id } => {
                write!(f, "{} with id '{}' not found", entity, id)
            }
            CatalogError::Forbidden { message } => write!(f, "Forbidden: {}", message),
            CatalogError::AlreadyExists { message } => write!(f, "{}", message),
            CatalogError::DuplicateBook { title } => {
                write!(f, "A book titled '{}' already exists", title)
            }
            CatalogError::DuplicateReview { author_id, book_id } => {
                write!(
                    f,
                    "Account '{}' has already reviewed book '{}'",
                    author_id, book_id
                )
            }
            CatalogError::GenreNotFound { ids } => {
                let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
                write!(f, "Genres not found: {}", ids.join(", "))
            }
            CatalogError::GenreInUse { id } => {
                write!(f, "Genre '{}' is still assigned to books", id)
            }
            CatalogError::InvalidCredentials => write!(f, "Invalid username or password"),
            CatalogError::TokenExpired => write!(f, "Session expired, please sign in again"),
            CatalogError::TokenInvalid => write!(f, "Invalid session token"),
            CatalogError::ValidationFailed(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            CatalogError::Fatal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CatalogError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CatalogError::Forbidden {
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        CatalogError::AlreadyExists {
            message: message.into(),
        }
    }

    /// Single-field validation failure
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CatalogError::ValidationFailed(vec![FieldValidationError::new(field, message)])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CatalogError::AlreadyExists { .. }
            | CatalogError::DuplicateBook { .. }
            | CatalogError::DuplicateReview { .. }
            | CatalogError::GenreInUse { .. } => StatusCode::CONFLICT,
            CatalogError::GenreNotFound { .. } | CatalogError::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::InvalidCredentials
            | CatalogError::TokenExpired
            | CatalogError::TokenInvalid => StatusCode::UNAUTHORIZED,
            CatalogError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::NotFound { .. } => "NOT_FOUND",
            CatalogError::Forbidden { .. } => "FORBIDDEN",
            CatalogError::AlreadyExists { .. } => "ALREADY_EXISTS",
            CatalogError::DuplicateBook { .. } => "DUPLICATE_BOOK",
            CatalogError::DuplicateReview { .. } => "DUPLICATE_REVIEW",
            CatalogError::GenreNotFound { .. } => "GENRE_NOT_FOUND",
            CatalogError::GenreInUse { .. } => "GENRE_IN_USE",
            CatalogError::InvalidCredentials => "INVALID_CREDENTIALS",
            CatalogError::TokenExpired => "TOKEN_EXPIRED",
            CatalogError::TokenInvalid => "TOKEN_INVALID",
            CatalogError::ValidationFailed(_) => "VALIDATION_FAILED",
            CatalogError::Fatal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    ///
    /// `Fatal` is logged here and replaced by a generic message.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            CatalogError::Fatal(detail) => {
                tracing::error!(detail = %detail, "fatal catalog error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    /// Get additional details for the error
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            CatalogError::NotFound { entity, id } => Some(serde_json::json!({
                "entity": entity.as_str(),
                "id": id
            })),
            CatalogError::DuplicateReview { author_id, book_id } => Some(serde_json::json!({
                "author_id": author_id.to_string(),
                "book_id": book_id.to_string()
            })),
            CatalogError::GenreNotFound { ids } => Some(serde_json::json!({
                "ids": ids.iter().map(Uuid::to_string).collect::<Vec<_>>()
            })),
            CatalogError::ValidationFailed(errors) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by storage backends
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// A unique constraint rejected the write
    #[error("unique constraint '{constraint}' violated by '{value}'")]
    UniqueViolation {
        constraint: &'static str,
        value: String,
    },

    /// Update or delete targeted a missing record
    #[error("{kind} with id '{id}' does not exist")]
    NotFound { kind: EntityKind, id: Uuid },

    /// Insert targeted an existing id
    #[error("{kind} with id '{id}' already exists")]
    Duplicate { kind: EntityKind, id: Uuid },

    /// Stored state no longer allows the write (token already revoked, account locked)
    #[error("write conflict: {0}")]
    Conflict(String),

    /// A batch would break a stored invariant (negative counters, kind mismatch)
    #[error("data integrity error: {0}")]
    Integrity(String),

    /// Backend cannot serve the request
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Constraint name when this is a unique violation
    pub fn violated_constraint(&self) -> Option<&'static str> {
        match self {
            StorageError::UniqueViolation { constraint, .. } => Some(constraint),
            _ => None,
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        CatalogError::Fatal(err.to_string())
    }
}

// =============================================================================
// Token Errors
// =============================================================================

/// Reasons a session token fails verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature verified but the token is past its expiry
    #[error("token expired")]
    Expired,

    /// Bad signature, unsupported header or unreadable claims
    #[error("token invalid")]
    Invalid,

    /// Wrong number of segments or undecodable encoding
    #[error("token malformed")]
    Malformed,
}

impl From<TokenError> for CatalogError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => CatalogError::TokenExpired,
            TokenError::Invalid | TokenError::Malformed => CatalogError::TokenInvalid,
        }
    }
}

impl From<validator::ValidationErrors> for CatalogError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CatalogError::ValidationFailed(crate::core::validation::collect_field_errors(&errors))
    }
}

// Extractor rejections are reported against the request part that failed.

impl From<JsonRejection> for CatalogError {
    fn from(rejection: JsonRejection) -> Self {
        CatalogError::invalid_field("body", rejection.body_text())
    }
}

impl From<PathRejection> for CatalogError {
    fn from(rejection: PathRejection) -> Self {
        CatalogError::invalid_field("path", rejection.body_text())
    }
}

impl From<QueryRejection> for CatalogError {
    fn from(rejection: QueryRejection) -> Self {
        CatalogError::invalid_field("query", rejection.body_text())
    }
}
