//! Catalog entity types
//!
//! Every entity references others by id only. There is no object graph to
//! traverse: callers load what they need through [`Storage`](crate::core::Storage).

pub mod account;
pub mod book;
pub mod genre;
pub mod macros;
pub mod refresh_token;
pub mod review;

pub use account::{Account, AccountChange, AccountProfile, Role};
pub use book::{Book, BookStatus, BookView};
pub use genre::Genre;
pub use refresh_token::RefreshToken;
pub use review::{HelpfulnessVote, Review};
