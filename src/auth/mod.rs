//! Authentication and authorization
//!
//! - [`token`]: signed session tokens
//! - [`password`]: Argon2id hashing
//! - [`directory`]: accounts, login bookkeeping, roles
//! - [`policy`]: the authorization rule table
//! - [`session`]: login, refresh rotation, logout

pub mod directory;
pub mod password;
pub mod policy;
pub mod session;
pub mod token;

pub use directory::{IdentityDirectory, Registration};
pub use password::{HashCost, PasswordService};
pub use policy::{Action, AuthorizationEngine, Decision, Principal, Resource, Rule};
pub use session::{SessionService, SessionTokens, SessionTtl};
pub use token::{Claims, Clock, CredentialService, ManualClock, SystemClock};
