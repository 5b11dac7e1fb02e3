//! HTTP server for the catalog
//!
//! `ServerBuilder` wires the services into a `ServerHost` and exposes them
//! through the REST router.

pub mod builder;
pub mod exposure;
pub mod extractors;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use extractors::{Authenticated, JsonBody, PathParams, QueryParams};
pub use host::ServerHost;
