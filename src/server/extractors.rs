//! Axum extractors for authenticated requests and request input
//!
//! `JsonBody`, `PathParams` and `QueryParams` wrap the axum extractors of the
//! same role and reject with `CatalogError::ValidationFailed`, so malformed
//! input gets the catalog's JSON error body and a 400 status.

use crate::auth::policy::Principal;
use crate::core::error::CatalogError;
use crate::server::host::ServerHost;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;

/// Principal resolved from an `Authorization: Bearer <token>` header
///
/// Missing or malformed headers are rejected with `TOKEN_INVALID`; expired
/// tokens with `TOKEN_EXPIRED`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

/// JSON request body
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(CatalogError))]
pub struct JsonBody<T>(pub T);

/// Path segments
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CatalogError))]
pub struct PathParams<T>(pub T);

/// Query string
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CatalogError))]
pub struct QueryParams<T>(pub T);

/// Pull the token out of a bearer header value
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<Arc<ServerHost>> for Authenticated {
    type Rejection = CatalogError;

    async fn from_request_parts(parts: &mut Parts, host: &Arc<ServerHost>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(CatalogError::TokenInvalid)?;

        host.sessions.principal(token).await.map(Authenticated)
    }
}
