//! REST API exposure
//!
//! The REST exposure consumes a `ServerHost` and produces an Axum `Router`.
//! Reads are public; every mutation requires a bearer token.

pub mod handlers;

use super::super::host::ServerHost;
use anyhow::Result;
use axum::routing::{get, post};
use axum::{Json, Router};
use handlers::*;
use serde_json::{Value, json};
use std::sync::Arc;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host, merging `custom_routes` last
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut app = Self::health_routes()
            .merge(Self::auth_routes(host.clone()))
            .merge(Self::catalog_routes(host));

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app)
    }

    fn auth_routes(host: Arc<ServerHost>) -> Router {
        Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .route("/accounts/{id}/roles", post(grant_role))
            .route("/accounts/{id}/roles/{role}", axum::routing::delete(revoke_role))
            .route("/accounts/{id}/unlock", post(unlock_account))
            .route("/accounts/{id}/reviews", get(list_author_reviews))
            .with_state(host)
    }

    fn catalog_routes(host: Arc<ServerHost>) -> Router {
        Router::new()
            .route("/books", get(list_books).post(create_book))
            .route(
                "/books/{id}",
                get(get_book).patch(update_book).delete(delete_book),
            )
            .route("/books/{id}/reviews", get(list_book_reviews))
            .route("/reviews", post(create_review))
            .route(
                "/reviews/{id}",
                get(get_review).patch(update_review).delete(delete_review),
            )
            .route("/reviews/{id}/votes", post(vote_review))
            .route("/genres", get(list_genres).post(create_genre))
            .route(
                "/genres/{id}",
                get(get_genre).patch(update_genre).delete(delete_genre),
            )
            .route("/genres/{id}/deactivate", post(deactivate_genre))
            .route("/genres/slug/{slug}", get(get_genre_by_slug))
            .with_state(host)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "bookreview"
        }))
    }
}
