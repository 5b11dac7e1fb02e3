//! HTTP handlers
//!
//! Handlers only translate between HTTP and the services on [`ServerHost`];
//! every failure leaves as a [`CatalogError`] response.

use crate::auth::directory::Registration;
use crate::auth::session::SessionTokens;
use crate::catalog::dto::{
    BookCreate, BookFilter, BookPatch, GenreCreate, GenreUpdate, ReviewCreate, ReviewUpdate,
    VoteRequest,
};
use crate::core::error::CatalogError;
use crate::core::query::{PageRequest, Paginated};
use crate::entities::{AccountProfile, BookView, Genre, Review, Role};
use crate::server::extractors::{Authenticated, JsonBody, PathParams, QueryParams};
use crate::server::host::ServerHost;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

type HostState = State<Arc<ServerHost>>;
type ApiResult<T> = Result<T, CatalogError>;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn register(
    State(host): HostState,
    JsonBody(registration): JsonBody<Registration>,
) -> ApiResult<(StatusCode, Json<AccountProfile>)> {
    let profile = host.directory().register(registration).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login(State(host): HostState, JsonBody(request): JsonBody<LoginRequest>) -> ApiResult<Json<SessionTokens>> {
    host.sessions
        .login(&request.username, &request.password)
        .await
        .map(Json)
}

pub async fn refresh(State(host): HostState, JsonBody(request): JsonBody<RefreshRequest>) -> ApiResult<Json<SessionTokens>> {
    host.sessions.refresh(&request.refresh_token).await.map(Json)
}

pub async fn logout(State(host): HostState, JsonBody(request): JsonBody<RefreshRequest>) -> ApiResult<StatusCode> {
    host.sessions.logout(&request.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(host): HostState, Authenticated(principal): Authenticated) -> ApiResult<Json<AccountProfile>> {
    host.directory().profile(principal.account_id).await.map(Json)
}

pub async fn grant_role(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(account_id): PathParams<Uuid>,
    JsonBody(request): JsonBody<RoleRequest>,
) -> ApiResult<Json<AccountProfile>> {
    host.directory()
        .grant_role(&principal, account_id, request.role)
        .await
        .map(Json)
}

pub async fn revoke_role(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams((account_id, role)): PathParams<(Uuid, String)>,
) -> ApiResult<Json<AccountProfile>> {
    let role: Role = role
        .parse()
        .map_err(|message: String| CatalogError::invalid_field("role", message))?;
    host.directory()
        .revoke_role(&principal, account_id, role)
        .await
        .map(Json)
}

pub async fn unlock_account(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(account_id): PathParams<Uuid>,
) -> ApiResult<Json<AccountProfile>> {
    host.directory().unlock(&principal, account_id).await.map(Json)
}

// =============================================================================
// Books
// =============================================================================

pub async fn list_books(
    State(host): HostState,
    QueryParams(filter): QueryParams<BookFilter>,
    QueryParams(page): QueryParams<PageRequest>,
) -> ApiResult<Json<Paginated<BookView>>> {
    host.catalog.list_books(&filter, page).await.map(Json)
}

pub async fn create_book(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<BookCreate>,
) -> ApiResult<(StatusCode, Json<BookView>)> {
    let book = host.catalog.create_book(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn get_book(State(host): HostState, PathParams(id): PathParams<Uuid>) -> ApiResult<Json<BookView>> {
    host.catalog.get_book(id).await.map(Json)
}

pub async fn update_book(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
    JsonBody(patch): JsonBody<BookPatch>,
) -> ApiResult<Json<BookView>> {
    host.catalog.update_book(&principal, id, patch).await.map(Json)
}

pub async fn delete_book(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<StatusCode> {
    host.catalog.delete_book(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_book_reviews(
    State(host): HostState,
    PathParams(book_id): PathParams<Uuid>,
    QueryParams(page): QueryParams<PageRequest>,
) -> ApiResult<Json<Paginated<Review>>> {
    host.catalog.list_reviews_for_book(book_id, page).await.map(Json)
}

// =============================================================================
// Reviews
// =============================================================================

pub async fn create_review(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<ReviewCreate>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = host.catalog.create_review(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(State(host): HostState, PathParams(id): PathParams<Uuid>) -> ApiResult<Json<Review>> {
    host.catalog.get_review(id).await.map(Json)
}

pub async fn update_review(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
    JsonBody(request): JsonBody<ReviewUpdate>,
) -> ApiResult<Json<Review>> {
    host.catalog.update_review(&principal, id, request).await.map(Json)
}

pub async fn delete_review(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<StatusCode> {
    host.catalog.delete_review(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn vote_review(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
    JsonBody(vote): JsonBody<VoteRequest>,
) -> ApiResult<Json<Review>> {
    host.catalog
        .vote_review(&principal, id, vote.helpful)
        .await
        .map(Json)
}

pub async fn list_author_reviews(
    State(host): HostState,
    PathParams(author_id): PathParams<Uuid>,
    QueryParams(page): QueryParams<PageRequest>,
) -> ApiResult<Json<Paginated<Review>>> {
    host.catalog.list_reviews_by_author(author_id, page).await.map(Json)
}

// =============================================================================
// Genres
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenreListQuery {
    pub active_only: bool,
}

pub async fn list_genres(State(host): HostState, QueryParams(query): QueryParams<GenreListQuery>) -> ApiResult<Json<Vec<Genre>>> {
    host.catalog.list_genres(query.active_only).await.map(Json)
}

pub async fn create_genre(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    JsonBody(request): JsonBody<GenreCreate>,
) -> ApiResult<(StatusCode, Json<Genre>)> {
    let genre = host.catalog.create_genre(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

pub async fn get_genre(State(host): HostState, PathParams(id): PathParams<Uuid>) -> ApiResult<Json<Genre>> {
    host.catalog.get_genre(id).await.map(Json)
}

pub async fn get_genre_by_slug(State(host): HostState, PathParams(slug): PathParams<String>) -> ApiResult<Json<Genre>> {
    host.catalog.get_genre_by_slug(&slug).await.map(Json)
}

pub async fn update_genre(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
    JsonBody(request): JsonBody<GenreUpdate>,
) -> ApiResult<Json<Genre>> {
    host.catalog.update_genre(&principal, id, request).await.map(Json)
}

pub async fn deactivate_genre(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<Json<Genre>> {
    host.catalog.deactivate_genre(&principal, id).await.map(Json)
}

pub async fn delete_genre(
    State(host): HostState,
    Authenticated(principal): Authenticated,
    PathParams(id): PathParams<Uuid>,
) -> ApiResult<StatusCode> {
    host.catalog.delete_genre(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
