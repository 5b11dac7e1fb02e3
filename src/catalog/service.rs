//! Book, review and genre use cases
//!
//! Each mutating operation follows the same shape: load the target
//! (`NotFound`), ask the [`AuthorizationEngine`] (`Forbidden`), validate and
//! apply the request, then hand the write to the [`ConsistencyManager`].

use crate::auth::policy::{Action, AuthorizationEngine, Principal, Resource};
use crate::catalog::consistency::ConsistencyManager;
use crate::catalog::dto::{
    BookCreate, BookFilter, BookPatch, GenreCreate, GenreUpdate, ReviewCreate, ReviewUpdate,
};
use crate::core::entity::{Entity, EntityKind};
use crate::core::error::CatalogError;
use crate::core::field::slugify;
use crate::core::query::{PageRequest, Paginated, Predicate};
use crate::core::service::{Storage, StorageExt};
use crate::entities::{Account, Book, BookView, Genre, Review};
use std::sync::Arc;
use uuid::Uuid;

/// Entry point the HTTP layer calls for catalog operations
#[derive(Clone)]
pub struct CatalogService {
    storage: Arc<dyn Storage>,
    consistency: ConsistencyManager,
    policy: AuthorizationEngine,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            consistency: ConsistencyManager::new(storage.clone()),
            storage,
            policy: AuthorizationEngine::new(),
        }
    }

    async fn load<T: Entity>(&self, id: Uuid) -> Result<T, CatalogError> {
        self.storage
            .load::<T>(&id)
            .await?
            .ok_or_else(|| CatalogError::not_found(T::KIND, id))
    }

    // =========================================================================
    // Books
    // =========================================================================

    pub async fn create_book(&self, principal: &Principal, request: BookCreate) -> Result<BookView, CatalogError> {
        self.policy
            .require(principal, Action::Create, &Resource::Collection(EntityKind::Book))?;
        request.validate_all()?;

        let genre_ids = self.consistency.resolve_genres(&request.genre_ids).await?;
        let co_author_ids = self
            .consistency
            .resolve_co_authors(principal.account_id, &request.co_author_ids)
            .await?;

        let mut book = Book::new(request.title, principal.account_id);
        book.subtitle = request.subtitle;
        book.isbn = request.isbn;
        book.description = request.description;
        book.publisher = request.publisher;
        book.publication_date = request.publication_date;
        book.status = request.status.unwrap_or_default();
        book.genre_ids = genre_ids;
        book.co_author_ids = co_author_ids;

        let book = self.consistency.create_book(book).await?;
        tracing::info!(book_id = %book.id, author = %principal.username, "book created");
        Ok(BookView::from(book))
    }

    pub async fn get_book(&self, id: Uuid) -> Result<BookView, CatalogError> {
        self.load::<Book>(id).await.map(BookView::from)
    }

    pub async fn list_books(&self, filter: &BookFilter, page: PageRequest) -> Result<Paginated<BookView>, CatalogError> {
        let mut predicate = Predicate::All;
        if let Some(status) = filter.status {
            predicate = predicate.and(Predicate::eq("status", status.as_str()));
        }
        if let Some(author_id) = filter.author_id {
            predicate = predicate.and(Predicate::eq("author_id", author_id));
        }
        if let Some(genre_id) = filter.genre_id {
            predicate = predicate.and(Predicate::contains("genre_ids", genre_id));
        }

        let books = self.storage.find_many_as::<Book>(&predicate).await?;
        Ok(page.paginate(books).map(BookView::from))
    }

    pub async fn update_book(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: BookPatch,
    ) -> Result<BookView, CatalogError> {
        let mut book = self.load::<Book>(id).await?;
        self.policy.require(principal, Action::Modify, &Resource::Book(&book))?;
        patch.validate_all()?;

        let previous_title = book.title.clone();
        if let Some(Some(title)) = patch.title {
            book.title = title;
        }
        if let Some(subtitle) = patch.subtitle {
            book.subtitle = subtitle;
        }
        if let Some(isbn) = patch.isbn {
            book.isbn = isbn;
        }
        if let Some(description) = patch.description {
            book.description = description;
        }
        if let Some(publisher) = patch.publisher {
            book.publisher = publisher;
        }
        if let Some(publication_date) = patch.publication_date {
            book.publication_date = publication_date;
        }
        if let Some(Some(status)) = patch.status {
            book.status = status;
        }
        if let Some(Some(genre_ids)) = patch.genre_ids {
            book.genre_ids = self.consistency.resolve_genres(&genre_ids).await?;
        }
        if let Some(Some(co_author_ids)) = patch.co_author_ids {
            book.co_author_ids = self
                .consistency
                .resolve_co_authors(book.author_id, &co_author_ids)
                .await?;
        }
        book.touch();

        let book = self.consistency.update_book(&previous_title, book).await?;
        tracing::info!(book_id = %book.id, by = %principal.username, "book updated");
        Ok(BookView::from(book))
    }

    pub async fn delete_book(&self, principal: &Principal, id: Uuid) -> Result<(), CatalogError> {
        let book = self.load::<Book>(id).await?;
        self.policy.require(principal, Action::Delete, &Resource::Book(&book))?;

        self.consistency.delete_book(&book).await?;
        tracing::info!(book_id = %book.id, by = %principal.username, "book deleted");
        Ok(())
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    pub async fn create_review(&self, principal: &Principal, request: ReviewCreate) -> Result<Review, CatalogError> {
        request.validate_all()?;
        let book = self.load::<Book>(request.book_id).await?;
        self.policy
            .require(principal, Action::Create, &Resource::Collection(EntityKind::Review))?;

        let review = Review::new(
            principal.account_id,
            book.id,
            request.rating,
            request.title,
            request.content,
        );
        let review = self.consistency.create_review(review).await?;
        tracing::info!(
            review_id = %review.id,
            book_id = %book.id,
            rating = review.rating,
            author = %principal.username,
            "review created"
        );
        Ok(review)
    }

    pub async fn get_review(&self, id: Uuid) -> Result<Review, CatalogError> {
        self.load::<Review>(id).await
    }

    pub async fn list_reviews_for_book(&self, book_id: Uuid, page: PageRequest) -> Result<Paginated<Review>, CatalogError> {
        self.load::<Book>(book_id).await?;
        let reviews = self
            .storage
            .find_many_as::<Review>(&Predicate::eq("book_id", book_id))
            .await?;
        Ok(page.paginate(reviews))
    }

    pub async fn list_reviews_by_author(
        &self,
        author_id: Uuid,
        page: PageRequest,
    ) -> Result<Paginated<Review>, CatalogError> {
        self.load::<Account>(author_id).await?;
        let reviews = self
            .storage
            .find_many_as::<Review>(&Predicate::eq("author_id", author_id))
            .await?;
        Ok(page.paginate(reviews))
    }

    pub async fn update_review(
        &self,
        principal: &Principal,
        id: Uuid,
        request: ReviewUpdate,
    ) -> Result<Review, CatalogError> {
        let mut review = self.load::<Review>(id).await?;
        self.policy.require(principal, Action::Modify, &Resource::Review(&review))?;
        request.validate_all()?;

        let previous_rating = review.rating;
        if let Some(Some(rating)) = request.rating {
            review.rating = rating;
        }
        if let Some(Some(title)) = request.title {
            review.title = title;
        }
        if let Some(Some(content)) = request.content {
            review.content = content;
        }
        review.touch();

        let review = self.consistency.update_review(review).await?;
        tracing::info!(
            review_id = %review.id,
            from = previous_rating,
            to = review.rating,
            "review updated"
        );
        Ok(review)
    }

    pub async fn delete_review(&self, principal: &Principal, id: Uuid) -> Result<(), CatalogError> {
        let review = self.load::<Review>(id).await?;
        self.policy.require(principal, Action::Delete, &Resource::Review(&review))?;

        self.consistency.delete_review(&review).await?;
        tracing::info!(review_id = %review.id, by = %principal.username, "review deleted");
        Ok(())
    }

    /// Mark a review helpful or not; authors cannot vote on their own reviews
    pub async fn vote_review(&self, principal: &Principal, id: Uuid, helpful: bool) -> Result<Review, CatalogError> {
        let review = self.load::<Review>(id).await?;
        self.policy.require(principal, Action::Vote, &Resource::Review(&review))?;

        self.consistency.cast_vote(principal.account_id, &review, helpful).await
    }

    // =========================================================================
    // Genres
    // =========================================================================

    pub async fn create_genre(&self, principal: &Principal, request: GenreCreate) -> Result<Genre, CatalogError> {
        self.policy
            .require(principal, Action::Create, &Resource::Collection(EntityKind::Genre))?;
        request.validate_all()?;

        let slug = request.slug.unwrap_or_else(|| slugify(&request.name));
        if slug.is_empty() {
            return Err(CatalogError::invalid_field("slug", "cannot be derived from the name"));
        }

        let mut genre = Genre::new(request.name, slug, request.description);
        genre.active = request.active;

        let genre = self.consistency.create_genre(genre).await?;
        tracing::info!(genre_id = %genre.id, slug = %genre.slug, "genre created");
        Ok(genre)
    }

    pub async fn get_genre(&self, id: Uuid) -> Result<Genre, CatalogError> {
        self.load::<Genre>(id).await
    }

    pub async fn get_genre_by_slug(&self, slug: &str) -> Result<Genre, CatalogError> {
        self.storage
            .find_one_as::<Genre>(&Predicate::eq("slug", slug))
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityKind::Genre, slug))
    }

    /// Genres sorted by name
    pub async fn list_genres(&self, active_only: bool) -> Result<Vec<Genre>, CatalogError> {
        let predicate = if active_only {
            Predicate::eq("active", true)
        } else {
            Predicate::All
        };
        let mut genres = self.storage.find_many_as::<Genre>(&predicate).await?;
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    pub async fn update_genre(
        &self,
        principal: &Principal,
        id: Uuid,
        request: GenreUpdate,
    ) -> Result<Genre, CatalogError> {
        let mut genre = self.load::<Genre>(id).await?;
        self.policy.require(principal, Action::Modify, &Resource::Genre(&genre))?;
        if request.active.flatten().is_some_and(|active| active != genre.active) {
            self.policy
                .require(principal, Action::Deactivate, &Resource::Genre(&genre))?;
        }
        request.validate_all()?;

        if let Some(Some(name)) = request.name {
            genre.name = name;
        }
        if let Some(Some(slug)) = request.slug {
            genre.slug = slug;
        }
        if let Some(description) = request.description {
            genre.description = description;
        }
        if let Some(Some(active)) = request.active {
            genre.active = active;
        }
        genre.touch();

        let genre = self.consistency.update_genre(genre).await?;
        tracing::info!(genre_id = %genre.id, by = %principal.username, "genre updated");
        Ok(genre)
    }

    /// Hide a genre from active listings; books keep their assignment
    pub async fn deactivate_genre(&self, principal: &Principal, id: Uuid) -> Result<Genre, CatalogError> {
        let mut genre = self.load::<Genre>(id).await?;
        self.policy
            .require(principal, Action::Deactivate, &Resource::Genre(&genre))?;

        if !genre.active {
            return Ok(genre);
        }
        genre.active = false;
        genre.touch();

        let genre = self.consistency.update_genre(genre).await?;
        tracing::info!(genre_id = %genre.id, by = %principal.username, "genre deactivated");
        Ok(genre)
    }

    pub async fn delete_genre(&self, principal: &Principal, id: Uuid) -> Result<(), CatalogError> {
        let genre = self.load::<Genre>(id).await?;
        self.policy.require(principal, Action::Delete, &Resource::Genre(&genre))?;

        self.consistency.delete_genre(&genre).await?;
        tracing::info!(genre_id = %genre.id, by = %principal.username, "genre deleted");
        Ok(())
    }
}
