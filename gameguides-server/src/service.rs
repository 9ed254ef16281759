//! Guide operations - validation, slug handling, and store calls
//!
//! Transport-agnostic: the HTTP layer only maps `GuideError` to responses.
//! Slug uniqueness is check-then-write; the MongoDB unique index catches the
//! rare race between two identical concurrent creates.

use std::sync::Arc;

use crate::models::{
    CreateGuide, Guide, GuideId, Slug, SlugRequest, UpdateGuide, ValidationError,
};
use crate::store::{GuideStore, StoreError};

/// Guide operation error
#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("slug '{0}' is already used by another guide")]
    DuplicateSlug(String),

    #[error("guide '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GuideError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateSlug(slug) => Self::DuplicateSlug(slug),
            other => Self::Store(other),
        }
    }
}

pub type GuideResult<T> = Result<T, GuideError>;

/// CRUD over guides, shared by all handlers
#[derive(Clone)]
pub struct GuideService {
    store: Arc<dyn GuideStore>,
}

impl GuideService {
    pub fn new(store: Arc<dyn GuideStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GuideStore> {
        &self.store
    }

    /// All guides, newest `publishedDate` first.
    pub async fn list(&self) -> GuideResult<Vec<Guide>> {
        Ok(self.store.list().await?)
    }

    /// Validate, derive the slug, refuse duplicates, persist.
    pub async fn create(&self, input: CreateGuide) -> GuideResult<Guide> {
        let guide = input.validate()?;

        if self.store.slug_taken(guide.slug.as_str(), None).await? {
            return Err(GuideError::DuplicateSlug(guide.slug.into_string()));
        }

        let created = self.store.insert(guide).await?;
        tracing::info!(id = %created.id, slug = %created.slug, "guide created");
        Ok(created)
    }

    /// Look up by id when `token` has the id shape, falling back to slug.
    pub async fn get(&self, token: &str) -> GuideResult<Guide> {
        if let Some(id) = GuideId::parse(token) {
            if let Some(guide) = self.store.find_by_id(id).await? {
                return Ok(guide);
            }
        }

        self.store
            .find_by_slug(token)
            .await?
            .ok_or_else(|| GuideError::NotFound(token.to_owned()))
    }

    /// Apply a partial update.
    ///
    /// A changed title re-derives the slug unless one was supplied
    /// explicitly. A slug conflict aborts the whole update.
    pub async fn update(&self, token: &str, input: UpdateGuide) -> GuideResult<Guide> {
        let id = parse_id(token)?;
        let (mut patch, slug_request) = input.validate()?;

        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| GuideError::NotFound(token.to_owned()))?;

        let candidate = match slug_request {
            SlugRequest::Explicit(slug) => Some(slug),
            SlugRequest::FromTitle => match &patch.title {
                Some(title) if *title != existing.title => Some(Slug::derive("title", title)?),
                _ => None,
            },
        };
        patch.slug = candidate.filter(|slug| slug.as_str() != existing.slug);

        if let Some(slug) = &patch.slug {
            if self.store.slug_taken(slug.as_str(), Some(id)).await? {
                return Err(GuideError::DuplicateSlug(slug.as_str().to_owned()));
            }
        }

        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| GuideError::NotFound(token.to_owned()))?;
        tracing::info!(id = %updated.id, slug = %updated.slug, "guide updated");
        Ok(updated)
    }

    /// Hard delete by id.
    pub async fn delete(&self, token: &str) -> GuideResult<()> {
        let id = parse_id(token)?;
        if !self.store.delete(id).await? {
            return Err(GuideError::NotFound(token.to_owned()));
        }
        tracing::info!(%id, "guide deleted");
        Ok(())
    }
}

/// Ids that can't be ObjectIds can't resolve to a guide.
fn parse_id(token: &str) -> GuideResult<GuideId> {
    GuideId::parse(token).ok_or_else(|| GuideError::NotFound(token.to_owned()))
}
