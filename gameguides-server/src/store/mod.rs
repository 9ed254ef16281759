//! Storage layer - shared connection and guide repositories
//!
//! # Design Principles
//!
//! - One memoized connection per process, injected rather than global
//! - Repositories speak in validated domain types (`NewGuide`, `GuidePatch`)
//! - Slug conflicts are reported as `StoreError::DuplicateSlug`, whether caught
//!   by a lookup or by the unique index

pub mod connection;
pub mod memory;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Guide, GuideId, GuidePatch, NewGuide};

pub use connection::{ConnectionCache, Connector};
pub use memory::MemoryGuideStore;
pub use mongo::{MongoConnector, MongoGuideStore, MongoHandle};

/// Storage error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("slug '{0}' is already taken")]
    DuplicateSlug(String),

    #[error("database error: {0}")]
    Driver(Arc<mongodb::error::Error>),

    #[error("malformed guide document: {0}")]
    Malformed(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Driver(Arc::new(e))
    }
}

/// Persistence operations for guides.
///
/// Implementations maintain `createdAt`/`updatedAt` themselves and must keep
/// `updatedAt` strictly increasing per guide.
#[async_trait]
pub trait GuideStore: Send + Sync {
    /// Short backend name, reported by the health check.
    fn backend(&self) -> &'static str;

    /// All guides, newest `publishedDate` first.
    async fn list(&self) -> Result<Vec<Guide>, StoreError>;

    /// Persist a new guide and return it with its assigned id.
    async fn insert(&self, guide: NewGuide) -> Result<Guide, StoreError>;

    async fn find_by_id(&self, id: GuideId) -> Result<Option<Guide>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Guide>, StoreError>;

    /// Whether any guide other than `except` already uses `slug`.
    async fn slug_taken(&self, slug: &str, except: Option<GuideId>) -> Result<bool, StoreError>;

    /// Apply `patch` and refresh `updatedAt`. `None` if the id doesn't resolve.
    async fn update(&self, id: GuideId, patch: GuidePatch) -> Result<Option<Guide>, StoreError>;

    /// Hard delete. `false` if the id doesn't resolve.
    async fn delete(&self, id: GuideId) -> Result<bool, StoreError>;

    /// Release the underlying connection, if any.
    async fn close(&self) {}
}
