//! In-memory guide store
//!
//! Same contract as the MongoDB store, including the unique slug constraint.
//! Backs the service and router tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{GuideStore, StoreError};
use crate::models::{next_updated_at, store_time, Guide, GuideId, GuidePatch, NewGuide};

#[derive(Default)]
pub struct MemoryGuideStore {
    guides: RwLock<HashMap<GuideId, Guide>>,
}

impl MemoryGuideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.guides.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.guides.read().await.is_empty()
    }
}

fn slug_in_use(guides: &HashMap<GuideId, Guide>, slug: &str, except: Option<GuideId>) -> bool {
    guides
        .values()
        .any(|g| g.slug == slug && Some(g.id) != except)
}

#[async_trait]
impl GuideStore for MemoryGuideStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list(&self) -> Result<Vec<Guide>, StoreError> {
        let mut guides: Vec<Guide> = self.guides.read().await.values().cloned().collect();
        guides.sort_by(|a, b| {
            b.published_date
                .cmp(&a.published_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(guides)
    }

    async fn insert(&self, guide: NewGuide) -> Result<Guide, StoreError> {
        let mut guides = self.guides.write().await;
        if slug_in_use(&guides, guide.slug.as_str(), None) {
            return Err(StoreError::DuplicateSlug(guide.slug.into_string()));
        }

        let now = store_time(Utc::now());
        let created = Guide {
            id: GuideId::generate(),
            title: guide.title,
            slug: guide.slug.into_string(),
            content: guide.content,
            video_url: guide.video_url,
            cover_image: guide.cover_image,
            featured: guide.featured,
            published_date: guide.published_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        guides.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: GuideId) -> Result<Option<Guide>, StoreError> {
        Ok(self.guides.read().await.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Guide>, StoreError> {
        Ok(self
            .guides
            .read()
            .await
            .values()
            .find(|g| g.slug == slug)
            .cloned())
    }

    async fn slug_taken(&self, slug: &str, except: Option<GuideId>) -> Result<bool, StoreError> {
        Ok(slug_in_use(&*self.guides.read().await, slug, except))
    }

    async fn update(&self, id: GuideId, patch: GuidePatch) -> Result<Option<Guide>, StoreError> {
        let mut guides = self.guides.write().await;

        if let Some(slug) = &patch.slug {
            if slug_in_use(&guides, slug.as_str(), Some(id)) {
                return Err(StoreError::DuplicateSlug(slug.as_str().to_owned()));
            }
        }

        let Some(guide) = guides.get_mut(&id) else {
            return Ok(None);
        };
        patch.apply_to(guide);
        guide.updated_at = next_updated_at(guide.updated_at, Utc::now());
        Ok(Some(guide.clone()))
    }

    async fn delete(&self, id: GuideId) -> Result<bool, StoreError> {
        Ok(self.guides.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateGuide;

    fn new_guide(title: &str) -> NewGuide {
        CreateGuide {
            title: Some(title.into()),
            content: Some("body".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn insert_enforces_unique_slug() {
        let store = MemoryGuideStore::new();
        store.insert(new_guide("Fishing")).await.unwrap();

        let err = store.insert(new_guide("fishing!")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlug(ref s) if s == "fishing"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_missing_is_none() {
        let store = MemoryGuideStore::new();
        let result = store
            .update(GuideId::generate(), GuidePatch::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_refreshes_updated_at() {
        let store = MemoryGuideStore::new();
        let created = store.insert(new_guide("Mining")).await.unwrap();

        let mut last = created.updated_at;
        for _ in 0..5 {
            let patch = GuidePatch {
                featured: Some(true),
                ..Default::default()
            };
            let updated = store.update(created.id, patch).await.unwrap().unwrap();
            assert!(updated.updated_at > last);
            last = updated.updated_at;
        }
        assert_eq!(
            store.find_by_id(created.id).await.unwrap().unwrap().created_at,
            created.created_at
        );
    }

    #[tokio::test]
    async fn slug_taken_excludes_self() {
        let store = MemoryGuideStore::new();
        let created = store.insert(new_guide("Farming")).await.unwrap();

        assert!(store.slug_taken("farming", None).await.unwrap());
        assert!(!store.slug_taken("farming", Some(created.id)).await.unwrap());
        assert!(!store.slug_taken("foraging", None).await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes() {
        let store = MemoryGuideStore::new();
        let created = store.insert(new_guide("Cooking")).await.unwrap();

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
