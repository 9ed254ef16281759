//! MongoDB guide store
//!
//! Guides live in the `guides` collection. Connecting pings the database and
//! ensures a unique index on `slug`, so a write that slips past the
//! check-then-write lookup is still refused with a duplicate-key error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use super::{ConnectionCache, Connector, GuideStore, StoreError};
use crate::config::StoreConfig;
use crate::models::{store_time, Guide, GuideId, GuidePatch, NewGuide, DEFAULT_COVER_IMAGE};

/// Collection holding guide documents
pub const GUIDES_COLLECTION: &str = "guides";

/// Server error code for unique index violations
const DUPLICATE_KEY: i32 = 11000;

/// Guide as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuideDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    slug: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(default = "default_cover_image")]
    cover_image: String,
    #[serde(default)]
    featured: bool,
    published_date: bson::DateTime,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

fn default_cover_image() -> String {
    DEFAULT_COVER_IMAGE.to_owned()
}

fn to_bson_time(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn from_bson_time(field: &str, at: bson::DateTime) -> Result<DateTime<Utc>, StoreError> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis())
        .ok_or_else(|| StoreError::Malformed(format!("{field} out of range")))
}

impl TryFrom<GuideDocument> for Guide {
    type Error = StoreError;

    fn try_from(d: GuideDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: GuideId::from(d.id),
            title: d.title,
            slug: d.slug,
            content: d.content,
            video_url: d.video_url,
            cover_image: d.cover_image,
            featured: d.featured,
            published_date: from_bson_time("publishedDate", d.published_date)?,
            created_at: from_bson_time("createdAt", d.created_at)?,
            updated_at: from_bson_time("updatedAt", d.updated_at)?,
        })
    }
}

/// Live connection: the client (for shutdown) and the guides collection
#[derive(Clone)]
pub struct MongoHandle {
    client: Client,
    guides: Collection<GuideDocument>,
}

/// Opens MongoDB connections from a `StoreConfig`
pub struct MongoConnector {
    config: StoreConfig,
}

impl MongoConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Handle = MongoHandle;

    async fn connect(&self) -> Result<MongoHandle, StoreError> {
        let mut options = ClientOptions::parse(&self.config.uri).await?;
        options.app_name = Some("gameguides".to_string());
        options.max_pool_size = Some(self.config.max_pool_size);

        let client = Client::with_options(options)?;
        let db = client.database(&self.config.database);

        // The driver connects lazily; ping so failures surface here
        db.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            StoreError::Unavailable(format!(
                "ping to database '{}' at {} failed: {}",
                self.config.database,
                self.config.redacted_uri(),
                e
            ))
        })?;

        let guides = db.collection::<GuideDocument>(GUIDES_COLLECTION);
        let slug_index = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        guides.create_index(slug_index).await?;

        tracing::info!(database = %self.config.database, "MongoDB connected");
        Ok(MongoHandle { client, guides })
    }

    async fn disconnect(&self, handle: MongoHandle) {
        handle.client.shutdown().await;
        tracing::info!("MongoDB connection closed");
    }
}

/// Guide store backed by MongoDB through a memoized connection
pub struct MongoGuideStore {
    cache: ConnectionCache<MongoConnector>,
}

impl MongoGuideStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            cache: ConnectionCache::new(MongoConnector::new(config)),
        }
    }

    /// Establish (or reuse) the connection.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.cache.connect().await.map(|_| ())
    }

    async fn guides(&self) -> Result<Collection<GuideDocument>, StoreError> {
        Ok(self.cache.connect().await?.guides)
    }
}

/// Map a driver error, turning unique-index violations into slug conflicts.
fn write_error(e: mongodb::error::Error, slug: &str) -> StoreError {
    if is_duplicate_key(&e) {
        StoreError::DuplicateSlug(slug.to_owned())
    } else {
        StoreError::from(e)
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Aggregation-pipeline update for a patch.
///
/// Values are wrapped in `$literal` so user text starting with `$` is never
/// read as a field path. `updatedAt` becomes the later of the server clock and
/// the previous value plus one millisecond.
fn update_pipeline(patch: GuidePatch) -> Vec<Document> {
    let mut set = Document::new();
    let mut put = |field: &str, value: Bson| {
        set.insert(field, doc! { "$literal": value });
    };

    if let Some(title) = patch.title {
        put("title", Bson::from(title));
    }
    if let Some(slug) = patch.slug {
        put("slug", Bson::from(slug.into_string()));
    }
    if let Some(content) = patch.content {
        put("content", Bson::from(content));
    }
    if let Some(video_url) = patch.video_url {
        put("videoUrl", Bson::from(video_url));
    }
    if let Some(cover_image) = patch.cover_image {
        put("coverImage", Bson::from(cover_image));
    }
    if let Some(featured) = patch.featured {
        put("featured", Bson::from(featured));
    }
    if let Some(published_date) = patch.published_date {
        put("publishedDate", Bson::DateTime(to_bson_time(published_date)));
    }

    set.insert(
        "updatedAt",
        doc! { "$max": ["$$NOW", { "$add": ["$updatedAt", 1_i64] }] },
    );

    vec![doc! { "$set": set }]
}

#[async_trait]
impl GuideStore for MongoGuideStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn list(&self) -> Result<Vec<Guide>, StoreError> {
        let docs: Vec<GuideDocument> = self
            .guides()
            .await?
            .find(doc! {})
            .sort(doc! { "publishedDate": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;

        docs.into_iter().map(Guide::try_from).collect()
    }

    async fn insert(&self, guide: NewGuide) -> Result<Guide, StoreError> {
        let now = to_bson_time(store_time(Utc::now()));
        let slug = guide.slug.into_string();
        let document = GuideDocument {
            id: ObjectId::new(),
            title: guide.title,
            slug: slug.clone(),
            content: guide.content,
            video_url: guide.video_url,
            cover_image: guide.cover_image,
            featured: guide.featured,
            published_date: guide.published_date.map(to_bson_time).unwrap_or(now),
            created_at: now,
            updated_at: now,
        };

        self.guides()
            .await?
            .insert_one(&document)
            .await
            .map_err(|e| write_error(e, &slug))?;

        Guide::try_from(document)
    }

    async fn find_by_id(&self, id: GuideId) -> Result<Option<Guide>, StoreError> {
        self.guides()
            .await?
            .find_one(doc! { "_id": id.object_id() })
            .await?
            .map(Guide::try_from)
            .transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Guide>, StoreError> {
        self.guides()
            .await?
            .find_one(doc! { "slug": slug })
            .await?
            .map(Guide::try_from)
            .transpose()
    }

    async fn slug_taken(&self, slug: &str, except: Option<GuideId>) -> Result<bool, StoreError> {
        let mut filter = doc! { "slug": slug };
        if let Some(id) = except {
            filter.insert("_id", doc! { "$ne": id.object_id() });
        }

        let count = self.guides().await?.count_documents(filter).await?;
        Ok(count > 0)
    }

    async fn update(&self, id: GuideId, patch: GuidePatch) -> Result<Option<Guide>, StoreError> {
        let slug = patch
            .slug
            .as_ref()
            .map(|s| s.as_str().to_owned())
            .unwrap_or_default();

        self.guides()
            .await?
            .find_one_and_update(doc! { "_id": id.object_id() }, update_pipeline(patch))
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| write_error(e, &slug))?
            .map(Guide::try_from)
            .transpose()
    }

    async fn delete(&self, id: GuideId) -> Result<bool, StoreError> {
        let result = self
            .guides()
            .await?
            .delete_one(doc! { "_id": id.object_id() })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn close(&self) {
        self.cache.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Slug;

    fn write_failure(code: i32) -> mongodb::error::Error {
        let raw = doc! { "code": code, "errmsg": "E11000 duplicate key error collection: guides" };
        let failure: mongodb::error::WriteError = bson::from_document(raw).unwrap();
        mongodb::error::Error::from(ErrorKind::Write(WriteFailure::WriteError(failure)))
    }

    fn command_failure(code: i32) -> mongodb::error::Error {
        let raw = doc! { "code": code, "codeName": "DuplicateKey", "errmsg": "E11000" };
        let failure: mongodb::error::CommandError = bson::from_document(raw).unwrap();
        mongodb::error::Error::from(ErrorKind::Command(failure))
    }

    #[test]
    fn duplicate_key_maps_to_slug_conflict() {
        for err in [write_failure(DUPLICATE_KEY), command_failure(DUPLICATE_KEY)] {
            assert!(is_duplicate_key(&err));
            assert!(matches!(
                write_error(err, "first-spring"),
                StoreError::DuplicateSlug(ref slug) if slug == "first-spring"
            ));
        }
    }

    #[test]
    fn other_write_errors_stay_driver_errors() {
        // 121: document failed validation
        for err in [write_failure(121), command_failure(121)] {
            assert!(!is_duplicate_key(&err));
            assert!(matches!(write_error(err, "first-spring"), StoreError::Driver(_)));
        }
    }

    #[test]
    fn pipeline_sets_only_supplied_fields() {
        let patch = GuidePatch {
            title: Some("New Title".into()),
            slug: Some(Slug::derive("title", "New Title").unwrap()),
            video_url: Some(None),
            ..Default::default()
        };
        let pipeline = update_pipeline(patch);
        assert_eq!(pipeline.len(), 1);

        let set = pipeline[0].get_document("$set").unwrap();
        let keys: Vec<&str> = set.keys().map(String::as_str).collect();
        assert_eq!(keys, ["title", "slug", "videoUrl", "updatedAt"]);

        assert_eq!(
            set.get_document("slug").unwrap().get_str("$literal").unwrap(),
            "new-title"
        );
        assert_eq!(
            set.get_document("videoUrl").unwrap().get("$literal"),
            Some(&Bson::Null)
        );
    }

    #[test]
    fn pipeline_literal_guards_dollar_values() {
        let patch = GuidePatch {
            content: Some("$title".into()),
            ..Default::default()
        };
        let pipeline = update_pipeline(patch);
        let set = pipeline[0].get_document("$set").unwrap();
        assert_eq!(
            set.get_document("content").unwrap().get_str("$literal").unwrap(),
            "$title"
        );
    }

    #[test]
    fn document_round_trips_timestamps() {
        let at = store_time(Utc::now());
        let document = GuideDocument {
            id: ObjectId::new(),
            title: "Fishing".into(),
            slug: "fishing".into(),
            content: "Cast early.".into(),
            video_url: None,
            cover_image: DEFAULT_COVER_IMAGE.into(),
            featured: true,
            published_date: to_bson_time(at),
            created_at: to_bson_time(at),
            updated_at: to_bson_time(at),
        };

        let guide = Guide::try_from(document).unwrap();
        assert_eq!(guide.published_date, at);
        assert_eq!(guide.updated_at, at);
        assert!(guide.featured);
    }

    #[test]
    fn document_tolerates_missing_optional_fields() {
        let raw = doc! {
            "_id": ObjectId::new(),
            "title": "Old schema",
            "slug": "old-schema",
            "content": "body",
            "publishedDate": bson::DateTime::now(),
            "createdAt": bson::DateTime::now(),
            "updatedAt": bson::DateTime::now(),
            "__v": 0,
        };
        let document: GuideDocument = bson::from_document(raw).unwrap();
        assert_eq!(document.cover_image, DEFAULT_COVER_IMAGE);
        assert!(!document.featured);
        assert_eq!(document.video_url, None);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn connects_and_round_trips() {
        let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI required");
        let config = StoreConfig::new(uri, "gameguides_test");
        let store = MongoGuideStore::new(config);
        store.ping().await.expect("connection failed");

        let guide = crate::models::CreateGuide {
            title: Some(format!("Round Trip {}", ObjectId::new().to_hex())),
            content: Some("body".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let created = store.insert(guide).await.expect("insert failed");
        let found = store.find_by_id(created.id).await.unwrap();
        assert_eq!(found.as_ref().map(|g| &g.slug), Some(&created.slug));

        assert!(store.delete(created.id).await.unwrap());
        store.close().await;
    }
}
