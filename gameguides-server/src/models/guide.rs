//! Guide entity and the validated inputs that create or change one.
//!
//! Raw request bodies (`CreateGuide`, `UpdateGuide`) are plain optional
//! fields; `validate()` turns them into `NewGuide` / `GuidePatch`, which the
//! store accepts without further checks.

use std::fmt;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer};

use super::{Slug, ValidationError};

/// Maximum title length in characters
pub const MAX_TITLE_LEN: usize = 100;

/// Cover image used when none is supplied
pub const DEFAULT_COVER_IMAGE: &str = "/images/default-cover.jpg";

/// Store-assigned guide identifier (a 24-hex-digit ObjectId)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuideId(ObjectId);

impl GuideId {
    /// Fresh identifier.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Parse `token` if it has the store's id shape, `None` otherwise.
    ///
    /// ```
    /// use gameguides_server::models::GuideId;
    ///
    /// assert!(GuideId::parse("65f1c0a2b3d4e5f601234567").is_some());
    /// assert!(GuideId::parse("first-spring").is_none());
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() != 24 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        ObjectId::parse_str(token).ok().map(Self)
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for GuideId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for GuideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// A published guide
#[derive(Debug, Clone, PartialEq)]
pub struct Guide {
    pub id: GuideId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub video_url: Option<String>,
    pub cover_image: String,
    pub featured: bool,
    pub published_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store timestamps carry millisecond precision.
pub fn store_time(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(3)
}

/// Next `updatedAt` value: `now`, or one millisecond past `previous` when the
/// clock hasn't moved beyond it.
pub fn next_updated_at(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = store_time(now);
    if now > previous {
        now
    } else {
        previous + TimeDelta::milliseconds(1)
    }
}

/// Create request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuide {
    pub title: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub cover_image: Option<String>,
    pub featured: Option<bool>,
    /// Overrides the slug derived from the title
    pub slug: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

/// Validated guide ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewGuide {
    pub title: String,
    pub slug: Slug,
    pub content: String,
    pub video_url: Option<String>,
    pub cover_image: String,
    pub featured: bool,
    /// Defaults to the insertion time when absent
    pub published_date: Option<DateTime<Utc>>,
}

impl CreateGuide {
    /// Check required fields and derive the slug.
    ///
    /// # Rules
    /// - `title` and `content` are required and not blank
    /// - `title` is at most 100 characters
    /// - slug comes from `slug` if given, else from `title`
    pub fn validate(self) -> Result<NewGuide, ValidationError> {
        let title = required("title", self.title)?;
        let title = check_title(title)?;
        let content = required("content", self.content)?;

        let slug = match self.slug.as_deref() {
            Some(explicit) => Slug::derive("slug", explicit)?,
            None => Slug::derive("title", &title)?,
        };

        Ok(NewGuide {
            title,
            slug,
            content,
            video_url: self.video_url.and_then(non_blank),
            cover_image: cover_image_or_default(self.cover_image),
            featured: self.featured.unwrap_or(false),
            published_date: self.published_date.map(store_time),
        })
    }
}

/// Update request body; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuide {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `null` clears the video, absence keeps it
    #[serde(default, deserialize_with = "present_or_null")]
    pub video_url: Option<Option<String>>,
    pub cover_image: Option<String>,
    pub featured: Option<bool>,
    pub slug: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
}

/// Validated partial update.
///
/// `slug` is only set when the slug actually changes; the service resolves it
/// from an explicit override or a changed title before handing the patch to
/// the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuidePatch {
    pub title: Option<String>,
    pub slug: Option<Slug>,
    pub content: Option<String>,
    pub video_url: Option<Option<String>>,
    pub cover_image: Option<String>,
    pub featured: Option<bool>,
    pub published_date: Option<DateTime<Utc>>,
}

impl GuidePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to an in-memory guide (timestamps untouched).
    pub fn apply_to(&self, guide: &mut Guide) {
        if let Some(title) = &self.title {
            guide.title = title.clone();
        }
        if let Some(slug) = &self.slug {
            guide.slug = slug.as_str().to_owned();
        }
        if let Some(content) = &self.content {
            guide.content = content.clone();
        }
        if let Some(video_url) = &self.video_url {
            guide.video_url = video_url.clone();
        }
        if let Some(cover_image) = &self.cover_image {
            guide.cover_image = cover_image.clone();
        }
        if let Some(featured) = self.featured {
            guide.featured = featured;
        }
        if let Some(published_date) = self.published_date {
            guide.published_date = published_date;
        }
    }
}

/// What the caller asked for with respect to the slug.
#[derive(Debug, Clone, PartialEq)]
pub enum SlugRequest {
    /// Leave the slug alone unless the title changes
    FromTitle,
    /// Caller supplied a slug explicitly
    Explicit(Slug),
}

impl UpdateGuide {
    /// Validate supplied fields. Returns the patch (with `slug` unset) and the
    /// caller's slug request.
    pub fn validate(self) -> Result<(GuidePatch, SlugRequest), ValidationError> {
        let title = match self.title {
            Some(title) => Some(check_title(non_empty("title", title)?)?),
            None => None,
        };
        let content = match self.content {
            Some(content) => Some(non_empty("content", content)?),
            None => None,
        };
        let slug_request = match self.slug.as_deref() {
            Some(explicit) => SlugRequest::Explicit(Slug::derive("slug", explicit)?),
            None => SlugRequest::FromTitle,
        };

        let patch = GuidePatch {
            title,
            slug: None,
            content,
            video_url: self.video_url.map(|v| v.and_then(non_blank)),
            cover_image: self.cover_image.map(|c| cover_image_or_default(Some(c))),
            featured: self.featured,
            published_date: self.published_date.map(store_time),
        };

        Ok((patch, slug_request))
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) => non_empty(field, v),
        None => Err(ValidationError::Missing { field }),
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value)
}

fn check_title(title: String) -> Result<String, ValidationError> {
    let title = title.trim().to_owned();
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TooLong {
            field: "title",
            max: MAX_TITLE_LEN,
        });
    }
    Ok(title)
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn cover_image_or_default(value: Option<String>) -> String {
    value
        .and_then(non_blank)
        .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_owned())
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
