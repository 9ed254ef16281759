//! Domain models with validation at construction
//!
//! All user input is validated before it reaches the store.
//! Invalid input returns ValidationError, not panic.

pub mod guide;
pub mod slug;
pub mod validation;

pub use guide::{
    next_updated_at, store_time, CreateGuide, Guide, GuideId, GuidePatch, NewGuide, SlugRequest,
    UpdateGuide, DEFAULT_COVER_IMAGE, MAX_TITLE_LEN,
};
pub use slug::{slugify, Slug};
pub use validation::ValidationError;
