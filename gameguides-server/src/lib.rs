//! gameguides-server: HTTP API for GameGuides content
//!
//! Serves the Guide resource (list, create, get by id or slug, partial
//! update, delete) over a memoized MongoDB connection.

pub mod config;
pub mod http;
pub mod models;
pub mod service;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use service::{GuideError, GuideService};
pub use store::{GuideStore, MemoryGuideStore, MongoGuideStore, StoreError};
