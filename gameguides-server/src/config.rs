//! Store configuration
//!
//! The binary fills this from flags or the environment:
//! - `MONGODB_URI`: connection string (required)
//! - `MONGODB_DATABASE`: database name (default: gameguides)
//! - `MONGODB_MAX_POOL_SIZE`: driver pool size (default: 10)

use std::fmt;

/// Default database name
pub const DEFAULT_DATABASE: &str = "gameguides";

/// Default maximum connections in the driver pool.
/// Kept low for a single-tenant, low-traffic site.
pub const DEFAULT_MAX_POOL_SIZE: u32 = 10;

/// Configuration errors, reported at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where and how to reach the document store
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
    pub max_pool_size: u32,
}

impl StoreConfig {
    /// Build a config with the default pool size. Call `validate` before use.
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
        }
    }

    /// Fail fast on values that could never connect.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }
        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::Invalid {
                name: "MONGODB_URI",
                reason: "expected a mongodb:// or mongodb+srv:// connection string".to_string(),
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing("MONGODB_DATABASE"));
        }
        if self.max_pool_size == 0 {
            return Err(ConfigError::Invalid {
                name: "MONGODB_MAX_POOL_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Connection string with any password masked, for logs.
    ///
    /// Only the authority (up to the first `/` or `?`) is inspected, and only a
    /// `user:password@` prefix is rewritten.
    pub fn redacted_uri(&self) -> String {
        let Some((scheme, rest)) = self.uri.split_once("://") else {
            return self.uri.clone();
        };
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        match authority.rsplit_once('@') {
            Some((credentials, hosts)) => match credentials.split_once(':') {
                Some((user, _)) => format!("{scheme}://{user}:***@{hosts}{tail}"),
                None => self.uri.clone(),
            },
            None => self.uri.clone(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("uri", &self.redacted_uri())
            .field("database", &self.database)
            .field("max_pool_size", &self.max_pool_size)
            .finish()
    }
}
