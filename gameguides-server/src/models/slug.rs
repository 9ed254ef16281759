//! Slug derivation
//!
//! Slug format: lowercase ASCII word characters joined by single hyphens.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ValidationError;

/// Everything that is not a word character, whitespace, or hyphen.
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("invalid slug regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("invalid slug regex"));

static DASHES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("invalid slug regex"));

/// Turn arbitrary text into a URL-safe slug.
///
/// ```
/// use gameguides_server::models::slugify;
///
/// assert_eq!(slugify("First Spring!"), "first-spring");
/// assert_eq!(slugify("  Fishing -- 101  "), "fishing-101");
/// ```
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped = DISALLOWED_RE.replace_all(&lowered, "");
    let hyphenated = WHITESPACE_RE.replace_all(&stripped, "-");
    let collapsed = DASHES_RE.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_owned()
}

/// Validated, normalised slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from `text`, reporting failures against `field`.
    ///
    /// Fails when nothing usable is left after normalisation (e.g. `"!!!"`).
    pub fn derive(field: &'static str, text: &str) -> Result<Self, ValidationError> {
        let slug = slugify(text);
        if slug.is_empty() {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "must contain at least one letter or digit",
            });
        }
        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
