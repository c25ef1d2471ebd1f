//! URL slugs for products and archive collections.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The slug is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The slug is longer than [`Slug::MAX_LENGTH`].
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The slug contains something other than `a-z`, `0-9` and single dashes.
    #[error("slug may only contain lowercase letters, digits and single dashes")]
    InvalidFormat,
}

/// A URL-safe identifier: lowercase ASCII letters and digits separated by
/// single dashes, no leading or trailing dash.
///
/// ```
/// use zolar_core::Slug;
///
/// assert_eq!(Slug::from_title("Linen Over-Shirt (Sand)").unwrap().as_str(), "linen-over-shirt-sand");
/// assert!(Slug::parse("linen-shirt").is_ok());
/// assert!(Slug::parse("Linen Shirt").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 120;

    /// Validate an existing slug.
    ///
    /// # Errors
    ///
    /// Returns `SlugError` if the input is empty, too long, or not in
    /// canonical form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        let valid_chars = s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid_chars || s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::InvalidFormat);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a human title.
    ///
    /// Non-alphanumeric runs collapse into a single dash; non-ASCII letters
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` if nothing slug-worthy remains.
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(title.len());
        let mut pending_dash = false;
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
        if out.len() > Self::MAX_LENGTH {
            out.truncate(Self::MAX_LENGTH);
            while out.ends_with('-') {
                out.pop();
            }
        }
        Self::parse(&out)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_title() {
        assert_eq!(
            Slug::from_title("  Oversized Tee -- Black  ").unwrap().as_str(),
            "oversized-tee-black"
        );
        assert_eq!(Slug::from_title("SS'25 Drop").unwrap().as_str(), "ss-25-drop");
        assert_eq!(Slug::from_title("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_from_title_truncates() {
        let title = "a ".repeat(200);
        let slug = Slug::from_title(&title).unwrap();
        assert!(slug.as_str().len() <= Slug::MAX_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn test_parse_rejects_non_canonical() {
        assert_eq!(Slug::parse("-tee"), Err(SlugError::InvalidFormat));
        assert_eq!(Slug::parse("tee-"), Err(SlugError::InvalidFormat));
        assert_eq!(Slug::parse("tee--black"), Err(SlugError::InvalidFormat));
        assert_eq!(Slug::parse("Tee"), Err(SlugError::InvalidFormat));
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
    }

    #[test]
    fn test_serde_validates() {
        let slug: Slug = serde_json::from_str("\"summer-archive\"").unwrap();
        assert_eq!(slug.as_str(), "summer-archive");
        assert!(serde_json::from_str::<Slug>("\"Summer Archive\"").is_err());
    }
}
