//! Page slug validation
//!
//! Page slugs key progress records and are used verbatim as file names in
//! the state directory, so they are validated rather than sanitized.

use crate::error::{ErrorCategory, UserFriendlyError};

/// Longest accepted page slug.
pub const MAX_SLUG_LEN: usize = 100;

/// Error type for page slug validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("Page slug is empty")]
    Empty,

    #[error("Page slug is {len} characters long (max {MAX_SLUG_LEN})")]
    TooLong { len: usize },

    #[error("Page slug contains invalid character {ch:?}")]
    InvalidCharacter { ch: char },

    #[error("Page slug may not start or end with '-'")]
    EdgeHyphen,
}

impl UserFriendlyError for SlugError {
    fn user_message(&self) -> String {
        match self {
            Self::Empty => "The page slug is empty".to_string(),
            Self::TooLong { len } => {
                format!("The page slug is too long ({len} characters, at most {MAX_SLUG_LEN})")
            }
            Self::InvalidCharacter { ch } => {
                format!("The page slug contains the invalid character {ch:?}")
            }
            Self::EdgeHyphen => "The page slug starts or ends with a hyphen".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Page slugs name progress record files. Only lowercase ASCII letters, digits and inner hyphens are allowed."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Example slugs: pricing, about-us, blog-post-2024".to_string(),
            "Replace spaces and underscores with '-' and lowercase the name".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Validate a page slug.
///
/// # Errors
///
/// Returns [`SlugError`] when the slug is empty, longer than
/// [`MAX_SLUG_LEN`], contains anything outside `[a-z0-9-]`, or starts or
/// ends with `-`.
///
/// # Examples
///
/// ```
/// use pageclone_utils::slug::{validate_page_slug, SlugError};
///
/// assert!(validate_page_slug("pricing-page").is_ok());
/// assert_eq!(validate_page_slug("-pricing"), Err(SlugError::EdgeHyphen));
/// ```
pub fn validate_page_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::Empty);
    }
    let len = slug.chars().count();
    if len > MAX_SLUG_LEN {
        return Err(SlugError::TooLong { len });
    }
    if let Some(ch) = slug
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(SlugError::InvalidCharacter { ch });
    }
    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(SlugError::EdgeHyphen);
    }
    Ok(())
}
