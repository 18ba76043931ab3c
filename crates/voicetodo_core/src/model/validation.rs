//! Task title validation.
//!
//! # Responsibility
//! - Provide the single gate used by task creation and rename.
//!
//! # Invariants
//! - Validation is pure; callers persist only the returned trimmed title.
//! - Length is measured in Unicode scalar values after trimming.
//! - Trimming removes whitespace and U+FEFF from both ends.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum title length after trimming.
pub const MAX_TITLE_CHARS: usize = 200;

/// Reasons a title is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleValidationError {
    /// No title value was provided at all.
    Missing,
    /// Title is empty after trimming whitespace.
    Empty,
    /// Title exceeds [`MAX_TITLE_CHARS`] after trimming.
    TooLong { length: usize },
}

impl Display for TitleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "Title is required"),
            Self::Empty => write!(f, "Title cannot be empty"),
            Self::TooLong { .. } => {
                write!(f, "Title cannot exceed {MAX_TITLE_CHARS} characters")
            }
        }
    }
}

impl Error for TitleValidationError {}

/// Validates a raw title and returns its trimmed form.
///
/// Rules are checked in order: missing, empty after trim, too long.
pub fn validate_title(title: Option<&str>) -> Result<&str, TitleValidationError> {
    let Some(raw) = title else {
        return Err(TitleValidationError::Missing);
    };

    let trimmed = raw.trim_matches(is_trimmed_char);
    if trimmed.is_empty() {
        return Err(TitleValidationError::Empty);
    }

    let length = trimmed.chars().count();
    if length > MAX_TITLE_CHARS {
        return Err(TitleValidationError::TooLong { length });
    }

    Ok(trimmed)
}

// Whitespace plus the byte order mark.
fn is_trimmed_char(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

#[cfg(test)]
mod tests {
    use super::{validate_title, TitleValidationError, MAX_TITLE_CHARS};

    #[test]
    fn missing_title_is_required() {
        let err = validate_title(None).unwrap_err();
        assert_eq!(err, TitleValidationError::Missing);
        assert_eq!(err.to_string(), "Title is required");
    }

    #[test]
    fn whitespace_only_title_is_empty() {
        let err = validate_title(Some(" \t\n ")).unwrap_err();
        assert_eq!(err.to_string(), "Title cannot be empty");
    }

    #[test]
    fn boundary_length_counts_trimmed_chars() {
        let exact = format!("  {}  ", "a".repeat(MAX_TITLE_CHARS));
        assert_eq!(validate_title(Some(&exact)).unwrap().len(), MAX_TITLE_CHARS);

        let over = "a".repeat(MAX_TITLE_CHARS + 1);
        let err = validate_title(Some(&over)).unwrap_err();
        assert_eq!(err, TitleValidationError::TooLong { length: 201 });
        assert_eq!(err.to_string(), "Title cannot exceed 200 characters");
    }

    #[test]
    fn multibyte_titles_are_measured_in_chars() {
        let title = "é".repeat(MAX_TITLE_CHARS);
        assert!(validate_title(Some(&title)).is_ok());
    }

    #[test]
    fn byte_order_mark_is_trimmed() {
        let err = validate_title(Some("\u{FEFF}")).unwrap_err();
        assert_eq!(err, TitleValidationError::Empty);

        assert_eq!(validate_title(Some("\u{FEFF} Buy milk \u{FEFF}")), Ok("Buy milk"));
    }
}
