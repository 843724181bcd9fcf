//! Naming rules shared by files and folders.

use thiserror::Error;

use super::MAX_NAME_LENGTH;

/// Characters rejected anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Device names that cannot be used as a name or as a name stem.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A naming rule violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,

    #[error("name exceeds {max} characters (got {len})")]
    TooLong { len: usize, max: usize },

    #[error("name contains invalid character {0:?}")]
    InvalidCharacters(char),

    #[error("name must not start or end with a space or period")]
    InvalidStartEnd,

    #[error("{0:?} is a reserved name")]
    Reserved(String),
}

impl NameError {
    /// Stable machine-readable code for the violated rule.
    pub fn code(&self) -> &'static str {
        match self {
            NameError::Empty => "EMPTY_NAME",
            NameError::TooLong { .. } => "NAME_TOO_LONG",
            NameError::InvalidCharacters(_) => "INVALID_CHARACTERS",
            NameError::InvalidStartEnd => "INVALID_START_END",
            NameError::Reserved(_) => "RESERVED_NAME",
        }
    }
}

/// Validate a file or folder name.
///
/// Rules are checked in a fixed order and the first violation is returned.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }

    let len = name.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(NameError::TooLong {
            len,
            max: MAX_NAME_LENGTH,
        });
    }

    if let Some(c) = name
        .chars()
        .find(|c| FORBIDDEN_CHARS.contains(c) || ('\u{0}'..='\u{1f}').contains(c))
    {
        return Err(NameError::InvalidCharacters(c));
    }

    let edge = |c: char| c == ' ' || c == '.';
    if name.starts_with(edge) || name.ends_with(edge) {
        return Err(NameError::InvalidStartEnd);
    }

    let upper = name.to_uppercase();
    for reserved in RESERVED_NAMES {
        let stem_match = upper
            .strip_prefix(reserved)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));
        if stem_match {
            return Err(NameError::Reserved(name.to_string()));
        }
    }

    Ok(())
}
