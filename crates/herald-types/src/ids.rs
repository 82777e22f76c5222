//! ID generation and parsing for reminder tasks.

use rand::RngExt;
use std::fmt;

use crate::kind::ReminderKind;

/// Base32 alphabet (Crockford-style, excludes I, L, O, U to avoid confusion)
const BASE32_ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstvwxyz";

/// Error type for ID parsing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

pub type IdParseResult<T> = std::result::Result<T, IdParseError>;

/// Generate a random suffix using base32 encoding
pub fn generate_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE32_ALPHABET[rng.random_range(0..32)] as char)
        .collect()
}

/// Generate a reminder task ID from a subject ID and kind.
/// Format: `<subject_id>-<kind>-<suffix>`
/// Example: "ev-319-2h-5h18"
pub fn generate_task_id(subject_id: &str, kind: ReminderKind) -> String {
    format!("{}-{}-{}", subject_id, kind.as_str(), generate_suffix(4))
}

/// Parse a reminder task ID back into its subject ID and kind.
///
/// The subject ID may itself contain hyphens, so parsing works from the
/// right: `<subject>-<kind>-<suffix>`.
pub fn parse_task_id(task_id: &str) -> IdParseResult<(&str, ReminderKind)> {
    let (rest, _suffix) = task_id
        .rsplit_once('-')
        .ok_or_else(|| IdParseError::new(format!("Invalid task ID: {}", task_id)))?;
    let (subject_id, kind_str) = rest
        .rsplit_once('-')
        .ok_or_else(|| IdParseError::new(format!("Invalid task ID: {}", task_id)))?;
    let kind = kind_str
        .parse::<ReminderKind>()
        .map_err(|_| IdParseError::new(format!("Unknown reminder kind in task ID: {}", task_id)))?;
    Ok((subject_id, kind))
}
