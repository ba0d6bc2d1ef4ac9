//! Identity types and key normalization for Fieldbook entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Surrogate row identifier from the relational identity column.
/// Immutable for the lifetime of the row; ties between equal
/// timestamps are broken by the lowest id.
pub type RecordId = i64;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ============================================================================
// KEY SOURCES AND STRATEGIES
// ============================================================================

/// Column a matching key is derived from.
///
/// The priority order `UserRef > Email > DisplayName` is fixed: a record
/// keys on the highest-priority column that is present and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    UserRef,
    Email,
    DisplayName,
}

impl KeySource {
    /// Column name in the backing table.
    pub fn column(&self) -> &'static str {
        match self {
            KeySource::UserRef => "user_ref",
            KeySource::Email => "email",
            KeySource::DisplayName => "display_name",
        }
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Selects which field a normalized key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStrategy {
    /// Highest-priority present field: user_ref, then email, then display_name.
    Preferred,
    /// A single fixed column (used by per-column trigger guards).
    Field(KeySource),
}

// ============================================================================
// NORMALIZED KEY
// ============================================================================

/// Derived, never-persisted matching key: the trimmed, lower-cased
/// projection of one identity column. Recomputed on every scan and on
/// every guarded write.
///
/// Carries its [`KeySource`] so a key derived from `user_ref` can never
/// collide with an equal string derived from `email`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedKey {
    pub source: KeySource,
    pub value: String,
}

impl NormalizedKey {
    /// Derive a key from a raw column value.
    ///
    /// Returns `None` for absent values and for values that are empty
    /// after trimming - an empty string never forms a duplicate group.
    pub fn derive(source: KeySource, raw: Option<&str>) -> Option<Self> {
        let value = normalize_value(raw?)?;
        Some(NormalizedKey { source, value })
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.source, self.value)
    }
}

/// Trim surrounding whitespace and case-fold to lower case.
/// Returns `None` when the result is empty (treated as absent).
pub fn normalize_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

// =============================================================================
// TESTS
// =============================================================================
