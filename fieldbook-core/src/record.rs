//! Core entity structures

use crate::identity::{KeySource, KeyStrategy, NormalizedKey, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTITY TABLES
// ============================================================================

/// Identity tables protected by the dedup subsystem.
/// The uniform retention and guard policy applies to all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityTable {
    Technicians,
    Customers,
    Profiles,
}

impl IdentityTable {
    /// Table name in the backing store.
    pub fn table_name(&self) -> &'static str {
        match self {
            IdentityTable::Technicians => "technicians",
            IdentityTable::Customers => "customers",
            IdentityTable::Profiles => "profiles",
        }
    }

    /// All protected tables, in migration order.
    pub fn all() -> [IdentityTable; 3] {
        [
            IdentityTable::Technicians,
            IdentityTable::Customers,
            IdentityTable::Profiles,
        ]
    }
}

impl fmt::Display for IdentityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

// ============================================================================
// IDENTITY RECORD
// ============================================================================

/// A row in one of the identity tables (technician, customer, profile).
///
/// `user_ref` points at an external authentication identity when the
/// record came from a sign-up flow; `email` and `display_name` are free
/// text entered by users, so uniqueness on them is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: RecordId,
    pub user_ref: Option<String>,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: Timestamp,
}

impl IdentityRecord {
    /// Raw value of a keyed column, absent-as-None.
    pub fn field(&self, source: KeySource) -> Option<&str> {
        match source {
            KeySource::UserRef => self.user_ref.as_deref(),
            KeySource::Email => self.email.as_deref(),
            KeySource::DisplayName => Some(self.display_name.as_str()),
        }
    }

    /// Normalized matching key under the given strategy.
    ///
    /// `Preferred` walks the fixed priority order and keys on the first
    /// column that yields a non-empty normalized value. Returns `None`
    /// when no column is usable; such records are skipped by the
    /// scanner, never treated as duplicates of each other.
    pub fn matching_key(&self, strategy: KeyStrategy) -> Option<NormalizedKey> {
        match strategy {
            KeyStrategy::Field(source) => NormalizedKey::derive(source, self.field(source)),
            KeyStrategy::Preferred => {
                [KeySource::UserRef, KeySource::Email, KeySource::DisplayName]
                    .into_iter()
                    .find_map(|source| NormalizedKey::derive(source, self.field(source)))
            }
        }
    }
}

// ============================================================================
// DEPENDENT REFERENCES
// ============================================================================

/// A foreign-key-bearing row (e.g. a booking) pointing at an identity
/// record. A real booking referencing both a technician and a customer
/// appears as two dependent rows, one per reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentRow {
    pub id: RecordId,
    pub table: IdentityTable,
    pub identity_id: RecordId,
}

// ============================================================================
// DUPLICATE GROUPS
// ============================================================================

/// A maximal set of identity records sharing a normalized key.
/// Ephemeral: exists only for the duration of one scan or migration
/// run, never persisted.
///
/// Members are ordered by `created_at` ascending, then `id` ascending -
/// a total order, so resolution is deterministic even when timestamps
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: NormalizedKey,
    pub members: Vec<IdentityRecord>,
}

impl DuplicateGroup {
    /// Ids of all members, in member order.
    pub fn member_ids(&self) -> Vec<RecordId> {
        self.members.iter().map(|m| m.id).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
