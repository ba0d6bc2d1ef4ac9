//! Schema guard specifications
//!
//! Guards are the schema-level objects that make future duplicates
//! structurally impossible: unique indexes (plain or case-insensitive)
//! and row-level before-write triggers. They are owned by the schema
//! itself and outlive any single migration run, so installation is
//! modeled as a declarative, idempotent "ensure" keyed by a stable
//! derived name rather than an apply-once script.

use crate::identity::KeySource;
use crate::record::IdentityTable;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// GUARD MODES AND SPECS
// ============================================================================

/// Case-sensitivity mode of a uniqueness guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardMode {
    /// Plain unique constraint on the raw column value.
    Exact,
    /// Unique over the lower-cased projection of the column.
    CaseInsensitive,
}

/// A uniqueness guard on one column of one identity table.
///
/// The derived name is the identity of the guard: existence checks
/// compare names, never re-derive state from the data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub table: IdentityTable,
    pub source: KeySource,
    pub mode: GuardMode,
}

impl ConstraintSpec {
    /// Stable guard name derived from table + column + mode.
    pub fn guard_name(&self) -> String {
        match self.mode {
            GuardMode::Exact => format!("uq_{}_{}", self.table.table_name(), self.source.column()),
            GuardMode::CaseInsensitive => {
                format!("uqci_{}_{}", self.table.table_name(), self.source.column())
            }
        }
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.guard_name())
    }
}

/// A row-level before-write trigger guard on one keyed column.
///
/// Fires on every insert/update for the remaining lifetime of the
/// schema, normalizing the incoming value and rejecting the write when
/// another row already holds an equal key. The row being written is
/// excluded from the comparison, so a no-op update never rejects
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub table: IdentityTable,
    pub source: KeySource,
}

impl TriggerSpec {
    /// Stable trigger name derived from table + column.
    pub fn guard_name(&self) -> String {
        format!("trg_{}_{}_guard", self.table.table_name(), self.source.column())
    }

    /// Name of the check function backing the trigger.
    pub fn function_name(&self) -> String {
        format!("{}_check", self.guard_name())
    }
}

impl fmt::Display for TriggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.guard_name())
    }
}

/// A guard of either kind, as listed in plans and reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuardSpec {
    Constraint(ConstraintSpec),
    Trigger(TriggerSpec),
}

impl GuardSpec {
    pub fn guard_name(&self) -> String {
        match self {
            GuardSpec::Constraint(c) => c.guard_name(),
            GuardSpec::Trigger(t) => t.guard_name(),
        }
    }
}

/// Outcome of an idempotent ensure operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsureOutcome {
    /// The guard was created by this call.
    Applied,
    /// An equivalent guard already existed; nothing was done.
    AlreadyPresent,
}

// ============================================================================
// GUARD CATALOG
// ============================================================================

/// The uniform guard policy for one identity table:
/// - exact unique on `user_ref` (external identities compare exactly),
/// - case-insensitive unique on `email` and `display_name`,
/// - one trigger guard per keyed column.
pub fn guards_for_table(table: IdentityTable) -> Vec<GuardSpec> {
    vec![
        GuardSpec::Constraint(ConstraintSpec {
            table,
            source: KeySource::UserRef,
            mode: GuardMode::Exact,
        }),
        GuardSpec::Constraint(ConstraintSpec {
            table,
            source: KeySource::Email,
            mode: GuardMode::CaseInsensitive,
        }),
        GuardSpec::Constraint(ConstraintSpec {
            table,
            source: KeySource::DisplayName,
            mode: GuardMode::CaseInsensitive,
        }),
        GuardSpec::Trigger(TriggerSpec {
            table,
            source: KeySource::UserRef,
        }),
        GuardSpec::Trigger(TriggerSpec {
            table,
            source: KeySource::Email,
        }),
        GuardSpec::Trigger(TriggerSpec {
            table,
            source: KeySource::DisplayName,
        }),
    ]
}

// =============================================================================
// TESTS
// =============================================================================
