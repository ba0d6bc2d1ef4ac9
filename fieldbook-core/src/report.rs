//! Dry-run and migration outcome reporting
//!
//! Structured summaries consumable by the display layer. The core
//! produces these without side effects; rendering (colors, prompts)
//! lives outside this workspace.

use crate::identity::{NormalizedKey, RecordId, Timestamp};
use crate::record::IdentityTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// DRY-RUN REPORT
// ============================================================================

/// Resolution of one duplicate group: the survivor and the rows that
/// would be (or were) removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlan {
    pub key: NormalizedKey,
    pub keep: RecordId,
    pub remove: Vec<RecordId>,
}

/// Planned work for one identity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePlan {
    pub table: IdentityTable,
    pub groups: Vec<GroupPlan>,
    /// Records with no usable key field, skipped by the scanner.
    pub skipped_records: usize,
    /// Guard names not yet present in the schema.
    pub pending_guards: Vec<String>,
}

impl TablePlan {
    /// Total rows that would be deleted for this table.
    pub fn remove_count(&self) -> usize {
        self.groups.iter().map(|g| g.remove.len()).sum()
    }
}

/// Structured summary of a scan/resolve pass, produced without mutating
/// the store. This is the whole of a dry run's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DryRunReport {
    pub run_id: Uuid,
    pub generated_at: Timestamp,
    pub tables: Vec<TablePlan>,
}

impl DryRunReport {
    /// Count of duplicate groups across all tables.
    pub fn group_count(&self) -> usize {
        self.tables.iter().map(|t| t.groups.len()).sum()
    }

    /// Whether the run would change anything: rows to remove or guards
    /// to install.
    pub fn has_pending_work(&self) -> bool {
        self.tables
            .iter()
            .any(|t| !t.groups.is_empty() || !t.pending_guards.is_empty())
    }
}

// ============================================================================
// LIVE-RUN OUTCOME
// ============================================================================

/// Counters from a completed live run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub groups_resolved: usize,
    pub dependents_rewritten: u64,
    pub records_deleted: usize,
    pub guards_applied: usize,
    pub guards_already_present: usize,
}

/// Terminal outcome of a migration run. Failures are reported through
/// the error channel, identifying the step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationOutcome {
    /// The run mutated the store and/or installed guards.
    Applied(MigrationSummary),
    /// Nothing to do: no duplicates, every guard already present.
    AlreadyApplied,
    /// The confirmation boundary declined the plan; nothing mutated.
    Declined,
}

// =============================================================================
// TESTS
// =============================================================================
