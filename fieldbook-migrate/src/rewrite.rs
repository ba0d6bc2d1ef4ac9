//! Dependent rewriting
//!
//! Before any duplicate row is deleted, every booking referencing it is
//! repointed at the surviving row. A rewrite failure aborts the run
//! before deletion starts; a dependent must never point at a row about
//! to disappear.

use fieldbook_core::{FieldbookResult, IdentityTable, RecordId};
use fieldbook_store::DependentStore;
use tracing::debug;

/// Repoint every dependent referencing any of `remove_ids` at `keep`.
/// Returns the number of rows updated. No-op (returns 0) when nothing
/// references the removed rows, which is what makes re-runs converge.
pub fn rewrite_dependents<D: DependentStore + ?Sized>(
    dependents: &D,
    table: IdentityTable,
    remove_ids: &[RecordId],
    keep: RecordId,
) -> FieldbookResult<u64> {
    let rows = dependents.find_referencing(table, remove_ids)?;
    if rows.is_empty() {
        return Ok(0);
    }
    let updated = dependents.rewrite(&rows, keep)?;
    debug!(table = %table, keep, updated, "dependents repointed");
    Ok(updated)
}

// =============================================================================
// TESTS
// =============================================================================
