//! Error types for Fieldbook operations

use crate::identity::{NormalizedKey, RecordId};
use crate::record::IdentityTable;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {table} id {id}")]
    NotFound { table: IdentityTable, id: RecordId },

    #[error("Insert failed for {table}: {reason}")]
    InsertFailed { table: IdentityTable, reason: String },

    #[error("Guard {guard} rejected write to {table}: key {key} already held by id {holder}")]
    GuardConflict {
        table: IdentityTable,
        guard: String,
        key: NormalizedKey,
        holder: RecordId,
    },

    #[error("Dependent rewrite failed on {table}: {reason}")]
    RewriteFailed { table: IdentityTable, reason: String },

    #[error("Cannot delete {table} id {id}: dependent rows still reference it")]
    ForeignKeyViolation { table: IdentityTable, id: RecordId },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Schema-change errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error(
        "Cannot install {guard}: {table} still holds duplicate values for key {key} (ids {ids:?})"
    )]
    DirtyTable {
        table: IdentityTable,
        guard: String,
        key: NormalizedKey,
        ids: Vec<RecordId>,
    },

    #[error("Installing {guard} failed: {reason}")]
    InstallFailed { guard: String, reason: String },
}

/// Master error type for all Fieldbook operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldbookError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl FieldbookError {
    /// Whether the error is a guard rejecting a writer's operation.
    /// Such errors are the guard doing its job, not a system fault.
    pub fn is_guard_conflict(&self) -> bool {
        matches!(self, FieldbookError::Store(StoreError::GuardConflict { .. }))
    }
}

/// Result type alias for Fieldbook operations.
pub type FieldbookResult<T> = Result<T, FieldbookError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::KeySource;

    #[test]
    fn test_guard_conflict_display_names_guard_and_holder() {
        let err = StoreError::GuardConflict {
            table: IdentityTable::Technicians,
            guard: "trg_technicians_user_ref_guard".to_string(),
            key: NormalizedKey {
                source: KeySource::UserRef,
                value: "u1".to_string(),
            },
            holder: 1,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("trg_technicians_user_ref_guard"));
        assert!(msg.contains("user_ref=u1"));
        assert!(msg.contains("id 1"));
    }

    #[test]
    fn test_dirty_table_display_lists_offending_ids() {
        let err = SchemaError::DirtyTable {
            table: IdentityTable::Customers,
            guard: "uqci_customers_email".to_string(),
            key: NormalizedKey {
                source: KeySource::Email,
                value: "a@x.com".to_string(),
            },
            ids: vec![3, 7],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("uqci_customers_email"));
        assert!(msg.contains("[3, 7]"));
    }

    #[test]
    fn test_fieldbook_error_from_variants() {
        let store = FieldbookError::from(StoreError::LockPoisoned);
        assert!(matches!(store, FieldbookError::Store(_)));

        let schema = FieldbookError::from(SchemaError::InstallFailed {
            guard: "uq_technicians_user_ref".to_string(),
            reason: "rejected".to_string(),
        });
        assert!(matches!(schema, FieldbookError::Schema(_)));
    }

    #[test]
    fn test_is_guard_conflict() {
        let conflict = FieldbookError::Store(StoreError::GuardConflict {
            table: IdentityTable::Profiles,
            guard: "trg_profiles_email_guard".to_string(),
            key: NormalizedKey {
                source: KeySource::Email,
                value: "a@x.com".to_string(),
            },
            holder: 9,
        });
        assert!(conflict.is_guard_conflict());
        assert!(!FieldbookError::Store(StoreError::LockPoisoned).is_guard_conflict());
    }
}
