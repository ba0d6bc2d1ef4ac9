//! Idempotent guard installation
//!
//! Guards are ensured, not applied: each ensure checks for the guard's
//! stable derived name first and reports `AlreadyPresent` instead of
//! failing on re-runs. Dirty-table failures from constraint creation
//! are surfaced verbatim; they mean cleanup has not run.

use fieldbook_core::{
    guards_for_table, ConstraintSpec, EnsureOutcome, FieldbookResult, GuardSpec, IdentityTable,
    TriggerSpec,
};
use fieldbook_store::SchemaStore;
use tracing::info;

/// Ensure a uniqueness guard exists.
pub fn ensure_constraint<S: SchemaStore + ?Sized>(
    schema: &S,
    spec: &ConstraintSpec,
) -> FieldbookResult<EnsureOutcome> {
    let name = spec.guard_name();
    if schema.guard_exists(&name)? {
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    schema.create_constraint(spec)?;
    info!(guard = %name, "unique guard installed");
    Ok(EnsureOutcome::Applied)
}

/// Ensure a trigger guard exists.
pub fn ensure_trigger<S: SchemaStore + ?Sized>(
    schema: &S,
    spec: &TriggerSpec,
) -> FieldbookResult<EnsureOutcome> {
    let name = spec.guard_name();
    if schema.guard_exists(&name)? {
        return Ok(EnsureOutcome::AlreadyPresent);
    }
    schema.create_trigger(spec)?;
    info!(guard = %name, "trigger guard installed");
    Ok(EnsureOutcome::Applied)
}

/// Guards from the table's catalog that are not yet installed.
pub fn pending_guards<S: SchemaStore + ?Sized>(
    schema: &S,
    table: IdentityTable,
) -> FieldbookResult<Vec<GuardSpec>> {
    let mut pending = Vec::new();
    for guard in guards_for_table(table) {
        if !schema.guard_exists(&guard.guard_name())? {
            pending.push(guard);
        }
    }
    Ok(pending)
}

/// Ensure every uniqueness guard in the table's catalog.
/// Returns one outcome per guard, in catalog order.
pub fn ensure_table_constraints<S: SchemaStore + ?Sized>(
    schema: &S,
    table: IdentityTable,
) -> FieldbookResult<Vec<(ConstraintSpec, EnsureOutcome)>> {
    let mut outcomes = Vec::new();
    for guard in guards_for_table(table) {
        if let GuardSpec::Constraint(spec) = guard {
            let outcome = ensure_constraint(schema, &spec)?;
            outcomes.push((spec, outcome));
        }
    }
    Ok(outcomes)
}

/// Ensure every trigger guard in the table's catalog.
pub fn ensure_table_triggers<S: SchemaStore + ?Sized>(
    schema: &S,
    table: IdentityTable,
) -> FieldbookResult<Vec<(TriggerSpec, EnsureOutcome)>> {
    let mut outcomes = Vec::new();
    for guard in guards_for_table(table) {
        if let GuardSpec::Trigger(spec) = guard {
            let outcome = ensure_trigger(schema, &spec)?;
            outcomes.push((spec, outcome));
        }
    }
    Ok(outcomes)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fieldbook_core::{FieldbookError, GuardMode, IdentityRecord, KeySource, SchemaError};
    use fieldbook_store::MemoryStore;

    fn email_constraint() -> ConstraintSpec {
        ConstraintSpec {
            table: IdentityTable::Technicians,
            source: KeySource::Email,
            mode: GuardMode::CaseInsensitive,
        }
    }

    #[test]
    fn test_ensure_constraint_applied_then_already_present() {
        let store = MemoryStore::new();
        let spec = email_constraint();
        assert_eq!(
            ensure_constraint(&store, &spec).unwrap(),
            EnsureOutcome::Applied
        );
        assert_eq!(
            ensure_constraint(&store, &spec).unwrap(),
            EnsureOutcome::AlreadyPresent
        );
    }

    #[test]
    fn test_ensure_trigger_is_idempotent() {
        let store = MemoryStore::new();
        let spec = TriggerSpec {
            table: IdentityTable::Customers,
            source: KeySource::DisplayName,
        };
        assert_eq!(ensure_trigger(&store, &spec).unwrap(), EnsureOutcome::Applied);
        assert_eq!(
            ensure_trigger(&store, &spec).unwrap(),
            EnsureOutcome::AlreadyPresent
        );
    }

    #[test]
    fn test_dirty_table_error_is_surfaced_verbatim() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (id, email) in [(1, "A@x.com"), (2, "a@x.com")] {
            store
                .seed(
                    IdentityTable::Technicians,
                    IdentityRecord {
                        id,
                        user_ref: None,
                        display_name: format!("tech {id}"),
                        email: Some(email.to_string()),
                        created_at: now,
                    },
                )
                .unwrap();
        }
        let err = ensure_constraint(&store, &email_constraint()).unwrap_err();
        assert!(matches!(
            err,
            FieldbookError::Schema(SchemaError::DirtyTable { .. })
        ));
    }

    #[test]
    fn test_pending_guards_shrinks_as_guards_install() {
        let store = MemoryStore::new();
        assert_eq!(
            pending_guards(&store, IdentityTable::Profiles).unwrap().len(),
            6
        );
        ensure_table_constraints(&store, IdentityTable::Profiles).unwrap();
        assert_eq!(
            pending_guards(&store, IdentityTable::Profiles).unwrap().len(),
            3
        );
        ensure_table_triggers(&store, IdentityTable::Profiles).unwrap();
        assert!(pending_guards(&store, IdentityTable::Profiles)
            .unwrap()
            .is_empty());
    }
}
