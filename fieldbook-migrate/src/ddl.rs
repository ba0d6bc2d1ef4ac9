//! Postgres DDL rendering
//!
//! The schema-side form of the guards and of the cleanup itself. Every
//! statement is idempotent (`IF NOT EXISTS`, `CREATE OR REPLACE`,
//! `DROP ... IF EXISTS` before `CREATE`), so the rendered script can be
//! re-applied safely - the same converge-to-state model the in-memory
//! ensure operations follow. A Postgres-backed `SchemaStore` executes
//! these; rendering itself is pure.

use fieldbook_core::{
    guards_for_table, ConstraintSpec, GuardMode, GuardSpec, IdentityTable, TablePlan, TriggerSpec,
};
use std::fmt::Write;

/// Foreign-key column in `bookings` for an identity table.
pub fn fk_column(table: IdentityTable) -> &'static str {
    match table {
        IdentityTable::Technicians => "technician_id",
        IdentityTable::Customers => "customer_id",
        IdentityTable::Profiles => "profile_id",
    }
}

/// Unique index DDL for a uniqueness guard.
///
/// Case-insensitive mode constrains the lower-cased, trimmed projection
/// as an expression index - the derived-key form of case-insensitive
/// uniqueness. Both modes exclude absent/empty values, matching the
/// normalizer's absent-never-collides rule.
pub fn constraint_ddl(spec: &ConstraintSpec) -> String {
    let table = spec.table.table_name();
    let column = spec.source.column();
    let name = spec.guard_name();
    match spec.mode {
        GuardMode::Exact => format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} ({column}) \
             WHERE {column} IS NOT NULL AND btrim({column}) <> '';"
        ),
        GuardMode::CaseInsensitive => format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {name} ON {table} (lower(btrim({column}))) \
             WHERE {column} IS NOT NULL AND btrim({column}) <> '';"
        ),
    }
}

/// Trigger-guard DDL: a check function plus a BEFORE INSERT/UPDATE
/// trigger on the keyed column.
///
/// The function runs inside the writer's transaction, which closes the
/// check-then-commit race an application-level lookup leaves open. The
/// `id <> NEW.id` predicate excludes the row being updated, so an
/// unchanged key never rejects its own row.
pub fn trigger_ddl(spec: &TriggerSpec) -> String {
    let table = spec.table.table_name();
    let column = spec.source.column();
    let trigger = spec.guard_name();
    let function = spec.function_name();
    format!(
        "CREATE OR REPLACE FUNCTION {function}() RETURNS trigger AS $$\n\
         BEGIN\n\
         \x20   IF NEW.{column} IS NULL OR btrim(NEW.{column}) = '' THEN\n\
         \x20       RETURN NEW;\n\
         \x20   END IF;\n\
         \x20   IF EXISTS (\n\
         \x20       SELECT 1 FROM {table}\n\
         \x20       WHERE id <> NEW.id\n\
         \x20         AND lower(btrim({column})) = lower(btrim(NEW.{column}))\n\
         \x20   ) THEN\n\
         \x20       RAISE EXCEPTION '{table}.{column} % is already taken', NEW.{column}\n\
         \x20           USING ERRCODE = 'unique_violation';\n\
         \x20   END IF;\n\
         \x20   RETURN NEW;\n\
         END;\n\
         $$ LANGUAGE plpgsql;\n\
         \n\
         DROP TRIGGER IF EXISTS {trigger} ON {table};\n\
         CREATE TRIGGER {trigger}\n\
         \x20   BEFORE INSERT OR UPDATE OF {column} ON {table}\n\
         \x20   FOR EACH ROW EXECUTE FUNCTION {function}();"
    )
}

/// DDL for either guard kind.
pub fn guard_ddl(guard: &GuardSpec) -> String {
    match guard {
        GuardSpec::Constraint(spec) => constraint_ddl(spec),
        GuardSpec::Trigger(spec) => trigger_ddl(spec),
    }
}

/// Render the full live migration as one transactional script:
/// rewrite bookings, delete losers, install pending guards.
///
/// This is the versioned script handed across the migration boundary;
/// stores that support transactional DDL get the whole sequence as a
/// single atomic unit.
pub fn migration_script(plans: &[TablePlan]) -> String {
    let mut script = String::from("BEGIN;\n");

    for plan in plans {
        let table = plan.table.table_name();
        let fk = fk_column(plan.table);
        for group in &plan.groups {
            if group.remove.is_empty() {
                continue;
            }
            let removed = id_list(&group.remove);
            let _ = writeln!(
                script,
                "UPDATE bookings SET {fk} = {keep} WHERE {fk} IN ({removed});",
                keep = group.keep,
            );
            let _ = writeln!(script, "DELETE FROM {table} WHERE id IN ({removed});");
        }
        for guard in guards_for_table(plan.table) {
            if plan.pending_guards.contains(&guard.guard_name()) {
                script.push_str(&guard_ddl(&guard));
                script.push('\n');
            }
        }
    }

    script.push_str("COMMIT;\n");
    script
}

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbook_core::{GroupPlan, KeySource, NormalizedKey};

    #[test]
    fn test_exact_constraint_ddl() {
        let ddl = constraint_ddl(&ConstraintSpec {
            table: IdentityTable::Technicians,
            source: KeySource::UserRef,
            mode: GuardMode::Exact,
        });
        assert!(ddl.contains("CREATE UNIQUE INDEX IF NOT EXISTS uq_technicians_user_ref"));
        assert!(ddl.contains("ON technicians (user_ref)"));
        assert!(!ddl.contains("lower("));
    }

    #[test]
    fn test_case_insensitive_constraint_uses_expression_index() {
        let ddl = constraint_ddl(&ConstraintSpec {
            table: IdentityTable::Customers,
            source: KeySource::Email,
            mode: GuardMode::CaseInsensitive,
        });
        assert!(ddl.contains("uqci_customers_email"));
        assert!(ddl.contains("(lower(btrim(email)))"));
    }

    #[test]
    fn test_trigger_ddl_excludes_self_and_is_replayable() {
        let ddl = trigger_ddl(&TriggerSpec {
            table: IdentityTable::Technicians,
            source: KeySource::Email,
        });
        assert!(ddl.contains("id <> NEW.id"));
        assert!(ddl.contains("CREATE OR REPLACE FUNCTION trg_technicians_email_guard_check()"));
        assert!(ddl.contains("DROP TRIGGER IF EXISTS trg_technicians_email_guard ON technicians"));
        assert!(ddl.contains("BEFORE INSERT OR UPDATE OF email ON technicians"));
        assert!(ddl.contains("unique_violation"));
    }

    #[test]
    fn test_migration_script_rewrites_before_deleting() {
        let plan = TablePlan {
            table: IdentityTable::Technicians,
            groups: vec![GroupPlan {
                key: NormalizedKey {
                    source: KeySource::UserRef,
                    value: "u1".to_string(),
                },
                keep: 1,
                remove: vec![2, 3],
            }],
            skipped_records: 0,
            pending_guards: vec!["uq_technicians_user_ref".to_string()],
        };
        let script = migration_script(&[plan]);

        let update = script
            .find("UPDATE bookings SET technician_id = 1 WHERE technician_id IN (2, 3);")
            .expect("update present");
        let delete = script
            .find("DELETE FROM technicians WHERE id IN (2, 3);")
            .expect("delete present");
        assert!(update < delete);

        assert!(script.starts_with("BEGIN;"));
        assert!(script.trim_end().ends_with("COMMIT;"));
        assert!(script.contains("uq_technicians_user_ref"));
        // Only the pending guard is rendered.
        assert!(!script.contains("uqci_technicians_email"));
    }
}
