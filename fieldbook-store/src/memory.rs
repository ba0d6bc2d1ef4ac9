//! In-memory store for the identity tables, bookings, and guards.
//!
//! Backs the test suites and the audit tooling. Guard semantics match
//! what the rendered Postgres DDL installs: once a trigger guard is in
//! place, every insert/update re-checks the normalized key against all
//! other rows and rejects collisions inside the writer's own call.
//! Each call is atomic; cross-step atomicity is the runner's concern.

use crate::{DependentStore, IdentityStore, SchemaStore};
use fieldbook_core::{
    ConstraintSpec, DependentRow, FieldbookResult, GuardMode, IdentityRecord, IdentityTable,
    KeyStrategy, NormalizedKey, RecordId, SchemaError, StoreError, TriggerSpec,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Tables = HashMap<IdentityTable, BTreeMap<RecordId, IdentityRecord>>;

/// In-memory implementation of all three store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Tables>>,
    bookings: Arc<RwLock<BTreeMap<RecordId, DependentRow>>>,
    constraints: Arc<RwLock<HashMap<String, ConstraintSpec>>>,
    triggers: Arc<RwLock<HashMap<String, TriggerSpec>>>,
}

fn read<T>(lock: &RwLock<T>) -> FieldbookResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned.into())
}

fn write<T>(lock: &RwLock<T>) -> FieldbookResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned.into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without guard checks, as production data written
    /// before any guard existed. Fixtures use this to build the dirty
    /// states the migration has to clean up.
    pub fn seed(&self, table: IdentityTable, record: IdentityRecord) -> FieldbookResult<()> {
        let mut tables = write(&self.records)?;
        tables.entry(table).or_default().insert(record.id, record);
        Ok(())
    }

    /// Seed a booking referencing an identity record.
    pub fn seed_booking(
        &self,
        id: RecordId,
        table: IdentityTable,
        identity_id: RecordId,
    ) -> FieldbookResult<()> {
        let mut bookings = write(&self.bookings)?;
        bookings.insert(
            id,
            DependentRow {
                id,
                table,
                identity_id,
            },
        );
        Ok(())
    }

    /// All bookings, in id order.
    pub fn bookings(&self) -> FieldbookResult<Vec<DependentRow>> {
        Ok(read(&self.bookings)?.values().cloned().collect())
    }

    /// Row count of one identity table.
    pub fn record_count(&self, table: IdentityTable) -> FieldbookResult<usize> {
        Ok(read(&self.records)?
            .get(&table)
            .map(|rows| rows.len())
            .unwrap_or(0))
    }

    /// Guard checks applied to a write of `record` into `table`.
    ///
    /// Trigger guards fire first (they run BEFORE the write in the real
    /// schema), then unique guards. Rows with `id == record.id` are
    /// excluded so an update never collides with itself.
    fn check_guards(
        &self,
        tables: &Tables,
        table: IdentityTable,
        record: &IdentityRecord,
    ) -> FieldbookResult<()> {
        let rows = tables.get(&table);
        let others = || {
            rows.into_iter()
                .flat_map(|r| r.values())
                .filter(|other| other.id != record.id)
        };

        let triggers = read(&self.triggers)?;
        for spec in triggers.values().filter(|t| t.table == table) {
            let Some(key) = record.matching_key(KeyStrategy::Field(spec.source)) else {
                continue;
            };
            if let Some(holder) = others()
                .find(|other| other.matching_key(KeyStrategy::Field(spec.source)).as_ref() == Some(&key))
            {
                return Err(StoreError::GuardConflict {
                    table,
                    guard: spec.guard_name(),
                    key,
                    holder: holder.id,
                }
                .into());
            }
        }

        let constraints = read(&self.constraints)?;
        for spec in constraints.values().filter(|c| c.table == table) {
            let Some(key) = constraint_key(record, spec) else {
                continue;
            };
            if let Some(holder) =
                others().find(|&other| constraint_key(other, spec).as_ref() == Some(&key))
            {
                return Err(StoreError::GuardConflict {
                    table,
                    guard: spec.guard_name(),
                    key,
                    holder: holder.id,
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Comparison key for a uniqueness guard. Exact mode compares the raw
/// column value; case-insensitive mode compares the normalized
/// projection. Absent and empty-after-trim values never collide in
/// either mode, matching the rendered index's
/// `WHERE col IS NOT NULL AND btrim(col) <> ''` exclusion.
fn constraint_key(record: &IdentityRecord, spec: &ConstraintSpec) -> Option<NormalizedKey> {
    match spec.mode {
        GuardMode::CaseInsensitive => NormalizedKey::derive(spec.source, record.field(spec.source)),
        GuardMode::Exact => record
            .field(spec.source)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| NormalizedKey {
                source: spec.source,
                value: raw.to_string(),
            }),
    }
}

// ============================================================================
// IDENTITY STORE
// ============================================================================

impl IdentityStore for MemoryStore {
    fn list(&self, table: IdentityTable) -> FieldbookResult<Vec<IdentityRecord>> {
        let tables = read(&self.records)?;
        Ok(tables
            .get(&table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, table: IdentityTable, id: RecordId) -> FieldbookResult<Option<IdentityRecord>> {
        let tables = read(&self.records)?;
        Ok(tables.get(&table).and_then(|rows| rows.get(&id)).cloned())
    }

    fn insert(&self, table: IdentityTable, record: &IdentityRecord) -> FieldbookResult<()> {
        let mut tables = write(&self.records)?;
        if tables
            .get(&table)
            .is_some_and(|rows| rows.contains_key(&record.id))
        {
            return Err(StoreError::InsertFailed {
                table,
                reason: format!("id {} already exists", record.id),
            }
            .into());
        }
        self.check_guards(&tables, table, record)?;
        tables.entry(table).or_default().insert(record.id, record.clone());
        Ok(())
    }

    fn update(&self, table: IdentityTable, record: &IdentityRecord) -> FieldbookResult<()> {
        let mut tables = write(&self.records)?;
        if !tables
            .get(&table)
            .is_some_and(|rows| rows.contains_key(&record.id))
        {
            return Err(StoreError::NotFound {
                table,
                id: record.id,
            }
            .into());
        }
        self.check_guards(&tables, table, record)?;
        tables.entry(table).or_default().insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, table: IdentityTable, ids: &[RecordId]) -> FieldbookResult<usize> {
        let mut tables = write(&self.records)?;
        let bookings = read(&self.bookings)?;
        for id in ids {
            if bookings
                .values()
                .any(|b| b.table == table && b.identity_id == *id)
            {
                return Err(StoreError::ForeignKeyViolation { table, id: *id }.into());
            }
        }
        let Some(rows) = tables.get_mut(&table) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count())
    }
}

// ============================================================================
// DEPENDENT STORE
// ============================================================================

impl DependentStore for MemoryStore {
    fn find_referencing(
        &self,
        table: IdentityTable,
        old_ids: &[RecordId],
    ) -> FieldbookResult<Vec<DependentRow>> {
        let bookings = read(&self.bookings)?;
        Ok(bookings
            .values()
            .filter(|b| b.table == table && old_ids.contains(&b.identity_id))
            .cloned()
            .collect())
    }

    fn rewrite(&self, rows: &[DependentRow], new_id: RecordId) -> FieldbookResult<u64> {
        let mut bookings = write(&self.bookings)?;
        let mut updated = 0u64;
        for row in rows {
            let booking = bookings
                .get_mut(&row.id)
                .ok_or_else(|| StoreError::RewriteFailed {
                    table: row.table,
                    reason: format!("dependent row {} vanished during rewrite", row.id),
                })?;
            if booking.identity_id != new_id {
                booking.identity_id = new_id;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

// ============================================================================
// SCHEMA STORE
// ============================================================================

impl SchemaStore for MemoryStore {
    fn guard_exists(&self, name: &str) -> FieldbookResult<bool> {
        Ok(read(&self.constraints)?.contains_key(name) || read(&self.triggers)?.contains_key(name))
    }

    fn create_constraint(&self, spec: &ConstraintSpec) -> FieldbookResult<()> {
        let tables = read(&self.records)?;
        // Installation against a dirty column is rejected outright, as
        // the underlying index build would be.
        let mut seen: HashMap<NormalizedKey, RecordId> = HashMap::new();
        if let Some(rows) = tables.get(&spec.table) {
            for row in rows.values() {
                let Some(key) = constraint_key(row, spec) else {
                    continue;
                };
                if let Some(first) = seen.insert(key.clone(), row.id) {
                    return Err(SchemaError::DirtyTable {
                        table: spec.table,
                        guard: spec.guard_name(),
                        key,
                        ids: vec![first, row.id],
                    }
                    .into());
                }
            }
        }
        let mut constraints = write(&self.constraints)?;
        constraints.insert(spec.guard_name(), spec.clone());
        Ok(())
    }

    fn create_trigger(&self, spec: &TriggerSpec) -> FieldbookResult<()> {
        let mut triggers = write(&self.triggers)?;
        triggers.insert(spec.guard_name(), spec.clone());
        Ok(())
    }

    fn installed_guards(&self) -> FieldbookResult<Vec<String>> {
        let mut names: Vec<String> = read(&self.constraints)?.keys().cloned().collect();
        names.extend(read(&self.triggers)?.keys().cloned());
        names.sort();
        Ok(names)
    }
}

// =============================================================================
// TESTS
// =============================================================================
