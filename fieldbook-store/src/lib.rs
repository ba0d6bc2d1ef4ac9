//! Fieldbook Store - Storage Traits and In-Memory Implementation
//!
//! Defines the storage abstraction the migration core runs against.
//! A Postgres-backed implementation executes the rendered DDL from
//! `fieldbook-migrate`; the in-memory [`MemoryStore`] here enforces the
//! same guard semantics inline and backs the test suites.

pub mod memory;

pub use memory::MemoryStore;

use fieldbook_core::{
    ConstraintSpec, DependentRow, FieldbookResult, IdentityRecord, IdentityTable, RecordId,
    TriggerSpec,
};

// ============================================================================
// IDENTITY STORE
// ============================================================================

/// Row operations on the identity tables.
///
/// Once trigger guards are installed, every `insert`/`update` must pass
/// through them; implementations reject colliding writes with
/// `StoreError::GuardConflict` inside the writer's own operation.
pub trait IdentityStore: Send + Sync {
    /// All rows of a table. Ordering is implementation-defined; the
    /// scanner imposes its own total order.
    fn list(&self, table: IdentityTable) -> FieldbookResult<Vec<IdentityRecord>>;

    /// Fetch a row by id.
    fn get(&self, table: IdentityTable, id: RecordId) -> FieldbookResult<Option<IdentityRecord>>;

    /// Insert a new row, subject to installed guards.
    fn insert(&self, table: IdentityTable, record: &IdentityRecord) -> FieldbookResult<()>;

    /// Update an existing row, subject to installed guards. The row
    /// being updated is excluded from guard comparisons.
    fn update(&self, table: IdentityTable, record: &IdentityRecord) -> FieldbookResult<()>;

    /// Delete rows by id, returning the count actually removed.
    /// Fails with `ForeignKeyViolation` if dependents still reference
    /// any of the ids.
    fn delete(&self, table: IdentityTable, ids: &[RecordId]) -> FieldbookResult<usize>;
}

// ============================================================================
// DEPENDENT STORE
// ============================================================================

/// Foreign-key-bearing rows (bookings) referencing identity records.
/// The migration core never touches booking-table specifics directly.
pub trait DependentStore: Send + Sync {
    /// Rows referencing any of `old_ids` in the given identity table.
    fn find_referencing(
        &self,
        table: IdentityTable,
        old_ids: &[RecordId],
    ) -> FieldbookResult<Vec<DependentRow>>;

    /// Repoint the given rows at `new_id`, returning rows updated.
    fn rewrite(&self, rows: &[DependentRow], new_id: RecordId) -> FieldbookResult<u64>;
}

// ============================================================================
// SCHEMA STORE
// ============================================================================

/// Schema-level guard objects: unique constraints/indexes and trigger
/// guards. Guards are identified by their derived name; existence is
/// checked by name, never re-derived from data.
pub trait SchemaStore: Send + Sync {
    /// Whether a guard with this name is already installed.
    fn guard_exists(&self, name: &str) -> FieldbookResult<bool>;

    /// Create a uniqueness guard. Precondition: the column is already
    /// free of duplicates under the spec's mode; a dirty table fails
    /// with `SchemaError::DirtyTable` and must be surfaced verbatim.
    fn create_constraint(&self, spec: &ConstraintSpec) -> FieldbookResult<()>;

    /// Create a before-write trigger guard.
    fn create_trigger(&self, spec: &TriggerSpec) -> FieldbookResult<()>;

    /// Names of all installed guards.
    fn installed_guards(&self) -> FieldbookResult<Vec<String>>;
}
