//! Fieldbook Core - Entity Types
//!
//! Pure data structures for the identity-integrity subsystem.
//! All other crates depend on this. This crate contains ONLY data
//! types and key derivation - no storage, no orchestration.

pub mod config;
pub mod error;
pub mod guard;
pub mod identity;
pub mod record;
pub mod report;

pub use config::{MigrationConfig, RunMode};
pub use error::{FieldbookError, FieldbookResult, SchemaError, StoreError};
pub use guard::{
    guards_for_table, ConstraintSpec, EnsureOutcome, GuardMode, GuardSpec, TriggerSpec,
};
pub use identity::{normalize_value, KeySource, KeyStrategy, NormalizedKey, RecordId, Timestamp};
pub use record::{DependentRow, DuplicateGroup, IdentityRecord, IdentityTable};
pub use report::{DryRunReport, GroupPlan, MigrationOutcome, MigrationSummary, TablePlan};
