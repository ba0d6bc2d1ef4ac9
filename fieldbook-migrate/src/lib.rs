//! Fieldbook Migrate - Identity Deduplication Engine
//!
//! The one-time cleanup and permanent guard installation protecting the
//! identity tables (technicians, customers, profiles):
//!
//! - [`scanner`] finds groups of rows sharing a normalized key
//! - [`retention`] picks the surviving row of each group
//! - [`rewrite`] repoints bookings at the survivor before deletion
//! - [`guards`] idempotently ensures unique indexes and trigger guards
//! - [`ddl`] renders the equivalent Postgres migration script
//! - [`runner`] sequences the whole thing, with a dry-run mode
//!
//! The engine runs against the traits in `fieldbook-store`; it knows
//! nothing about terminals, prompts, or colors. The interactive layer
//! supplies a [`runner::Confirm`] implementation and renders the
//! [`fieldbook_core::DryRunReport`] however it likes.

pub mod ddl;
pub mod guards;
pub mod retention;
pub mod rewrite;
pub mod runner;
pub mod scanner;

pub use guards::{ensure_constraint, ensure_trigger, pending_guards};
pub use retention::{resolve, Resolution};
pub use rewrite::rewrite_dependents;
pub use runner::{AutoConfirm, Confirm, MigrationRunner, MigrationState, RunOutput};
pub use scanner::{scan, scan_table, ScanOutcome};
