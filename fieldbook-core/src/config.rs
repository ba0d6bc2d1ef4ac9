//! Configuration types

use crate::record::IdentityTable;
use serde::{Deserialize, Serialize};

/// Execution mode for a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Scan and resolve only; report the plan, mutate nothing.
    DryRun,
    /// Execute the full sequence against the store.
    Live,
}

/// Configuration for one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Tables to process, in order.
    pub tables: Vec<IdentityTable>,
    pub mode: RunMode,
}

impl MigrationConfig {
    /// All identity tables in dry-run mode.
    pub fn dry_run() -> Self {
        MigrationConfig {
            tables: IdentityTable::all().to_vec(),
            mode: RunMode::DryRun,
        }
    }

    /// All identity tables in live mode.
    pub fn live() -> Self {
        MigrationConfig {
            tables: IdentityTable::all().to_vec(),
            mode: RunMode::Live,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
