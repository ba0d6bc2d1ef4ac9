//! Migration runner
//!
//! One sequential process per invocation, stepping
//! `Idle -> Scanning -> Resolving -> Rewriting -> Deleting ->
//! InstallingConstraints -> InstallingTriggers -> Done`, with `Failed`
//! terminal from any step. Dry-run stops after `Resolving` and mutates
//! nothing. Each mutating step is idempotent, so re-running the whole
//! sequence after a partial failure converges: rewritten bookings stay
//! rewritten, deleted rows vanish from later scans, and guard
//! installation reports `AlreadyPresent` instead of failing.

use crate::guards::{ensure_table_constraints, ensure_table_triggers, pending_guards};
use crate::retention::resolve;
use crate::rewrite::rewrite_dependents;
use crate::scanner::scan_table;
use fieldbook_core::{
    DryRunReport, EnsureOutcome, FieldbookResult, GroupPlan, MigrationConfig, MigrationOutcome,
    MigrationSummary, RunMode, TablePlan,
};
use fieldbook_store::{DependentStore, IdentityStore, SchemaStore};
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// STATE MACHINE
// ============================================================================

/// Runner state. Transitions are strictly sequential; no step starts
/// before the previous one completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Scanning,
    Resolving,
    Rewriting,
    Deleting,
    InstallingConstraints,
    InstallingTriggers,
    Done,
    Failed,
}

// ============================================================================
// CONFIRMATION BOUNDARY
// ============================================================================

/// Boundary callback for interactive confirmation. The terminal layer
/// (colors, prompts) implements this; the core only sees a yes/no.
pub trait Confirm {
    fn confirm(&self, report: &DryRunReport) -> bool;
}

/// Confirms every plan. For unattended runs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _report: &DryRunReport) -> bool {
        true
    }
}

/// What a run produced, depending on the configured mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// Dry-run: the plan, nothing mutated.
    Report(DryRunReport),
    /// Live run: applied / already-applied / declined.
    Outcome(MigrationOutcome),
}

// ============================================================================
// RUNNER
// ============================================================================

/// Sequences one migration run against the three store collaborators.
/// Not designed for concurrent self-invocation; serialization is the
/// backing store's transaction isolation's job.
pub struct MigrationRunner<'a, I, D, S>
where
    I: IdentityStore + ?Sized,
    D: DependentStore + ?Sized,
    S: SchemaStore + ?Sized,
{
    identity: &'a I,
    dependents: &'a D,
    schema: &'a S,
    config: MigrationConfig,
    state: MigrationState,
}

impl<'a, I, D, S> MigrationRunner<'a, I, D, S>
where
    I: IdentityStore + ?Sized,
    D: DependentStore + ?Sized,
    S: SchemaStore + ?Sized,
{
    pub fn new(identity: &'a I, dependents: &'a D, schema: &'a S, config: MigrationConfig) -> Self {
        MigrationRunner {
            identity,
            dependents,
            schema,
            config,
            state: MigrationState::Idle,
        }
    }

    /// Current state. A successful dry run reaches `Done` directly
    /// from `Resolving`; the mutating states are never entered.
    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Run according to the configured mode.
    pub fn execute(&mut self, confirm: &dyn Confirm) -> FieldbookResult<RunOutput> {
        match self.config.mode {
            RunMode::DryRun => self.dry_run().map(RunOutput::Report),
            RunMode::Live => self.apply(confirm).map(RunOutput::Outcome),
        }
    }

    /// Scan and resolve only; report the plan without mutating the
    /// store. Never produces a fatal error from malformed data -
    /// un-keyable records are counted and skipped.
    pub fn dry_run(&mut self) -> FieldbookResult<DryRunReport> {
        let report = self.guarded(Self::build_plan)?;
        self.state = MigrationState::Done;
        Ok(report)
    }

    /// Execute the full sequence. `Rewriting` through
    /// `InstallingTriggers` only start once the confirmation boundary
    /// accepts the plan.
    pub fn apply(&mut self, confirm: &dyn Confirm) -> FieldbookResult<MigrationOutcome> {
        let outcome = self.guarded(|runner| runner.apply_inner(confirm))?;
        self.state = match outcome {
            MigrationOutcome::Declined => MigrationState::Idle,
            _ => MigrationState::Done,
        };
        Ok(outcome)
    }

    /// Run `f`, parking the runner in `Failed` on error.
    fn guarded<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> FieldbookResult<T>,
    ) -> FieldbookResult<T> {
        let result = f(&mut *self);
        if let Err(error) = &result {
            warn!(state = ?self.state, %error, "migration step failed");
            self.state = MigrationState::Failed;
        }
        result
    }

    fn apply_inner(&mut self, confirm: &dyn Confirm) -> FieldbookResult<MigrationOutcome> {
        let report = self.build_plan()?;

        if !report.has_pending_work() {
            info!(run_id = %report.run_id, "nothing to do; migration already applied");
            return Ok(MigrationOutcome::AlreadyApplied);
        }
        if !confirm.confirm(&report) {
            info!(run_id = %report.run_id, "plan declined; store untouched");
            return Ok(MigrationOutcome::Declined);
        }

        let mut summary = MigrationSummary {
            groups_resolved: report.group_count(),
            ..MigrationSummary::default()
        };

        // Rewrite every dependent before any deletion starts.
        self.state = MigrationState::Rewriting;
        for plan in &report.tables {
            for group in &plan.groups {
                summary.dependents_rewritten +=
                    rewrite_dependents(self.dependents, plan.table, &group.remove, group.keep)?;
            }
        }

        self.state = MigrationState::Deleting;
        for plan in &report.tables {
            let mut deleted = 0usize;
            for group in &plan.groups {
                deleted += self.identity.delete(plan.table, &group.remove)?;
            }
            if deleted > 0 {
                info!(table = %plan.table, deleted, "duplicates removed");
            }
            summary.records_deleted += deleted;
        }

        // Constraints cannot be added while violating rows exist, so
        // guard installation strictly follows cleanup.
        self.state = MigrationState::InstallingConstraints;
        for plan in &report.tables {
            for (_, outcome) in ensure_table_constraints(self.schema, plan.table)? {
                tally(&mut summary, outcome);
            }
        }

        self.state = MigrationState::InstallingTriggers;
        for plan in &report.tables {
            for (_, outcome) in ensure_table_triggers(self.schema, plan.table)? {
                tally(&mut summary, outcome);
            }
        }

        info!(
            run_id = %report.run_id,
            groups = summary.groups_resolved,
            rewritten = summary.dependents_rewritten,
            deleted = summary.records_deleted,
            guards_applied = summary.guards_applied,
            "migration applied"
        );
        Ok(MigrationOutcome::Applied(summary))
    }

    /// Scanning + Resolving: the shared front half of both modes.
    fn build_plan(&mut self) -> FieldbookResult<DryRunReport> {
        self.state = MigrationState::Scanning;
        let mut scans = Vec::new();
        for &table in &self.config.tables {
            scans.push((table, scan_table(self.identity, table)?));
        }

        self.state = MigrationState::Resolving;
        let mut tables = Vec::new();
        for (table, outcome) in scans {
            let groups = outcome
                .groups
                .iter()
                .filter_map(|group| {
                    let resolution = resolve(group)?;
                    Some(GroupPlan {
                        key: group.key.clone(),
                        keep: resolution.keep.id,
                        remove: resolution.remove_ids(),
                    })
                })
                .collect();
            let pending = pending_guards(self.schema, table)?
                .iter()
                .map(|guard| guard.guard_name())
                .collect();
            tables.push(TablePlan {
                table,
                groups,
                skipped_records: outcome.skipped,
                pending_guards: pending,
            });
        }

        Ok(DryRunReport {
            run_id: Uuid::now_v7(),
            generated_at: chrono::Utc::now(),
            tables,
        })
    }
}

fn tally(summary: &mut MigrationSummary, outcome: EnsureOutcome) {
    match outcome {
        EnsureOutcome::Applied => summary.guards_applied += 1,
        EnsureOutcome::AlreadyPresent => summary.guards_already_present += 1,
    }
}

// =============================================================================
// TESTS
// =============================================================================
