//! Transactional asset coordinator: filesystem actions after the outcome
//!
//! One coordinator per add/edit operation. It records every staged asset
//! while the operation runs, adopts the plan's filesystem actions before
//! the database writes go out, and runs nothing against the filesystem
//! until [`finalize`](AssetCoordinator::finalize) receives the
//! transaction's outcome. Dropping an unfinalized coordinator discards
//! the staged files, so error paths cannot leak temp artifacts.

use vitrine_assets::{LogicalAssetPath, StagedAsset, StagingStore};

use crate::reconcile::ReconciliationPlan;

/// Settled fate of the enclosing repository transaction, passed to the
/// coordinator explicitly rather than through global registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Staging,
    PendingCommit,
    Finished,
}

/// What the deferred filesystem phase actually did.
#[derive(Debug, Default)]
pub struct FinalizeReport {
    pub promoted: usize,
    pub discarded: usize,
    pub deleted: usize,
    /// Final paths the committed transaction now references but whose
    /// promotion failed. The one inconsistency this design cannot undo;
    /// surfaced here and as critical logs, never as an operation error.
    pub failed_promotions: Vec<LogicalAssetPath>,
}

/// Per-operation coordinator for the two-resource commit.
pub struct AssetCoordinator<'a> {
    store: &'a StagingStore,
    staged: Vec<StagedAsset>,
    promote: Vec<StagedAsset>,
    delete_final: Vec<LogicalAssetPath>,
    state: State,
}

impl<'a> AssetCoordinator<'a> {
    pub fn new(store: &'a StagingStore) -> Self {
        Self {
            store,
            staged: Vec::new(),
            promote: Vec::new(),
            delete_final: Vec::new(),
            state: State::Staging,
        }
    }

    /// Record a staged asset for end-of-operation accounting. Every asset
    /// staged for this operation must be tracked, or it can leak on
    /// rollback.
    pub fn track(&mut self, asset: &StagedAsset) {
        if self.state != State::Staging {
            log::warn!("asset staged after writes were issued: {}", asset.temp_path);
        }
        self.staged.push(asset.clone());
    }

    /// Adopt the plan's filesystem actions and move to the pending state.
    /// Call immediately before issuing the database writes.
    pub fn adopt(&mut self, plan: &ReconciliationPlan) {
        self.promote = plan.promote.clone();
        self.delete_final = plan.delete_final.clone();
        self.state = State::PendingCommit;
    }

    /// Execute the deferred filesystem actions for the settled outcome.
    ///
    /// Commit: promote planned assets (in plan order), then delete removed
    /// final files, then discard staged assets the plan did not promote.
    /// Old files are deleted only after new ones are in place, so an image
    /// replacement never has a window with neither file present.
    ///
    /// Rollback: discard everything that was staged.
    pub fn finalize(mut self, outcome: TransactionOutcome) -> FinalizeReport {
        let mut report = FinalizeReport::default();

        match outcome {
            TransactionOutcome::Committed => {
                for asset in std::mem::take(&mut self.promote) {
                    match self.store.promote(&asset) {
                        Ok(()) => report.promoted += 1,
                        Err(err) => {
                            // The committed row now references a missing
                            // file; nothing here can roll that back.
                            log::error!(
                                "CRITICAL: promotion failed after commit for {}: {err}",
                                asset.final_path
                            );
                            report.failed_promotions.push(asset.final_path.clone());
                        }
                    }
                    self.forget(&asset);
                }
                for path in std::mem::take(&mut self.delete_final) {
                    match self.store.delete_final(&path) {
                        Ok(true) => report.deleted += 1,
                        Ok(false) => {}
                        Err(err) => log::error!("deferred delete failed for {path}: {err}"),
                    }
                }
                // Staged but unplanned (e.g. upload for a deleted color).
                report.discarded = self.discard_remaining();
            }
            TransactionOutcome::RolledBack => {
                report.discarded = self.discard_remaining();
            }
        }

        self.state = State::Finished;
        log::info!(
            "asset coordinator finished ({outcome:?}): {} promoted, {} discarded, {} deleted, {} failed",
            report.promoted,
            report.discarded,
            report.deleted,
            report.failed_promotions.len()
        );
        report
    }

    /// Drop a tracked asset once its temp file has been consumed.
    fn forget(&mut self, asset: &StagedAsset) {
        self.staged.retain(|s| s.temp_path != asset.temp_path);
    }

    fn discard_remaining(&mut self) -> usize {
        let remaining = std::mem::take(&mut self.staged);
        let count = remaining.len();
        for asset in &remaining {
            self.store.discard(asset);
        }
        count
    }
}

impl Drop for AssetCoordinator<'_> {
    fn drop(&mut self) {
        if self.state != State::Finished && !self.staged.is_empty() {
            log::warn!(
                "operation abandoned with {} staged asset(s), discarding",
                self.staged.len()
            );
            self.discard_remaining();
        }
    }
}
