//! # Pathway Configuration Service
//!
//! Reconciles a live endpoint towards a target configuration set.
//!
//! ## Apply contract
//!
//! - Rejected or unacknowledged pathways abort the whole batch in
//!   all-or-nothing mode; in partial mode they fail individually.
//! - Distinct pathways are submitted concurrently. At most one apply per
//!   pathway is in flight; a second attempt fails with `ApplyInProgress`.
//! - A submission is only `Applied` once the submitter confirms it. A
//!   timeout leaves the pathway in unknown state and sets `requires_rediff`.
//! - Once its in-flight slot is held, each pathway's live descriptor is
//!   re-read. A pathway whose live state moved since planning is not
//!   submitted and the batch reports `requires_rediff`.

use crate::algorithms::{
    diff, ApplyBatch, ConfigurationDiff, PlannedPathway, SecurityStackValidator, ValidationOutcome,
    ValidationReport,
};
use crate::config::ReconcilerConfig;
use crate::domain::{
    ApplyFailure, ApplyInstruction, ApplyMode, ApplyOptions, ApplyReport, ApplyResult,
    ConfigurationSet, LiveState, PathwayError, PathwayKey, Rejection,
};
use crate::metrics;
use crate::ports::inbound::PathwayConfigApi;
use crate::ports::outbound::{LiveStateSource, SubmitError, TransactionSubmitter};

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Releases a pathway's in-flight slot on drop.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<PathwayKey>>>,
    key: PathwayKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

/// The pathway configuration service.
pub struct PathwayConfigService<S: TransactionSubmitter, L: LiveStateSource> {
    /// Service configuration.
    config: ReconcilerConfig,
    /// Validator built from `config.security`.
    validator: SecurityStackValidator,
    /// Transaction submission adapter.
    submitter: Arc<S>,
    /// Live state adapter.
    source: Arc<L>,
    /// Pathways with an apply in flight.
    in_flight: Arc<Mutex<HashSet<PathwayKey>>>,
}

impl<S: TransactionSubmitter, L: LiveStateSource> PathwayConfigService<S, L> {
    /// Create a new service.
    pub fn new(submitter: Arc<S>, source: Arc<L>, config: ReconcilerConfig) -> Self {
        Self {
            validator: SecurityStackValidator::new(config.security.clone()),
            config,
            submitter,
            source,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Service configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Validator used for every batch.
    pub fn validator(&self) -> &SecurityStackValidator {
        &self.validator
    }

    /// Pathways with an apply currently in flight.
    pub fn in_flight(&self) -> Vec<PathwayKey> {
        self.in_flight.lock().iter().copied().collect()
    }

    fn try_acquire(&self, key: PathwayKey) -> Option<InFlightGuard> {
        if !self.in_flight.lock().insert(key) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// Why a planned pathway may not be submitted, if anything.
    fn blocker(entry: &PlannedPathway, options: &ApplyOptions) -> Option<Rejection> {
        match &entry.outcome {
            ValidationOutcome::Accepted => None,
            ValidationOutcome::Rejected(rejection) => Some(rejection.clone()),
            ValidationOutcome::AcceptedWithWarnings(advisories) => {
                let pending = options.acknowledgement.pending(&entry.key(), advisories);
                if pending.is_empty() {
                    None
                } else {
                    Some(Rejection::Unacknowledged(pending))
                }
            }
        }
    }

    async fn submit_one(&self, instruction: &ApplyInstruction, timeout: Duration) -> ApplyResult {
        let key = instruction.key;
        if instruction.updates().is_empty() {
            debug!(pathway = %key, "No field changes to submit");
            return ApplyResult::Skipped;
        }

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.submitter.submit(instruction)).await;
        metrics::record_submission_latency(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(())) => {
                info!(pathway = %key, kind = ?instruction.kind, updates = instruction.updates().len(), "Pathway applied");
                ApplyResult::Applied
            }
            Ok(Err(SubmitError::Timeout)) | Err(_) => {
                warn!(pathway = %key, timeout_secs = timeout.as_secs_f64(), "Apply timed out; state unknown");
                ApplyResult::Failed(ApplyFailure::Timeout)
            }
            Ok(Err(e)) => {
                warn!(pathway = %key, error = %e, "Apply failed");
                ApplyResult::Failed(ApplyFailure::Submission(e.to_string()))
            }
        }
    }

    async fn apply_batch(
        &self,
        batch: ApplyBatch,
        options: ApplyOptions,
    ) -> Result<ApplyReport, PathwayError> {
        let timeout = options.timeout.unwrap_or_else(|| self.config.apply_timeout());
        let mut results: BTreeMap<PathwayKey, ApplyResult> = batch
            .unchanged
            .iter()
            .map(|key| (*key, ApplyResult::Skipped))
            .collect();

        let blocked: BTreeMap<PathwayKey, Rejection> = batch
            .planned
            .iter()
            .filter_map(|entry| Self::blocker(entry, &options).map(|r| (entry.key(), r)))
            .collect();

        if options.mode == ApplyMode::AllOrNothing && !blocked.is_empty() {
            for entry in &batch.planned {
                let result = match blocked.get(&entry.key()) {
                    Some(rejection) => ApplyResult::Failed(ApplyFailure::Rejected(rejection.clone())),
                    None => ApplyResult::Skipped,
                };
                results.insert(entry.key(), result);
            }
            warn!(
                blocked = blocked.len(),
                planned = batch.planned.len(),
                "Batch rejected; nothing submitted"
            );
            metrics::record_batch_rejected();
            return Err(PathwayError::BatchRejected { results });
        }

        let mut submissions = Vec::new();
        for entry in batch.planned {
            let key = entry.key();
            if let Some(rejection) = blocked.get(&key) {
                debug!(pathway = %key, reason = %rejection, "Pathway blocked");
                results.insert(key, ApplyResult::Failed(ApplyFailure::Rejected(rejection.clone())));
                continue;
            }
            match self.try_acquire(key) {
                Some(guard) => submissions.push((entry, guard)),
                None if options.mode == ApplyMode::AllOrNothing => {
                    warn!(pathway = %key, "Apply already in progress; batch not submitted");
                    return Err(PathwayError::ApplyInProgress(key));
                }
                None => {
                    warn!(pathway = %key, "Apply already in progress");
                    results.insert(key, ApplyResult::Failed(ApplyFailure::ApplyInProgress));
                }
            }
        }

        // Holding the slots, confirm live state still matches the plan.
        if !submissions.is_empty() {
            let live = self.source.live_state().await?;
            let (stale, fresh): (Vec<_>, Vec<_>) = submissions
                .into_iter()
                .partition(|(entry, _)| entry.is_stale(&live));
            for (entry, _) in &stale {
                warn!(pathway = %entry.key(), "Live state changed since planning; not submitted");
                results.insert(entry.key(), ApplyResult::Failed(ApplyFailure::StaleLiveState));
            }
            if options.mode == ApplyMode::AllOrNothing && !stale.is_empty() {
                for (entry, _) in &fresh {
                    results.insert(entry.key(), ApplyResult::Skipped);
                }
                warn!(stale = stale.len(), "Batch planned against stale live state; nothing submitted");
                metrics::record_batch_rejected();
                return Err(PathwayError::BatchRejected { results });
            }
            submissions = fresh;
        }

        info!(submissions = submissions.len(), mode = %options.mode, "Submitting batch");
        let outcomes = join_all(submissions.into_iter().map(|(entry, guard)| async move {
            let result = self.submit_one(&entry.instruction, timeout).await;
            drop(guard);
            (entry.key(), result)
        }))
        .await;
        results.extend(outcomes);

        let mut report = ApplyReport {
            results,
            requires_rediff: false,
        };
        let mut submission_failed = false;
        for result in report.results.values() {
            metrics::record_apply_result(result_label(result));
            match result {
                ApplyResult::Failed(ApplyFailure::Timeout | ApplyFailure::StaleLiveState) => {
                    report.requires_rediff = true;
                    submission_failed = true;
                }
                ApplyResult::Failed(ApplyFailure::Submission(_))
                | ApplyResult::Failed(ApplyFailure::ApplyInProgress) => submission_failed = true,
                _ => {}
            }
        }

        if submission_failed {
            warn!(
                failed = report.failed().len(),
                requires_rediff = report.requires_rediff,
                "Batch partially applied"
            );
            return Err(PathwayError::PartialApplyFailure {
                results: report.results,
            });
        }

        info!(
            applied = report.applied().len(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            "Batch applied"
        );
        Ok(report)
    }
}

fn result_label(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::Applied => "applied",
        ApplyResult::Skipped => "skipped",
        ApplyResult::Failed(ApplyFailure::Rejected(_)) => "rejected",
        ApplyResult::Failed(ApplyFailure::ApplyInProgress) => "in_progress",
        ApplyResult::Failed(ApplyFailure::Timeout) => "timeout",
        ApplyResult::Failed(ApplyFailure::Submission(_)) => "submission_failed",
        ApplyResult::Failed(ApplyFailure::StaleLiveState) => "stale",
    }
}

// =============================================================================
// PathwayConfigApi Implementation
// =============================================================================

#[async_trait]
impl<S: TransactionSubmitter, L: LiveStateSource> PathwayConfigApi for PathwayConfigService<S, L> {
    async fn live_state(&self) -> Result<LiveState, PathwayError> {
        self.source.live_state().await
    }

    fn validate(&self, live: &LiveState, target: &ConfigurationSet) -> ValidationReport {
        ApplyBatch::prepare(live, target, &self.validator).validation_report()
    }

    fn diff(&self, live: &LiveState, target: &ConfigurationSet) -> ConfigurationDiff {
        diff(live, target)
    }

    async fn apply(
        &self,
        batch: ApplyBatch,
        options: ApplyOptions,
    ) -> Result<ApplyReport, PathwayError> {
        self.apply_batch(batch, options).await
    }

    async fn reconcile(
        &self,
        target: &ConfigurationSet,
        options: ApplyOptions,
    ) -> Result<ApplyReport, PathwayError> {
        let live = self.source.live_state().await?;
        let diff = diff(&live, target);
        for key in &diff.untracked {
            warn!(pathway = %key, "Live pathway not in target; left untouched");
        }
        info!(
            creates = diff.creates.len(),
            updates = diff.updates.len(),
            unchanged = diff.unchanged.len(),
            "Reconciling"
        );
        let batch = ApplyBatch::from_diff(&diff, &self.validator);
        self.apply_batch(batch, options).await
    }
}
