//! # Concurrent Apply
//!
//! Custom submitters exercise what the in-memory endpoint cannot: slow
//! confirmations, transport errors and the concurrency of distinct
//! pathways within one batch.

use async_trait::async_trait;
use pathway_config::{
    ApplyInstruction, LiveState, LiveStateSource, PathwayError, PathwayKey, SubmitError,
    TransactionSubmitter,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Live state that never changes.
pub struct FixedLiveState(pub LiveState);

#[async_trait]
impl LiveStateSource for FixedLiveState {
    async fn live_state(&self) -> Result<LiveState, PathwayError> {
        Ok(self.0.clone())
    }
}

/// Submitter that waits a per-pathway delay, then confirms or errors.
#[derive(Default)]
pub struct ScriptedSubmitter {
    delays: HashMap<PathwayKey, Duration>,
    errors: HashMap<PathwayKey, SubmitError>,
    active: AtomicUsize,
    peak: AtomicUsize,
    confirmed: Mutex<Vec<PathwayKey>>,
}

impl ScriptedSubmitter {
    pub fn delay(mut self, key: PathwayKey, delay: Duration) -> Self {
        self.delays.insert(key, delay);
        self
    }

    pub fn error(mut self, key: PathwayKey, error: SubmitError) -> Self {
        self.errors.insert(key, error);
        self
    }

    /// Highest number of submissions observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn confirmed(&self) -> Vec<PathwayKey> {
        self.confirmed.lock().clone()
    }
}

#[async_trait]
impl TransactionSubmitter for ScriptedSubmitter {
    async fn submit(&self, instruction: &ApplyInstruction) -> Result<(), SubmitError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&instruction.key)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.errors.get(&instruction.key) {
            return Err(error.clone());
        }
        self.confirmed.lock().push(instruction.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use pathway_config::{
        Address, ApplyBatch, ApplyFailure, ApplyMode, ApplyOptions, ApplyResult, PathwayConfigApi,
        PathwayConfigService, ReconcilerConfig, RecordingSubmitter,
    };
    use std::sync::Arc;

    fn scripted_service(
        submitter: ScriptedSubmitter,
        live: LiveState,
    ) -> (
        Arc<ScriptedSubmitter>,
        PathwayConfigService<ScriptedSubmitter, FixedLiveState>,
    ) {
        let submitter = Arc::new(submitter);
        let service = PathwayConfigService::new(
            Arc::clone(&submitter),
            Arc::new(FixedLiveState(live)),
            ReconcilerConfig::default(),
        );
        (submitter, service)
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_pathways_submit_concurrently() {
        let registry = registry();
        let target = target(
            &registry,
            &[
                PathwayFixture::new(CHAIN_A, CHAIN_B),
                PathwayFixture::new(CHAIN_B, CHAIN_A),
                PathwayFixture::new(CHAIN_A, CHAIN_C),
            ],
        );
        let slow = Duration::from_secs(5);
        let submitter = ScriptedSubmitter::default()
            .delay(key(CHAIN_A, CHAIN_B), slow)
            .delay(key(CHAIN_B, CHAIN_A), slow)
            .delay(key(CHAIN_A, CHAIN_C), slow);
        let (submitter, service) = scripted_service(submitter, LiveState::new());

        let started = tokio::time::Instant::now();
        let report = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        assert_eq!(report.applied().len(), 3);
        assert_eq!(submitter.peak_concurrency(), 3);
        assert!(started.elapsed() < slow * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_confirmation_times_out_as_unknown() {
        let registry = registry();
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B), PathwayFixture::new(CHAIN_B, CHAIN_A)],
        );
        let submitter =
            ScriptedSubmitter::default().delay(key(CHAIN_B, CHAIN_A), Duration::from_secs(600));
        let (submitter, service) = scripted_service(submitter, LiveState::new());

        let options = ApplyOptions::default().with_timeout(Duration::from_secs(30));
        let err = service.reconcile(&target, options).await.unwrap_err();
        assert!(err.requires_rediff());

        let results = err.results().unwrap();
        assert_eq!(results.get(&key(CHAIN_A, CHAIN_B)), Some(&ApplyResult::Applied));
        assert_eq!(
            results.get(&key(CHAIN_B, CHAIN_A)),
            Some(&ApplyResult::Failed(ApplyFailure::Timeout))
        );
        // Never reported as confirmed.
        assert_eq!(submitter.confirmed(), vec![key(CHAIN_A, CHAIN_B)]);
        assert!(service.in_flight().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitter_timeout_error_is_unknown_state() {
        let registry = registry();
        let target = target(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let submitter =
            ScriptedSubmitter::default().error(key(CHAIN_A, CHAIN_B), SubmitError::Timeout);
        let (_, service) = scripted_service(submitter, LiveState::new());

        let err = service
            .reconcile(&target, ApplyOptions::default())
            .await
            .unwrap_err();
        assert!(err.requires_rediff());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_fails_only_its_pathway() {
        let registry = registry();
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B), PathwayFixture::new(CHAIN_A, CHAIN_C)],
        );
        let submitter = ScriptedSubmitter::default().error(
            key(CHAIN_A, CHAIN_C),
            SubmitError::Transport("connection reset".into()),
        );
        let (_, service) = scripted_service(submitter, LiveState::new());

        let err = service
            .reconcile(&target, ApplyOptions::default().with_mode(ApplyMode::Partial))
            .await
            .unwrap_err();
        assert!(!err.requires_rediff());
        let results = err.results().unwrap();
        assert_eq!(results.get(&key(CHAIN_A, CHAIN_B)), Some(&ApplyResult::Applied));
        assert!(matches!(
            results.get(&key(CHAIN_A, CHAIN_C)),
            Some(ApplyResult::Failed(ApplyFailure::Submission(msg))) if msg.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_recording_submitter_sees_ordered_updates() {
        let registry = registry();
        let live = live(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B)
                .required(&[AGENT_X, AGENT_Y])
                .max_message_size(20_000)],
        );
        let submitter = Arc::new(RecordingSubmitter::new());
        let service = PathwayConfigService::new(
            Arc::clone(&submitter),
            Arc::new(FixedLiveState(live)),
            ReconcilerConfig::default(),
        );

        service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        let submitted = submitter.submitted.lock();
        assert_eq!(submitted.len(), 1);
        let phases: Vec<_> = submitted[0].updates().iter().map(|u| u.phase()).collect();
        let mut sorted = phases.clone();
        sorted.sort();
        assert_eq!(phases, sorted);
        assert_eq!(phases.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_apply_on_same_pathway_rejected() {
        let registry = registry();
        let target = target(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let (endpoint, service) = service(&registry, &LiveState::new(), ReconcilerConfig::default());
        endpoint.stall_on(key(CHAIN_A, CHAIN_B));
        let service = Arc::new(service);

        let first = {
            let service = Arc::clone(&service);
            let target = target.clone();
            tokio::spawn(async move {
                let options = ApplyOptions::default().with_timeout(Duration::from_secs(60));
                service.reconcile(&target, options).await
            })
        };
        while service.in_flight().is_empty() {
            tokio::task::yield_now().await;
        }

        let second = service
            .reconcile(&target, ApplyOptions::default())
            .await
            .unwrap_err();
        assert_eq!(second, PathwayError::ApplyInProgress(key(CHAIN_A, CHAIN_B)));

        // The stalled apply times out, the guard is released and a re-diff
        // finds the half-written pathway still to create.
        let first = first.await.unwrap().unwrap_err();
        assert!(first.requires_rediff());
        assert!(service.in_flight().is_empty());

        endpoint.clear_faults();
        let live = service.live_state().await.unwrap();
        assert_eq!(service.diff(&live, &target).creates.len(), 1);
        let report = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        assert_eq!(report.applied(), vec![key(CHAIN_A, CHAIN_B)]);
    }

    #[tokio::test]
    async fn test_batch_planned_before_concurrent_apply_cannot_drop_agents() {
        let registry = registry();
        let agent_z = Address([0xA3; 20]);
        let initial = live(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let (endpoint, service) = service(&registry, &initial, ReconcilerConfig::default());
        let ab = key(CHAIN_A, CHAIN_B);

        // Swapping X for Z keeps the count, so it validates against [X].
        let swap = target(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[agent_z])]);
        let stale = ApplyBatch::prepare(&initial, &swap, service.validator());
        assert!(stale.validation_report().is_clean());

        let widen = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[AGENT_X, AGENT_Y])],
        );
        service.reconcile(&widen, ApplyOptions::default()).await.unwrap();
        let required = |state: &LiveState| state.get(&ab).unwrap().send().policy().agents.required().len();
        assert_eq!(required(&endpoint.snapshot()), 2);

        for mode in [ApplyMode::AllOrNothing, ApplyMode::Partial] {
            let err = service
                .apply(stale.clone(), ApplyOptions::default().with_mode(mode))
                .await
                .unwrap_err();
            assert!(err.requires_rediff());
            assert_eq!(
                err.results().unwrap().get(&ab),
                Some(&ApplyResult::Failed(ApplyFailure::StaleLiveState))
            );
            assert_eq!(required(&endpoint.snapshot()), 2);
        }

        // A fresh plan sees the shrink for what it is.
        let live = service.live_state().await.unwrap();
        assert!(!service.validate(&live, &swap).is_clean());
    }
}
