//! # Reconciliation Scenarios
//!
//! Validate, diff and apply against an in-memory endpoint:
//!
//! 1. First-time setup with a zero grace period needs acknowledgement
//! 2. Shrinking the required agent set is rejected with no writes
//! 3. All-or-nothing vs partial batches
//! 4. Idempotence and untracked pathways
//! 5. Executor capacity shrink and the `allow_shrink` override

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pathway_config::{
        Acknowledgement, Advisory, ApplyFailure, ApplyMode, ApplyOptions, ApplyResult, Direction,
        LiveState, PathwayConfigApi, PathwayError, ReconcilerConfig, Rejection, SecurityPolicy,
        ValidationOutcome,
    };

    // =========================================================================
    // FIRST-TIME SETUP
    // =========================================================================

    #[tokio::test]
    async fn test_first_time_setup_with_zero_grace() {
        let registry = registry();
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).confirmations(1, 1).grace(0)],
        );
        let (endpoint, service) = service(&registry, &LiveState::new(), ReconcilerConfig::default());
        let ab = key(CHAIN_A, CHAIN_B);

        let report = service.validate(&LiveState::new(), &target);
        assert_eq!(
            report.get(&ab),
            Some(&ValidationOutcome::AcceptedWithWarnings(vec![
                Advisory::GracePeriodWarning { key: ab }
            ]))
        );
        assert!(report.is_clean());

        // Not acknowledged: nothing written.
        let err = service
            .reconcile(&target, ApplyOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::BatchRejected { .. }));
        assert!(endpoint.writes().is_empty());

        let options = ApplyOptions::default()
            .with_acknowledgement(Acknowledgement::Pathways([ab].into_iter().collect()));
        let report = service.reconcile(&target, options).await.unwrap();
        assert_eq!(report.results.get(&ab), Some(&ApplyResult::Applied));

        let live = service.live_state().await.unwrap();
        let diff = service.diff(&live, &target);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, vec![ab]);
    }

    #[tokio::test]
    async fn test_library_change_with_zero_grace_warns() {
        let registry = registry();
        let current = PathwayFixture::new(CHAIN_A, CHAIN_B).grace(0);
        let live = live(&registry, &[current.clone()]);
        let (_, service) = service(&registry, &live, ReconcilerConfig::default());

        // Same libraries, only confirmations change: no grace warning.
        let same_library = target(&registry, &[current.clone().confirmations(3, 3)]);
        let report = service.validate(&live, &same_library);
        assert_eq!(
            report.get(&key(CHAIN_A, CHAIN_B)),
            Some(&ValidationOutcome::Accepted)
        );

        let moved = target(
            &registry,
            &[current.receive_library(pathway_config::Address([0x12; 20]))],
        );
        let report = service.validate(&live, &moved);
        assert_eq!(report.advisories().len(), 1);
    }

    // =========================================================================
    // SECURITY REGRESSION
    // =========================================================================

    #[tokio::test]
    async fn test_required_agent_shrink_rejected_without_writes() {
        let registry = registry();
        let live = live(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[AGENT_X, AGENT_Y])],
        );
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[AGENT_X])],
        );
        let (endpoint, service) = service(&registry, &live, ReconcilerConfig::default());

        let report = service.validate(&live, &target);
        assert!(matches!(
            report.get(&key(CHAIN_A, CHAIN_B)),
            Some(ValidationOutcome::Rejected(Rejection::SecurityRegression {
                live: Some(2),
                candidate: 1,
                ..
            }))
        ));
        assert!(!report.is_clean());

        // Acknowledgement does not override a rejection.
        let err = service
            .reconcile(&target, ApplyOptions::acknowledged())
            .await
            .unwrap_err();
        assert!(matches!(err, PathwayError::BatchRejected { .. }));
        assert!(endpoint.writes().is_empty());
        assert_eq!(endpoint.snapshot(), live);
    }

    #[tokio::test]
    async fn test_regression_rejected_regardless_of_other_fields() {
        let registry = registry();
        let live = live(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[AGENT_X, AGENT_Y])],
        );
        // Stronger everywhere else, still one agent short.
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B)
                .required(&[AGENT_Y])
                .confirmations(64, 64)
                .max_message_size(20_000)],
        );
        let (_, service) = service(&registry, &live, ReconcilerConfig::default());

        let report = service.validate(&live, &target);
        let rejected: Vec<_> = report.rejected().collect();
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0].1,
            Rejection::SecurityRegression {
                direction: Direction::Send,
                ..
            } | Rejection::SecurityRegression {
                direction: Direction::Receive,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_floor_applies_to_first_time_setup() {
        let registry = registry();
        let target = target(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B).required(&[])]);

        let (_, strict) = service(&registry, &LiveState::new(), ReconcilerConfig::default());
        assert!(!strict.validate(&LiveState::new(), &target).is_clean());

        let insecure = ReconcilerConfig {
            security: SecurityPolicy {
                min_required_agents: 0,
                allow_shrink: false,
            },
            ..ReconcilerConfig::default()
        };
        let (_, relaxed) = service(&registry, &LiveState::new(), insecure);
        assert!(relaxed.validate(&LiveState::new(), &target).is_clean());
    }

    // =========================================================================
    // BATCH MODES
    // =========================================================================

    #[tokio::test]
    async fn test_batch_modes_with_one_failing_pathway() {
        let registry = registry();
        let live = live(
            &registry,
            &[PathwayFixture::new(CHAIN_B, CHAIN_A).required(&[AGENT_X, AGENT_Y])],
        );
        let p1 = PathwayFixture::new(CHAIN_A, CHAIN_B);
        let p2 = PathwayFixture::new(CHAIN_B, CHAIN_A).required(&[AGENT_X]);
        let target = target(&registry, &[p1, p2]);

        let (endpoint, service) = service(&registry, &live, ReconcilerConfig::default());
        let err = service
            .reconcile(&target, ApplyOptions::default())
            .await
            .unwrap_err();
        let results = err.results().expect("per-pathway results");
        assert_eq!(results.get(&key(CHAIN_A, CHAIN_B)), Some(&ApplyResult::Skipped));
        assert!(results.get(&key(CHAIN_B, CHAIN_A)).unwrap().is_failed());
        assert!(endpoint.writes().is_empty());

        let partial = ApplyOptions::default().with_mode(ApplyMode::Partial);
        let report = service.reconcile(&target, partial).await.unwrap();
        assert_eq!(report.applied(), vec![key(CHAIN_A, CHAIN_B)]);
        assert!(matches!(
            report.results.get(&key(CHAIN_B, CHAIN_A)),
            Some(ApplyResult::Failed(ApplyFailure::Rejected(
                Rejection::SecurityRegression { .. }
            )))
        ));
        assert!(endpoint
            .writes()
            .iter()
            .all(|(k, _)| *k == key(CHAIN_A, CHAIN_B)));
    }

    // =========================================================================
    // IDEMPOTENCE
    // =========================================================================

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let registry = registry();
        let target = target(
            &registry,
            &[
                PathwayFixture::new(CHAIN_A, CHAIN_B),
                PathwayFixture::new(CHAIN_B, CHAIN_A).confirmations(2, 1),
                PathwayFixture::new(CHAIN_A, CHAIN_C).required(&[AGENT_X, AGENT_Y]),
            ],
        );
        let (endpoint, service) = service(&registry, &LiveState::new(), ReconcilerConfig::default());

        let first = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        assert_eq!(first.applied().len(), 3);
        let writes = endpoint.writes().len();

        let live = service.live_state().await.unwrap();
        assert_eq!(service.diff(&live, &target).change_count(), 0);

        let second = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        assert_eq!(second.skipped().len(), 3);
        assert_eq!(endpoint.writes().len(), writes);
    }

    #[tokio::test]
    async fn test_endpoint_rotation_converges() {
        let registry = registry();
        let fixtures = [PathwayFixture::new(CHAIN_A, CHAIN_B)];
        let (endpoint, service) =
            service(&registry, &live(&registry, &fixtures), ReconcilerConfig::default());

        let mut rotated = registry.clone();
        rotated
            .rotate(CHAIN_A, pathway_config::Address([0x5A; 20]))
            .unwrap();
        let target = target(&rotated, &fixtures);

        for _ in 0..2 {
            let report = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
            assert_eq!(report.skipped(), vec![key(CHAIN_A, CHAIN_B)]);
            let live = service.live_state().await.unwrap();
            let diff = service.diff(&live, &target);
            assert_eq!(diff.change_count(), 0);
            assert_eq!(diff.unchanged, vec![key(CHAIN_A, CHAIN_B)]);
        }
        assert!(endpoint.writes().is_empty());
    }

    #[tokio::test]
    async fn test_untracked_live_pathway_left_alone() {
        let registry = registry();
        let live = live(&registry, &[PathwayFixture::new(CHAIN_C, CHAIN_A)]);
        let target = target(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let (endpoint, service) = service(&registry, &live, ReconcilerConfig::default());

        let diff = service.diff(&live, &target);
        assert_eq!(diff.untracked, vec![key(CHAIN_C, CHAIN_A)]);

        let report = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
        assert!(!report.results.contains_key(&key(CHAIN_C, CHAIN_A)));
        assert_eq!(
            endpoint.snapshot().get(&key(CHAIN_C, CHAIN_A)),
            live.get(&key(CHAIN_C, CHAIN_A))
        );
    }

    // =========================================================================
    // EXECUTOR CAPACITY
    // =========================================================================

    #[tokio::test]
    async fn test_executor_shrink_needs_override() {
        let registry = registry();
        let live = live(&registry, &[PathwayFixture::new(CHAIN_A, CHAIN_B)]);
        let target = target(
            &registry,
            &[PathwayFixture::new(CHAIN_A, CHAIN_B).max_message_size(5_000)],
        );
        let ab = key(CHAIN_A, CHAIN_B);

        let (_, strict) = service(&registry, &live, ReconcilerConfig::default());
        assert_eq!(
            strict.validate(&live, &target).get(&ab),
            Some(&ValidationOutcome::Rejected(Rejection::ExecutorCapacityShrink {
                live: 10_000,
                candidate: 5_000,
            }))
        );

        let mut config = ReconcilerConfig::default();
        config.security.allow_shrink = true;
        let (endpoint, relaxed) = service(&registry, &live, config);
        let report = relaxed.validate(&live, &target);
        assert_eq!(
            report.get(&ab),
            Some(&ValidationOutcome::AcceptedWithWarnings(vec![
                Advisory::ExecutorCapacityShrink {
                    key: ab,
                    live: 10_000,
                    candidate: 5_000,
                }
            ]))
        );

        let report = relaxed
            .reconcile(&target, ApplyOptions::acknowledged())
            .await
            .unwrap();
        assert_eq!(report.applied(), vec![ab]);
        assert_eq!(
            endpoint.snapshot().get(&ab).unwrap().executor().max_message_size(),
            5_000
        );
    }
}
