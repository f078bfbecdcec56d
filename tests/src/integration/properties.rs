//! # Structural Properties
//!
//! Property-based checks over randomly generated agent sets and pathways.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use pathway_config::{
        build_pathway, diff, Address, ApplyOptions, EndpointId, EndpointRegistry, ExecutorPolicy,
        LibraryBinding, LiveState, PathwayConfigApi, ReceiveVerification, ReconcilerConfig,
        SecurityPolicy, SecurityStackValidator, SendVerification, ValidationError,
        ValidationOutcome, VerificationAgentSet, VerificationPolicy,
    };
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn address() -> impl Strategy<Value = Address> {
        any::<[u8; 20]>().prop_map(Address)
    }

    fn agents(max: usize) -> impl Strategy<Value = Vec<Address>> {
        prop::collection::vec(address(), 0..max)
    }

    fn policy(agents: VerificationAgentSet) -> (SendVerification, ReceiveVerification) {
        (
            SendVerification(VerificationPolicy::new(1, agents.clone())),
            ReceiveVerification(VerificationPolicy::new(1, agents)),
        )
    }

    proptest! {
        #[test]
        fn prop_valid_agent_sets_are_disjoint_and_bounded(
            required in agents(6),
            optional in agents(6),
            threshold in 0u8..8,
        ) {
            if let Ok(set) = VerificationAgentSet::new(required, optional, threshold) {
                prop_assert!(set.required().is_disjoint(set.optional()));
                prop_assert!(usize::from(set.optional_threshold()) <= set.optional().len());
            }
        }

        #[test]
        fn prop_overlap_always_rejected(
            shared in address(),
            required in agents(4),
            optional in agents(4),
        ) {
            let mut required = required;
            let mut optional = optional;
            required.push(shared);
            optional.push(shared);
            let threshold = 0;
            prop_assert!(VerificationAgentSet::new(required, optional, threshold).is_err());
        }

        #[test]
        fn prop_threshold_above_optional_rejected(optional in agents(5), extra in 1u8..4) {
            let distinct: BTreeSet<_> = optional.iter().copied().collect();
            let threshold = distinct.len() as u8 + extra;
            prop_assert!(VerificationAgentSet::new(Vec::new(), optional, threshold).is_err());
        }

        #[test]
        fn prop_self_loop_always_rejected(id in any::<u32>(), transport in address()) {
            let mut registry = EndpointRegistry::new();
            registry.register(EndpointId(id), transport).unwrap();
            let endpoint = registry.resolve(EndpointId(id)).unwrap();
            let agents = VerificationAgentSet::required_only(vec![AGENT_X]).unwrap();
            let (send, receive) = policy(agents);

            let result = build_pathway(
                endpoint.clone(),
                endpoint,
                LibraryBinding::new(SEND_LIBRARY, RECEIVE_LIBRARY, 0),
                send,
                receive,
                ExecutorPolicy::new(EXECUTOR, 10_000).unwrap(),
            );
            prop_assert_eq!(result.unwrap_err(), ValidationError::SelfLoop(EndpointId(id)));
        }

        #[test]
        fn prop_shrinking_required_agents_rejected(
            required in prop::collection::btree_set(address(), 2..6),
            keep in 1usize..5,
            size in 1u32..100_000,
            grace in 0u64..1_000,
        ) {
            let required: Vec<Address> = required.into_iter().collect();
            let keep = keep.min(required.len() - 1);
            let registry = registry();
            let build = |agents: &[Address], size: u32, grace: u64| {
                let (send, receive) =
                    policy(VerificationAgentSet::required_only(agents.to_vec()).unwrap());
                build_pathway(
                    registry.resolve(CHAIN_A).unwrap(),
                    registry.resolve(CHAIN_B).unwrap(),
                    LibraryBinding::new(SEND_LIBRARY, RECEIVE_LIBRARY, grace),
                    send,
                    receive,
                    ExecutorPolicy::new(EXECUTOR, size).unwrap(),
                )
                .unwrap()
            };

            let live = build(&required, 1, 60);
            let candidate = build(&required[..keep], size, grace);
            let validator = SecurityStackValidator::new(SecurityPolicy::default());
            prop_assert!(validator.validate(&candidate, Some(&live)).is_rejected());
        }

        #[test]
        fn prop_reconcile_then_diff_is_empty(
            confirmations in prop::collection::vec((1u64..100, 1u64..100), 1..3),
        ) {
            let registry = registry();
            let pairs = [(CHAIN_A, CHAIN_B), (CHAIN_B, CHAIN_A), (CHAIN_A, CHAIN_C)];
            let fixtures: Vec<PathwayFixture> = confirmations
                .iter()
                .zip(pairs)
                .map(|((send, receive), (from, to))| {
                    PathwayFixture::new(from, to).confirmations(*send, *receive)
                })
                .collect();
            let target = target(&registry, &fixtures);
            let (endpoint, service) =
                service(&registry, &LiveState::new(), ReconcilerConfig::default());

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (first, writes, after, second) = runtime.block_on(async {
                let first = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
                let writes = endpoint.writes().len();
                let after = diff(&service.live_state().await.unwrap(), &target);
                let second = service.reconcile(&target, ApplyOptions::default()).await.unwrap();
                (first, writes, after, second)
            });

            prop_assert_eq!(first.applied().len(), fixtures.len());
            prop_assert!(after.is_empty());
            prop_assert_eq!(after.unchanged.len(), fixtures.len());
            prop_assert_eq!(second.skipped().len(), fixtures.len());
            prop_assert_eq!(endpoint.writes().len(), writes);
        }
    }

    #[test]
    fn test_accepted_outcome_for_identical_candidate() {
        let registry = registry();
        let descriptor = PathwayFixture::new(CHAIN_A, CHAIN_B).build(&registry);
        let validator = SecurityStackValidator::new(SecurityPolicy::default());
        assert_eq!(
            validator.validate(&descriptor, Some(&descriptor)),
            ValidationOutcome::Accepted
        );
    }
}
