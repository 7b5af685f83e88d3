//! Unit tests for the scaling plans
//!
//! Scenario coverage for head-pod singleton enforcement and worker-group
//! convergence, including the autoscaler victim paths.

use k8s_openapi::api::core::v1::{Pod, PodStatus};
use kube::core::ObjectMeta;

use raycluster_operator::controller::{
    plan_head_pods, plan_worker_group, HeadPodAction, WorkerGroupPlan,
};

fn pod(name: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Net group size after applying a plan to a live set
fn final_size(live: usize, plan: &WorkerGroupPlan) -> i32 {
    live as i32 - plan.victims.len() as i32 - plan.overflow.len() as i32 + plan.create
}

mod head_singleton_tests {
    use super::*;

    #[test]
    fn test_duplicate_running_heads_reduced_to_one() {
        let pods = [pod("head-a", "Running"), pod("head-b", "Running")];
        let action = plan_head_pods(&pods).unwrap();

        assert_eq!(
            action,
            HeadPodAction::DeleteExtras {
                survivor: "head-a".to_string(),
                extras: vec!["head-b".to_string()],
            }
        );
    }

    #[test]
    fn test_failed_head_is_not_recreated() {
        let pods = [pod("head-a", "Failed")];
        assert!(plan_head_pods(&pods).is_err());
    }

    #[test]
    fn test_missing_head_is_created() {
        assert_eq!(plan_head_pods(&[]).unwrap(), HeadPodAction::Create);
    }
}

mod worker_scaling_tests {
    use super::*;

    #[test]
    fn test_cold_start_creates_all_replicas() {
        let plan = plan_worker_group(3, &[], &[]);
        assert_eq!(plan.create, 3);
        assert!(plan.victims.is_empty());
        assert!(plan.overflow.is_empty());
    }

    #[test]
    fn test_converged_group_plans_nothing() {
        let live = names(&["w1", "w2", "w3"]);
        let plan = plan_worker_group(3, &live, &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_victim_removed_when_over_replicas() {
        // replicas=3, live={w1..w4}, victims=[w2]
        let live = names(&["w1", "w2", "w3", "w4"]);
        let plan = plan_worker_group(3, &live, &names(&["w2"]));

        assert_eq!(plan.victims, names(&["w2"]));
        assert!(plan.overflow.is_empty());
        assert_eq!(plan.create, 0);
        assert_eq!(final_size(4, &plan), 3);
    }

    #[test]
    fn test_named_shrink_exactly_covers_drift() {
        // replicas=2, live={w1,w2,w3}, victims=[w3]: no arbitrary deletion
        let live = names(&["w1", "w2", "w3"]);
        let plan = plan_worker_group(2, &live, &names(&["w3"]));

        assert_eq!(plan.victims, names(&["w3"]));
        assert!(plan.overflow.is_empty());
        assert_eq!(plan.create, 0);
    }

    #[test]
    fn test_named_shrink_insufficient_evicts_overflow() {
        // replicas=1, live={w1,w2,w3}, victims=[w2]: one more eviction needed
        let live = names(&["w1", "w2", "w3"]);
        let plan = plan_worker_group(1, &live, &names(&["w2"]));

        assert_eq!(plan.victims, names(&["w2"]));
        assert_eq!(plan.overflow.len(), 1);
        assert!(plan.overflow[0] == "w1" || plan.overflow[0] == "w3");
        assert_eq!(final_size(3, &plan), 1);
    }

    #[test]
    fn test_overflow_eviction_is_lexicographic() {
        let live = names(&["w9", "w2", "w5", "w7"]);
        let plan = plan_worker_group(2, &live, &[]);

        assert_eq!(plan.overflow, names(&["w2", "w5"]));
    }

    #[test]
    fn test_victims_honored_even_during_scale_up() {
        // replicas=5, live={w1,w2,w3}, victims=[w2]: delete w2, create 3
        let live = names(&["w1", "w2", "w3"]);
        let plan = plan_worker_group(5, &live, &names(&["w2"]));

        assert_eq!(plan.victims, names(&["w2"]));
        assert_eq!(plan.create, 3);
        assert_eq!(final_size(3, &plan), 5);
    }

    #[test]
    fn test_stale_victims_are_pruned() {
        let live = names(&["w1", "w2"]);
        let plan = plan_worker_group(2, &live, &names(&["gone-1", "w2", "gone-2"]));

        assert_eq!(plan.victims, names(&["w2"]));
        assert_eq!(plan.create, 1);
    }

    #[test]
    fn test_all_victims_stale_is_a_noop() {
        let live = names(&["w1", "w2"]);
        let plan = plan_worker_group(2, &live, &names(&["gone-1", "gone-2"]));

        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_is_idempotent_after_convergence() {
        // Applying a plan and re-planning with the resulting live set must
        // produce an empty plan.
        let live = names(&["w1", "w2", "w3", "w4", "w5"]);
        let plan = plan_worker_group(2, &live, &names(&["w4"]));

        let after: Vec<String> = live
            .iter()
            .filter(|n| !plan.victims.contains(n) && !plan.overflow.contains(n))
            .cloned()
            .collect();
        assert_eq!(after.len(), 2);

        let second = plan_worker_group(2, &after, &[]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_final_size_matches_replicas_across_inputs() {
        let live = names(&["w1", "w2", "w3", "w4", "w5", "w6"]);
        for replicas in 0..9 {
            for victims in [vec![], names(&["w3"]), names(&["w1", "w5"])] {
                let plan = plan_worker_group(replicas, &live, &victims);
                assert_eq!(final_size(6, &plan), replicas, "replicas={}", replicas);
            }
        }
    }
}
