//! Unit tests for resource builders
//!
//! Tests for the head/worker pod, head service, ingress and autoscaler
//! RBAC builders: names, labels, owner references and gating inputs.

use kube::ResourceExt;

use raycluster_operator::controller::Error;
use raycluster_operator::resources::common::{
    CLUSTER_LABEL_KEY, GROUP_LABEL_KEY, NODE_TYPE_LABEL_KEY,
};
use raycluster_operator::resources::{ingress, pod, rbac, service};

use crate::common::{create_test_cluster, worker_group};

fn assert_owned_by_cluster(owner_refs: &Option<Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference>>) {
    let refs = owner_refs.as_ref().expect("owner references missing");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].kind, "RayCluster");
    assert_eq!(refs[0].name, "my-cluster");
    assert_eq!(refs[0].controller, Some(true));
}

mod head_pod_tests {
    use super::*;

    #[test]
    fn test_head_pod_name_and_labels() {
        let cluster = create_test_cluster("my-cluster", "default");
        let head = pod::build_head_pod(&cluster).unwrap();

        assert!(head.name_any().starts_with("my-cluster-head-"));
        let labels = head.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get(CLUSTER_LABEL_KEY), Some(&"my-cluster".to_string()));
        assert_eq!(labels.get(NODE_TYPE_LABEL_KEY), Some(&"head".to_string()));
        assert!(!labels.contains_key(GROUP_LABEL_KEY));
        assert_owned_by_cluster(&head.metadata.owner_references);
    }

    #[test]
    fn test_head_pod_command_includes_start_params() {
        let mut cluster = create_test_cluster("my-cluster", "default");
        cluster
            .spec
            .head_group_spec
            .ray_start_params
            .insert("num-cpus".to_string(), "2".to_string());

        let head = pod::build_head_pod(&cluster).unwrap();
        let container = &head.spec.as_ref().unwrap().containers[0];
        let args = container.args.as_ref().unwrap();
        assert!(args[0].starts_with("ray start --head --block"));
        assert!(args[0].contains("--num-cpus=2"));
    }

    #[test]
    fn test_head_pod_names_are_fresh() {
        let cluster = create_test_cluster("my-cluster", "default");
        let first = pod::build_head_pod(&cluster).unwrap();
        let second = pod::build_head_pod(&cluster).unwrap();
        assert_ne!(first.name_any(), second.name_any());
    }

    #[test]
    fn test_head_pod_requires_a_container() {
        let mut cluster = create_test_cluster("my-cluster", "default");
        cluster
            .spec
            .head_group_spec
            .template
            .spec
            .as_mut()
            .unwrap()
            .containers
            .clear();

        match pod::build_head_pod(&cluster) {
            Err(Error::MissingObjectKey(key)) => assert_eq!(key, "template.spec.containers"),
            other => panic!("expected MissingObjectKey, got {:?}", other),
        }
    }
}

mod worker_pod_tests {
    use super::*;

    #[test]
    fn test_worker_pod_name_and_labels() {
        let cluster = create_test_cluster("my-cluster", "default");
        let group = &cluster.spec.worker_group_specs[0];
        let worker = pod::build_worker_pod(&cluster, group).unwrap();

        assert!(worker.name_any().starts_with("my-cluster-worker-small-group-"));
        let labels = worker.metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get(NODE_TYPE_LABEL_KEY), Some(&"worker".to_string()));
        assert_eq!(labels.get(GROUP_LABEL_KEY), Some(&"small-group".to_string()));
        assert_owned_by_cluster(&worker.metadata.owner_references);
    }

    #[test]
    fn test_worker_pod_dials_the_head_service() {
        let cluster = create_test_cluster("my-cluster", "default");
        let group = &cluster.spec.worker_group_specs[0];
        let worker = pod::build_worker_pod(&cluster, group).unwrap();

        let container = &worker.spec.as_ref().unwrap().containers[0];
        let args = container.args.as_ref().unwrap();
        assert!(args[0].contains("--address=my-cluster-head-svc:6379"));
    }

    #[test]
    fn test_worker_pod_uses_service_name_hint() {
        let mut cluster = create_test_cluster("my-cluster", "default");
        cluster.spec.head_group_spec.service_name = Some("Custom.Head".to_string());
        let group = &cluster.spec.worker_group_specs[0];
        let worker = pod::build_worker_pod(&cluster, group).unwrap();

        let container = &worker.spec.as_ref().unwrap().containers[0];
        let args = container.args.as_ref().unwrap();
        assert!(args[0].contains("--address=custom-head:6379"));
    }
}

mod head_service_tests {
    use super::*;

    #[test]
    fn test_head_service_name_and_selector() {
        let cluster = create_test_cluster("my-cluster", "default");
        let svc = service::build_head_service(&cluster).unwrap();

        assert_eq!(svc.name_any(), "my-cluster-head-svc");
        let selector = svc.spec.as_ref().unwrap().selector.as_ref().unwrap();
        assert_eq!(selector.get(CLUSTER_LABEL_KEY), Some(&"my-cluster".to_string()));
        assert_eq!(selector.get(NODE_TYPE_LABEL_KEY), Some(&"head".to_string()));
        assert_owned_by_cluster(&svc.metadata.owner_references);
    }

    #[test]
    fn test_head_service_exposes_gcs_dashboard_and_client_ports() {
        let cluster = create_test_cluster("my-cluster", "default");
        let svc = service::build_head_service(&cluster).unwrap();

        let ports: Vec<i32> = svc
            .spec
            .as_ref()
            .unwrap()
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.port)
            .collect();
        assert_eq!(ports, vec![6379, 8265, 10001]);
    }

    #[test]
    fn test_head_service_type_from_spec() {
        let mut cluster = create_test_cluster("my-cluster", "default");
        cluster.spec.head_group_spec.service_type = Some("LoadBalancer".to_string());
        let svc = service::build_head_service(&cluster).unwrap();

        assert_eq!(
            svc.spec.as_ref().unwrap().type_,
            Some("LoadBalancer".to_string())
        );
    }
}

mod head_ingress_tests {
    use super::*;

    #[test]
    fn test_head_ingress_routes_to_dashboard() {
        let cluster = create_test_cluster("my-cluster", "default");
        let ing = ingress::build_head_ingress(&cluster).unwrap();

        assert_eq!(ing.name_any(), "my-cluster-head-ingress");
        assert_owned_by_cluster(&ing.metadata.owner_references);

        let rules = ing.spec.as_ref().unwrap().rules.as_ref().unwrap();
        let path = &rules[0].http.as_ref().unwrap().paths[0];
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "my-cluster-head-svc");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(8265));
    }
}

mod autoscaler_rbac_tests {
    use super::*;

    #[test]
    fn test_service_account_named_after_cluster() {
        let cluster = create_test_cluster("my-cluster", "default");
        let sa = rbac::build_autoscaler_service_account(&cluster).unwrap();

        assert_eq!(sa.name_any(), "my-cluster");
        assert_owned_by_cluster(&sa.metadata.owner_references);
    }

    #[test]
    fn test_role_grants_pod_deletion_and_cluster_patch() {
        let cluster = create_test_cluster("my-cluster", "default");
        let role = rbac::build_autoscaler_role(&cluster).unwrap();

        let rules = role.rules.as_ref().unwrap();
        let pod_rule = rules
            .iter()
            .find(|r| {
                r.resources
                    .as_ref()
                    .is_some_and(|res| res.contains(&"pods".to_string()))
            })
            .unwrap();
        assert!(pod_rule.verbs.contains(&"delete".to_string()));

        let cluster_rule = rules
            .iter()
            .find(|r| {
                r.resources
                    .as_ref()
                    .is_some_and(|res| res.contains(&"rayclusters".to_string()))
            })
            .unwrap();
        assert!(cluster_rule.verbs.contains(&"patch".to_string()));
    }

    #[test]
    fn test_role_binding_ties_account_to_role() {
        let cluster = create_test_cluster("my-cluster", "default");
        let binding = rbac::build_autoscaler_role_binding(&cluster).unwrap();

        assert_eq!(binding.role_ref.kind, "Role");
        assert_eq!(binding.role_ref.name, "my-cluster");
        let subjects = binding.subjects.as_ref().unwrap();
        assert_eq!(subjects[0].kind, "ServiceAccount");
        assert_eq!(subjects[0].name, "my-cluster");
    }
}

mod group_ordering_tests {
    use super::*;

    #[test]
    fn test_each_group_builds_its_own_workers() {
        let mut cluster = create_test_cluster("my-cluster", "default");
        cluster.spec.worker_group_specs = vec![
            worker_group("gpu-group", 1),
            worker_group("cpu-group", 2),
        ];

        let gpu = pod::build_worker_pod(&cluster, &cluster.spec.worker_group_specs[0]).unwrap();
        let cpu = pod::build_worker_pod(&cluster, &cluster.spec.worker_group_specs[1]).unwrap();

        assert!(gpu.name_any().starts_with("my-cluster-worker-gpu-group-"));
        assert!(cpu.name_any().starts_with("my-cluster-worker-cpu-group-"));
        assert_eq!(
            gpu.metadata.labels.as_ref().unwrap().get(GROUP_LABEL_KEY),
            Some(&"gpu-group".to_string())
        );
    }
}
