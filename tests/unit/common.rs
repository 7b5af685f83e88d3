//! Shared fixtures for the unit tests

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use raycluster_operator::crd::{
    HeadGroupSpec, RayCluster, RayClusterSpec, ScaleStrategy, WorkerGroupSpec,
};

/// A minimal single-container pod template
pub fn pod_template() -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: None,
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "ray-node".to_string(),
                image: Some("rayproject/ray:2.5.0".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }),
    }
}

/// A worker group with the given name and replica count
pub fn worker_group(name: &str, replicas: i32) -> WorkerGroupSpec {
    WorkerGroupSpec {
        group_name: name.to_string(),
        replicas,
        min_replicas: None,
        max_replicas: None,
        ray_start_params: BTreeMap::new(),
        template: pod_template(),
        scale_strategy: ScaleStrategy::default(),
    }
}

/// A cluster with one worker group of three replicas
pub fn create_test_cluster(name: &str, namespace: &str) -> RayCluster {
    RayCluster {
        metadata: kube::core::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some("test-uid-12345".to_string()),
            ..Default::default()
        },
        spec: RayClusterSpec {
            head_group_spec: HeadGroupSpec {
                service_type: None,
                service_name: None,
                enable_ingress: None,
                ray_start_params: BTreeMap::new(),
                template: pod_template(),
            },
            worker_group_specs: vec![worker_group("small-group", 3)],
            enable_in_tree_autoscaling: None,
        },
        status: None,
    }
}
