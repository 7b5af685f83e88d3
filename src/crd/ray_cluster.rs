use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// RayCluster is the Schema for the rayclusters API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "ray.io",
    version = "v1alpha1",
    kind = "RayCluster",
    plural = "rayclusters",
    shortname = "rayc",
    namespaced,
    status = "RayClusterStatus",
    printcolumn = r#"{"name":"Desired Workers", "type":"integer", "jsonPath":".status.desiredWorkerReplicas"}"#,
    printcolumn = r#"{"name":"Available Workers", "type":"integer", "jsonPath":".status.availableWorkerReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RayClusterSpec {
    /// Template and options for the single head pod
    pub head_group_spec: HeadGroupSpec,

    /// Worker groups, each scaled independently
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub worker_group_specs: Vec<WorkerGroupSpec>,

    /// Create ServiceAccount/Role/RoleBinding for the in-tree autoscaler sidecar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_in_tree_autoscaling: Option<bool>,
}

/// Head group configuration
///
/// The head group always runs exactly one pod; the controller re-establishes
/// the singleton on every reconcile.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeadGroupSpec {
    /// Service type for the head service (ClusterIP if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,

    /// Name hint for the head service; normalized before use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Expose the head service through an Ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ingress: Option<bool>,

    /// Extra flags passed to `ray start --head`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ray_start_params: BTreeMap<String, String>,

    /// Pod template for the head pod
    pub template: PodTemplateSpec,
}

/// A homogeneous, separately-scalable group of worker pods
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerGroupSpec {
    /// Group name, unique within the cluster
    pub group_name: String,

    /// Desired number of live worker pods in this group
    #[serde(default)]
    pub replicas: i32,

    /// Lower bound advertised to the autoscaler (defaults to replicas)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Upper bound advertised to the autoscaler (defaults to replicas)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    /// Extra flags passed to `ray start`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ray_start_params: BTreeMap<String, String>,

    /// Pod template for worker pods in this group
    pub template: PodTemplateSpec,

    /// Scale-down directives from the external autoscaler
    #[serde(default)]
    pub scale_strategy: ScaleStrategy,
}

/// Autoscaler-nominated victims for the next scale-down
///
/// Names referring to pods that no longer exist are pruned silently during
/// reconciliation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaleStrategy {
    /// Pod names to delete in preference to arbitrary selection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workers_to_delete: Vec<String>,
}

/// Status of the RayCluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RayClusterStatus {
    /// Worker pods that are running and ready
    #[serde(default)]
    pub available_worker_replicas: i32,

    /// Sum of replicas over all worker groups
    #[serde(default)]
    pub desired_worker_replicas: i32,

    /// Sum of minReplicas over all worker groups
    #[serde(default)]
    pub min_worker_replicas: i32,

    /// Sum of maxReplicas over all worker groups
    #[serde(default)]
    pub max_worker_replicas: i32,

    /// Time of the last status write, RFC 3339
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
}
