//! Replica counters and status subresource updates
//!
//! Recomputes the four worker counters from the observed pods and writes the
//! status subresource when any of them changed. Status writes are best
//! effort: failures are logged by the caller and never retried.

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::ResourceExt;
use tracing::debug;

use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::crd::{RayCluster, RayClusterSpec, RayClusterStatus};
use crate::resources::common::{NodeType, CLUSTER_LABEL_KEY, NODE_TYPE_LABEL_KEY};

/// Worker pods that are running and ready
pub fn available_worker_replicas(pods: &[Pod]) -> i32 {
    pods.iter().filter(|pod| is_running_and_ready(pod)).count() as i32
}

/// Sum of replicas over all worker groups
pub fn desired_worker_replicas(spec: &RayClusterSpec) -> i32 {
    spec.worker_group_specs.iter().map(|g| g.replicas).sum()
}

/// Sum of minReplicas, falling back to replicas per group
pub fn min_worker_replicas(spec: &RayClusterSpec) -> i32 {
    spec.worker_group_specs
        .iter()
        .map(|g| g.min_replicas.unwrap_or(g.replicas))
        .sum()
}

/// Sum of maxReplicas, falling back to replicas per group
pub fn max_worker_replicas(spec: &RayClusterSpec) -> i32 {
    spec.worker_group_specs
        .iter()
        .map(|g| g.max_replicas.unwrap_or(g.replicas))
        .sum()
}

fn is_running_and_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    if status.phase.as_deref() != Some("Running") {
        return false;
    }
    status
        .conditions
        .as_ref()
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Recompute the worker counters and patch the status subresource
///
/// The write is skipped when no counter changed; `lastUpdateTime` is bumped
/// on every write but never participates in the change detection, so a
/// reconcile that converged to a fixed point performs no status mutation.
pub async fn update_status(cluster: &RayCluster, ctx: &Context, ns: &str) -> Result<()> {
    let cluster_name = cluster.name_any();

    let pods_api: Api<Pod> = Api::namespaced(ctx.client.clone(), ns);
    let selector = format!(
        "{}={},{}={}",
        CLUSTER_LABEL_KEY,
        cluster_name,
        NODE_TYPE_LABEL_KEY,
        NodeType::Worker
    );
    let worker_pods = pods_api
        .list(&ListParams::default().labels(&selector))
        .await?;

    let observed = RayClusterStatus {
        available_worker_replicas: available_worker_replicas(&worker_pods.items),
        desired_worker_replicas: desired_worker_replicas(&cluster.spec),
        min_worker_replicas: min_worker_replicas(&cluster.spec),
        max_worker_replicas: max_worker_replicas(&cluster.spec),
        last_update_time: None,
    };

    let current = cluster.status.clone().unwrap_or_default();
    if counters_equal(&current, &observed) {
        debug!(cluster = %cluster_name, "worker counters unchanged, skipping status write");
        return Ok(());
    }

    let status = RayClusterStatus {
        last_update_time: Some(Utc::now().to_rfc3339()),
        ..observed
    };

    let clusters: Api<RayCluster> = Api::namespaced(ctx.client.clone(), ns);
    clusters
        .patch_status(
            &cluster_name,
            &PatchParams::default(),
            &Patch::Merge(serde_json::json!({ "status": status })),
        )
        .await?;

    Ok(())
}

fn counters_equal(current: &RayClusterStatus, observed: &RayClusterStatus) -> bool {
    current.available_worker_replicas == observed.available_worker_replicas
        && current.desired_worker_replicas == observed.desired_worker_replicas
        && current.min_worker_replicas == observed.min_worker_replicas
        && current.max_worker_replicas == observed.max_worker_replicas
}
