//! Pod reconciliation: head singleton enforcement and worker scale convergence
//!
//! The decision procedure is split out into pure planning functions
//! ([`plan_head_pods`], [`plan_worker_group`]) so that the scaling semantics
//! can be tested without an apiserver; the async functions below only list,
//! apply the plan and translate API failures.

use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::controller::context::Context;
use crate::controller::error::{is_already_exists, is_not_found, Error, Result};
use crate::crd::{RayCluster, WorkerGroupSpec};
use crate::resources::common::{
    NodeType, CLUSTER_LABEL_KEY, GROUP_LABEL_KEY, NODE_TYPE_LABEL_KEY,
};
use crate::resources::pod::{build_head_pod, build_worker_pod};

/// Outcome of planning the head-pod singleton
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadPodAction {
    /// No head pod exists, one must be created
    Create,
    /// Exactly one head pod in a live phase
    Converged,
    /// Duplicate head pods: keep the survivor, delete the rest
    DeleteExtras {
        survivor: String,
        extras: Vec<String>,
    },
}

/// Deletions and creations needed to converge one worker group
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerGroupPlan {
    /// Autoscaler-nominated victims that matched a live pod; always deleted
    pub victims: Vec<String>,
    /// Additional deletions when the victims do not cover the full shrink
    pub overflow: Vec<String>,
    /// Number of worker pods to create
    pub create: i32,
}

impl WorkerGroupPlan {
    /// True when the group is already converged
    pub fn is_empty(&self) -> bool {
        self.victims.is_empty() && self.overflow.is_empty() && self.create == 0
    }
}

/// A pod whose phase is Running or Pending
pub fn has_live_phase(pod: &Pod) -> bool {
    matches!(
        pod.status.as_ref().and_then(|s| s.phase.as_deref()),
        Some("Running") | Some("Pending")
    )
}

/// A pod counted into a worker group's running set: live phase, not terminating
pub fn is_live(pod: &Pod) -> bool {
    has_live_phase(pod) && pod.metadata.deletion_timestamp.is_none()
}

/// Decide what to do with the observed head pods of a cluster
///
/// A single unhealthy head is surfaced as an error rather than recreated:
/// a failed head usually means an image pull or scheduling problem that
/// recreation cannot fix, so it is left for human diagnosis.
pub fn plan_head_pods(pods: &[Pod]) -> Result<HeadPodAction> {
    match pods {
        [] => Ok(HeadPodAction::Create),
        [pod] => {
            if has_live_phase(pod) {
                Ok(HeadPodAction::Converged)
            } else {
                Err(Error::HeadPodNotHealthy {
                    name: pod.name_any(),
                    phase: pod
                        .status
                        .as_ref()
                        .and_then(|s| s.phase.clone())
                        .unwrap_or_default(),
                })
            }
        }
        _ => {
            let survivor_index = pods.iter().position(has_live_phase).unwrap_or(0);
            let survivor = pods[survivor_index].name_any();
            let extras = pods
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != survivor_index)
                .map(|(_, p)| p.name_any())
                .collect();
            Ok(HeadPodAction::DeleteExtras { survivor, extras })
        }
    }
}

/// Compute the deletions and creations converging one worker group
///
/// Named victims that match a live pod are always honored; stale names are
/// pruned silently. After the victims, residual drift is covered by creating
/// pods or by evicting overflow pods picked in lexicographic name order so
/// that repeated reconciles make the same choice.
pub fn plan_worker_group(
    replicas: i32,
    live: &[String],
    workers_to_delete: &[String],
) -> WorkerGroupPlan {
    let victims: Vec<String> = workers_to_delete
        .iter()
        .filter(|name| live.contains(name))
        .cloned()
        .collect();

    let mut remaining: Vec<String> = live
        .iter()
        .filter(|name| !victims.contains(name))
        .cloned()
        .collect();

    let diff = replicas - remaining.len() as i32;
    if diff >= 0 {
        return WorkerGroupPlan {
            victims,
            overflow: Vec::new(),
            create: diff,
        };
    }

    remaining.sort();
    remaining.truncate((-diff) as usize);
    WorkerGroupPlan {
        victims,
        overflow: remaining,
        create: 0,
    }
}

/// Reconcile the head pod and every worker group of a cluster
pub async fn reconcile_pods(cluster: &RayCluster, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<Pod> = Api::namespaced(ctx.client.clone(), ns);
    let cluster_name = cluster.name_any();

    // Phase A: head singleton
    let selector = format!(
        "{}={},{}={}",
        CLUSTER_LABEL_KEY,
        cluster_name,
        NODE_TYPE_LABEL_KEY,
        NodeType::Head
    );
    let head_pods = api.list(&ListParams::default().labels(&selector)).await?;

    match plan_head_pods(&head_pods.items)? {
        HeadPodAction::Create => {
            info!(cluster = %cluster_name, "creating head pod");
            let pod = build_head_pod(cluster)?;
            create_pod(&api, ctx, cluster, pod, "head pod").await?;
        }
        HeadPodAction::Converged => {
            debug!(cluster = %cluster_name, "head pod is up and running, checking workers");
        }
        HeadPodAction::DeleteExtras { survivor, extras } => {
            warn!(
                cluster = %cluster_name,
                survivor = %survivor,
                extras = extras.len(),
                "more than one head pod found, deleting extras"
            );
            for name in &extras {
                delete_pod(&api, ctx, cluster, name, "head pod").await?;
            }
        }
    }

    // Phase B: worker groups, in spec order
    for group in &cluster.spec.worker_group_specs {
        reconcile_worker_group(&api, ctx, cluster, group, &cluster_name).await?;
    }

    Ok(())
}

async fn reconcile_worker_group(
    api: &Api<Pod>,
    ctx: &Context,
    cluster: &RayCluster,
    group: &WorkerGroupSpec,
    cluster_name: &str,
) -> Result<()> {
    let selector = format!(
        "{}={},{}={}",
        CLUSTER_LABEL_KEY, cluster_name, GROUP_LABEL_KEY, group.group_name
    );
    let pods = api.list(&ListParams::default().labels(&selector)).await?;

    let live: Vec<String> = pods
        .items
        .iter()
        .filter(|pod| is_live(pod))
        .map(|pod| pod.name_any())
        .collect();

    let plan = plan_worker_group(
        group.replicas,
        &live,
        &group.scale_strategy.workers_to_delete,
    );

    if plan.is_empty() {
        debug!(group = %group.group_name, "all workers already exist for group");
        return Ok(());
    }

    if !plan.victims.is_empty() {
        if ctx.config.prioritize_workers_to_delete {
            info!(
                group = %group.group_name,
                victims = plan.victims.len(),
                "removing nominated workers before measuring drift"
            );
        } else {
            info!(
                group = %group.group_name,
                victims = plan.victims.len(),
                "removing nominated workers"
            );
        }
    }
    for name in &plan.victims {
        delete_pod(api, ctx, cluster, name, "worker pod").await?;
    }

    if !plan.overflow.is_empty() {
        info!(
            group = %group.group_name,
            overflow = plan.overflow.len(),
            "scaling down beyond the nominated workers"
        );
        for name in &plan.overflow {
            delete_pod(api, ctx, cluster, name, "worker pod").await?;
        }
    }

    for index in 0..plan.create {
        info!(
            group = %group.group_name,
            index,
            total = plan.create,
            "creating worker pod"
        );
        let pod = build_worker_pod(cluster, group)?;
        create_pod(api, ctx, cluster, pod, "worker pod").await?;
    }

    Ok(())
}

/// Create a pod, tolerating a lost race against an identically named one
///
/// When the create hits AlreadyExists the conflicting pod is inspected: if it
/// is terminating the reconcile fails so the next pass retries after the name
/// frees up; otherwise the existing pod is accepted as ours.
async fn create_pod(
    api: &Api<Pod>,
    ctx: &Context,
    cluster: &RayCluster,
    pod: Pod,
    what: &str,
) -> Result<()> {
    let name = pod.name_any();
    match api.create(&PostParams::default(), &pod).await {
        Ok(_) => {
            info!(name = %name, "created {}", what);
            ctx.publish_normal_event(cluster, "Created", Some(format!("Created {} {}", what, name)))
                .await;
            Ok(())
        }
        Err(e) if is_already_exists(&e) => {
            match api.get_opt(&name).await? {
                Some(existing) if existing.metadata.deletion_timestamp.is_some() => {
                    Err(Error::PodPendingDeletion { name })
                }
                _ => {
                    info!(name = %name, "{} already exists, no need to create", what);
                    Ok(())
                }
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a pod by name, treating NotFound as success
async fn delete_pod(
    api: &Api<Pod>,
    ctx: &Context,
    cluster: &RayCluster,
    name: &str,
    what: &str,
) -> Result<()> {
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            info!(name = %name, "deleted {}", what);
            ctx.publish_normal_event(cluster, "Deleted", Some(format!("Deleted {} {}", what, name)))
                .await;
            Ok(())
        }
        Err(e) if is_not_found(&e) => {
            debug!(name = %name, "{} was already deleted", what);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
