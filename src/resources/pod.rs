//! Head and worker pod builders
//!
//! Pods are built from the templates carried in the RayCluster spec. The
//! builder injects the identifying labels, the owner reference and the
//! `ray start` command assembled from the group's start parameters.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::controller::error::{Error, Result};
use crate::crd::{RayCluster, WorkerGroupSpec};
use crate::resources::common::{
    generate_suffix, head_service_name, owner_reference, pod_labels, sanitize_name, NodeType,
};

/// Port the head's GCS server listens on; workers dial it through the head service
const GCS_SERVER_PORT: u16 = 6379;

/// Build the head pod for a cluster
///
/// The pod name gets a fresh suffix on every call so that a delete/create
/// cycle never reuses a name that is still terminating.
pub fn build_head_pod(cluster: &RayCluster) -> Result<Pod> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&format!("{}-head-{}", cluster_name, generate_suffix()))?;
    let command = ray_start_command(
        "ray start --head --block",
        &cluster.spec.head_group_spec.ray_start_params,
    );

    build_pod(
        cluster,
        name,
        pod_labels(&cluster_name, NodeType::Head, None),
        &cluster.spec.head_group_spec.template,
        command,
    )
}

/// Build a worker pod for one group of a cluster
///
/// Workers join the cluster by dialing the head service, which is why the
/// service is reconciled before any pod is admitted.
pub fn build_worker_pod(cluster: &RayCluster, group: &WorkerGroupSpec) -> Result<Pod> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&format!(
        "{}-worker-{}-{}",
        cluster_name,
        group.group_name,
        generate_suffix()
    ))?;
    let svc_name = head_service_name(cluster)?;
    let command = ray_start_command(
        &format!(
            "ray start --block --address={}:{}",
            svc_name, GCS_SERVER_PORT
        ),
        &group.ray_start_params,
    );

    build_pod(
        cluster,
        name,
        pod_labels(&cluster_name, NodeType::Worker, Some(&group.group_name)),
        &group.template,
        command,
    )
}

fn build_pod(
    cluster: &RayCluster,
    name: String,
    labels: BTreeMap<String, String>,
    template: &k8s_openapi::api::core::v1::PodTemplateSpec,
    command: String,
) -> Result<Pod> {
    let mut pod_spec = template
        .spec
        .clone()
        .ok_or(Error::MissingObjectKey("template.spec"))?;
    let container = pod_spec
        .containers
        .first_mut()
        .ok_or(Error::MissingObjectKey("template.spec.containers"))?;

    // The first container is the ray node; its entrypoint is replaced with
    // the assembled `ray start` invocation.
    container.command = Some(vec![
        "/bin/bash".to_string(),
        "-lc".to_string(),
        "--".to_string(),
    ]);
    container.args = Some(vec![command]);

    // Merge template labels under the controller's identifying labels so the
    // cluster/node-type/group keys cannot be shadowed.
    let mut merged = template
        .metadata
        .as_ref()
        .and_then(|m| m.labels.clone())
        .unwrap_or_default();
    merged.extend(labels);

    Ok(Pod {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(merged),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(pod_spec),
        ..Default::default()
    })
}

/// Render a `ray start` command line from a base invocation and start params
///
/// Params are appended as `--key=value` flags; a param with an empty value
/// becomes a bare `--key` switch. BTreeMap iteration keeps the rendering
/// stable across reconciles.
fn ray_start_command(base: &str, params: &BTreeMap<String, String>) -> String {
    let mut command = base.to_string();
    for (key, value) in params {
        if value.is_empty() {
            command.push_str(&format!(" --{}", key));
        } else {
            command.push_str(&format!(" --{}={}", key, value));
        }
    }
    command
}
