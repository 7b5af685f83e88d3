//! Common utilities for Kubernetes resource generation
//!
//! Shared labels, owner references and name handling used across all
//! resource builders.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use rand::Rng;

use crate::controller::error::{Error, Result};
use crate::crd::RayCluster;

/// API version for the RayCluster CRD
pub const API_VERSION: &str = "ray.io/v1alpha1";

/// Kind for the RayCluster CRD
pub const KIND: &str = "RayCluster";

/// Operator field manager name
pub const FIELD_MANAGER: &str = "raycluster-operator";

/// Label identifying the owning cluster, present on every child object
pub const CLUSTER_LABEL_KEY: &str = "ray.io/cluster";

/// Label carrying the node type (head or worker), present on pods
pub const NODE_TYPE_LABEL_KEY: &str = "ray.io/node-type";

/// Label carrying the worker group name, present on worker pods
pub const GROUP_LABEL_KEY: &str = "ray.io/group";

/// Maximum length of a generated object name
const MAX_NAME_LEN: usize = 50;

/// Alphabet the apiserver uses for generateName suffixes
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Length of generated pod-name suffixes
const SUFFIX_LEN: usize = 5;

/// Node type recorded in the `ray.io/node-type` label
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    Head,
    Worker,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeType::Head => write!(f, "head"),
            NodeType::Worker => write!(f, "worker"),
        }
    }
}

/// Generate an owner reference for a RayCluster
///
/// All child resources carry this reference so that deleting the cluster
/// cascades to them through the garbage collector.
pub fn owner_reference(cluster: &RayCluster) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: cluster.name_any(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Labels shared by every resource belonging to a cluster
pub fn cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CLUSTER_LABEL_KEY.to_string(), cluster_name.to_string()),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
    ])
}

/// Labels for a pod: cluster labels plus node type and, for workers, group
pub fn pod_labels(
    cluster_name: &str,
    node_type: NodeType,
    group_name: Option<&str>,
) -> BTreeMap<String, String> {
    let mut labels = cluster_labels(cluster_name);
    labels.insert(NODE_TYPE_LABEL_KEY.to_string(), node_type.to_string());
    if let Some(group) = group_name {
        labels.insert(GROUP_LABEL_KEY.to_string(), group.to_string());
    }
    labels
}

/// Rewrite a candidate name into a valid DNS label
///
/// Lowercases, replaces invalid characters with dashes and bounds the length
/// at [`MAX_NAME_LEN`], keeping the tail so that generated suffixes survive
/// truncation. A candidate that normalizes to the empty string is rejected.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let mut name: String = raw
        .to_ascii_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if name.len() > MAX_NAME_LEN {
        name = name[name.len() - MAX_NAME_LEN..].to_string();
    }

    let name = name.trim_matches('-');
    if name.is_empty() {
        return Err(Error::InvalidName(raw.to_string()));
    }
    Ok(name.to_string())
}

/// Generate a fresh pod-name suffix
pub fn generate_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Name of the head service for a cluster
///
/// Uses the service-name hint from the head group spec when present.
pub fn head_service_name(cluster: &RayCluster) -> Result<String> {
    match cluster.spec.head_group_spec.service_name.as_deref() {
        Some(hint) => sanitize_name(hint),
        None => sanitize_name(&format!("{}-head-svc", cluster.name_any())),
    }
}
