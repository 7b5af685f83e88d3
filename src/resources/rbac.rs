//! RBAC objects for the in-tree autoscaler sidecar
//!
//! Gated by `spec.enableInTreeAutoscaling`. The autoscaler runs next to the
//! head node and needs to watch pods and patch the owning RayCluster, so
//! each cluster gets its own ServiceAccount, Role and RoleBinding, all named
//! after the cluster.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::controller::error::Result;
use crate::crd::RayCluster;
use crate::resources::common::{cluster_labels, owner_reference, sanitize_name};

/// Generate the ServiceAccount the autoscaler sidecar runs as
pub fn build_autoscaler_service_account(cluster: &RayCluster) -> Result<ServiceAccount> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&cluster_name)?;

    Ok(ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(cluster_labels(&cluster_name)),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Generate the Role granting the autoscaler its permissions
pub fn build_autoscaler_role(cluster: &RayCluster) -> Result<Role> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&cluster_name)?;

    Ok(Role {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(cluster_labels(&cluster_name)),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        rules: Some(vec![
            // The autoscaler observes pods to measure load and terminates the
            // victims it nominates.
            PolicyRule {
                api_groups: Some(vec!["".to_string()]),
                resources: Some(vec!["pods".to_string(), "pods/status".to_string()]),
                verbs: vec![
                    "get".to_string(),
                    "list".to_string(),
                    "watch".to_string(),
                    "delete".to_string(),
                ],
                ..Default::default()
            },
            // Scale decisions are delivered by patching the RayCluster spec.
            PolicyRule {
                api_groups: Some(vec!["ray.io".to_string()]),
                resources: Some(vec!["rayclusters".to_string()]),
                verbs: vec![
                    "get".to_string(),
                    "list".to_string(),
                    "watch".to_string(),
                    "update".to_string(),
                    "patch".to_string(),
                ],
                ..Default::default()
            },
        ]),
    })
}

/// Generate the RoleBinding tying the autoscaler ServiceAccount to its Role
pub fn build_autoscaler_role_binding(cluster: &RayCluster) -> Result<RoleBinding> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&cluster_name)?;

    Ok(RoleBinding {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: cluster.namespace(),
            labels: Some(cluster_labels(&cluster_name)),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.clone(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name,
            namespace: cluster.namespace(),
            ..Default::default()
        }]),
    })
}
