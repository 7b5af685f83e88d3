//! Head ingress builder
//!
//! Gated by `headGroupSpec.enableIngress`; routes external traffic to the
//! dashboard port of the head service.

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::controller::error::Result;
use crate::crd::RayCluster;
use crate::resources::common::{
    cluster_labels, head_service_name, owner_reference, sanitize_name,
};
use crate::resources::service::DASHBOARD_PORT;

/// Generate the ingress in front of the head service
pub fn build_head_ingress(cluster: &RayCluster) -> Result<Ingress> {
    let cluster_name = cluster.name_any();
    let name = sanitize_name(&format!("{}-head-ingress", cluster_name))?;
    let svc_name = head_service_name(cluster)?;

    let backend = IngressBackend {
        service: Some(IngressServiceBackend {
            name: svc_name,
            port: Some(ServiceBackendPort {
                number: Some(DASHBOARD_PORT),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    Ok(Ingress {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: cluster.namespace(),
            labels: Some(cluster_labels(&cluster_name)),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend,
                    }],
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    })
}
