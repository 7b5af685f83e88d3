//! Head service builder
//!
//! Every cluster gets a single service in front of its head pod. Workers
//! resolve the head through this service, and the dashboard and client
//! ports are exposed on it as well.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::controller::error::Result;
use crate::crd::RayCluster;
use crate::resources::common::{
    cluster_labels, head_service_name, owner_reference, NodeType, CLUSTER_LABEL_KEY,
    NODE_TYPE_LABEL_KEY,
};

/// GCS server port, the address workers dial on `ray start`
pub const GCS_PORT: i32 = 6379;

/// Ray dashboard port
pub const DASHBOARD_PORT: i32 = 8265;

/// Ray client server port
pub const CLIENT_PORT: i32 = 10001;

/// Generate the head service for a cluster
pub fn build_head_service(cluster: &RayCluster) -> Result<Service> {
    let name = head_service_name(cluster)?;
    let cluster_name = cluster.name_any();
    let ns = cluster.namespace();

    let selector = BTreeMap::from([
        (CLUSTER_LABEL_KEY.to_string(), cluster_name.clone()),
        (NODE_TYPE_LABEL_KEY.to_string(), NodeType::Head.to_string()),
    ]);

    let ports = vec![
        service_port("gcs-server", GCS_PORT),
        service_port("dashboard", DASHBOARD_PORT),
        service_port("client", CLIENT_PORT),
    ];

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: ns,
            labels: Some(cluster_labels(&cluster_name)),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(ports),
            type_: cluster.spec.head_group_spec.service_type.clone(),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}
