pub mod controller;
pub mod crd;
pub mod resources;

pub use controller::{error_policy, reconcile, Context, Error, OperatorConfig, Result};
pub use crd::RayCluster;

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

/// Run the operator controller
///
/// Watches RayCluster resources and the pods and services they own, and
/// reconciles each cluster with bounded concurrency. It can be called from
/// main.rs or spawned as a background task during tests.
pub async fn run_controller(client: Client, config: OperatorConfig) {
    tracing::info!(
        concurrency = config.reconcile_concurrency,
        requeue = ?config.requeue_duration,
        prioritize_workers_to_delete = config.prioritize_workers_to_delete,
        "Starting controller for RayCluster resources"
    );

    let ctx = Arc::new(Context::new(client.clone(), config.clone()));

    let clusters: Api<RayCluster> = Api::all(client.clone());
    let pods: Api<Pod> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client);

    // any_semantic() keeps resource discovery reliable in test environments
    let watcher_config = WatcherConfig::default().any_semantic();

    // Watch RayCluster plus owned pods and services; an event on an owned
    // object enqueues its parent cluster.
    Controller::new(clusters, watcher_config.clone())
        .owns(pods, watcher_config.clone())
        .owns(services, watcher_config)
        .with_config(ControllerConfig::default().concurrency(config.reconcile_concurrency))
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    tracing::debug!("Reconciled: {}", obj.name);
                }
                Err(e) => {
                    tracing::error!("Reconciliation error: {:?}", e);
                }
            }
        })
        .await;

    // This should never complete in normal operation
    tracing::error!("Controller stream ended unexpectedly");
}
