//! Reconciliation logic for RayCluster resources
//!
//! The top-level reconcile runs the dependent-object reconcilers in a fixed
//! order (autoscaler RBAC, ingress, head service, pods) so that when a pod
//! is admitted the service it resolves is already present, then updates the
//! status counters best-effort.

use std::fmt::Debug;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, ListParams, PostParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::{is_already_exists, Error, Result};
use crate::controller::{pods, status};
use crate::crd::RayCluster;
use crate::resources::{ingress, rbac, service};
use crate::resources::common::CLUSTER_LABEL_KEY;

/// Main reconciliation function
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any(), namespace = %cluster.namespace().unwrap_or_default()))]
pub async fn reconcile(cluster: Arc<RayCluster>, ctx: Arc<Context>) -> Result<Action> {
    let ns = cluster.namespace().unwrap_or_default();

    info!("reconciling RayCluster");

    // A tombstoned cluster needs no action: the owner references on its
    // children let the garbage collector cascade the deletion.
    if cluster.metadata.deletion_timestamp.is_some() {
        info!("RayCluster is being deleted, nothing to do");
        return Ok(Action::await_change());
    }

    reconcile_autoscaler_service_account(&cluster, &ctx, &ns).await?;
    reconcile_autoscaler_role(&cluster, &ctx, &ns).await?;
    reconcile_autoscaler_role_binding(&cluster, &ctx, &ns).await?;
    reconcile_head_ingress(&cluster, &ctx, &ns).await?;
    reconcile_head_service(&cluster, &ctx, &ns).await?;
    pods::reconcile_pods(&cluster, &ctx, &ns).await?;

    // Status is best effort; the next watch event covers a failed write.
    if let Err(e) = status::update_status(&cluster, &ctx, &ns).await {
        warn!(error = %e, "failed to update status");
    }

    Ok(Action::await_change())
}

/// Error policy for the controller
pub fn error_policy(cluster: Arc<RayCluster>, err: &Error, ctx: Arc<Context>) -> Action {
    error!(
        cluster = %cluster.name_any(),
        namespace = %cluster.namespace().unwrap_or_default(),
        error = %err,
        "reconciliation failed, requeuing"
    );
    Action::requeue(ctx.config.requeue_duration)
}

fn autoscaling_enabled(cluster: &RayCluster) -> bool {
    cluster.spec.enable_in_tree_autoscaling.unwrap_or(false)
}

async fn reconcile_autoscaler_service_account(
    cluster: &RayCluster,
    ctx: &Context,
    ns: &str,
) -> Result<()> {
    if !autoscaling_enabled(cluster) {
        return Ok(());
    }

    let api: Api<ServiceAccount> = Api::namespaced(ctx.client.clone(), ns);
    if api.get_opt(&cluster.name_any()).await?.is_some() {
        return Ok(());
    }

    let sa = rbac::build_autoscaler_service_account(cluster)?;
    create_child(&api, ctx, cluster, sa, "service account").await
}

async fn reconcile_autoscaler_role(cluster: &RayCluster, ctx: &Context, ns: &str) -> Result<()> {
    if !autoscaling_enabled(cluster) {
        return Ok(());
    }

    let api: Api<Role> = Api::namespaced(ctx.client.clone(), ns);
    if api.get_opt(&cluster.name_any()).await?.is_some() {
        return Ok(());
    }

    let role = rbac::build_autoscaler_role(cluster)?;
    create_child(&api, ctx, cluster, role, "role").await
}

async fn reconcile_autoscaler_role_binding(
    cluster: &RayCluster,
    ctx: &Context,
    ns: &str,
) -> Result<()> {
    if !autoscaling_enabled(cluster) {
        return Ok(());
    }

    let api: Api<RoleBinding> = Api::namespaced(ctx.client.clone(), ns);
    if api.get_opt(&cluster.name_any()).await?.is_some() {
        return Ok(());
    }

    let role_binding = rbac::build_autoscaler_role_binding(cluster)?;
    create_child(&api, ctx, cluster, role_binding, "role binding").await
}

async fn reconcile_head_ingress(cluster: &RayCluster, ctx: &Context, ns: &str) -> Result<()> {
    if !cluster.spec.head_group_spec.enable_ingress.unwrap_or(false) {
        return Ok(());
    }

    let api: Api<Ingress> = Api::namespaced(ctx.client.clone(), ns);
    let selector = format!("{}={}", CLUSTER_LABEL_KEY, cluster.name_any());
    let ingresses = api.list(&ListParams::default().labels(&selector)).await?;

    match ingresses.items.len() {
        0 => {
            let head_ingress = ingress::build_head_ingress(cluster)?;
            create_child(&api, ctx, cluster, head_ingress, "ingress").await
        }
        1 => {
            debug!(name = %ingresses.items[0].name_any(), "head ingress found");
            Ok(())
        }
        found => {
            // Structurally possible only through a race or user tampering;
            // left for a human rather than auto-resolved.
            warn!(found, "duplicate head ingresses found, not mutating");
            ctx.publish_warning_event(
                cluster,
                "DuplicateIngress",
                Some(format!("{} head ingresses found", found)),
            )
            .await;
            Ok(())
        }
    }
}

async fn reconcile_head_service(cluster: &RayCluster, ctx: &Context, ns: &str) -> Result<()> {
    let api: Api<Service> = Api::namespaced(ctx.client.clone(), ns);
    let selector = format!("{}={}", CLUSTER_LABEL_KEY, cluster.name_any());
    let services = api.list(&ListParams::default().labels(&selector)).await?;

    match services.items.len() {
        0 => {
            let head_svc = service::build_head_service(cluster)?;
            create_child(&api, ctx, cluster, head_svc, "service").await
        }
        1 => {
            debug!(name = %services.items[0].name_any(), "head service found");
            Ok(())
        }
        found => {
            warn!(found, "duplicate head services found, not mutating");
            ctx.publish_warning_event(
                cluster,
                "DuplicateService",
                Some(format!("{} head services found", found)),
            )
            .await;
            Ok(())
        }
    }
}

/// Create a dependent object, tolerating AlreadyExists
async fn create_child<T>(
    api: &Api<T>,
    ctx: &Context,
    cluster: &RayCluster,
    child: T,
    what: &str,
) -> Result<()>
where
    T: kube::Resource + Clone + Debug + Serialize + DeserializeOwned,
    T::DynamicType: Default,
{
    let name = child.name_any();
    match api.create(&PostParams::default(), &child).await {
        Ok(_) => {
            info!(name = %name, "created {}", what);
            ctx.publish_normal_event(
                cluster,
                "Created",
                Some(format!("Created {} {}", what, name)),
            )
            .await;
            Ok(())
        }
        Err(e) if is_already_exists(&e) => {
            info!(name = %name, "{} already exists, no need to create", what);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
