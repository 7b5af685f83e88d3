//! Shared context for the RayCluster controller
//!
//! This module provides the shared state and utilities used across
//! the reconciliation loop.

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};

use crate::controller::config::OperatorConfig;
use crate::crd::RayCluster;
use crate::resources::common::FIELD_MANAGER;

/// Shared context for the controller
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Immutable process-wide configuration
    pub config: OperatorConfig,
    /// Event reporter identity
    reporter: Reporter,
}

impl Context {
    /// Create a new context with the given Kubernetes client
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self {
            client,
            config,
            reporter: Reporter {
                controller: FIELD_MANAGER.into(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }

    /// Create an event recorder
    fn recorder(&self) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone())
    }

    /// Publish a normal event for a cluster
    pub async fn publish_normal_event(
        &self,
        cluster: &RayCluster,
        reason: &str,
        note: Option<String>,
    ) {
        let recorder = self.recorder();
        let object_ref = cluster.object_ref(&());
        if let Err(e) = recorder
            .publish(
                &Event {
                    type_: EventType::Normal,
                    reason: reason.into(),
                    note,
                    action: "Reconciling".into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!("Failed to publish event: {}", e);
        }
    }

    /// Publish a warning event for a cluster
    pub async fn publish_warning_event(
        &self,
        cluster: &RayCluster,
        reason: &str,
        note: Option<String>,
    ) {
        let recorder = self.recorder();
        let object_ref = cluster.object_ref(&());
        if let Err(e) = recorder
            .publish(
                &Event {
                    type_: EventType::Warning,
                    reason: reason.into(),
                    note,
                    action: "Reconciling".into(),
                    secondary: None,
                },
                &object_ref,
            )
            .await
        {
            tracing::warn!("Failed to publish warning event: {}", e);
        }
    }
}
