//! Error types for the RayCluster controller

use thiserror::Error;

/// Error variants are coarse on purpose: every failure either aborts the
/// current reconcile (and is retried after the default requeue duration) or
/// is logged and dropped, so the variants only need to carry enough context
/// for the log line.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("head pod {name} is not running nor pending (phase {phase})")]
    HeadPodNotHealthy { name: String, phase: String },

    #[error("pod {name} already exists and is terminating")]
    PodPendingDeletion { name: String },

    #[error("name {0:?} cannot be normalized into a DNS label")]
    InvalidName(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The create lost to an object that already carries the name
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.reason == "AlreadyExists")
}

/// The target of a get/delete is gone; deletes treat this as success
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}
