pub mod config;
pub mod context;
pub mod error;
pub mod pods;
pub mod reconciler;
pub mod status;

pub use config::OperatorConfig;
pub use context::Context;
pub use error::{Error, Result};
pub use pods::{plan_head_pods, plan_worker_group, HeadPodAction, WorkerGroupPlan};
pub use reconciler::{error_policy, reconcile};
