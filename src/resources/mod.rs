pub mod common;
pub mod ingress;
pub mod pod;
pub mod rbac;
pub mod service;
