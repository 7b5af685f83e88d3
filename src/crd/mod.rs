mod ray_cluster;

pub use ray_cluster::*;
