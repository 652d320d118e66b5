//! Kubernetes Ingress remap engine: compiles watched cluster state into an
//! immutable routing table and decides, per request, where to proxy and
//! which policies apply. The Kubernetes watcher and the proxy runtime are
//! external collaborators.

pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod remap;
pub mod snapshot;

pub use cluster::ClusterState;
pub use config::EngineConfig;
pub use dispatch::{dispatch, Dispatch, DispatchError, Request};
pub use remap::RemapDatabase;
pub use snapshot::SnapshotSlot;
