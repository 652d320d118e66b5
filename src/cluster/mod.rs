//! Cluster state model.
//!
//! # Data Flow
//! ```text
//! Kubernetes watcher (external)
//!     → apply_*/delete_* (under the cluster lock)
//!     → ClusterState marks itself changed
//!     → compiler reads a consistent view, clears the flag
//! ```
//!
//! # Design Decisions
//! - One owned `ClusterState` instance, no process-wide globals
//! - Objects are parsed from Kubernetes API JSON at the watcher boundary;
//!   malformed objects are rejected there and never enter the state
//! - The `changed` flag lets the rebuild path be a cheap no-op

pub mod endpoints;
pub mod ingress;
pub mod secret;
pub mod service;

pub use endpoints::{EndpointAddress, EndpointPort, EndpointSubset, Endpoints};
pub use ingress::{Ingress, IngressPath, IngressRule, IngressTls, PortRef};
pub use secret::Secret;
pub use service::{Protocol, Service, ServicePort, ServiceType};

use std::collections::HashMap;

use thiserror::Error;

/// Error raised when a watched object cannot be turned into its model type.
///
/// Never fatal: the watcher drops the object and processing continues.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("malformed object: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("object has no metadata.{0}")]
    MissingMetadata(&'static str),
}

/// All watched objects in one namespace, keyed by object name.
#[derive(Debug, Default)]
pub struct Namespace {
    name: String,
    ingresses: HashMap<String, Ingress>,
    services: HashMap<String, Service>,
    endpoints: HashMap<String, Endpoints>,
    secrets: HashMap<String, Secret>,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ingress(&self, name: &str) -> Option<&Ingress> {
        self.ingresses.get(name)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn endpoints(&self, name: &str) -> Option<&Endpoints> {
        self.endpoints.get(name)
    }

    pub fn secret(&self, name: &str) -> Option<&Secret> {
        self.secrets.get(name)
    }

    pub fn ingresses(&self) -> impl Iterator<Item = &Ingress> {
        self.ingresses.values()
    }
}

/// Root of the watched cluster state.
///
/// Mutated only by the watcher collaborator, read by the routing-table
/// compiler. Callers share it behind a single `Mutex`; none of the methods
/// here block or allocate beyond the maps they maintain.
#[derive(Debug, Default)]
pub struct ClusterState {
    namespaces: HashMap<String, Namespace>,
    changed: bool,
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a namespace, if any object in it has been seen.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.get(name)
    }

    /// Get or create the namespace record for `name`.
    pub fn namespace_mut(&mut self, name: &str) -> &mut Namespace {
        self.namespaces
            .entry(name.to_string())
            .or_insert_with(|| Namespace::new(name))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }

    /// True if any mutation happened since the last `take_changed`.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Consume the changed flag; the compiler calls this under the lock.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn apply_ingress(&mut self, obj: Ingress) {
        tracing::debug!(namespace = %obj.namespace, name = %obj.name, "ingress applied");
        self.namespace_mut(&obj.namespace.clone())
            .ingresses
            .insert(obj.name.clone(), obj);
        self.changed = true;
    }

    pub fn delete_ingress(&mut self, namespace: &str, name: &str) {
        if let Some(ns) = self.namespaces.get_mut(namespace) {
            if ns.ingresses.remove(name).is_some() {
                tracing::debug!(namespace, name, "ingress deleted");
                self.changed = true;
            }
        }
    }

    pub fn apply_service(&mut self, obj: Service) {
        tracing::debug!(namespace = %obj.namespace, name = %obj.name, "service applied");
        self.namespace_mut(&obj.namespace.clone())
            .services
            .insert(obj.name.clone(), obj);
        self.changed = true;
    }

    pub fn delete_service(&mut self, namespace: &str, name: &str) {
        if let Some(ns) = self.namespaces.get_mut(namespace) {
            if ns.services.remove(name).is_some() {
                tracing::debug!(namespace, name, "service deleted");
                self.changed = true;
            }
        }
    }

    pub fn apply_endpoints(&mut self, obj: Endpoints) {
        tracing::debug!(namespace = %obj.namespace, name = %obj.name, "endpoints applied");
        self.namespace_mut(&obj.namespace.clone())
            .endpoints
            .insert(obj.name.clone(), obj);
        self.changed = true;
    }

    pub fn delete_endpoints(&mut self, namespace: &str, name: &str) {
        if let Some(ns) = self.namespaces.get_mut(namespace) {
            if ns.endpoints.remove(name).is_some() {
                tracing::debug!(namespace, name, "endpoints deleted");
                self.changed = true;
            }
        }
    }

    pub fn apply_secret(&mut self, obj: Secret) {
        tracing::debug!(namespace = %obj.namespace, name = %obj.name, "secret applied");
        self.namespace_mut(&obj.namespace.clone())
            .secrets
            .insert(obj.name.clone(), obj);
        self.changed = true;
    }

    pub fn delete_secret(&mut self, namespace: &str, name: &str) {
        if let Some(ns) = self.namespaces.get_mut(namespace) {
            if ns.secrets.remove(name).is_some() {
                tracing::debug!(namespace, name, "secret deleted");
                self.changed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_flag() {
        let mut cluster = ClusterState::new();
        assert!(!cluster.changed());

        let ing = Ingress::from_value(json!({
            "metadata": {"namespace": "default", "name": "web"},
            "spec": {"rules": []}
        }))
        .unwrap();
        cluster.apply_ingress(ing);
        assert!(cluster.changed());

        assert!(cluster.take_changed());
        assert!(!cluster.changed());

        // Deleting a nonexistent object is not a change.
        cluster.delete_ingress("default", "nope");
        assert!(!cluster.changed());

        cluster.delete_ingress("default", "web");
        assert!(cluster.changed());
    }

    #[test]
    fn test_namespace_isolation() {
        let mut cluster = ClusterState::new();
        let a = Ingress::from_value(json!({
            "metadata": {"namespace": "a", "name": "web"},
            "spec": {"rules": []}
        }))
        .unwrap();
        cluster.apply_ingress(a);

        assert!(cluster.namespace("a").unwrap().ingress("web").is_some());
        assert!(cluster.namespace("b").is_none());
    }
}
