//! The remap database: every routable hostname, compiled from one
//! consistent view of the cluster.

use std::collections::HashMap;

use crate::cluster::{ClusterState, Ingress, IngressPath, Namespace, ServiceType};
use crate::config::EngineConfig;
use crate::remap::annotations::{self, INGRESS_CLASS};
use crate::remap::host::RemapHost;
use crate::remap::path::{RemapPath, RemapTarget};
use crate::remap::tls;

/// The compiled routing table. Immutable once built; a rebuild produces a
/// fresh instance that supersedes this one at the snapshot slot.
#[derive(Debug, Default)]
pub struct RemapDatabase {
    hosts: HashMap<String, RemapHost>,
    x_forwarded_proto: bool,
}

impl RemapDatabase {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a database from cluster state and static configuration.
    ///
    /// Pure with respect to its inputs: the cluster is only read, and the
    /// same state and config yield an equivalent table. Individual broken
    /// objects are skipped, never fatal.
    pub fn from_cluster(config: &EngineConfig, cluster: &ClusterState) -> Self {
        let mut db = Self::empty();
        db.x_forwarded_proto = config.x_forwarded_proto;
        for namespace in cluster.namespaces() {
            for ingress in namespace.ingresses() {
                db.add_ingress(config, namespace, ingress);
            }
        }
        tracing::debug!(hosts = db.hosts.len(), "remap database built");
        db
    }

    /// Exact hostname lookup, also used at TLS-handshake time for SNI.
    pub fn host(&self, hostname: &str) -> Option<&RemapHost> {
        self.hosts.get(&hostname.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Whether proxied requests should carry an X-Forwarded-Proto header.
    pub fn x_forwarded_proto(&self) -> bool {
        self.x_forwarded_proto
    }

    fn host_mut(&mut self, hostname: &str) -> &mut RemapHost {
        self.hosts
            .entry(hostname.to_ascii_lowercase())
            .or_insert_with(|| RemapHost::new(hostname))
    }

    fn add_ingress(&mut self, config: &EngineConfig, namespace: &Namespace, ingress: &Ingress) {
        // An Ingress claimed by another controller contributes nothing.
        // One with no class annotation is always ours.
        if let Some(class) = ingress.annotations.get(INGRESS_CLASS) {
            if !config.serves_class(class) {
                tracing::debug!(
                    namespace = %ingress.namespace,
                    name = %ingress.name,
                    class = %class,
                    "ingress class not served, skipping"
                );
                return;
            }
        }

        for entry in &ingress.tls {
            let Some(secret) = namespace.secret(&entry.secret_name) else {
                tracing::warn!(
                    namespace = %ingress.namespace,
                    secret = %entry.secret_name,
                    "TLS secret not found"
                );
                continue;
            };
            if !secret.is_tls() {
                tracing::warn!(
                    namespace = %ingress.namespace,
                    secret = %entry.secret_name,
                    secret_type = %secret.secret_type,
                    "secret is not a TLS secret"
                );
                continue;
            }
            match tls::context_from_secret(secret) {
                Ok(ctx) => {
                    for hostname in &entry.hosts {
                        let host = self.host_mut(hostname);
                        host.tls = Some(ctx.clone());
                        annotations::apply_host_annotations(host, &ingress.annotations);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        namespace = %ingress.namespace,
                        secret = %entry.secret_name,
                        %err,
                        "unusable TLS secret"
                    );
                }
            }
        }

        for rule in &ingress.rules {
            let Some(hostname) = rule.host.as_deref() else {
                // Wildcard (host-less) rules are not supported.
                tracing::debug!(
                    namespace = %ingress.namespace,
                    name = %ingress.name,
                    "rule without host, skipping"
                );
                continue;
            };

            annotations::apply_host_annotations(self.host_mut(hostname), &ingress.annotations);

            for entry in &rule.paths {
                let targets = resolve_targets(namespace, entry);

                let declared = entry
                    .path
                    .as_deref()
                    .filter(|p| !p.is_empty() && *p != "/");
                let mut path = match declared {
                    Some(p) => match RemapPath::new(p) {
                        Ok(path) => path,
                        Err(err) => {
                            tracing::warn!(
                                namespace = %ingress.namespace,
                                name = %ingress.name,
                                path = p,
                                %err,
                                "unusable path pattern, skipping"
                            );
                            continue;
                        }
                    },
                    None => RemapPath::new_default(),
                };
                path.targets = targets;
                annotations::apply_path_annotations(&mut path, &ingress.annotations, namespace, config);

                let host = self.host_mut(hostname);
                if path.is_default() {
                    host.set_default_path(path);
                } else {
                    host.add_path(path);
                }
            }
        }
    }
}

/// Resolve one path entry's backend addresses.
///
/// Any miss along the Service → port → Endpoints chain yields an empty
/// target list: the path stays routable and reports "no backend" at
/// dispatch time.
fn resolve_targets(namespace: &Namespace, entry: &IngressPath) -> Vec<RemapTarget> {
    let Some(service) = namespace.service(&entry.service_name) else {
        tracing::warn!(
            namespace = namespace.name(),
            service = %entry.service_name,
            "backend service not found"
        );
        return Vec::new();
    };

    let Some(port) = service.port(&entry.service_port) else {
        tracing::warn!(
            namespace = namespace.name(),
            service = %entry.service_name,
            "service has no matching port"
        );
        return Vec::new();
    };

    if service.service_type == ServiceType::ExternalName {
        return match &service.external_name {
            Some(name) => vec![RemapTarget {
                host: name.clone(),
                port: port.port,
            }],
            None => {
                tracing::warn!(
                    namespace = namespace.name(),
                    service = %entry.service_name,
                    "ExternalName service without externalName"
                );
                Vec::new()
            }
        };
    }

    let Some(endpoints) = namespace.endpoints(&service.name) else {
        tracing::debug!(
            namespace = namespace.name(),
            service = %entry.service_name,
            "no endpoints for service"
        );
        return Vec::new();
    };

    let port_name = port.name.clone().unwrap_or_default();
    let mut targets = Vec::new();
    for subset in &endpoints.subsets {
        let Some(subset_port) = subset.ports.get(&port_name) else {
            continue;
        };
        targets.extend(subset.addresses.iter().map(|addr| RemapTarget {
            host: addr.ip.clone(),
            port: subset_port.port,
        }));
    }

    if targets.is_empty() {
        tracing::debug!(
            namespace = namespace.name(),
            service = %entry.service_name,
            "service has no ready addresses"
        );
    }
    targets
}
