//! Ingress objects: host/path routing rules pointing at backend Services.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cluster::ObjectError;

/// Reference to a Service port, by name or number.
///
/// Kubernetes accepts either form in `backend.servicePort`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortRef {
    Number(u16),
    Name(String),
}

/// TLS entry: the named Secret supplies the certificate for these hosts.
#[derive(Debug, Clone)]
pub struct IngressTls {
    pub hosts: Vec<String>,
    pub secret_name: String,
}

/// One path entry under a rule. An absent path routes via the host's
/// default path.
#[derive(Debug, Clone)]
pub struct IngressPath {
    pub path: Option<String>,
    pub service_name: String,
    pub service_port: PortRef,
}

/// One host rule with its ordered path list.
#[derive(Debug, Clone)]
pub struct IngressRule {
    pub host: Option<String>,
    pub paths: Vec<IngressPath>,
}

/// An Ingress object as consumed by the routing-table compiler.
#[derive(Debug, Clone)]
pub struct Ingress {
    pub namespace: String,
    pub name: String,
    pub annotations: HashMap<String, String>,
    pub tls: Vec<IngressTls>,
    pub rules: Vec<IngressRule>,
}

impl Ingress {
    /// Parse an Ingress from Kubernetes API JSON.
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let raw: RawIngress = serde_json::from_value(value)?;
        Ok(raw.into())
    }
}

// Wire shape. metadata.namespace/name are required; everything else
// defaults to empty.

#[derive(Deserialize)]
struct RawIngress {
    metadata: RawMetadata,
    #[serde(default)]
    spec: RawIngressSpec,
}

#[derive(Deserialize)]
struct RawMetadata {
    namespace: String,
    name: String,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

#[derive(Default, Deserialize)]
struct RawIngressSpec {
    #[serde(default)]
    tls: Vec<RawIngressTls>,
    #[serde(default)]
    rules: Vec<RawIngressRule>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIngressTls {
    #[serde(default)]
    hosts: Vec<String>,
    secret_name: String,
}

#[derive(Deserialize)]
struct RawIngressRule {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    http: Option<RawIngressHttp>,
}

#[derive(Deserialize)]
struct RawIngressHttp {
    #[serde(default)]
    paths: Vec<RawIngressPath>,
}

#[derive(Deserialize)]
struct RawIngressPath {
    #[serde(default)]
    path: Option<String>,
    backend: RawIngressBackend,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIngressBackend {
    service_name: String,
    service_port: PortRef,
}

impl From<RawIngress> for Ingress {
    fn from(raw: RawIngress) -> Self {
        let rules = raw
            .spec
            .rules
            .into_iter()
            .map(|rule| IngressRule {
                host: rule.host.filter(|h| !h.is_empty()),
                paths: rule
                    .http
                    .map(|http| {
                        http.paths
                            .into_iter()
                            .map(|p| IngressPath {
                                path: p.path.filter(|s| !s.is_empty()),
                                service_name: p.backend.service_name,
                                service_port: p.backend.service_port,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            namespace: raw.metadata.namespace,
            name: raw.metadata.name,
            annotations: raw.metadata.annotations,
            tls: raw
                .spec
                .tls
                .into_iter()
                .map(|t| IngressTls {
                    hosts: t.hosts,
                    secret_name: t.secret_name,
                })
                .collect(),
            rules,
        }
    }
}
