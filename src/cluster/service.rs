//! Service objects: the stable identity of a backend.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cluster::{ObjectError, PortRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    ExternalName,
    NodePort,
    LoadBalancer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// One declared Service port.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    #[serde(default)]
    pub name: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub target_port: Option<PortRef>,
}

/// A Service object. Exactly one of `cluster_ip`/`external_name` is
/// meaningful, governed by `service_type`.
#[derive(Debug, Clone)]
pub struct Service {
    pub namespace: String,
    pub name: String,
    pub service_type: ServiceType,
    pub cluster_ip: Option<String>,
    pub external_name: Option<String>,
    pub selector: HashMap<String, String>,
    pub ports: Vec<ServicePort>,
    pub session_affinity: Option<String>,
}

impl Service {
    /// Parse a Service from Kubernetes API JSON.
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let raw: RawService = serde_json::from_value(value)?;
        let spec = raw.spec;
        Ok(Self {
            namespace: raw.metadata.namespace,
            name: raw.metadata.name,
            service_type: spec.service_type,
            cluster_ip: spec.cluster_ip.filter(|ip| !ip.is_empty() && ip != "None"),
            external_name: spec.external_name.filter(|n| !n.is_empty()),
            selector: spec.selector,
            ports: spec.ports,
            session_affinity: spec.session_affinity,
        })
    }

    /// Resolve a port reference against the declared ports.
    pub fn port(&self, port: &PortRef) -> Option<&ServicePort> {
        self.ports.iter().find(|sp| match port {
            PortRef::Number(n) => sp.port == *n,
            PortRef::Name(name) => sp.name.as_deref() == Some(name.as_str()),
        })
    }
}

#[derive(Deserialize)]
struct RawService {
    metadata: RawMetadata,
    #[serde(default)]
    spec: RawServiceSpec,
}

#[derive(Deserialize)]
struct RawMetadata {
    namespace: String,
    name: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServiceSpec {
    #[serde(rename = "type", default)]
    service_type: ServiceType,
    #[serde(rename = "clusterIP", default)]
    cluster_ip: Option<String>,
    #[serde(default)]
    external_name: Option<String>,
    #[serde(default)]
    selector: HashMap<String, String>,
    #[serde(default)]
    ports: Vec<ServicePort>,
    #[serde(default)]
    session_affinity: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_cluster_ip_service() {
        let svc = Service::from_value(json!({
            "metadata": {"namespace": "default", "name": "echoheaders"},
            "spec": {
                "type": "ClusterIP",
                "clusterIP": "10.3.245.77",
                "selector": {"app": "echoheaders"},
                "sessionAffinity": "None",
                "ports": [
                    {"name": "http", "port": 80, "protocol": "TCP", "targetPort": 8080}
                ]
            }
        }))
        .unwrap();

        assert_eq!(svc.service_type, ServiceType::ClusterIP);
        assert_eq!(svc.cluster_ip.as_deref(), Some("10.3.245.77"));
        assert_eq!(svc.external_name, None);
        assert_eq!(svc.ports[0].protocol, Protocol::Tcp);
        assert_eq!(
            svc.ports[0].target_port,
            Some(PortRef::Number(8080))
        );
    }

    #[test]
    fn test_port_lookup_by_name_and_number() {
        let svc = Service::from_value(json!({
            "metadata": {"namespace": "default", "name": "web"},
            "spec": {"ports": [
                {"name": "http", "port": 80},
                {"name": "https", "port": 443}
            ]}
        }))
        .unwrap();

        assert_eq!(svc.port(&PortRef::Number(443)).unwrap().name.as_deref(), Some("https"));
        assert_eq!(svc.port(&PortRef::Name("http".into())).unwrap().port, 80);
        assert!(svc.port(&PortRef::Name("grpc".into())).is_none());
    }

    #[test]
    fn test_external_name_service() {
        let svc = Service::from_value(json!({
            "metadata": {"namespace": "default", "name": "ext"},
            "spec": {"type": "ExternalName", "externalName": "app.example.net"}
        }))
        .unwrap();

        assert_eq!(svc.service_type, ServiceType::ExternalName);
        assert_eq!(svc.external_name.as_deref(), Some("app.example.net"));
        assert_eq!(svc.cluster_ip, None);
    }
}
