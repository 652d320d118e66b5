//! Endpoints objects: the live, ready addresses behind a Service.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::cluster::{ObjectError, Protocol};

/// One ready backend address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointAddress {
    pub ip: String,
    #[serde(default)]
    pub node_name: Option<String>,
}

/// A named port within a subset.
#[derive(Debug, Clone, Copy)]
pub struct EndpointPort {
    pub port: u16,
    pub protocol: Protocol,
}

/// A group of addresses all exposing the same set of ports.
#[derive(Debug, Clone, Default)]
pub struct EndpointSubset {
    pub addresses: Vec<EndpointAddress>,
    /// Keyed by port name; unnamed ports key on the empty string.
    pub ports: HashMap<String, EndpointPort>,
}

/// An Endpoints object. Absence of a referenced port name is a lookup
/// miss at compile time, never an error here.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub namespace: String,
    pub name: String,
    pub subsets: Vec<EndpointSubset>,
}

impl Endpoints {
    /// Parse an Endpoints object from Kubernetes API JSON.
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let raw: RawEndpoints = serde_json::from_value(value)?;
        let subsets = raw
            .subsets
            .into_iter()
            .map(|subset| {
                let ports = subset
                    .ports
                    .into_iter()
                    .map(|p| {
                        let name = p.name.unwrap_or_default();
                        (name, EndpointPort { port: p.port, protocol: p.protocol })
                    })
                    .collect();
                EndpointSubset {
                    addresses: subset.addresses,
                    ports,
                }
            })
            .collect();

        Ok(Self {
            namespace: raw.metadata.namespace,
            name: raw.metadata.name,
            subsets,
        })
    }
}

#[derive(Deserialize)]
struct RawEndpoints {
    metadata: RawMetadata,
    #[serde(default)]
    subsets: Vec<RawSubset>,
}

#[derive(Deserialize)]
struct RawMetadata {
    namespace: String,
    name: String,
}

#[derive(Deserialize)]
struct RawSubset {
    #[serde(default)]
    addresses: Vec<EndpointAddress>,
    #[serde(default)]
    ports: Vec<RawPort>,
}

#[derive(Deserialize)]
struct RawPort {
    #[serde(default)]
    name: Option<String>,
    port: u16,
    #[serde(default)]
    protocol: Protocol,
}
