//! Secret objects: credential and TLS material.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::cluster::ObjectError;

/// The Kubernetes type of a TLS secret.
pub const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";

/// Data keys carrying the certificate chain and private key in a TLS secret.
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_KEY_KEY: &str = "tls.key";

/// A Secret object. `data` values stay base64-encoded until asked for.
#[derive(Debug, Clone)]
pub struct Secret {
    pub namespace: String,
    pub name: String,
    pub secret_type: String,
    pub data: HashMap<String, String>,
}

impl Secret {
    /// Parse a Secret from Kubernetes API JSON.
    pub fn from_value(value: Value) -> Result<Self, ObjectError> {
        let raw: RawSecret = serde_json::from_value(value)?;
        Ok(Self {
            namespace: raw.metadata.namespace,
            name: raw.metadata.name,
            secret_type: raw.secret_type,
            data: raw.data,
        })
    }

    pub fn is_tls(&self) -> bool {
        self.secret_type == TLS_SECRET_TYPE
    }

    /// Decode one data entry. Returns None for a missing key or bad base64.
    pub fn data_decoded(&self, key: &str) -> Option<Vec<u8>> {
        let raw = self.data.get(key)?;
        match STANDARD.decode(raw.trim()) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(
                    namespace = %self.namespace,
                    name = %self.name,
                    key,
                    %err,
                    "secret entry is not valid base64"
                );
                None
            }
        }
    }
}

#[derive(Deserialize)]
struct RawSecret {
    metadata: RawMetadata,
    #[serde(rename = "type", default = "default_secret_type")]
    secret_type: String,
    #[serde(default)]
    data: HashMap<String, String>,
}

fn default_secret_type() -> String {
    "Opaque".to_string()
}

#[derive(Deserialize)]
struct RawMetadata {
    namespace: String,
    name: String,
}
