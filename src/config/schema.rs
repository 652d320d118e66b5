//! Configuration schema definitions.
//!
//! This module defines the static configuration for the remap engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Static configuration for the routing-table compiler and dispatch engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ingress classes this controller instance serves. An Ingress whose
    /// class annotation names another controller contributes no routes;
    /// an Ingress without a class annotation is always served.
    pub ingress_classes: Vec<String>,

    /// Add an X-Forwarded-Proto header to proxied requests.
    pub x_forwarded_proto: bool,

    /// Default basic-auth realm when an Ingress does not set one.
    pub auth_realm: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ingress_classes: vec!["trafficserver".to_string()],
            x_forwarded_proto: true,
            auth_realm: "Authentication Required".to_string(),
        }
    }
}

impl EngineConfig {
    /// True if `class` names this controller instance.
    pub fn serves_class(&self, class: &str) -> bool {
        self.ingress_classes.iter().any(|c| c == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert!(cfg.serves_class("trafficserver"));
        assert!(!cfg.serves_class("nginx"));
        assert!(cfg.x_forwarded_proto);
    }

    #[test]
    fn test_minimal_toml() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.ingress_classes, vec!["trafficserver"]);
    }

    #[test]
    fn test_override_classes() {
        let cfg: EngineConfig = toml::from_str(r#"ingress_classes = ["nginx"]"#).unwrap();
        assert!(cfg.serves_class("nginx"));
        assert!(!cfg.serves_class("trafficserver"));
    }
}
