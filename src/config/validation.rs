//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (class names nonempty, realm printable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::EngineConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ingress class name must not be empty")]
    EmptyIngressClass,

    #[error("auth realm must not contain control characters")]
    BadAuthRealm,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ingress_classes.iter().any(|c| c.is_empty()) {
        errors.push(ValidationError::EmptyIngressClass);
    }

    if config.auth_realm.chars().any(|c| c.is_control()) {
        errors.push(ValidationError::BadAuthRealm);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
