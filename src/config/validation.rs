//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("single_app.app_root must not be empty")]
    EmptySingleAppRoot,

    #[error("upstream for app group {0:?} has an empty app_group")]
    EmptyUpstreamGroup(String),

    #[error("defaults.min_instances must be at least 1")]
    ZeroMinInstances,

    #[error("body.max_buffered_bytes must be greater than 0")]
    ZeroBodyLimit,

    #[error("listener.secure_header_prefix must not be empty")]
    EmptySecurePrefix,
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener", &config.listener.bind_address, &mut errors);
    if config.listener.secure_header_prefix.is_empty() {
        errors.push(ValidationError::EmptySecurePrefix);
    }

    if config.observability.metrics_enabled {
        check_address("metrics", &config.observability.metrics_address, &mut errors);
    }

    if let Some(single) = &config.single_app {
        if single.app_root.is_empty() {
            errors.push(ValidationError::EmptySingleAppRoot);
        }
    }

    for upstream in &config.upstreams {
        if upstream.app_group.is_empty() {
            errors.push(ValidationError::EmptyUpstreamGroup(upstream.address.clone()));
        }
        check_address("upstream", &upstream.address, &mut errors);
    }

    if config.defaults.min_instances == 0 {
        errors.push(ValidationError::ZeroMinInstances);
    }

    if config.body.max_buffered_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
