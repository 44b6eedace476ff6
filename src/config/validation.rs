//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses parse and limits are non-zero
//! - Check route shape for operator-supplied route tables
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure functions over borrowed data
//! - The control core never calls this; the config file and admin API do

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ControlConfig;
use crate::control::Route;

/// A single semantic problem in a configuration or route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("route #{index}: path '{path}' must start with '/'")]
    RoutePath { index: usize, path: String },

    #[error("route #{index}: backend must not be empty")]
    RouteBackend { index: usize },
}

/// Validate a full configuration.
pub fn validate_config(config: &ControlConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_subscriptions == 0 {
        errors.push(ValidationError::Zero("listener.max_subscriptions"));
    }
    if config.streaming.sink_capacity == 0 {
        errors.push(ValidationError::Zero("streaming.sink_capacity"));
    }
    if config.streaming.send_timeout_ms == 0 {
        errors.push(ValidationError::Zero("streaming.send_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    errors.extend(route_errors(&config.routes));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate an operator-supplied route table.
///
/// Duplicate paths are accepted; the first one in table order wins at
/// resolution time.
pub fn validate_routes(routes: &[Route]) -> Result<(), Vec<ValidationError>> {
    let errors = route_errors(routes);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn route_errors(routes: &[Route]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (index, route) in routes.iter().enumerate() {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                index,
                path: route.path.clone(),
            });
        }
        if route.backend.trim().is_empty() {
            errors.push(ValidationError::RouteBackend { index });
        }
    }
    errors
}
