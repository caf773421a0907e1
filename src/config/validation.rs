//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the allow-list pattern compiles before any request is served
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;

use crate::config::schema::ProxyConfig;
use crate::filter::pattern::AllowList;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("upstream.address {0:?} is not a valid host:port")]
    UpstreamAddress(String),

    #[error("filter.user_id_regex is required")]
    MissingPattern,

    #[error("filter.user_id_regex is invalid: {0}")]
    InvalidPattern(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let upstream_ok = Authority::from_str(&config.upstream.address)
        .map(|a| a.port_u16().is_some())
        .unwrap_or(false);
    if !upstream_ok {
        errors.push(ValidationError::UpstreamAddress(config.upstream.address.clone()));
    }

    if config.filter.user_id_regex.is_empty() {
        errors.push(ValidationError::MissingPattern);
    } else if let Err(e) = AllowList::compile(&config.filter.user_id_regex) {
        errors.push(ValidationError::InvalidPattern(e.to_string()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
