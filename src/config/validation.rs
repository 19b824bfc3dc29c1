//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that required fields are present while the feature is enabled
//! - Check that every trusted range parses as a CIDR
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use ipnet::IpNet;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A semantic configuration error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address cannot be empty")]
    EmptyBindAddress,

    #[error("upstream.address cannot be empty")]
    EmptyUpstreamAddress,

    #[error("real_ip.header_name cannot be empty when real_ip is enabled")]
    EmptyHeaderName,

    #[error("real_ip.process_headers cannot be empty when real_ip is enabled")]
    EmptyProcessHeaders,

    #[error("real_ip.process_headers[{0}].header_name cannot be empty")]
    EmptyProcessHeaderName(usize),

    #[error("real_ip.trusted_ips cannot be empty when trust_all is false")]
    EmptyTrustedIps,

    #[error("real_ip.trusted_ips entry {0:?} is not a valid CIDR")]
    InvalidTrustedCidr(String),
}

/// Validate a configuration, collecting every semantic error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }

    if config.upstream.address.is_empty() {
        errors.push(ValidationError::EmptyUpstreamAddress);
    }

    let real_ip = &config.real_ip;
    if real_ip.enabled {
        if real_ip.header_name.is_empty() {
            errors.push(ValidationError::EmptyHeaderName);
        }

        if real_ip.process_headers.is_empty() {
            errors.push(ValidationError::EmptyProcessHeaders);
        }

        for (i, spec) in real_ip.process_headers.iter().enumerate() {
            if spec.header_name.is_empty() {
                errors.push(ValidationError::EmptyProcessHeaderName(i));
            }
        }

        if !real_ip.trust_all && real_ip.trusted_ips.is_empty() {
            errors.push(ValidationError::EmptyTrustedIps);
        }

        for entry in &real_ip.trusted_ips {
            if entry.trim().parse::<IpNet>().is_err() {
                errors.push(ValidationError::InvalidTrustedCidr(entry.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
