//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            address = "127.0.0.1:3000"
            "#,
        )
        .unwrap();

        assert!(config.real_ip.enabled);
        assert_eq!(config.real_ip.header_name, "X-Real-IP");
        assert_eq!(config.real_ip.process_headers.len(), 4);
        assert!(config.real_ip.force_overwrite);
        assert!(config.real_ip.trust_all);
    }

    #[test]
    fn test_real_ip_section_parses() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [real_ip]
            header_name = "X-Client-IP"
            force_overwrite = false
            trust_all = false
            trusted_ips = ["10.0.0.0/8", "2001:db8::/32"]
            trusted_header = "X-Is-Trusted"

            [[real_ip.process_headers]]
            header_name = "X-Forwarded-For"
            depth = 1

            [[real_ip.process_headers]]
            header_name = "clientAddress"
            "#,
        )
        .unwrap();

        let real_ip = &config.real_ip;
        assert_eq!(real_ip.header_name, "X-Client-IP");
        assert_eq!(real_ip.process_headers.len(), 2);
        assert_eq!(real_ip.process_headers[0].depth, 1);
        // depth defaults to -1 (leftmost) when omitted
        assert_eq!(real_ip.process_headers[1].depth, -1);
        assert_eq!(real_ip.trusted_header.as_deref(), Some("X-Is-Trusted"));
        assert!(!real_ip.trust_all);
    }
}
