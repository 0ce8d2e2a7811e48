// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration from command-line flags and environment variables.
//!
//! Every flag can also be set through the environment variable named next to it
//! in `--help`. Flags win over environment variables.
//!
//! # Example
//!
//! ```text
//! PIHOLE_URL=http://pihole.lan PIHOLE_PASSWORD=secret DEFAULT_TARGET_IP=192.168.1.100 \
//!     pihole-operator --enable-gateway-api
//! ```

use crate::constants::{
    DEFAULT_HEALTH_PROBE_BIND_ADDRESS, DEFAULT_LOG_LEVEL, DEFAULT_PIHOLE_API_PATH,
    DEFAULT_PIHOLE_PASSWORD_FIELD, DEFAULT_PIHOLE_SESSION_HEADER, DEFAULT_PIHOLE_TIMEOUT_SECS,
};
use crate::pihole::PiholeClientConfig;
use crate::validation::is_valid_ipv4;
use clap::Parser;
use reqwest::header::HeaderName;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Log levels accepted by `--log-level`.
const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];

/// Invalid startup configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid Pi-hole URL {value:?}: {reason}")]
    InvalidPiholeUrl { value: String, reason: String },

    #[error("Pi-hole password must not be empty")]
    MissingPassword,

    #[error("default target IP {0:?} is not an IPv4 address")]
    InvalidTargetIp(String),

    #[error("invalid log level {0:?} (expected one of debug, info, warn, error)")]
    InvalidLogLevel(String),

    #[error("invalid Pi-hole session header {0:?}")]
    InvalidSessionHeader(String),

    #[error("Pi-hole password field must not be empty")]
    MissingPasswordField,

    #[error("Pi-hole timeout must be greater than zero")]
    InvalidTimeout,
}

/// Pi-hole operator configuration.
#[derive(Parser, Debug, Clone)]
#[command(name = "pihole-operator")]
#[command(about = "Keeps Pi-hole local DNS records in sync with Ingress and Gateway API routes", long_about = None)]
#[command(version)]
pub struct Config {
    /// Pi-hole base URL, e.g. http://pihole.lan
    #[arg(long, env = "PIHOLE_URL")]
    pub pihole_url: String,

    /// Pi-hole web password
    #[arg(long, env = "PIHOLE_PASSWORD", hide_env_values = true)]
    pub pihole_password: String,

    /// IPv4 address hostnames resolve to unless overridden per object
    #[arg(long, env = "DEFAULT_TARGET_IP")]
    pub default_target_ip: String,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// API path prefix under the Pi-hole URL
    #[arg(long, env = "PIHOLE_API_PATH", default_value = DEFAULT_PIHOLE_API_PATH)]
    pub pihole_api_path: String,

    /// Header carrying the Pi-hole session id
    #[arg(long, env = "PIHOLE_SESSION_HEADER", default_value = DEFAULT_PIHOLE_SESSION_HEADER)]
    pub pihole_session_header: String,

    /// JSON field holding the password in the auth request
    #[arg(long, env = "PIHOLE_PASSWORD_FIELD", default_value = DEFAULT_PIHOLE_PASSWORD_FIELD)]
    pub pihole_password_field: String,

    /// Timeout for each Pi-hole request, in seconds
    #[arg(long, env = "PIHOLE_TIMEOUT_SECS", default_value_t = DEFAULT_PIHOLE_TIMEOUT_SECS)]
    pub pihole_timeout_secs: u64,

    /// Also watch HTTPRoute, GRPCRoute, TLSRoute and TCPRoute
    #[arg(long, env = "ENABLE_GATEWAY_API")]
    pub enable_gateway_api: bool,

    /// Address the health and metrics server listens on
    #[arg(long, env = "HEALTH_PROBE_BIND_ADDRESS", default_value = DEFAULT_HEALTH_PROBE_BIND_ADDRESS)]
    pub health_probe_bind_address: SocketAddr,
}

impl Config {
    /// Check values clap cannot check and normalize the rest.
    ///
    /// The log level is lowercased and an empty watch namespace means all namespaces.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let url = Url::parse(&self.pihole_url).map_err(|e| ConfigError::InvalidPiholeUrl {
            value: self.pihole_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidPiholeUrl {
                value: self.pihole_url,
                reason: "scheme must be http or https".to_string(),
            });
        }

        if self.pihole_password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }

        if !is_valid_ipv4(&self.default_target_ip) {
            return Err(ConfigError::InvalidTargetIp(self.default_target_ip));
        }

        self.log_level = self.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level));
        }

        if HeaderName::from_bytes(self.pihole_session_header.as_bytes()).is_err() {
            return Err(ConfigError::InvalidSessionHeader(
                self.pihole_session_header,
            ));
        }

        if self.pihole_password_field.is_empty() {
            return Err(ConfigError::MissingPasswordField);
        }

        if self.pihole_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        self.watch_namespace = self.watch_namespace.filter(|ns| !ns.is_empty());
        Ok(self)
    }

    /// Settings for the Pi-hole client.
    #[must_use]
    pub fn pihole_client_config(&self) -> PiholeClientConfig {
        PiholeClientConfig {
            base_url: self.pihole_url.clone(),
            password: self.pihole_password.clone(),
            api_path: self.pihole_api_path.clone(),
            session_header: self.pihole_session_header.clone(),
            password_field: self.pihole_password_field.clone(),
            timeout: Duration::from_secs(self.pihole_timeout_secs),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
