// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record and wire types for the Pi-hole v6 API.

use serde::Deserialize;

/// A local DNS record: one domain bound to one IPv4 address.
///
/// Pi-hole keys local records by domain, so at most one address can be bound
/// to a domain at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsRecord {
    /// Fully qualified hostname
    pub domain: String,
    /// IPv4 address the domain resolves to
    pub ip: String,
}

impl DnsRecord {
    /// Create a record binding `domain` to `ip`.
    pub fn new(domain: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ip: ip.into(),
        }
    }

    /// Render the record as Pi-hole's `"address domain"` hosts entry.
    #[must_use]
    pub fn to_entry(&self) -> String {
        format!("{} {}", self.ip, self.domain)
    }

    /// Parse a Pi-hole hosts entry.
    ///
    /// Returns `None` for entries with fewer than two whitespace-separated
    /// fields. Extra fields (aliases) are ignored.
    #[must_use]
    pub fn from_entry(entry: &str) -> Option<Self> {
        let mut fields = entry.split_whitespace();
        let ip = fields.next()?;
        let domain = fields.next()?;
        Some(Self::new(domain, ip))
    }
}

/// Body of `POST /auth`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub session: AuthSession,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthSession {
    #[serde(default)]
    pub sid: String,
    /// Advertised session lifetime in seconds
    #[serde(default)]
    pub validity: u64,
}

/// Body of `GET /config/dns/hosts`.
#[derive(Debug, Deserialize)]
pub(crate) struct HostsResponse {
    pub config: HostsConfig,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HostsConfig {
    pub dns: HostsDns,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HostsDns {
    #[serde(default)]
    pub hosts: Vec<String>,
}
