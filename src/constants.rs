// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Pi-hole operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Annotation Contract
// ============================================================================

/// Opt-in marker; only the exact value [`REGISTER_ENABLED_VALUE`] enables sync
pub const ANNOTATION_REGISTER: &str = "pihole.io/register";

/// Per-object IPv4 override for the record target address
pub const ANNOTATION_TARGET_IP: &str = "pihole.io/target-ip";

/// Comma-separated hostname list that replaces spec-declared hostnames
pub const ANNOTATION_HOSTS: &str = "pihole.io/hosts";

/// Comma-joined hostnames last applied to Pi-hole for this object (operator-owned)
pub const ANNOTATION_MANAGED_HOSTS: &str = "pihole.io/managed-hosts";

/// Value of [`ANNOTATION_REGISTER`] that enables registration
pub const REGISTER_ENABLED_VALUE: &str = "true";

/// Finalizer guaranteeing DNS cleanup runs before the object is removed
pub const FINALIZER_DNS_CLEANUP: &str = "pihole.io/dns-cleanup";

// ============================================================================
// Kind Constants
// ============================================================================

/// Kind name for `Ingress`
pub const KIND_INGRESS: &str = "Ingress";

/// Kind name for `HTTPRoute`
pub const KIND_HTTP_ROUTE: &str = "HTTPRoute";

/// Kind name for `GRPCRoute`
pub const KIND_GRPC_ROUTE: &str = "GRPCRoute";

/// Kind name for `TLSRoute`
pub const KIND_TLS_ROUTE: &str = "TLSRoute";

/// Kind name for `TCPRoute`
pub const KIND_TCP_ROUTE: &str = "TCPRoute";

// ============================================================================
// Pi-hole API Constants
// ============================================================================

/// Default API path prefix under the Pi-hole base URL
pub const DEFAULT_PIHOLE_API_PATH: &str = "/api";

/// Default session header carrying the session id
pub const DEFAULT_PIHOLE_SESSION_HEADER: &str = "X-FTL-SID";

/// Default JSON field name of the password in the auth payload
pub const DEFAULT_PIHOLE_PASSWORD_FIELD: &str = "password";

/// Default timeout for a single Pi-hole HTTP request
pub const DEFAULT_PIHOLE_TIMEOUT_SECS: u64 = 30;

/// Share of the advertised session validity the client actually uses (percent)
pub const SESSION_VALIDITY_PERCENT: u32 = 80;

/// Upper bound on how long a cached session is trusted (1 day)
pub const MAX_SESSION_VALIDITY_SECS: u64 = 86_400;

/// Auth endpoint, relative to the API path
pub const PIHOLE_AUTH_PATH: &[&str] = &["auth"];

/// Local DNS hosts endpoint, relative to the API path
pub const PIHOLE_HOSTS_PATH: &[&str] = &["config", "dns", "hosts"];

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for transient store and Kubernetes API errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue duration when only the managed-hosts bookkeeping failed (10 seconds)
pub const MANAGED_HOSTS_REQUEUE_DURATION_SECS: u64 = 10;

/// Requeue duration after an optimistic-concurrency conflict (1 second)
pub const CONFLICT_REQUEUE_DURATION_SECS: u64 = 1;

/// Randomization factor applied to requeue delays (±10%)
pub const REQUEUE_JITTER_FACTOR: f64 = 0.1;

// ============================================================================
// Health Check Constants
// ============================================================================

/// Default bind address for the health and metrics HTTP server
pub const DEFAULT_HEALTH_PROBE_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Timeout for the Pi-hole check behind `/readyz`
pub const READINESS_TIMEOUT_SECS: u64 = 5;

/// Timeout for the Pi-hole check performed once at startup
pub const STARTUP_HEALTH_TIMEOUT_SECS: u64 = 10;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default log level when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "info";
