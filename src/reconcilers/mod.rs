// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of routing objects against Pi-hole local DNS.
//!
//! One generic engine, [`reconcile_route`], serves every watched kind. Each
//! reconcile:
//!
//! 1. **Fetches** the object; a vanished object is a no-op
//! 2. **Cleans up** owned hostnames when the object is deleted or opted out
//! 3. **Ensures** the finalizer before touching Pi-hole
//! 4. **Syncs** desired hostnames to the target address
//! 5. **Prunes** hostnames this object created earlier but no longer declares
//! 6. **Persists** the managed hostname set back onto the object
//!
//! Failures surface as [`ReconcileError`]; the controller's error policy turns
//! [`ReconcileError::requeue_after`] into the next scheduled attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use pihole_operator::reconcilers::{reconcile_route, KubeObjectStore};
//! use k8s_openapi::api::networking::v1::Ingress;
//!
//! let objects = KubeObjectStore::new(client);
//! reconcile_route::<Ingress>(&objects, pihole.as_ref(), "192.168.1.100", "default", "web").await?;
//! ```

pub mod finalizers;
pub mod hosts;
pub mod managed_hosts;
pub mod object_store;
pub mod retry;
pub mod route;

#[cfg(test)]
pub(crate) mod fakes;

pub use object_store::{KubeObjectStore, ObjectStore};
pub use route::reconcile_route;

use crate::constants::{
    CONFLICT_REQUEUE_DURATION_SECS, ERROR_REQUEUE_DURATION_SECS,
    MANAGED_HOSTS_REQUEUE_DURATION_SECS,
};
use crate::dns_errors::PiholeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a reconcile.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A Pi-hole operation failed.
    #[error("Pi-hole {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: PiholeError,
    },

    /// The object changed between read and write (HTTP 409).
    #[error("object was modified concurrently: {0}")]
    Conflict(String),

    /// DNS changes were applied but the managed hosts annotation could not be written.
    #[error("failed to persist managed hosts: {0}")]
    ManagedHosts(#[source] Box<ReconcileError>),

    /// Any other Kubernetes API failure.
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

impl ReconcileError {
    /// Wrap a Pi-hole failure with the operation that produced it.
    #[must_use]
    pub fn store(operation: &'static str, source: PiholeError) -> Self {
        Self::Store { operation, source }
    }

    /// Delay before the next attempt, or `None` if retrying cannot help.
    #[must_use]
    pub fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Store { source, .. } if !source.is_retryable() => None,
            Self::Store { .. } | Self::Kube(_) => {
                Some(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
            }
            Self::Conflict(_) => Some(Duration::from_secs(CONFLICT_REQUEUE_DURATION_SECS)),
            Self::ManagedHosts(_) => Some(Duration::from_secs(MANAGED_HOSTS_REQUEUE_DURATION_SECS)),
        }
    }

    /// Whether the controller should schedule another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.requeue_after().is_some()
    }

    /// Stable label for metrics and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Store { source, .. } => source.reason(),
            Self::Conflict(_) => "KubernetesConflict",
            Self::ManagedHosts(_) => "ManagedHostsUpdateFailed",
            Self::Kube(_) => "KubernetesApiError",
        }
    }
}

impl From<kube::Error> for ReconcileError {
    fn from(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(response) if is_conflict_status(response.code) => {
                Self::Conflict(response.message.clone())
            }
            _ => Self::Kube(err),
        }
    }
}

/// Whether a Kubernetes API status code reports a failed optimistic write.
pub(crate) fn is_conflict_status(code: u16) -> bool {
    code == 409
}
