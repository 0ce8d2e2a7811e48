// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers.
//!
//! Every controller receives an `Arc<Context>` holding:
//! - the Kubernetes client
//! - the Pi-hole client, whose session cache is shared by every reconcile
//! - operator-wide defaults from the configuration

use crate::pihole::DnsStore;
use crate::reconcilers::KubeObjectStore;
use kube::Client;
use std::sync::Arc;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Pi-hole local DNS store
    pub pihole: Arc<dyn DnsStore>,

    /// Address used when an object has no target-ip annotation
    pub default_target_ip: String,

    /// Namespace to watch, or `None` for all namespaces
    pub watch_namespace: Option<String>,
}

impl Context {
    /// Object store over the Kubernetes API for this context's client.
    #[must_use]
    pub fn objects(&self) -> KubeObjectStore {
        KubeObjectStore::new(self.client.clone())
    }
}
