// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read and patch access to routing objects.
//!
//! The engine never talks to `kube::Api` directly; it goes through
//! [`ObjectStore`], so scenarios can run against an in-memory store in tests.

use super::ReconcileError;
use crate::routing::RoutingObject;
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::Value;
use tracing::debug;

/// Namespaced get and JSON merge patch for one object kind.
///
/// Both operations return `Ok(None)` when the object no longer exists.
#[async_trait]
pub trait ObjectStore<K: RoutingObject>: Send + Sync {
    /// Fetch the current version of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails for any reason other than not found.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ReconcileError>;

    /// Apply a JSON merge patch and return the updated object.
    ///
    /// Patches that include `metadata.resourceVersion` fail with
    /// [`ReconcileError::Conflict`] if the object changed since that version.
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is rejected or the API request fails.
    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Option<K>, ReconcileError>;
}

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl KubeObjectStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<K: RoutingObject> ObjectStore<K> for KubeObjectStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ReconcileError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Option<K>, ReconcileError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
        {
            Ok(object) => Ok(Some(object)),
            Err(kube::Error::Api(response)) if response.code == 404 => {
                debug!(kind = K::KIND, namespace, name, "Object vanished before patch");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
