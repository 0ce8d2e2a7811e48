// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for routing objects.
//!
//! Finalizer changes are JSON merge patches that carry the object's
//! `resourceVersion`, so a concurrent modification surfaces as
//! [`ReconcileError::Conflict`] instead of silently overwriting the list.
//!
//! # Example
//!
//! ```rust,ignore
//! use pihole_operator::constants::FINALIZER_DNS_CLEANUP;
//! use pihole_operator::reconcilers::finalizers::{ensure_finalizer, has_finalizer};
//!
//! if !has_finalizer(&ingress, FINALIZER_DNS_CLEANUP) {
//!     ensure_finalizer(&objects, &ingress, FINALIZER_DNS_CLEANUP).await?;
//! }
//! ```

use super::object_store::ObjectStore;
use super::ReconcileError;
use crate::routing::RoutingObject;
use kube::{Resource, ResourceExt};
use serde_json::{json, Map, Value};
use tracing::info;

/// Whether `finalizer` is present on the resource.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|existing| existing == finalizer))
}

/// Add a finalizer to a resource if not already present.
///
/// Returns the object as stored after the patch, or the unchanged object when
/// the finalizer was already present. Returns `Ok(None)` if the object vanished.
///
/// # Errors
///
/// Returns an error if the patch is rejected, including a version conflict.
pub async fn ensure_finalizer<K: RoutingObject>(
    objects: &dyn ObjectStore<K>,
    resource: &K,
    finalizer: &str,
) -> Result<Option<K>, ReconcileError> {
    if has_finalizer(resource, finalizer) {
        return Ok(Some(resource.clone()));
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(kind = K::KIND, namespace = %namespace, name = %name, finalizer, "Adding finalizer");

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());

    let patch = json!({
        "metadata": {
            "resourceVersion": resource.resource_version(),
            "finalizers": finalizers,
        }
    });
    objects.patch(&namespace, &name, &patch).await
}

/// Remove a finalizer and drop the given annotations in one patch.
///
/// Does nothing if the finalizer is absent.
///
/// # Errors
///
/// Returns an error if the patch is rejected, including a version conflict.
pub async fn remove_finalizer<K: RoutingObject>(
    objects: &dyn ObjectStore<K>,
    resource: &K,
    finalizer: &str,
    drop_annotations: &[&str],
) -> Result<(), ReconcileError> {
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    info!(kind = K::KIND, namespace = %namespace, name = %name, finalizer, "Removing finalizer");

    let remaining: Vec<&String> = resource
        .finalizers()
        .iter()
        .filter(|existing| *existing != finalizer)
        .collect();

    let mut metadata = Map::new();
    metadata.insert(
        "resourceVersion".to_string(),
        json!(resource.resource_version()),
    );
    metadata.insert("finalizers".to_string(), json!(remaining));
    if !drop_annotations.is_empty() {
        let cleared: Map<String, Value> = drop_annotations
            .iter()
            .map(|key| ((*key).to_string(), Value::Null))
            .collect();
        metadata.insert("annotations".to_string(), Value::Object(cleared));
    }

    objects
        .patch(&namespace, &name, &json!({ "metadata": metadata }))
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
