// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The managed hosts annotation: hostnames this operator created for an object.
//!
//! The set lives on the object itself as a comma-joined annotation, so no
//! external datastore is needed to know what to prune or clean up.

use super::object_store::ObjectStore;
use super::ReconcileError;
use crate::constants::ANNOTATION_MANAGED_HOSTS;
use crate::routing::RoutingObject;
use crate::validation::parse_comma_separated;
use kube::ResourceExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Hostnames recorded as managed. Missing or empty annotations yield an empty list.
#[must_use]
pub fn read_managed_hosts(annotations: &BTreeMap<String, String>) -> Vec<String> {
    annotations
        .get(ANNOTATION_MANAGED_HOSTS)
        .map(|value| parse_comma_separated(value))
        .unwrap_or_default()
}

/// Record `hosts` as the managed set of the named object.
///
/// The object is fetched again right before the write and the patch is pinned
/// to that version. Other annotations are left untouched. An empty set removes
/// the annotation. Nothing is written if the stored value already matches.
///
/// # Errors
///
/// Returns an error if the fetch or patch fails, including a version conflict.
pub async fn write_managed_hosts<K: RoutingObject>(
    objects: &dyn ObjectStore<K>,
    namespace: &str,
    name: &str,
    hosts: &[String],
) -> Result<(), ReconcileError> {
    let Some(latest) = objects.get(namespace, name).await? else {
        debug!(kind = K::KIND, namespace, name, "Object vanished before managed hosts write");
        return Ok(());
    };

    let desired = (!hosts.is_empty()).then(|| hosts.join(","));
    let current = latest.annotations().get(ANNOTATION_MANAGED_HOSTS);
    if current == desired.as_ref() {
        return Ok(());
    }

    let value = desired.map_or(Value::Null, Value::String);
    let patch = json!({
        "metadata": {
            "resourceVersion": latest.resource_version(),
            "annotations": { ANNOTATION_MANAGED_HOSTS: value },
        }
    });
    objects.patch(namespace, name, &patch).await?;
    Ok(())
}

#[cfg(test)]
#[path = "managed_hosts_tests.rs"]
mod managed_hosts_tests;
