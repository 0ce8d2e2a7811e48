// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic reconciler for routing objects.
//!
//! [`reconcile_route`] drives one object from whatever state it is in to the
//! state where Pi-hole binds exactly its declared hostnames to its target
//! address, and the object records those hostnames as managed.
//!
//! ## State Machine
//!
//! | Object state | Action |
//! |---|---|
//! | not found | nothing |
//! | deleting, finalizer present | delete managed hostnames, remove finalizer |
//! | not registered, finalizer present | same cleanup as deleting |
//! | registered | ensure finalizer, sync, prune, persist managed set |
//!
//! The finalizer is always durable before the first Pi-hole mutation, so a
//! later deletion is guaranteed to come back through cleanup.

use super::finalizers::{ensure_finalizer, has_finalizer, remove_finalizer};
use super::hosts::{extract_hosts, is_registered, resolve_target_ip};
use super::managed_hosts::{read_managed_hosts, write_managed_hosts};
use super::object_store::ObjectStore;
use super::ReconcileError;
use crate::constants::{ANNOTATION_MANAGED_HOSTS, ANNOTATION_TARGET_IP, FINALIZER_DNS_CLEANUP};
use crate::metrics::{record_dns_record, OPERATION_CREATED, OPERATION_DELETED, OPERATION_UPDATED};
use crate::pihole::{DnsRecord, DnsStore};
use crate::routing::RoutingObject;
use kube::ResourceExt;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Reconcile the named object against the DNS store.
///
/// Configuration problems on the object (no hostnames, an invalid target-ip
/// annotation) are logged and reported as success, since retrying cannot fix
/// them.
///
/// # Errors
///
/// Returns an error if a Kubernetes or Pi-hole call fails. Use
/// [`ReconcileError::requeue_after`] to decide whether and when to retry.
pub async fn reconcile_route<K: RoutingObject>(
    objects: &dyn ObjectStore<K>,
    dns: &dyn DnsStore,
    default_target_ip: &str,
    namespace: &str,
    name: &str,
) -> Result<(), ReconcileError> {
    let Some(object) = objects.get(namespace, name).await? else {
        debug!(kind = K::KIND, namespace, name, "Object not found, nothing to do");
        return Ok(());
    };

    if object.is_being_deleted() {
        if has_finalizer(&object, FINALIZER_DNS_CLEANUP) {
            info!(kind = K::KIND, namespace, name, "Object deleted, cleaning up DNS records");
            cleanup(objects, dns, &object).await?;
        }
        return Ok(());
    }

    if !is_registered(object.annotations()) {
        if has_finalizer(&object, FINALIZER_DNS_CLEANUP) {
            info!(kind = K::KIND, namespace, name, "Registration removed, cleaning up DNS records");
            cleanup(objects, dns, &object).await?;
        }
        return Ok(());
    }

    let Some(object) = ensure_finalizer(objects, &object, FINALIZER_DNS_CLEANUP).await? else {
        return Ok(());
    };

    let hosts = without_duplicates(extract_hosts(object.annotations(), object.spec_hostnames()));
    if hosts.is_empty() {
        warn!(kind = K::KIND, namespace, name, "skipped (no hosts)");
        return Ok(());
    }

    let Some(target_ip) = resolve_target_ip(object.annotations(), default_target_ip) else {
        warn!(
            kind = K::KIND,
            namespace,
            name,
            annotation = ANNOTATION_TARGET_IP,
            value = object.annotations().get(ANNOTATION_TARGET_IP).map(String::as_str),
            "invalid annotation"
        );
        return Ok(());
    };

    sync_hosts::<K>(dns, &hosts, &target_ip, namespace, name).await?;
    prune_hosts::<K>(dns, &read_managed_hosts(object.annotations()), &hosts, namespace, name)
        .await?;

    write_managed_hosts(objects, namespace, name, &hosts)
        .await
        .map_err(|e| ReconcileError::ManagedHosts(Box::new(e)))?;

    debug!(kind = K::KIND, namespace, name, hosts = hosts.len(), "Reconciled DNS records");
    Ok(())
}

/// Bind every host to `target_ip`, leaving hosts that already match alone.
async fn sync_hosts<K: RoutingObject>(
    dns: &dyn DnsStore,
    hosts: &[String],
    target_ip: &str,
    namespace: &str,
    name: &str,
) -> Result<(), ReconcileError> {
    let records = dns
        .list_records()
        .await
        .map_err(|e| ReconcileError::store("list", e))?;

    // Pi-hole deletes by domain hit the first entry, so the first one is authoritative
    let mut current: HashMap<String, String> = HashMap::new();
    for record in records {
        current.entry(record.domain).or_insert(record.ip);
    }

    for host in hosts {
        let existing = current.get(host).cloned();
        if existing.as_deref() == Some(target_ip) {
            continue;
        }

        let record = DnsRecord::new(host.as_str(), target_ip);
        dns.create_or_replace(&record, existing.as_deref())
            .await
            .map_err(|e| ReconcileError::store("create", e))?;

        match existing {
            Some(previous_ip) => {
                info!(
                    kind = K::KIND,
                    namespace,
                    name,
                    host = %host,
                    ip = target_ip,
                    previous_ip = %previous_ip,
                    "dns record updated"
                );
                record_dns_record(K::KIND, OPERATION_UPDATED);
            }
            None => {
                info!(kind = K::KIND, namespace, name, host = %host, ip = target_ip, "dns record created");
                record_dns_record(K::KIND, OPERATION_CREATED);
            }
        }
        current.insert(host.clone(), target_ip.to_string());
    }

    Ok(())
}

/// Delete previously managed hosts that are no longer desired.
async fn prune_hosts<K: RoutingObject>(
    dns: &dyn DnsStore,
    managed: &[String],
    desired: &[String],
    namespace: &str,
    name: &str,
) -> Result<(), ReconcileError> {
    let desired: HashSet<&str> = desired.iter().map(String::as_str).collect();
    for host in managed.iter().filter(|host| !desired.contains(host.as_str())) {
        delete_host::<K>(dns, host, namespace, name).await?;
    }
    Ok(())
}

/// Delete every managed host, then release the object.
async fn cleanup<K: RoutingObject>(
    objects: &dyn ObjectStore<K>,
    dns: &dyn DnsStore,
    object: &K,
) -> Result<(), ReconcileError> {
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();

    for host in read_managed_hosts(object.annotations()) {
        delete_host::<K>(dns, &host, &namespace, &name).await?;
    }

    remove_finalizer(
        objects,
        object,
        FINALIZER_DNS_CLEANUP,
        &[ANNOTATION_MANAGED_HOSTS],
    )
    .await
}

async fn delete_host<K: RoutingObject>(
    dns: &dyn DnsStore,
    host: &str,
    namespace: &str,
    name: &str,
) -> Result<(), ReconcileError> {
    dns.delete_record(host)
        .await
        .map_err(|e| ReconcileError::store("delete", e))?;
    info!(kind = K::KIND, namespace, name, host, "dns record deleted");
    record_dns_record(K::KIND, OPERATION_DELETED);
    Ok(())
}

fn without_duplicates(hosts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    hosts
        .into_iter()
        .filter(|host| seen.insert(host.clone()))
        .collect()
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod route_tests;
