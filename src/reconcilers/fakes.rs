// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory object store and DNS store used by the reconciler tests.

use super::object_store::ObjectStore;
use super::ReconcileError;
use crate::dns_errors::PiholeError;
use crate::pihole::{DnsRecord, DnsStore};
use crate::routing::RoutingObject;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Mutex;

/// Object store that applies JSON merge patches to stored JSON documents.
///
/// Mirrors the API server behaviour the engine relies on: a `resourceVersion`
/// in the patch must match the stored one, every write bumps the version, and
/// an object marked for deletion disappears once its finalizers are gone.
pub struct FakeObjectStore<K> {
    objects: Mutex<HashMap<(String, String), Value>>,
    next_version: Mutex<u64>,
    conflicts_pending: Mutex<usize>,
    patches: Mutex<Vec<Value>>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: RoutingObject> FakeObjectStore<K> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            next_version: Mutex::new(1),
            conflicts_pending: Mutex::new(0),
            patches: Mutex::new(Vec::new()),
            _kind: PhantomData,
        }
    }

    fn bump_version(&self) -> String {
        let mut next = self.next_version.lock().unwrap();
        let version = next.to_string();
        *next += 1;
        version
    }

    /// Store `object`, replacing any previous version.
    pub fn insert(&self, object: &K) {
        let mut value = serde_json::to_value(object).unwrap();
        let key = key_of(&value);
        value["metadata"]["resourceVersion"] = Value::String(self.bump_version());
        self.objects.lock().unwrap().insert(key, value);
    }

    /// Current stored version of an object.
    pub fn current(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// Modify an object the way another actor would, bumping its version.
    pub fn edit(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut K)) {
        let mut object = self.current(namespace, name).expect("object to edit");
        edit(&mut object);
        self.insert(&object);
    }

    /// Make the next `count` patches fail with a version conflict.
    pub fn fail_next_patches_with_conflict(&self, count: usize) {
        *self.conflicts_pending.lock().unwrap() = count;
    }

    /// Every patch received so far, in order.
    pub fn patches(&self) -> Vec<Value> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl<K: RoutingObject> ObjectStore<K> for FakeObjectStore<K> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ReconcileError> {
        Ok(self.current(namespace, name))
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: &Value,
    ) -> Result<Option<K>, ReconcileError> {
        self.patches.lock().unwrap().push(patch.clone());

        {
            let mut pending = self.conflicts_pending.lock().unwrap();
            if *pending > 0 {
                *pending -= 1;
                return Err(ReconcileError::Conflict("injected conflict".to_string()));
            }
        }

        let key = (namespace.to_string(), name.to_string());
        let mut objects = self.objects.lock().unwrap();
        let Some(stored) = objects.get_mut(&key) else {
            return Ok(None);
        };

        if let Some(expected) = patch["metadata"]["resourceVersion"].as_str() {
            if stored["metadata"]["resourceVersion"].as_str() != Some(expected) {
                return Err(ReconcileError::Conflict(format!(
                    "resourceVersion {expected} is stale"
                )));
            }
        }

        merge_patch(stored, patch);
        stored["metadata"]["resourceVersion"] = Value::String(self.bump_version());
        let updated = stored.clone();

        let deleting = !updated["metadata"]["deletionTimestamp"].is_null();
        let finalizers_left = updated["metadata"]["finalizers"]
            .as_array()
            .is_some_and(|f| !f.is_empty());
        if deleting && !finalizers_left {
            objects.remove(&key);
        }

        Ok(Some(serde_json::from_value(updated).unwrap()))
    }
}

fn key_of(value: &Value) -> (String, String) {
    let metadata = &value["metadata"];
    (
        metadata["namespace"].as_str().unwrap_or_default().to_string(),
        metadata["name"].as_str().unwrap_or_default().to_string(),
    )
}

/// RFC 7386 JSON merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(
                    target_fields.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// DNS store that keeps records in memory and logs every call.
#[derive(Default)]
pub struct FakeDns {
    records: Mutex<Vec<DnsRecord>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, PiholeError>>,
}

impl FakeDns {
    pub fn with_records(records: &[(&str, &str)]) -> Self {
        let dns = Self::default();
        *dns.records.lock().unwrap() = records
            .iter()
            .map(|(domain, ip)| DnsRecord::new(*domain, *ip))
            .collect();
        dns
    }

    /// Fail every `operation` (`list`, `create` or `delete`) with `error`.
    pub fn fail(&self, operation: &'static str, error: PiholeError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Every call in order, e.g. `list`, `create app.local 10.0.0.1`, `delete app.local`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that change the store.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call != "list")
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn call(&self, operation: &'static str, entry: String) -> Result<(), PiholeError> {
        self.calls.lock().unwrap().push(entry);
        match self.failures.lock().unwrap().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DnsStore for FakeDns {
    async fn list_records(&self) -> Result<Vec<DnsRecord>, PiholeError> {
        self.call("list", "list".to_string())?;
        Ok(self.records())
    }

    async fn create_record(&self, record: &DnsRecord) -> Result<(), PiholeError> {
        self.call("create", format!("create {} {}", record.domain, record.ip))?;
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn delete_record(&self, domain: &str) -> Result<(), PiholeError> {
        self.call("delete", format!("delete {domain}"))?;
        let mut records = self.records.lock().unwrap();
        if let Some(position) = records.iter().position(|r| r.domain == domain) {
            records.remove(position);
        }
        Ok(())
    }

    async fn healthy(&self) -> bool {
        !self.failures.lock().unwrap().contains_key("list")
    }
}
