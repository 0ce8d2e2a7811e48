// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired DNS state derived from a routing object's annotations and spec.

use crate::constants::{
    ANNOTATION_HOSTS, ANNOTATION_REGISTER, ANNOTATION_TARGET_IP, REGISTER_ENABLED_VALUE,
};
use crate::validation::{is_valid_ipv4, parse_comma_separated};
use std::collections::BTreeMap;

/// Whether the object opted in to DNS registration.
///
/// Only the exact value `"true"` counts.
#[must_use]
pub fn is_registered(annotations: &BTreeMap<String, String>) -> bool {
    annotations
        .get(ANNOTATION_REGISTER)
        .is_some_and(|value| value == REGISTER_ENABLED_VALUE)
}

/// Hostnames the object wants registered, in order.
///
/// A non-empty hosts annotation replaces `spec_hosts` entirely. An annotation
/// that is empty after trimming counts as absent.
#[must_use]
pub fn extract_hosts(
    annotations: &BTreeMap<String, String>,
    spec_hosts: Vec<String>,
) -> Vec<String> {
    if let Some(value) = annotations.get(ANNOTATION_HOSTS) {
        let hosts = parse_comma_separated(value);
        if !hosts.is_empty() {
            return hosts;
        }
    }

    spec_hosts.into_iter().filter(|host| !host.is_empty()).collect()
}

/// Address the object's hostnames should resolve to.
///
/// Returns `None` when the target-ip annotation is set to something that is not
/// an IPv4 literal. An empty annotation falls back to `default_ip`.
#[must_use]
pub fn resolve_target_ip(
    annotations: &BTreeMap<String, String>,
    default_ip: &str,
) -> Option<String> {
    match annotations.get(ANNOTATION_TARGET_IP).map(String::as_str) {
        None | Some("") => Some(default_ip.to_string()),
        Some(ip) if is_valid_ipv4(ip) => Some(ip.to_string()),
        Some(_) => None,
    }
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod hosts_tests;
