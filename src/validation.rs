// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Small parsing helpers shared by the configuration layer and the reconcilers.

use std::net::Ipv4Addr;

/// Returns `true` when `value` is a dotted-decimal IPv4 literal.
///
/// IPv6 literals, including IPv4-mapped forms such as `::ffff:10.0.0.1`,
/// are rejected.
#[must_use]
pub fn is_valid_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

/// Split a comma-separated list, trimming whitespace and dropping empty entries.
///
/// Order is preserved and duplicates are kept.
#[must_use]
pub fn parse_comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
