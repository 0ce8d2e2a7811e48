// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Partial Gateway API route types.
//!
//! The operator does not own these CRDs; they are installed with the Gateway API.
//! Only the fields needed to derive DNS names are modelled. Unknown fields are
//! ignored on read and never written back, because the operator only ever
//! sends metadata merge patches.
//!
//! # Route Types
//!
//! - [`HTTPRoute`] - `gateway.networking.k8s.io/v1`
//! - [`GRPCRoute`] - `gateway.networking.k8s.io/v1`
//! - [`TLSRoute`] - `gateway.networking.k8s.io/v1alpha2`
//! - [`TCPRoute`] - `gateway.networking.k8s.io/v1alpha2`, carries no hostnames
//!
//! # Example
//!
//! ```rust,ignore
//! use pihole_operator::crd::{HTTPRoute, HTTPRouteSpec};
//!
//! let route = HTTPRoute::new(
//!     "web",
//!     HTTPRouteSpec {
//!         hostnames: Some(vec!["app.example.com".to_string()]),
//!     },
//! );
//! ```

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Hostnames an `HTTPRoute` answers for.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "HTTPRoute",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct HTTPRouteSpec {
    /// Hostnames matched against the HTTP Host header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,
}

/// Hostnames a `GRPCRoute` answers for.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1",
    kind = "GRPCRoute",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct GRPCRouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,
}

/// SNI hostnames a `TLSRoute` answers for.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1alpha2",
    kind = "TLSRoute",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct TLSRouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<Vec<String>>,
}

/// A `TCPRoute`. The kind has no hostname field; names come from the
/// `pihole.io/hosts` annotation only.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize)]
#[kube(
    group = "gateway.networking.k8s.io",
    version = "v1alpha2",
    kind = "TCPRoute",
    namespaced,
    schema = "disabled"
)]
pub struct TCPRouteSpec {}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
