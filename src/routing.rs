// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Routing object kinds the operator watches.
//!
//! Every watched kind implements [`RoutingObject`], which lets one generic
//! reconciler and one generic controller serve `Ingress` and all Gateway API
//! route kinds. Kinds differ only in where their spec keeps hostnames.

use crate::constants::{
    KIND_GRPC_ROUTE, KIND_HTTP_ROUTE, KIND_INGRESS, KIND_TCP_ROUTE, KIND_TLS_ROUTE,
};
use crate::crd::{GRPCRoute, HTTPRoute, TCPRoute, TLSRoute};
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A namespaced Kubernetes object that routes traffic for DNS names.
pub trait RoutingObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
    /// Kind name used in logs and metric labels (e.g. `Ingress`, `HTTPRoute`)
    const KIND: &'static str;

    /// Hostnames declared in the object's spec, in declaration order.
    ///
    /// Empty entries are skipped. Kinds without a hostname field return nothing.
    fn spec_hostnames(&self) -> Vec<String>;

    /// Whether Kubernetes has started deleting the object.
    fn is_being_deleted(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }
}

impl RoutingObject for Ingress {
    const KIND: &'static str = KIND_INGRESS;

    fn spec_hostnames(&self) -> Vec<String> {
        self.spec
            .as_ref()
            .and_then(|spec| spec.rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .filter_map(|rule| rule.host.as_deref())
                    .filter(|host| !host.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RoutingObject for HTTPRoute {
    const KIND: &'static str = KIND_HTTP_ROUTE;

    fn spec_hostnames(&self) -> Vec<String> {
        non_empty(self.spec.hostnames.as_deref())
    }
}

impl RoutingObject for GRPCRoute {
    const KIND: &'static str = KIND_GRPC_ROUTE;

    fn spec_hostnames(&self) -> Vec<String> {
        non_empty(self.spec.hostnames.as_deref())
    }
}

impl RoutingObject for TLSRoute {
    const KIND: &'static str = KIND_TLS_ROUTE;

    fn spec_hostnames(&self) -> Vec<String> {
        non_empty(self.spec.hostnames.as_deref())
    }
}

impl RoutingObject for TCPRoute {
    const KIND: &'static str = KIND_TCP_ROUTE;

    fn spec_hostnames(&self) -> Vec<String> {
        Vec::new()
    }
}

fn non_empty(hostnames: Option<&[String]>) -> Vec<String> {
    hostnames
        .unwrap_or_default()
        .iter()
        .filter(|host| !host.is_empty())
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod routing_tests;
