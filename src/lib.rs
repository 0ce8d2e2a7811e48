// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Pi-hole Operator - Kubernetes routes to Pi-hole local DNS
//!
//! A Kubernetes operator that keeps Pi-hole local DNS records in sync with the
//! hostnames declared on `Ingress` objects and Gateway API routes.
//!
//! ## Overview
//!
//! Objects opt in with the `pihole.io/register: "true"` annotation. For each
//! opted-in object the operator binds every declared hostname to a target
//! IPv4 address in Pi-hole, remembers what it created in the
//! `pihole.io/managed-hosts` annotation, and removes those records again when
//! the object is deleted or opts out.
//!
//! ## Modules
//!
//! - [`pihole`] - Pi-hole v6 API client and the [`pihole::DnsStore`] trait
//! - [`reconcilers`] - The generic reconcile engine
//! - [`routing`] - Per-kind hostname extraction
//! - [`crd`] - Partial Gateway API route types
//! - [`route_controller`] - Watch loops feeding the engine
//! - [`config`] - Flags and environment variables
//! - [`health`] - Probe and metrics HTTP server
//!
//! ## Annotations
//!
//! | Annotation | Meaning |
//! |---|---|
//! | `pihole.io/register` | `"true"` enables sync |
//! | `pihole.io/target-ip` | Per-object IPv4 target address |
//! | `pihole.io/hosts` | Comma-separated hostnames replacing the spec's |
//! | `pihole.io/managed-hosts` | Written by the operator |

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dns_errors;
pub mod health;
pub mod metrics;
pub mod pihole;
pub mod reconcilers;
pub mod route_controller;
pub mod routing;
pub mod validation;
