// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Generic controller for routing objects.
//!
//! One watch loop per kind, all sharing the same reconciler and Pi-hole client.

use crate::context::Context;
use crate::reconcilers::retry::jittered;
use crate::reconcilers::{reconcile_route, ReconcileError};
use crate::routing::RoutingObject;
use anyhow::Result;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Error policy for routing controllers.
///
/// Retryable errors are requeued after their jittered delay; permanent errors
/// wait for the object to change.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<K>(object: Arc<K>, err: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    K: RoutingObject,
{
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();

    match err.requeue_after() {
        Some(delay) => {
            let delay = jittered(delay);
            warn!(
                kind = K::KIND,
                namespace = %namespace,
                name = %name,
                error = %err,
                retry_in_secs = delay.as_secs_f64(),
                "Reconciliation failed, will retry"
            );
            crate::metrics::record_requeue(K::KIND, err.reason());
            Action::requeue(delay)
        }
        None => {
            error!(
                kind = K::KIND,
                namespace = %namespace,
                name = %name,
                error = %err,
                "non-retryable api error"
            );
            Action::await_change()
        }
    }
}

/// Run the controller for one routing object kind until shutdown.
///
/// Watches the configured namespace, or all namespaces when none is set.
///
/// # Errors
///
/// Returns an error if the controller fails to start.
pub async fn run_route_controller<K>(context: Arc<Context>) -> Result<()>
where
    K: RoutingObject,
{
    let api: Api<K> = match context.watch_namespace.as_deref() {
        Some(namespace) => {
            info!(kind = K::KIND, namespace, "Starting controller");
            Api::namespaced(context.client.clone(), namespace)
        }
        None => {
            info!(kind = K::KIND, "Starting controller for all namespaces");
            Api::all(context.client.clone())
        }
    };

    Controller::new(api, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile_wrapper::<K>, error_policy::<K>, context)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(kind = K::KIND, error = %e, "Controller event");
            }
            futures::future::ready(())
        })
        .await;

    info!(kind = K::KIND, "Controller stopped");
    Ok(())
}

/// Reconcile one object and record metrics.
///
/// The object handed in by the watcher only names what to reconcile; the
/// reconciler fetches its own fresh copy.
async fn reconcile_wrapper<K>(object: Arc<K>, ctx: Arc<Context>) -> Result<Action, ReconcileError>
where
    K: RoutingObject,
{
    let start = Instant::now();
    let namespace = object.namespace().unwrap_or_default();
    let name = object.name_any();
    let objects = ctx.objects();

    let result = reconcile_route::<K>(
        &objects,
        ctx.pihole.as_ref(),
        &ctx.default_target_ip,
        &namespace,
        &name,
    )
    .await;

    let duration = start.elapsed();
    match &result {
        Ok(()) => crate::metrics::record_reconciliation_success(K::KIND, duration),
        Err(e) => {
            crate::metrics::record_reconciliation_error(K::KIND, duration);
            crate::metrics::record_error(K::KIND, e.reason());
        }
    }

    result.map(|()| Action::await_change())
}
