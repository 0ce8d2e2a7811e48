// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use k8s_openapi::api::networking::v1::Ingress;
use kube::Client;
use pihole_operator::{
    config::Config,
    constants::{STARTUP_HEALTH_TIMEOUT_SECS, TOKIO_WORKER_THREADS},
    context::Context,
    crd::{GRPCRoute, HTTPRoute, TCPRoute, TLSRoute},
    health::{run_health_server, HealthState},
    pihole::{DnsStore, PiholeClient},
    route_controller::run_route_controller,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let config = Config::parse().validate()?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("pihole-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

/// Initialize logging.
///
/// Respects RUST_LOG if set, otherwise uses the configured log level.
/// RUST_LOG_FORMAT=json switches to JSON output.
fn init_logging(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: Config) -> Result<()> {
    init_logging(&config.log_level);

    info!(
        pihole_url = %config.pihole_url,
        default_target_ip = %config.default_target_ip,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        gateway_api = config.enable_gateway_api,
        "Starting Pi-hole operator"
    );

    let pihole: Arc<dyn DnsStore> = Arc::new(PiholeClient::new(config.pihole_client_config())?);
    check_pihole(pihole.as_ref()).await;

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let context = Arc::new(Context {
        client,
        pihole: pihole.clone(),
        default_target_ip: config.default_target_ip.clone(),
        watch_namespace: config.watch_namespace.clone(),
    });

    let health = run_health_server(
        config.health_probe_bind_address,
        HealthState::new(pihole),
    );

    tokio::select! {
        result = health => {
            error!("CRITICAL: health server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("health server exited unexpectedly without error")
        }
        result = run_controllers(context, config.enable_gateway_api) => {
            info!("Controllers stopped, shutting down");
            result
        }
    }
}

/// Startup connectivity check. An unreachable Pi-hole is not fatal.
async fn check_pihole(pihole: &dyn DnsStore) {
    let timeout = Duration::from_secs(STARTUP_HEALTH_TIMEOUT_SECS);
    match tokio::time::timeout(timeout, pihole.healthy()).await {
        Ok(true) => info!("Pi-hole reachable and authenticated"),
        Ok(false) => warn!("Pi-hole health check failed, continuing; reconciles will retry"),
        Err(_) => warn!(
            timeout_secs = STARTUP_HEALTH_TIMEOUT_SECS,
            "Pi-hole health check timed out, continuing; reconciles will retry"
        ),
    }
}

async fn run_controllers(context: Arc<Context>, gateway_api: bool) -> Result<()> {
    if !gateway_api {
        return run_route_controller::<Ingress>(context).await;
    }

    tokio::try_join!(
        run_route_controller::<Ingress>(context.clone()),
        run_route_controller::<HTTPRoute>(context.clone()),
        run_route_controller::<GRPCRoute>(context.clone()),
        run_route_controller::<TLSRoute>(context.clone()),
        run_route_controller::<TCPRoute>(context),
    )?;
    Ok(())
}
