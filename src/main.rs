// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use admission_fleet::{
    cli::{Cli, Command, DeployArgs, FailoverArgs, TargetArgs},
    command::ProcessRunner,
    errors::FleetError,
    metrics::write_metrics_file,
    orchestrator::{
        failover::{write_failover_config, FailoverController},
        Orchestrator,
    },
    providers::Providers,
};
use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("admission-fleet")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Respects RUST_LOG (default info) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

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

    debug!("Logging initialized with file and line number tracking");

    match cli.command {
        Command::Plan(args) => plan(&args),
        Command::Deploy(args) => deploy(&args).await,
        Command::Failover(args) => failover(&args).await,
    }
}

fn plan(args: &TargetArgs) -> Result<()> {
    let regions = args.regions()?;

    println!("{:<16} {:<32} HOSTNAME", "REGION", "CLUSTER");
    for region in &regions {
        println!(
            "{:<16} {:<32} {}",
            region.code, region.cluster_name, region.hostname
        );
    }
    info!(regions = regions.len(), "Plan complete");
    Ok(())
}

async fn deploy(args: &DeployArgs) -> Result<()> {
    let config = args.to_config();
    info!(image = %config.image, "Starting admission-fleet deploy");

    let providers = Providers::aws(Arc::new(ProcessRunner::new()));
    let result = Orchestrator::new(config, providers).run().await;
    flush_metrics(args.metrics_file.as_deref()).await;

    match result {
        Ok(reports) => {
            for report in &reports {
                info!(
                    region = %report.region,
                    cluster = %report.cluster,
                    hostname = %report.hostname,
                    certificate = %report.deployment.certificate_arn,
                    "Region deployed"
                );
            }
            debug!(report = %serde_json::to_string(&reports)?, "Run report");
            Ok(())
        }
        Err(e) => Err(fatal(e)),
    }
}

async fn failover(args: &FailoverArgs) -> Result<()> {
    let request = args.to_request();
    info!(domain = %request.domain, zone = %request.zone_id, "Starting admission-fleet failover");

    let providers = Providers::aws(Arc::new(ProcessRunner::new()));
    let controller = FailoverController::new(providers.dns, providers.resolver);
    let result = match controller.establish_failover(&request).await {
        Ok(config) => write_failover_config(&args.output, &config)
            .await
            .map_err(FleetError::from),
        Err(e) => Err(e),
    };
    flush_metrics(args.metrics_file.as_deref()).await;

    result.map_err(fatal)
}

/// Log the reason code and region of a fatal error before exiting.
fn fatal(e: FleetError) -> anyhow::Error {
    match &e {
        FleetError::Region { region, .. } => {
            error!(region = %region, reason = e.reason(), "CRITICAL: run aborted: {e}");
        }
        _ => error!(reason = e.reason(), "CRITICAL: run aborted: {e}"),
    }
    anyhow::Error::new(e)
}

async fn flush_metrics(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    match write_metrics_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Wrote metrics"),
        Err(e) => warn!(path = %path.display(), "Failed to write metrics file: {e}"),
    }
}
