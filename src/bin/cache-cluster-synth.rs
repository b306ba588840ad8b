// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Cluster Synth
//!
//! Declares the configured topology and writes its CloudFormation template.
//!
//! Run with: cargo run --bin cache-cluster-synth
//!
//! Environment:
//! - `CACHE_CLUSTER_STACK` - stack name (default `CacheClusterStack`)
//! - `CACHE_CLUSTER_TOPOLOGY` - `baseline`, `minimal` or `final` (default)
//! - `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION` - deployment target
//! - `CACHE_CLUSTER_OUT` - output directory; stdout when unset

use anyhow::{Context, Result};
use cache_cluster_infrastructure::{config::SynthConfig, topology};
use std::io::Write;
use tracing::info;

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the template
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting cache cluster synth");

    let config = SynthConfig::from_env().context("Failed to load configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Stack: {}", config.stack_name);
    info!("  - Topology: {}", config.variant);
    info!(
        "  - Region: {}",
        config.region.as_deref().unwrap_or("environment agnostic")
    );

    let params = config.topology_params()?;
    let declaration = topology::declare(&params)
        .with_context(|| format!("Failed to declare {} topology", config.variant))?;
    let template = declaration
        .template()
        .context("Failed to synthesise template")?;
    let json = template
        .to_json_pretty()
        .context("Failed to serialise template")?;

    match config.output_path() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }
            std::fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("✅ Wrote {} resources to {}", template.resources.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write template to stdout")?;
            info!("✅ Wrote {} resources to stdout", template.resources.len());
        }
    }

    Ok(())
}
