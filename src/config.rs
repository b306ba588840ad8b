// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synth configuration
//!
//! Read from environment variables. Account and region use the provisioning
//! toolchain's own `CDK_DEFAULT_ACCOUNT` / `CDK_DEFAULT_REGION`.

use std::path::PathBuf;

use crate::errors::InfrastructureResult;
use crate::stack::Environment;
use crate::topology::{TopologyParams, TopologyVariant, DEFAULT_STACK_NAME};

pub const STACK_VAR: &str = "CACHE_CLUSTER_STACK";
pub const TOPOLOGY_VAR: &str = "CACHE_CLUSTER_TOPOLOGY";
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";
pub const OUT_DIR_VAR: &str = "CACHE_CLUSTER_OUT";

/// Configuration for the synth binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthConfig {
    /// Stack name
    pub stack_name: String,
    /// Variant to declare
    pub variant: TopologyVariant,
    /// Deployment account, 12 digits
    pub account: Option<String>,
    /// Deployment region; `None` keeps the stack environment agnostic
    pub region: Option<String>,
    /// Directory for `<stack>.template.json`; `None` writes to stdout
    pub out_dir: Option<PathBuf>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            variant: TopologyVariant::default(),
            account: None,
            region: None,
            out_dir: None,
        }
    }
}

impl SynthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> InfrastructureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> InfrastructureResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let stack_name = get(STACK_VAR).unwrap_or_else(|| DEFAULT_STACK_NAME.to_string());
        let variant = match get(TOPOLOGY_VAR) {
            Some(value) => value.parse()?,
            None => TopologyVariant::default(),
        };

        let config = Self {
            stack_name,
            variant,
            account: get(ACCOUNT_VAR),
            region: get(REGION_VAR),
            out_dir: get(OUT_DIR_VAR).map(PathBuf::from),
        };
        // Fail on a bad account or region here rather than at declaration
        config.environment()?;
        Ok(config)
    }

    pub fn environment(&self) -> InfrastructureResult<Environment> {
        Environment::new(self.account.clone(), self.region.clone())
    }

    pub fn topology_params(&self) -> InfrastructureResult<TopologyParams> {
        Ok(TopologyParams::new(self.stack_name.clone(), self.variant)
            .with_environment(self.environment()?))
    }

    /// Output file, when writing to a directory
    pub fn output_path(&self) -> Option<PathBuf> {
        self.out_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.template.json", self.stack_name)))
    }
}
