// Copyright (c) 2025 - Cowboy AI, Inc.
//! Compute and Cache Sizing Value Objects
//!
//! Instance classes and sizes for the web fleet, the machine image it boots
//! from, the fleet capacity bounds, and the ElastiCache node/engine settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Compute sizing validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("Minimum capacity {min} exceeds maximum capacity {max}")]
    MinAboveMax { min: u32, max: u32 },

    #[error("Maximum capacity must be at least 1")]
    ZeroMaximum,

    #[error("Invalid cache node type: {0}")]
    InvalidNodeType(String),

    #[error("Cache cluster needs at least one node")]
    NoCacheNodes,

    #[error("Cross-AZ placement needs at least two nodes, got {0}")]
    CrossAzNeedsTwoNodes(u32),

    #[error("Engine version cannot be empty")]
    EmptyEngineVersion,
}

/// Instance family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceClass {
    /// Burstable, second generation (`t2`)
    Burstable2,
    /// Burstable, third generation (`t3`)
    Burstable3,
    /// Burstable, fourth generation on Graviton (`t4g`)
    Burstable4Graviton,
    /// General purpose, fifth generation (`m5`)
    Standard5,
    /// Memory optimised, fifth generation (`r5`)
    MemoryOptimised5,
}

impl InstanceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Burstable2 => "t2",
            Self::Burstable3 => "t3",
            Self::Burstable4Graviton => "t4g",
            Self::Standard5 => "m5",
            Self::MemoryOptimised5 => "r5",
        }
    }
}

/// Instance size within a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceSize {
    Nano,
    Micro,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl InstanceSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nano => "nano",
            Self::Micro => "micro",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
        }
    }
}

/// Instance type, e.g. `t2.micro`
///
/// # Examples
///
/// ```rust
/// use cache_cluster_infrastructure::domain::{InstanceClass, InstanceSize, InstanceType};
///
/// let t = InstanceType::of(InstanceClass::Burstable2, InstanceSize::Micro);
/// assert_eq!(t.to_string(), "t2.micro");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceType {
    class: InstanceClass,
    size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }

    pub fn class(&self) -> InstanceClass {
        self.class
    }

    pub fn size(&self) -> InstanceSize {
        self.size
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class.as_str(), self.size.as_str())
    }
}

/// Machine image the fleet boots from
///
/// Images resolve through public SSM parameters at deploy time, so the
/// declaration only names the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MachineImage {
    /// Latest Amazon Linux 2 HVM x86_64 gp2 image
    AmazonLinux2,
    /// Arbitrary SSM parameter holding an image id
    SsmParameter(String),
}

impl MachineImage {
    /// SSM parameter name the image id is read from
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::AmazonLinux2 => "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2",
            Self::SsmParameter(name) => name,
        }
    }

    /// Operating system family
    pub fn os_type(&self) -> &'static str {
        "linux"
    }
}

/// Fleet capacity bounds
///
/// # Invariants
/// - `min <= max`
/// - `max >= 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capacity {
    min: u32,
    max: u32,
}

impl Capacity {
    pub fn new(min: u32, max: u32) -> Result<Self, ComputeError> {
        if max == 0 {
            return Err(ComputeError::ZeroMaximum);
        }
        if min > max {
            return Err(ComputeError::MinAboveMax { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            min: 1,
            max: 1,
        }
    }
}

/// ElastiCache node type, e.g. `cache.t4g.micro`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheNodeType(String);

impl CacheNodeType {
    pub fn new(node_type: impl Into<String>) -> Result<Self, ComputeError> {
        let node_type = node_type.into();
        let valid = node_type
            .strip_prefix("cache.")
            .map(|rest| {
                let parts: Vec<&str> = rest.split('.').collect();
                parts.len() == 2
                    && parts
                        .iter()
                        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
            })
            .unwrap_or(false);

        if !valid {
            return Err(ComputeError::InvalidNodeType(node_type));
        }
        Ok(Self(node_type))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cache engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEngine {
    Memcached,
    Redis,
}

impl CacheEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memcached => "memcached",
            Self::Redis => "redis",
        }
    }
}

/// Node placement across availability zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AzMode {
    SingleAz,
    CrossAz,
}

impl AzMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleAz => "single-az",
            Self::CrossAz => "cross-az",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_type_rendering() {
        let t = InstanceType::of(InstanceClass::Burstable2, InstanceSize::Micro);
        assert_eq!(t.to_string(), "t2.micro");
        let g = InstanceType::of(InstanceClass::Burstable4Graviton, InstanceSize::Small);
        assert_eq!(g.to_string(), "t4g.small");
    }

    #[test]
    fn test_capacity_bounds() {
        let c = Capacity::new(2, 4).unwrap();
        assert_eq!((c.min(), c.max()), (2, 4));

        assert_eq!(
            Capacity::new(5, 4),
            Err(ComputeError::MinAboveMax { min: 5, max: 4 })
        );
        assert_eq!(Capacity::new(0, 0), Err(ComputeError::ZeroMaximum));
        assert!(Capacity::new(3, 3).is_ok());
    }

    #[test]
    fn test_cache_node_type() {
        assert!(CacheNodeType::new("cache.t4g.micro").is_ok());
        assert!(CacheNodeType::new("cache.r6g.large").is_ok());
        assert!(CacheNodeType::new("t4g.micro").is_err());
        assert!(CacheNodeType::new("cache.t4g").is_err());
        assert!(CacheNodeType::new("cache..micro").is_err());
    }

    #[test]
    fn test_machine_image_parameter() {
        assert_eq!(
            MachineImage::AmazonLinux2.parameter_name(),
            "/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-x86_64-gp2"
        );
        let custom = MachineImage::SsmParameter("/my/ami".to_string());
        assert_eq!(custom.parameter_name(), "/my/ami");
    }

    #[test]
    fn test_engine_and_az_mode() {
        assert_eq!(CacheEngine::Memcached.as_str(), "memcached");
        assert_eq!(AzMode::CrossAz.as_str(), "cross-az");
    }
}
