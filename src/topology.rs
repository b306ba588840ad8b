// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Declaration
//!
//! One pure function from parameters to a declared stack, parameterised over
//! three variants of the same web-fleet-plus-cache layout:
//!
//! - **Baseline**: one network, one security group shared by the fleet and a
//!   single cache cluster
//! - **Minimal**: network and fleet only
//! - **Final**: `/24` subnet tiers, separate instance and cache security
//!   groups opened to each other on the cache port, and four cache clusters
//!   spread over two availability zones each
//!
//! # Examples
//!
//! ```rust
//! use cache_cluster_infrastructure::domain::ResourceType;
//! use cache_cluster_infrastructure::topology::{declare, TopologyParams, TopologyVariant};
//!
//! let params = TopologyParams::new("CacheClusterStack", TopologyVariant::Final);
//! let declaration = declare(&params).unwrap();
//! assert_eq!(declaration.graph().count_of_type(ResourceType::CacheCluster), 4);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::constructs::{
    ApplicationLoadBalancer, ApplicationLoadBalancerProps, AutoScalingGroup,
    AutoScalingGroupProps, CacheCluster, CacheClusterProps, CacheSubnetGroup,
    CacheSubnetGroupProps, SecurityGroup, SecurityGroupProps, SubnetSelection, Vpc, VpcProps,
};
use crate::domain::invariants::{validate_symmetric_ingress, validate_topology};
use crate::domain::{
    AzMode, CacheEngine, CacheNodeType, Capacity, ConstructPath, InstanceClass, InstanceSize,
    InstanceType, LogicalId, MachineImage, Port,
};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::graph::ResourceGraph;
use crate::stack::{Environment, Stack};
use crate::template::{Template, TemplateOutput};
use crate::user_data;

/// Public HTTP port of the listener and the fleet
pub const HTTP_PORT: u16 = 80;

/// Cache protocol port, open in both directions between the tiers
pub const CACHE_PORT: u16 = 43334;

pub const DEFAULT_STACK_NAME: &str = "CacheClusterStack";

const INSTANCE_GROUP: &str = "ec2-sample-secgroup";
const CACHE_GROUP: &str = "cache-sample-secgroup";
const SUBNET_GROUP_ID: &str = "MySubnetGroup";
const SUBNET_GROUP_NAME: &str = "sample-subnet-group";
const SUBNET_GROUP_DESCRIPTION: &str = "My rds Sub";
const CACHE_NODE_TYPE: &str = "cache.t4g.micro";
const CACHE_ENGINE_VERSION: &str = "1.6.6";
const FINAL_CLUSTER_COUNT: u32 = 4;
const FINAL_SUBNET_MASK: u8 = 24;

/// Which topology to declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyVariant {
    Baseline,
    Minimal,
    #[default]
    Final,
}

impl TopologyVariant {
    pub const ALL: [TopologyVariant; 3] = [Self::Baseline, Self::Minimal, Self::Final];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Minimal => "minimal",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for TopologyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TopologyVariant {
    type Err = InfrastructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                InfrastructureError::Configuration(format!(
                    "Unknown topology {s:?}; expected baseline, minimal or final"
                ))
            })
    }
}

/// Inputs of a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyParams {
    pub stack_name: String,
    pub environment: Environment,
    pub variant: TopologyVariant,
}

impl TopologyParams {
    pub fn new(stack_name: impl Into<String>, variant: TopologyVariant) -> Self {
        Self {
            stack_name: stack_name.into(),
            environment: Environment::agnostic(),
            variant,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

impl Default for TopologyParams {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_NAME, TopologyVariant::default())
    }
}

/// A declared topology
#[derive(Debug, Clone)]
pub struct TopologyDeclaration {
    variant: TopologyVariant,
    stack: Stack,
    instance_security_group: LogicalId,
    cache_security_group: Option<LogicalId>,
}

impl TopologyDeclaration {
    pub fn variant(&self) -> TopologyVariant {
        self.variant
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Resource nodes and depends-on edges
    pub fn graph(&self) -> &ResourceGraph {
        self.stack.graph()
    }

    /// Security group of the web fleet
    pub fn instance_security_group(&self) -> &LogicalId {
        &self.instance_security_group
    }

    /// Security group of the cache clusters; `None` without a cache tier
    pub fn cache_security_group(&self) -> Option<&LogicalId> {
        self.cache_security_group.as_ref()
    }

    pub fn template(&self) -> InfrastructureResult<Template> {
        self.stack.synth()
    }
}

/// Declare the topology described by `params`
pub fn declare(params: &TopologyParams) -> InfrastructureResult<TopologyDeclaration> {
    let mut stack = Stack::new(params.stack_name.as_str(), params.environment.clone())?;
    stack.set_description(format!(
        "Web fleet behind a load balancer with an ElastiCache tier ({} topology)",
        params.variant
    ));
    let root = stack.root().clone();

    let (instance_security_group, cache_security_group) = match params.variant {
        TopologyVariant::Baseline => declare_baseline(&mut stack, &root)?,
        TopologyVariant::Minimal => declare_minimal(&mut stack, &root)?,
        TopologyVariant::Final => declare_final(&mut stack, &root)?,
    };

    validate_topology(stack.graph())?;
    if let Some(cache) = &cache_security_group {
        validate_symmetric_ingress(stack.graph(), &instance_security_group, cache, CACHE_PORT)?;
    }

    info!(
        "Declared {} topology for stack {}: {} resources, {} edges",
        params.variant,
        stack.name(),
        stack.graph().len(),
        stack.graph().edges().count()
    );

    Ok(TopologyDeclaration {
        variant: params.variant,
        stack,
        instance_security_group,
        cache_security_group,
    })
}

/// Declare and synthesise in one step
pub fn synthesize(params: &TopologyParams) -> InfrastructureResult<Template> {
    declare(params)?.template()
}

type TierGroups = (LogicalId, Option<LogicalId>);

fn declare_baseline(stack: &mut Stack, root: &ConstructPath) -> InfrastructureResult<TierGroups> {
    let vpc = Vpc::new(stack, root, "VPC", VpcProps::with_tier_mask(None)?)?;
    let shared = SecurityGroup::new(
        stack,
        root,
        INSTANCE_GROUP,
        &vpc,
        SecurityGroupProps::named(INSTANCE_GROUP),
    )?;
    let subnet_group = sample_subnet_group(stack, root, &vpc)?;
    let fleet = web_fleet(stack, root, &vpc, Some(shared.clone()))?;
    public_entry(stack, root, &vpc, &fleet, None)?;

    CacheCluster::new(
        stack,
        root,
        "ElastiCacheGroup",
        &subnet_group,
        memcached("SampleCluster", 4, Vec::new(), &shared)?,
    )?;

    let id = shared.logical_id().clone();
    Ok((id.clone(), Some(id)))
}

fn declare_minimal(stack: &mut Stack, root: &ConstructPath) -> InfrastructureResult<TierGroups> {
    let vpc = Vpc::new(stack, root, "VPC", VpcProps::with_tier_mask(None)?)?;
    let fleet = web_fleet(stack, root, &vpc, None)?;
    Ok((fleet.security_group().logical_id().clone(), None))
}

fn declare_final(stack: &mut Stack, root: &ConstructPath) -> InfrastructureResult<TierGroups> {
    let vpc = Vpc::new(stack, root, "VPC", VpcProps::with_tier_mask(Some(FINAL_SUBNET_MASK))?)?;
    let instances = SecurityGroup::new(
        stack,
        root,
        INSTANCE_GROUP,
        &vpc,
        SecurityGroupProps::named(INSTANCE_GROUP),
    )?;
    let cache = SecurityGroup::new(
        stack,
        root,
        CACHE_GROUP,
        &vpc,
        SecurityGroupProps::named(CACHE_GROUP),
    )?;
    cache.allow_from(stack, &instances, Port::tcp(CACHE_PORT), None)?;
    instances.allow_from(stack, &cache, Port::tcp(CACHE_PORT), None)?;

    let subnet_group = sample_subnet_group(stack, root, &vpc)?;
    let fleet = web_fleet(stack, root, &vpc, Some(instances.clone()))?;
    public_entry(stack, root, &vpc, &fleet, Some(instances.clone()))?;

    let zones: Vec<_> = vpc.availability_zones().iter().take(2).cloned().collect();
    for n in 1..=FINAL_CLUSTER_COUNT {
        CacheCluster::new(
            stack,
            root,
            &format!("ElastiCacheGroup{n}"),
            &subnet_group,
            memcached(&format!("SampleCluster{n}"), 2, zones.clone(), &cache)?,
        )?;
    }

    Ok((
        instances.logical_id().clone(),
        Some(cache.logical_id().clone()),
    ))
}

fn sample_subnet_group(
    stack: &mut Stack,
    root: &ConstructPath,
    vpc: &Vpc,
) -> InfrastructureResult<CacheSubnetGroup> {
    let subnet_ids = vpc
        .select_subnets(SubnetSelection::Private)?
        .iter()
        .map(|s| s.subnet_id())
        .collect();
    CacheSubnetGroup::new(
        stack,
        root,
        SUBNET_GROUP_ID,
        CacheSubnetGroupProps {
            name: SUBNET_GROUP_NAME.to_string(),
            description: SUBNET_GROUP_DESCRIPTION.to_string(),
            subnet_ids,
        },
    )
}

fn web_fleet(
    stack: &mut Stack,
    root: &ConstructPath,
    vpc: &Vpc,
    security_group: Option<SecurityGroup>,
) -> InfrastructureResult<AutoScalingGroup> {
    AutoScalingGroup::new(
        stack,
        root,
        "ASG",
        vpc,
        AutoScalingGroupProps {
            instance_type: InstanceType::of(InstanceClass::Burstable2, InstanceSize::Micro),
            machine_image: MachineImage::AmazonLinux2,
            user_data: user_data::web_server()?,
            capacity: Capacity::new(2, 4)?,
            security_group,
            subnets: SubnetSelection::Private,
        },
    )
}

fn public_entry(
    stack: &mut Stack,
    root: &ConstructPath,
    vpc: &Vpc,
    fleet: &AutoScalingGroup,
    security_group: Option<SecurityGroup>,
) -> InfrastructureResult<()> {
    let lb = ApplicationLoadBalancer::new(
        stack,
        root,
        "lb",
        vpc,
        ApplicationLoadBalancerProps {
            internet_facing: true,
            security_group,
        },
    )?;
    let listener = lb.add_listener(stack, "Listener", HTTP_PORT, true)?;
    listener.add_targets(stack, "ApplicationCluster", HTTP_PORT, &[fleet])?;

    stack.add_output(
        "LoadBalancerDnsName",
        TemplateOutput {
            value: lb.handle().attribute("DNSName"),
            description: Some("Public DNS name of the load balancer".to_string()),
        },
    )
}

fn memcached(
    name: &str,
    nodes: u32,
    preferred_availability_zones: Vec<serde_json::Value>,
    security_group: &SecurityGroup,
) -> InfrastructureResult<CacheClusterProps> {
    Ok(CacheClusterProps {
        cluster_name: name.to_string(),
        node_type: CacheNodeType::new(CACHE_NODE_TYPE)?,
        engine: CacheEngine::Memcached,
        engine_version: CACHE_ENGINE_VERSION.to_string(),
        num_cache_nodes: nodes,
        az_mode: AzMode::CrossAz,
        port: CACHE_PORT,
        preferred_availability_zones,
        security_group_ids: vec![security_group.group_id()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceType;

    #[test]
    fn test_variant_parsing() {
        assert_eq!("final".parse::<TopologyVariant>().unwrap(), TopologyVariant::Final);
        assert_eq!(" Baseline ".parse::<TopologyVariant>().unwrap(), TopologyVariant::Baseline);
        assert!("huge".parse::<TopologyVariant>().is_err());
        assert_eq!(TopologyVariant::Minimal.to_string(), "minimal");
    }

    #[test]
    fn test_baseline_shares_one_group() {
        let declaration = declare(&TopologyParams::new("Base", TopologyVariant::Baseline)).unwrap();
        assert_eq!(
            Some(declaration.instance_security_group()),
            declaration.cache_security_group()
        );
        assert_eq!(declaration.graph().count_of_type(ResourceType::CacheCluster), 1);
    }

    #[test]
    fn test_minimal_has_no_cache_tier() {
        let declaration = declare(&TopologyParams::new("Min", TopologyVariant::Minimal)).unwrap();
        assert!(declaration.cache_security_group().is_none());
        assert_eq!(declaration.graph().count_of_type(ResourceType::LoadBalancer), 0);
    }

    #[test]
    fn test_final_clusters_use_first_two_zones() {
        let params = TopologyParams::new("Final", TopologyVariant::Final)
            .with_environment(Environment::new(None, Some("us-west-2".into())).unwrap());
        let declaration = declare(&params).unwrap();
        for cluster in declaration.graph().nodes_of_type(ResourceType::CacheCluster) {
            assert_eq!(
                cluster.properties["PreferredAvailabilityZones"],
                serde_json::json!(["us-west-2a", "us-west-2b"])
            );
        }
    }

    #[test]
    fn test_invalid_stack_name() {
        assert!(declare(&TopologyParams::new("", TopologyVariant::Final)).is_err());
    }
}
