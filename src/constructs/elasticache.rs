// Copyright (c) 2025 - Cowboy AI, Inc.
//! ElastiCache subnet group and cache clusters
//!
//! A cluster names its subnet group by the literal group name rather than by
//! reference, so [`CacheCluster::new`] always records an explicit dependency
//! on the group.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::{AzMode, CacheEngine, CacheNodeType, ComputeError, ConstructPath, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::stack::{ResourceHandle, Stack};

#[derive(Debug, Clone)]
pub struct CacheSubnetGroupProps {
    pub name: String,
    pub description: String,
    /// Subnet id values, usually `Ref`s to private subnets
    pub subnet_ids: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct CacheSubnetGroup {
    handle: ResourceHandle,
    name: String,
}

impl CacheSubnetGroup {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        props: CacheSubnetGroupProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;
        if props.subnet_ids.is_empty() {
            return Err(InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: "a cache subnet group needs at least one subnet".to_string(),
            });
        }
        let handle = stack.add_resource(
            &path,
            ResourceType::CacheSubnetGroup,
            json!({
                "CacheSubnetGroupName": props.name,
                "Description": props.description,
                "SubnetIds": props.subnet_ids,
            }),
        )?;
        Ok(Self {
            handle,
            name: props.name,
        })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Literal group name clusters are placed by
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct CacheClusterProps {
    pub cluster_name: String,
    pub node_type: CacheNodeType,
    pub engine: CacheEngine,
    pub engine_version: String,
    pub num_cache_nodes: u32,
    pub az_mode: AzMode,
    pub port: u16,
    /// One zone per node, or empty to let the engine choose
    pub preferred_availability_zones: Vec<Value>,
    pub security_group_ids: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct CacheCluster {
    handle: ResourceHandle,
    name: String,
}

impl CacheCluster {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        subnet_group: &CacheSubnetGroup,
        props: CacheClusterProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;
        validate(&path, &props)?;

        let mut properties = Map::new();
        properties.insert("AZMode".to_string(), json!(props.az_mode.as_str()));
        properties.insert("CacheNodeType".to_string(), json!(props.node_type));
        properties.insert("CacheSubnetGroupName".to_string(), json!(subnet_group.name()));
        properties.insert("ClusterName".to_string(), json!(props.cluster_name));
        properties.insert("Engine".to_string(), json!(props.engine.as_str()));
        properties.insert("EngineVersion".to_string(), json!(props.engine_version));
        properties.insert("NumCacheNodes".to_string(), json!(props.num_cache_nodes));
        properties.insert("Port".to_string(), json!(props.port));
        if !props.preferred_availability_zones.is_empty() {
            properties.insert(
                "PreferredAvailabilityZones".to_string(),
                Value::Array(props.preferred_availability_zones),
            );
        }
        properties.insert(
            "VpcSecurityGroupIds".to_string(),
            Value::Array(props.security_group_ids),
        );

        let handle = stack.add_resource(&path, ResourceType::CacheCluster, Value::Object(properties))?;
        stack.add_dependency(&handle, subnet_group.handle())?;

        debug!(
            "Declared cache cluster {} ({} x {} {})",
            props.cluster_name,
            props.num_cache_nodes,
            props.node_type,
            props.engine.as_str()
        );
        Ok(Self {
            handle,
            name: props.cluster_name,
        })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn validate(path: &ConstructPath, props: &CacheClusterProps) -> InfrastructureResult<()> {
    if props.num_cache_nodes == 0 {
        return Err(ComputeError::NoCacheNodes.into());
    }
    if props.az_mode == AzMode::CrossAz && props.num_cache_nodes < 2 {
        return Err(ComputeError::CrossAzNeedsTwoNodes(props.num_cache_nodes).into());
    }
    if props.engine_version.trim().is_empty() {
        return Err(ComputeError::EmptyEngineVersion.into());
    }
    let zones = props.preferred_availability_zones.len();
    if zones != 0 && zones != props.num_cache_nodes as usize {
        return Err(InfrastructureError::InvalidConstruct {
            path: path.to_string(),
            reason: format!(
                "{zones} preferred availability zones for {} nodes",
                props.num_cache_nodes
            ),
        });
    }
    if props.cluster_name.is_empty() {
        return Err(InfrastructureError::InvalidConstruct {
            path: path.to_string(),
            reason: "cluster name cannot be empty".to_string(),
        });
    }
    Ok(())
}
