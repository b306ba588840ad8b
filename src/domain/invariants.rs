// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Topology Invariants
//!
//! Checks run over a declared [`ResourceGraph`]. All functions are pure and
//! return the first violation found.
//!
//! # Invariants
//!
//! 1. **Cache ordering**: every cache cluster has an explicit dependency on the
//!    subnet group it names
//! 2. **Tier symmetry**: two security groups that talk on a port allow each
//!    other on that port
//! 3. **Capacity**: every autoscaling group has `MinSize <= MaxSize`
//! 4. **Naming**: cache cluster names are distinct

use serde_json::Value;
use std::collections::BTreeSet;

use crate::domain::{LogicalId, ResourceType};
use crate::graph::{ResourceGraph, ResourceNode};
use crate::template::intrinsic;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Autoscaling group {resource} has MinSize {min} above MaxSize {max}")]
    InvertedCapacity { resource: String, min: u32, max: u32 },

    #[error("Autoscaling group {resource} has unreadable {field}")]
    UnreadableCapacity { resource: String, field: String },

    #[error("Cache cluster {0} has no explicit dependency on a subnet group")]
    MissingSubnetGroupDependency(String),

    #[error("Cache cluster {resource} names subnet group {name:?}, which is not declared")]
    UnknownSubnetGroup { resource: String, name: String },

    #[error("Security group {from} may reach {to} on port {port}, but not the reverse")]
    AsymmetricIngress { from: String, to: String, port: u16 },

    #[error("Security group {0} is not declared")]
    UnknownSecurityGroup(String),

    #[error("Cache cluster name {0:?} is used more than once")]
    DuplicateClusterName(String),
}

/// Every autoscaling group satisfies `MinSize <= MaxSize`
pub fn validate_capacity(graph: &ResourceGraph) -> ValidationResult {
    for node in graph.nodes_of_type(ResourceType::AutoScalingGroup) {
        let min = capacity_field(node, "MinSize")?;
        let max = capacity_field(node, "MaxSize")?;
        if min > max {
            return Err(ValidationError::InvertedCapacity {
                resource: node.logical_id.to_string(),
                min,
                max,
            });
        }
    }
    Ok(())
}

fn capacity_field(node: &ResourceNode, field: &str) -> Result<u32, ValidationError> {
    let unreadable = || ValidationError::UnreadableCapacity {
        resource: node.logical_id.to_string(),
        field: field.to_string(),
    };
    match node.properties.get(field) {
        Some(Value::String(s)) => s.parse().map_err(|_| unreadable()),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(unreadable),
        _ => Err(unreadable()),
    }
}

/// Every cache cluster depends explicitly on the subnet group it names
///
/// Clusters name their subnet group by string, so without the explicit edge
/// the engine is free to create the cluster first.
pub fn validate_cache_dependencies(graph: &ResourceGraph) -> ValidationResult {
    for cluster in graph.nodes_of_type(ResourceType::CacheCluster) {
        let dependency = graph
            .dependencies_of(&cluster.logical_id)
            .into_iter()
            .filter_map(|id| graph.node(id))
            .filter(|n| n.resource_type == ResourceType::CacheSubnetGroup)
            .find(|group| graph.has_explicit_edge(&cluster.logical_id, &group.logical_id));

        let Some(group) = dependency else {
            return Err(ValidationError::MissingSubnetGroupDependency(
                cluster.logical_id.to_string(),
            ));
        };

        if let Some(name) = cluster
            .properties
            .get("CacheSubnetGroupName")
            .and_then(Value::as_str)
        {
            let named = group
                .properties
                .get("CacheSubnetGroupName")
                .and_then(Value::as_str);
            if named != Some(name) {
                return Err(ValidationError::UnknownSubnetGroup {
                    resource: cluster.logical_id.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Two security groups allow each other on `port`, or neither does
///
/// A group paired with itself is trivially symmetric.
pub fn validate_symmetric_ingress(
    graph: &ResourceGraph,
    first: &LogicalId,
    second: &LogicalId,
    port: u16,
) -> ValidationResult {
    for id in [first, second] {
        let declared = graph
            .node(id)
            .is_some_and(|n| n.resource_type == ResourceType::SecurityGroup);
        if !declared {
            return Err(ValidationError::UnknownSecurityGroup(id.to_string()));
        }
    }
    if first == second {
        return Ok(());
    }

    let forward = allows_ingress(graph, first, second, port);
    let reverse = allows_ingress(graph, second, first, port);
    match (forward, reverse) {
        (true, false) => Err(ValidationError::AsymmetricIngress {
            from: first.to_string(),
            to: second.to_string(),
            port,
        }),
        (false, true) => Err(ValidationError::AsymmetricIngress {
            from: second.to_string(),
            to: first.to_string(),
            port,
        }),
        _ => Ok(()),
    }
}

/// Whether `target` admits traffic from `source` on TCP `port`
pub fn allows_ingress(
    graph: &ResourceGraph,
    source: &LogicalId,
    target: &LogicalId,
    port: u16,
) -> bool {
    let standalone = graph
        .nodes_of_type(ResourceType::SecurityGroupIngress)
        .filter(|rule| names_group(rule.properties.get("GroupId"), target))
        .any(|rule| rule_admits(&rule.properties, source, port));

    let inline = graph
        .node(target)
        .and_then(|sg| sg.properties.get("SecurityGroupIngress"))
        .and_then(Value::as_array)
        .is_some_and(|rules| {
            rules
                .iter()
                .filter_map(Value::as_object)
                .any(|rule| rule_admits(rule, source, port))
        });

    standalone || inline
}

fn names_group(value: Option<&Value>, group: &LogicalId) -> bool {
    value
        .and_then(|v| intrinsic::get_att_target(v, "GroupId"))
        .is_some_and(|id| id == group.as_str())
}

fn rule_admits(rule: &serde_json::Map<String, Value>, source: &LogicalId, port: u16) -> bool {
    if !names_group(rule.get("SourceSecurityGroupId"), source) {
        return false;
    }
    match rule.get("IpProtocol").and_then(Value::as_str) {
        Some("-1") => true,
        Some("tcp") => {
            let from = rule.get("FromPort").and_then(Value::as_u64);
            let to = rule.get("ToPort").and_then(Value::as_u64);
            matches!((from, to), (Some(from), Some(to)) if from <= u64::from(port) && u64::from(port) <= to)
        }
        _ => false,
    }
}

/// Cache cluster names are pairwise distinct
pub fn validate_distinct_cluster_names(graph: &ResourceGraph) -> ValidationResult {
    let mut seen = BTreeSet::new();
    for cluster in graph.nodes_of_type(ResourceType::CacheCluster) {
        if let Some(name) = cluster.properties.get("ClusterName").and_then(Value::as_str) {
            if !seen.insert(name) {
                return Err(ValidationError::DuplicateClusterName(name.to_string()));
            }
        }
    }
    Ok(())
}

/// Run every graph-wide invariant
pub fn validate_topology(graph: &ResourceGraph) -> ValidationResult {
    validate_capacity(graph)?;
    validate_cache_dependencies(graph)?;
    validate_distinct_cluster_names(graph)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConstructPath;
    use crate::graph::EdgeKind;
    use serde_json::json;

    fn id(s: &str) -> LogicalId {
        LogicalId::new(s).unwrap()
    }

    fn add(graph: &mut ResourceGraph, name: &str, resource_type: ResourceType, props: Value) {
        let Value::Object(properties) = props else {
            panic!("properties must be an object");
        };
        graph
            .add_node(ResourceNode {
                logical_id: id(name),
                resource_type,
                path: ConstructPath::root("T").unwrap().child(name).unwrap(),
                properties,
                update_policy: None,
            })
            .unwrap();
    }

    fn ingress(graph: &mut ResourceGraph, name: &str, target: &str, source: &str, port: u16) {
        add(
            graph,
            name,
            ResourceType::SecurityGroupIngress,
            json!({
                "GroupId": intrinsic::get_att(target, "GroupId"),
                "SourceSecurityGroupId": intrinsic::get_att(source, "GroupId"),
                "IpProtocol": "tcp",
                "FromPort": port,
                "ToPort": port
            }),
        );
    }

    fn two_groups() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Web", ResourceType::SecurityGroup, json!({}));
        add(&mut graph, "Cache", ResourceType::SecurityGroup, json!({}));
        graph
    }

    #[test]
    fn test_capacity_bounds() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Ok", ResourceType::AutoScalingGroup, json!({"MinSize": "2", "MaxSize": "4"}));
        assert!(validate_capacity(&graph).is_ok());

        add(&mut graph, "Bad", ResourceType::AutoScalingGroup, json!({"MinSize": "5", "MaxSize": "4"}));
        assert_eq!(
            validate_capacity(&graph),
            Err(ValidationError::InvertedCapacity {
                resource: "Bad".to_string(),
                min: 5,
                max: 4
            })
        );
    }

    #[test]
    fn test_unreadable_capacity() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Group", ResourceType::AutoScalingGroup, json!({"MinSize": "two", "MaxSize": "4"}));
        assert!(matches!(
            validate_capacity(&graph),
            Err(ValidationError::UnreadableCapacity { .. })
        ));
    }

    #[test]
    fn test_cache_cluster_needs_explicit_edge() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Group", ResourceType::CacheSubnetGroup, json!({"CacheSubnetGroupName": "g"}));
        add(&mut graph, "Cluster", ResourceType::CacheCluster, json!({"CacheSubnetGroupName": "g"}));
        assert_eq!(
            validate_cache_dependencies(&graph),
            Err(ValidationError::MissingSubnetGroupDependency("Cluster".to_string()))
        );

        graph.add_edge(id("Cluster"), id("Group"), EdgeKind::Reference);
        assert!(validate_cache_dependencies(&graph).is_err());

        graph.add_edge(id("Cluster"), id("Group"), EdgeKind::Explicit);
        assert!(validate_cache_dependencies(&graph).is_ok());
    }

    #[test]
    fn test_cache_cluster_names_declared_group() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Group", ResourceType::CacheSubnetGroup, json!({"CacheSubnetGroupName": "g"}));
        add(&mut graph, "Cluster", ResourceType::CacheCluster, json!({"CacheSubnetGroupName": "other"}));
        graph.add_edge(id("Cluster"), id("Group"), EdgeKind::Explicit);
        assert!(matches!(
            validate_cache_dependencies(&graph),
            Err(ValidationError::UnknownSubnetGroup { .. })
        ));
    }

    #[test]
    fn test_symmetric_ingress() {
        let mut graph = two_groups();
        assert!(validate_symmetric_ingress(&graph, &id("Web"), &id("Cache"), 43334).is_ok());

        ingress(&mut graph, "CacheFromWeb", "Cache", "Web", 43334);
        assert_eq!(
            validate_symmetric_ingress(&graph, &id("Web"), &id("Cache"), 43334),
            Err(ValidationError::AsymmetricIngress {
                from: "Web".to_string(),
                to: "Cache".to_string(),
                port: 43334
            })
        );

        ingress(&mut graph, "WebFromCache", "Web", "Cache", 43334);
        assert!(validate_symmetric_ingress(&graph, &id("Web"), &id("Cache"), 43334).is_ok());
        assert!(validate_symmetric_ingress(&graph, &id("Cache"), &id("Web"), 43334).is_ok());
    }

    #[test]
    fn test_ingress_on_other_port_does_not_count() {
        let mut graph = two_groups();
        ingress(&mut graph, "CacheFromWeb", "Cache", "Web", 43334);
        ingress(&mut graph, "WebFromCache", "Web", "Cache", 80);
        assert!(validate_symmetric_ingress(&graph, &id("Web"), &id("Cache"), 43334).is_err());
    }

    #[test]
    fn test_inline_rule_counts() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "Web", ResourceType::SecurityGroup, json!({
            "SecurityGroupIngress": [{
                "SourceSecurityGroupId": intrinsic::get_att("Cache", "GroupId"),
                "IpProtocol": "-1"
            }]
        }));
        add(&mut graph, "Cache", ResourceType::SecurityGroup, json!({}));
        assert!(allows_ingress(&graph, &id("Cache"), &id("Web"), 43334));
        assert!(!allows_ingress(&graph, &id("Web"), &id("Cache"), 43334));
    }

    #[test]
    fn test_shared_group_is_symmetric() {
        let graph = two_groups();
        assert!(validate_symmetric_ingress(&graph, &id("Web"), &id("Web"), 43334).is_ok());
        assert_eq!(
            validate_symmetric_ingress(&graph, &id("Web"), &id("Nope"), 43334),
            Err(ValidationError::UnknownSecurityGroup("Nope".to_string()))
        );
    }

    #[test]
    fn test_distinct_cluster_names() {
        let mut graph = ResourceGraph::new();
        add(&mut graph, "One", ResourceType::CacheCluster, json!({"ClusterName": "a"}));
        add(&mut graph, "Two", ResourceType::CacheCluster, json!({"ClusterName": "b"}));
        assert!(validate_distinct_cluster_names(&graph).is_ok());

        add(&mut graph, "Three", ResourceType::CacheCluster, json!({"ClusterName": "a"}));
        assert_eq!(
            validate_distinct_cluster_names(&graph),
            Err(ValidationError::DuplicateClusterName("a".to_string()))
        );
    }
}
