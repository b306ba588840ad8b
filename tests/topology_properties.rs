// Copyright (c) 2025 - Cowboy AI, Inc.
//! Topology Property Tests
//!
//! Checks each declared variant against the structural guarantees of the
//! topology: cache clusters depend on their subnet group, the instance and
//! cache tiers are opened to each other symmetrically, fleet capacity bounds
//! hold, and the variants carry the expected resources.

use anyhow::Result;
use cache_cluster_infrastructure::assertions::TemplateAssertions;
use cache_cluster_infrastructure::domain::invariants::allows_ingress;
use cache_cluster_infrastructure::domain::ResourceType;
use cache_cluster_infrastructure::stack::Environment;
use cache_cluster_infrastructure::topology::{
    declare, synthesize, TopologyParams, TopologyVariant, CACHE_PORT, HTTP_PORT,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use test_case::test_case;

fn params(variant: TopologyVariant) -> TopologyParams {
    TopologyParams::new("CacheClusterStack", variant)
}

fn regional(variant: TopologyVariant) -> Result<TopologyParams> {
    Ok(params(variant).with_environment(Environment::new(
        Some("123456789012".to_string()),
        Some("eu-west-1".to_string()),
    )?))
}

// ============================================================================
// Cache dependencies
// ============================================================================

#[test_case(TopologyVariant::Baseline ; "baseline")]
#[test_case(TopologyVariant::Final ; "final")]
fn test_every_cluster_depends_on_its_subnet_group(variant: TopologyVariant) -> Result<()> {
    let declaration = declare(&params(variant))?;
    let graph = declaration.graph();
    let groups: Vec<_> = graph.nodes_of_type(ResourceType::CacheSubnetGroup).collect();
    assert_eq!(groups.len(), 1);
    let group = groups[0];

    let template = TemplateAssertions::from_stack(declaration.stack())?;
    for cluster in graph.nodes_of_type(ResourceType::CacheCluster) {
        assert!(graph.has_explicit_edge(&cluster.logical_id, &group.logical_id));
        assert_eq!(
            cluster.properties["CacheSubnetGroupName"],
            group.properties["CacheSubnetGroupName"]
        );
        template.has_dependency(cluster.logical_id.as_str(), group.logical_id.as_str())?;
    }
    Ok(())
}

// ============================================================================
// Security group symmetry
// ============================================================================

#[test_case(TopologyVariant::Baseline ; "baseline")]
#[test_case(TopologyVariant::Final ; "final")]
fn test_tiers_open_symmetrically_on_cache_port(variant: TopologyVariant) -> Result<()> {
    let declaration = declare(&params(variant))?;
    let graph = declaration.graph();
    let instances = declaration.instance_security_group();
    let cache = declaration
        .cache_security_group()
        .expect("variant declares a cache tier");

    assert_eq!(
        allows_ingress(graph, instances, cache, CACHE_PORT),
        allows_ingress(graph, cache, instances, CACHE_PORT)
    );
    Ok(())
}

#[test]
fn test_final_tiers_are_distinct_and_open_both_ways() -> Result<()> {
    let declaration = declare(&params(TopologyVariant::Final))?;
    let graph = declaration.graph();
    let instances = declaration.instance_security_group();
    let cache = declaration.cache_security_group().expect("cache tier");

    assert_ne!(instances, cache);
    assert!(allows_ingress(graph, instances, cache, CACHE_PORT));
    assert!(allows_ingress(graph, cache, instances, CACHE_PORT));
    assert!(!allows_ingress(graph, instances, cache, HTTP_PORT));
    Ok(())
}

// ============================================================================
// Fleet capacity
// ============================================================================

fn size(properties: &Value, key: &str) -> u32 {
    properties[key]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("{key} is not a numeric string: {}", properties[key]))
}

#[test_case(TopologyVariant::Baseline ; "baseline")]
#[test_case(TopologyVariant::Minimal ; "minimal")]
#[test_case(TopologyVariant::Final ; "final")]
fn test_fleet_minimum_never_exceeds_maximum(variant: TopologyVariant) -> Result<()> {
    let template = TemplateAssertions::from_template(&synthesize(&params(variant))?)?;
    let fleets = template.find_resources(ResourceType::AutoScalingGroup.as_str());
    assert_eq!(fleets.len(), 1);

    for fleet in fleets.values() {
        let properties = &fleet["Properties"];
        assert!(size(properties, "MinSize") <= size(properties, "MaxSize"));
        assert_eq!(properties["MinSize"], json!("2"));
        assert_eq!(properties["MaxSize"], json!("4"));
    }
    Ok(())
}

// ============================================================================
// Variant shapes
// ============================================================================

#[test]
fn test_final_variant_shape() -> Result<()> {
    let declaration = declare(&regional(TopologyVariant::Final)?)?;
    let graph = declaration.graph();

    assert_eq!(graph.count_of_type(ResourceType::Vpc), 1);
    assert_eq!(graph.count_of_type(ResourceType::SecurityGroup), 2);
    assert_eq!(graph.count_of_type(ResourceType::CacheSubnetGroup), 1);
    assert_eq!(graph.count_of_type(ResourceType::CacheCluster), 4);
    assert_eq!(graph.count_of_type(ResourceType::LoadBalancer), 1);

    let names: BTreeSet<_> = graph
        .nodes_of_type(ResourceType::CacheCluster)
        .filter_map(|c| c.properties["ClusterName"].as_str())
        .collect();
    assert_eq!(
        names,
        BTreeSet::from([
            "SampleCluster1",
            "SampleCluster2",
            "SampleCluster3",
            "SampleCluster4",
        ])
    );

    let subnet_groups: BTreeSet<_> = graph
        .nodes_of_type(ResourceType::CacheCluster)
        .flat_map(|c| graph.explicit_dependencies(&c.logical_id))
        .collect();
    assert_eq!(subnet_groups.len(), 1);

    let template = TemplateAssertions::from_stack(declaration.stack())?;
    template.has_resource_properties(
        ResourceType::CacheCluster.as_str(),
        &json!({
            "Engine": "memcached",
            "CacheNodeType": "cache.t4g.micro",
            "NumCacheNodes": 2,
            "AZMode": "cross-az",
            "Port": CACHE_PORT,
            "PreferredAvailabilityZones": ["eu-west-1a", "eu-west-1b"],
        }),
    )?;
    template.has_resource_properties(
        ResourceType::Subnet.as_str(),
        &json!({"CidrBlock": "10.0.0.0/24"}),
    )?;
    Ok(())
}

#[test]
fn test_minimal_variant_has_no_cache_or_load_balancer() -> Result<()> {
    let declaration = declare(&params(TopologyVariant::Minimal))?;
    let graph = declaration.graph();

    assert_eq!(graph.count_of_type(ResourceType::CacheCluster), 0);
    assert_eq!(graph.count_of_type(ResourceType::CacheSubnetGroup), 0);
    assert_eq!(graph.count_of_type(ResourceType::LoadBalancer), 0);
    assert_eq!(graph.count_of_type(ResourceType::Vpc), 1);
    assert_eq!(graph.count_of_type(ResourceType::AutoScalingGroup), 1);

    let template = declaration.template()?;
    assert!(template.outputs.is_empty());
    Ok(())
}

#[test]
fn test_baseline_single_cluster_on_shared_group() -> Result<()> {
    let declaration = declare(&params(TopologyVariant::Baseline))?;
    let template = TemplateAssertions::from_stack(declaration.stack())?;

    template.resource_count_is(ResourceType::CacheCluster.as_str(), 1)?;
    template.has_resource_properties(
        ResourceType::CacheCluster.as_str(),
        &json!({
            "ClusterName": "SampleCluster",
            "NumCacheNodes": 4,
            "VpcSecurityGroupIds": [{
                "Fn::GetAtt": [declaration.instance_security_group().as_str(), "GroupId"]
            }],
        }),
    )?;
    template.has_resource_properties(
        ResourceType::Subnet.as_str(),
        &json!({"CidrBlock": "10.0.0.0/18"}),
    )?;
    Ok(())
}

#[test_case(TopologyVariant::Baseline ; "baseline")]
#[test_case(TopologyVariant::Final ; "final")]
fn test_load_balancer_is_public_on_http(variant: TopologyVariant) -> Result<()> {
    let template = synthesize(&params(variant))?;
    let assertions = TemplateAssertions::from_template(&template)?;

    assertions.has_resource_properties(
        ResourceType::LoadBalancer.as_str(),
        &json!({"Scheme": "internet-facing", "Type": "application"}),
    )?;
    assertions.has_resource_properties(
        ResourceType::Listener.as_str(),
        &json!({"Port": HTTP_PORT, "Protocol": "HTTP"}),
    )?;
    assert!(template.outputs.contains_key("LoadBalancerDnsName"));
    Ok(())
}

// ============================================================================
// Determinism
// ============================================================================

#[test_case(TopologyVariant::Baseline ; "baseline")]
#[test_case(TopologyVariant::Minimal ; "minimal")]
#[test_case(TopologyVariant::Final ; "final")]
fn test_identical_inputs_produce_identical_templates(variant: TopologyVariant) -> Result<()> {
    let first = declare(&regional(variant)?)?;
    let second = declare(&regional(variant)?)?;

    assert_eq!(first.graph(), second.graph());
    assert_eq!(
        first.template()?.to_json_pretty()?,
        second.template()?.to_json_pretty()?
    );
    Ok(())
}
