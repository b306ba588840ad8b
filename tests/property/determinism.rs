// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property Tests: Declaration Determinism
//!
//! Declaring the same topology twice must yield the same graph and the same
//! template bytes, for any valid stack name, region and variant.

use cache_cluster_infrastructure::domain::invariants::validate_topology;
use cache_cluster_infrastructure::domain::{Capacity, ResourceType};
use cache_cluster_infrastructure::stack::Environment;
use cache_cluster_infrastructure::topology::{declare, TopologyParams, TopologyVariant};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn variant() -> impl Strategy<Value = TopologyVariant> {
    prop_oneof![
        Just(TopologyVariant::Baseline),
        Just(TopologyVariant::Minimal),
        Just(TopologyVariant::Final),
    ]
}

/// Stack names as accepted by the provisioning toolchain
fn stack_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Za-z0-9]{0,30}"
}

fn environment() -> impl Strategy<Value = Environment> {
    prop_oneof![
        Just(Environment::agnostic()),
        prop::sample::select(vec!["us-east-1", "eu-west-1", "ap-southeast-2"]).prop_map(
            |region| Environment::new(None, Some(region.to_string()))
                .expect("sample regions are valid")
        ),
    ]
}

fn params() -> impl Strategy<Value = TopologyParams> {
    (stack_name(), environment(), variant())
        .prop_map(|(name, env, variant)| TopologyParams::new(name, variant).with_environment(env))
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: Declaration is deterministic
    ///
    /// Same parameters, same graph, same template JSON.
    #[test]
    fn prop_declaration_is_deterministic(params in params()) {
        let first = declare(&params).unwrap();
        let second = declare(&params).unwrap();

        prop_assert_eq!(first.graph(), second.graph());
        prop_assert_eq!(
            first.template().unwrap().to_json_pretty().unwrap(),
            second.template().unwrap().to_json_pretty().unwrap()
        );
    }

    /// Property: Every declared graph satisfies the topology invariants
    #[test]
    fn prop_declared_graphs_are_valid(params in params()) {
        let declaration = declare(&params).unwrap();

        prop_assert!(validate_topology(declaration.graph()).is_ok());
        prop_assert!(declaration.graph().topological_order().is_ok());
    }

    /// Property: The stack name never changes the shape
    ///
    /// Resource counts per type depend on the variant only.
    #[test]
    fn prop_shape_is_independent_of_stack_name(
        first in stack_name(),
        second in stack_name(),
        variant in variant(),
    ) {
        let a = declare(&TopologyParams::new(first, variant)).unwrap();
        let b = declare(&TopologyParams::new(second, variant)).unwrap();

        for resource_type in ResourceType::ALL {
            prop_assert_eq!(
                a.graph().count_of_type(resource_type),
                b.graph().count_of_type(resource_type),
                "count of {} differs",
                resource_type
            );
        }
    }

    /// Property: Every template resource records its construct path
    #[test]
    fn prop_resources_carry_their_path(params in params()) {
        let template = declare(&params).unwrap().template().unwrap();
        let prefix = format!("{}/", params.stack_name);

        for resource in template.resources.values() {
            let path = resource.metadata.get("aws:cdk:path").and_then(|p| p.as_str());
            prop_assert!(path.is_some_and(|p| p.starts_with(&prefix)));
        }
    }

    /// Property: Capacity accepts exactly the ordered bounds
    #[test]
    fn prop_capacity_requires_min_at_most_max(min in 0u32..20, max in 0u32..20) {
        let capacity = Capacity::new(min, max);

        prop_assert_eq!(capacity.is_ok(), max >= 1 && min <= max);
        if let Ok(capacity) = capacity {
            prop_assert!(capacity.min() <= capacity.max());
        }
    }
}
