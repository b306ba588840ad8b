// Copyright (c) 2025 - Cowboy AI, Inc.
//! Template Assertions
//!
//! Inspection helpers over a synthesised template, for tests that check
//! what a declaration emits without caring about generated logical IDs.
//!
//! # Matching
//!
//! Expected properties match as an object subset: objects are compared key by
//! key recursively and may carry extra keys, while arrays and scalars must be
//! equal.
//!
//! # Examples
//!
//! ```rust
//! use cache_cluster_infrastructure::assertions::TemplateAssertions;
//! use cache_cluster_infrastructure::topology::{synthesize, TopologyParams, TopologyVariant};
//! use serde_json::json;
//!
//! let template = synthesize(&TopologyParams::new("Demo", TopologyVariant::Baseline)).unwrap();
//! let assertions = TemplateAssertions::from_template(&template).unwrap();
//! assertions.resource_count_is("AWS::ElastiCache::CacheCluster", 1).unwrap();
//! assertions
//!     .has_resource_properties("AWS::ElastiCache::CacheCluster", &json!({"NumCacheNodes": 4}))
//!     .unwrap();
//! ```

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::errors::InfrastructureResult;
use crate::stack::Stack;
use crate::template::Template;

/// A failed assertion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("Expected {expected} resources of type {resource_type}, found {actual}")]
    ResourceCount {
        resource_type: String,
        expected: usize,
        actual: usize,
    },

    #[error("No {resource_type} resource matches {expected} ({candidates} candidates)")]
    NoMatchingResource {
        resource_type: String,
        expected: String,
        candidates: usize,
    },

    #[error("Resource {0} not found")]
    MissingResource(String),

    #[error("Resource {from} does not depend on {to}")]
    MissingDependency { from: String, to: String },
}

/// Assertions over one template
#[derive(Debug, Clone)]
pub struct TemplateAssertions {
    template: Value,
}

impl TemplateAssertions {
    /// Synthesise `stack` and wrap the result
    pub fn from_stack(stack: &Stack) -> InfrastructureResult<Self> {
        Self::from_template(&stack.synth()?)
    }

    pub fn from_template(template: &Template) -> InfrastructureResult<Self> {
        Ok(Self {
            template: template.to_value()?,
        })
    }

    /// Raw template JSON
    pub fn to_json(&self) -> &Value {
        &self.template
    }

    fn resources(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.template
            .get("Resources")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(Map::iter)
    }

    /// Resources of `resource_type`, by logical ID
    pub fn find_resources(&self, resource_type: &str) -> BTreeMap<String, Value> {
        self.resources()
            .filter(|(_, r)| r.get("Type").and_then(Value::as_str) == Some(resource_type))
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect()
    }

    pub fn resource_count_is(&self, resource_type: &str, expected: usize) -> Result<(), AssertionError> {
        let actual = self.find_resources(resource_type).len();
        if actual != expected {
            return Err(AssertionError::ResourceCount {
                resource_type: resource_type.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// At least one resource of `resource_type` has properties matching `expected`
    pub fn has_resource_properties(
        &self,
        resource_type: &str,
        expected: &Value,
    ) -> Result<(), AssertionError> {
        let candidates = self.find_resources(resource_type);
        let empty = Value::Object(Map::new());
        let found = candidates
            .values()
            .any(|r| matches_subset(r.get("Properties").unwrap_or(&empty), expected));
        if !found {
            return Err(AssertionError::NoMatchingResource {
                resource_type: resource_type.to_string(),
                expected: expected.to_string(),
                candidates: candidates.len(),
            });
        }
        Ok(())
    }

    /// `from` lists `to` in its `DependsOn`
    pub fn has_dependency(&self, from: &str, to: &str) -> Result<(), AssertionError> {
        let resource = self
            .resources()
            .find(|(id, _)| id.as_str() == from)
            .map(|(_, r)| r)
            .ok_or_else(|| AssertionError::MissingResource(from.to_string()))?;

        let depends = resource
            .get("DependsOn")
            .and_then(Value::as_array)
            .is_some_and(|deps| deps.iter().any(|d| d.as_str() == Some(to)));
        if !depends {
            return Err(AssertionError::MissingDependency {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

/// Object-subset match
pub fn matches_subset(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|found| matches_subset(found, value))
        }),
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"a": 1, "b": 2}), json!({"a": 1}), true ; "subset of keys")]
    #[test_case(json!({"a": {"x": 1, "y": 2}}), json!({"a": {"y": 2}}), true ; "nested subset")]
    #[test_case(json!({"a": [1, 2]}), json!({"a": [1]}), false ; "arrays must be equal")]
    #[test_case(json!({"a": 1}), json!({"a": "1"}), false ; "scalar types differ")]
    #[test_case(json!({"a": 1}), json!({"b": 1}), false ; "missing key")]
    fn test_matches_subset(actual: Value, expected: Value, matches: bool) {
        assert_eq!(matches_subset(&actual, &expected), matches);
    }

    fn sample() -> TemplateAssertions {
        TemplateAssertions {
            template: json!({
                "Resources": {
                    "Group": {"Type": "AWS::ElastiCache::SubnetGroup", "Properties": {"CacheSubnetGroupName": "g"}},
                    "Cluster": {
                        "Type": "AWS::ElastiCache::CacheCluster",
                        "Properties": {"NumCacheNodes": 2, "Engine": "memcached"},
                        "DependsOn": ["Group"]
                    }
                }
            }),
        }
    }

    #[test]
    fn test_count_and_properties() {
        let a = sample();
        assert!(a.resource_count_is("AWS::ElastiCache::CacheCluster", 1).is_ok());
        assert_eq!(
            a.resource_count_is("AWS::ElastiCache::CacheCluster", 4),
            Err(AssertionError::ResourceCount {
                resource_type: "AWS::ElastiCache::CacheCluster".to_string(),
                expected: 4,
                actual: 1
            })
        );
        assert!(a
            .has_resource_properties("AWS::ElastiCache::CacheCluster", &json!({"Engine": "memcached"}))
            .is_ok());
        assert!(a
            .has_resource_properties("AWS::ElastiCache::CacheCluster", &json!({"Engine": "redis"}))
            .is_err());
        assert_eq!(a.find_resources("AWS::EC2::VPC").len(), 0);
    }

    #[test]
    fn test_dependencies() {
        let a = sample();
        assert!(a.has_dependency("Cluster", "Group").is_ok());
        assert!(matches!(
            a.has_dependency("Group", "Cluster"),
            Err(AssertionError::MissingDependency { .. })
        ));
        assert_eq!(
            a.has_dependency("Nope", "Group"),
            Err(AssertionError::MissingResource("Nope".to_string()))
        );
    }
}
