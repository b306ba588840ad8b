// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Graph
//!
//! Nodes are resource descriptions; edges are depends-on relations from a
//! dependent resource to the resource it needs. Edges come from two places:
//!
//! - **Reference** edges, inferred when a resource's properties contain a
//!   `Ref` or `Fn::GetAtt` to another resource
//! - **Explicit** edges, declared when a resource must wait for another one it
//!   does not reference (a cache cluster naming its subnet group by string)
//!
//! Both are recorded at declaration time, so the graph is complete data and
//! never resolved lazily.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::{ConstructPath, LogicalId, ResourceCategory, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};

/// Origin of a dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Declared with `add_dependency`; rendered as `DependsOn`
    Explicit,
    /// Inferred from a `Ref` / `Fn::GetAtt` in the properties
    Reference,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// `from` depends on `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: LogicalId,
    pub to: LogicalId,
    pub kind: EdgeKind,
}

/// A declared resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub logical_id: LogicalId,
    pub resource_type: ResourceType,
    pub path: ConstructPath,
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub update_policy: Option<Value>,
}

/// Resource descriptions plus depends-on edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    nodes: BTreeMap<LogicalId, ResourceNode>,
    edges: BTreeSet<DependencyEdge>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, rejecting duplicate logical IDs
    pub fn add_node(&mut self, node: ResourceNode) -> InfrastructureResult<()> {
        if self.nodes.contains_key(&node.logical_id) {
            return Err(InfrastructureError::DuplicateLogicalId(
                node.logical_id.to_string(),
            ));
        }
        self.nodes.insert(node.logical_id.clone(), node);
        Ok(())
    }

    /// Record that `from` depends on `to`
    ///
    /// Self edges are ignored. Endpoints are checked by [`Self::validate`].
    pub fn add_edge(&mut self, from: LogicalId, to: LogicalId, kind: EdgeKind) -> bool {
        if from == to {
            return false;
        }
        self.edges.insert(DependencyEdge { from, to, kind })
    }

    pub fn node(&self, logical_id: &LogicalId) -> Option<&ResourceNode> {
        self.nodes.get(logical_id)
    }

    pub(crate) fn node_mut(&mut self, logical_id: &LogicalId) -> Option<&mut ResourceNode> {
        self.nodes.get_mut(logical_id)
    }

    pub fn contains(&self, logical_id: &LogicalId) -> bool {
        self.nodes.contains_key(logical_id)
    }

    /// Nodes ordered by logical ID
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    pub fn nodes_of_type(&self, resource_type: ResourceType) -> impl Iterator<Item = &ResourceNode> {
        self.nodes
            .values()
            .filter(move |n| n.resource_type == resource_type)
    }

    pub fn count_of_type(&self, resource_type: ResourceType) -> usize {
        self.nodes_of_type(resource_type).count()
    }

    /// Node count per category; categories without nodes are absent
    pub fn count_by_category(&self) -> BTreeMap<ResourceCategory, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.resource_type.category()).or_insert(0) += 1;
        }
        counts
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `from` depends on `to` through an edge of any kind
    pub fn has_edge(&self, from: &LogicalId, to: &LogicalId) -> bool {
        self.edges.iter().any(|e| &e.from == from && &e.to == to)
    }

    /// Whether `from` has an explicit depends-on edge to `to`
    pub fn has_explicit_edge(&self, from: &LogicalId, to: &LogicalId) -> bool {
        self.edges.contains(&DependencyEdge {
            from: from.clone(),
            to: to.clone(),
            kind: EdgeKind::Explicit,
        })
    }

    /// Resources `logical_id` depends on, deduplicated and ordered
    pub fn dependencies_of(&self, logical_id: &LogicalId) -> BTreeSet<&LogicalId> {
        self.edges
            .iter()
            .filter(|e| &e.from == logical_id)
            .map(|e| &e.to)
            .collect()
    }

    /// Resources that depend on `logical_id`
    pub fn dependents_of(&self, logical_id: &LogicalId) -> BTreeSet<&LogicalId> {
        self.edges
            .iter()
            .filter(|e| &e.to == logical_id)
            .map(|e| &e.from)
            .collect()
    }

    /// Explicit dependencies of `logical_id`, as rendered in `DependsOn`
    pub fn explicit_dependencies(&self, logical_id: &LogicalId) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| &e.from == logical_id && e.kind == EdgeKind::Explicit)
            .map(|e| e.to.to_string())
            .collect()
    }

    /// Check that every edge endpoint is a declared node
    pub fn validate(&self) -> InfrastructureResult<()> {
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(InfrastructureError::DanglingReference {
                        from: edge.from.to_string(),
                        to: endpoint.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Creation order: every resource after all of its dependencies
    ///
    /// Ties are broken by logical ID, so the order is deterministic.
    pub fn topological_order(&self) -> InfrastructureResult<Vec<LogicalId>> {
        self.validate()?;

        let mut pending: BTreeMap<&LogicalId, usize> = self
            .nodes
            .keys()
            .map(|id| (id, self.dependencies_of(id).len()))
            .collect();

        let mut ready: BTreeSet<&LogicalId> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(next) = ready.pop_first() {
            pending.remove(next);
            order.push(next.clone());

            for dependent in self.dependents_of(next) {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if !pending.is_empty() {
            return Err(InfrastructureError::DependencyCycle(
                pending.keys().map(|id| id.to_string()).collect(),
            ));
        }

        Ok(order)
    }
}
