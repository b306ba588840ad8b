// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack: the Explicit Construction Context
//!
//! Every resource is registered in a [`Stack`] that is passed by `&mut`
//! through construct builders. Registration computes the logical ID from the
//! construct path and records a reference edge for every `Ref` / `Fn::GetAtt`
//! found in the properties. Synthesis validates the graph and renders the
//! template.
//!
//! # Examples
//!
//! ```rust
//! use cache_cluster_infrastructure::domain::ResourceType;
//! use cache_cluster_infrastructure::stack::{Environment, Stack};
//! use serde_json::json;
//!
//! let mut stack = Stack::new("Demo", Environment::agnostic()).unwrap();
//! let vpc_path = stack.root().child("VPC").unwrap();
//! let vpc = stack
//!     .add_resource(&vpc_path, ResourceType::Vpc, json!({"CidrBlock": "10.0.0.0/16"}))
//!     .unwrap();
//!
//! let subnet_path = vpc_path.child("Subnet").unwrap();
//! let subnet = stack
//!     .add_resource(&subnet_path, ResourceType::Subnet, json!({"VpcId": vpc.reference()}))
//!     .unwrap();
//!
//! assert!(stack.graph().has_edge(subnet.logical_id(), vpc.logical_id()));
//! assert_eq!(stack.synth().unwrap().resources.len(), 2);
//! ```

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{ConstructPath, LogicalId, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::graph::{EdgeKind, ResourceGraph, ResourceNode};
use crate::template::intrinsic::{self, ReferenceTarget};
use crate::template::{
    Template, TemplateOutput, TemplateParameter, TemplateResource, FORMAT_VERSION,
    PATH_METADATA_KEY,
};

/// Availability zones known to an environment-agnostic stack
pub const AGNOSTIC_AZ_COUNT: usize = 2;

/// Parameter type that resolves an image id from SSM at deploy time
pub const SSM_IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";

/// Deployment target of a stack
///
/// Both parts are optional. Without a region the stack is environment
/// agnostic and availability zones are resolved by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    account: Option<String>,
    region: Option<String>,
}

impl Environment {
    /// No account or region
    pub fn agnostic() -> Self {
        Self::default()
    }

    pub fn new(account: Option<String>, region: Option<String>) -> InfrastructureResult<Self> {
        if let Some(account) = &account {
            if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
                return Err(InfrastructureError::Configuration(format!(
                    "Account id must be 12 digits, got {account:?}"
                )));
            }
        }
        if let Some(region) = &region {
            let valid = !region.is_empty()
                && region
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            if !valid {
                return Err(InfrastructureError::Configuration(format!(
                    "Invalid region: {region:?}"
                )));
            }
        }
        Ok(Self { account, region })
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

/// Handle to a registered resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    logical_id: LogicalId,
    resource_type: ResourceType,
    path: ConstructPath,
}

impl ResourceHandle {
    pub fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// `{"Ref": <logical id>}`
    pub fn reference(&self) -> Value {
        intrinsic::reference(self.logical_id.as_str())
    }

    /// `{"Fn::GetAtt": [<logical id>, attribute]}`
    pub fn attribute(&self, attribute: &str) -> Value {
        intrinsic::get_att(self.logical_id.as_str(), attribute)
    }
}

/// A named, independently deployable unit of declared infrastructure
#[derive(Debug, Clone)]
pub struct Stack {
    root: ConstructPath,
    environment: Environment,
    description: Option<String>,
    graph: ResourceGraph,
    parameters: BTreeMap<String, TemplateParameter>,
    outputs: BTreeMap<String, TemplateOutput>,
}

impl Stack {
    pub fn new(name: impl Into<String>, environment: Environment) -> InfrastructureResult<Self> {
        let root = ConstructPath::root(name)?;
        debug!("Created stack {}", root);
        Ok(Self {
            root,
            environment,
            description: None,
            graph: ResourceGraph::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.root.stack_name()
    }

    /// Path every construct in this stack descends from
    pub fn root(&self) -> &ConstructPath {
        &self.root
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Register a resource at `path`
    ///
    /// `properties` must be a JSON object (or null for none). Every `Ref` and
    /// `Fn::GetAtt` naming a resource becomes a reference edge.
    pub fn add_resource(
        &mut self,
        path: &ConstructPath,
        resource_type: ResourceType,
        properties: Value,
    ) -> InfrastructureResult<ResourceHandle> {
        if path.stack_name() != self.name() {
            return Err(InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: format!("does not belong to stack {}", self.name()),
            });
        }

        let properties = match properties {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(InfrastructureError::InvalidConstruct {
                    path: path.to_string(),
                    reason: format!("properties must be an object, got {other}"),
                })
            }
        };

        let logical_id = path.logical_id()?;
        let references: Vec<ReferenceTarget> = properties
            .values()
            .flat_map(intrinsic::collect_references)
            .collect();

        self.graph.add_node(ResourceNode {
            logical_id: logical_id.clone(),
            resource_type,
            path: path.clone(),
            properties,
            update_policy: None,
        })?;
        debug!(
            "Registered {} {} at {}",
            resource_type.display_name(),
            logical_id,
            path
        );

        self.record_references(&logical_id, references)?;

        Ok(ResourceHandle {
            logical_id,
            resource_type,
            path: path.clone(),
        })
    }

    /// Set one property of a registered resource, inferring new edges
    pub fn set_property(
        &mut self,
        handle: &ResourceHandle,
        key: &str,
        value: Value,
    ) -> InfrastructureResult<()> {
        let references: Vec<ReferenceTarget> =
            intrinsic::collect_references(&value).into_iter().collect();
        self.node_mut(handle)?
            .properties
            .insert(key.to_string(), value);
        self.record_references(handle.logical_id(), references)
    }

    /// Append to a list property, creating the list if absent
    pub fn append_property(
        &mut self,
        handle: &ResourceHandle,
        key: &str,
        value: Value,
    ) -> InfrastructureResult<()> {
        let references: Vec<ReferenceTarget> =
            intrinsic::collect_references(&value).into_iter().collect();
        let node = self.node_mut(handle)?;
        let entry = node
            .properties
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        match entry {
            Value::Array(items) => items.push(value),
            _ => {
                return Err(InfrastructureError::InvalidConstruct {
                    path: handle.path().to_string(),
                    reason: format!("property {key} is not a list"),
                })
            }
        }
        self.record_references(handle.logical_id(), references)
    }

    /// Declare that `dependent` must be created after `dependency`
    pub fn add_dependency(
        &mut self,
        dependent: &ResourceHandle,
        dependency: &ResourceHandle,
    ) -> InfrastructureResult<()> {
        for handle in [dependent, dependency] {
            if !self.graph.contains(handle.logical_id()) {
                return Err(InfrastructureError::DanglingReference {
                    from: dependent.logical_id().to_string(),
                    to: handle.logical_id().to_string(),
                });
            }
        }
        if self.graph.add_edge(
            dependent.logical_id().clone(),
            dependency.logical_id().clone(),
            EdgeKind::Explicit,
        ) {
            debug!(
                "Explicit dependency {} -> {}",
                dependent.logical_id(),
                dependency.logical_id()
            );
        }
        Ok(())
    }

    pub fn set_update_policy(
        &mut self,
        handle: &ResourceHandle,
        policy: Value,
    ) -> InfrastructureResult<()> {
        self.node_mut(handle)?.update_policy = Some(policy);
        Ok(())
    }

    /// Register a template parameter; re-adding the same id is a no-op
    pub fn add_parameter(&mut self, id: &str, parameter: TemplateParameter) -> InfrastructureResult<String> {
        let id = LogicalId::new(id)?.to_string();
        self.parameters.entry(id.clone()).or_insert(parameter);
        Ok(id)
    }

    /// Parameter resolving an image id from the SSM parameter `name`
    ///
    /// Returns the parameter id to `Ref`.
    pub fn add_ssm_image_parameter(&mut self, name: &str) -> InfrastructureResult<String> {
        let readable: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
        let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
            .to_uppercase();
        let id = format!("SsmParameterValue{readable}{digest}Parameter");
        self.add_parameter(
            &id,
            TemplateParameter {
                parameter_type: SSM_IMAGE_PARAMETER_TYPE.to_string(),
                default: Some(name.to_string()),
                description: None,
            },
        )
    }

    pub fn add_output(&mut self, id: &str, output: TemplateOutput) -> InfrastructureResult<()> {
        let id = LogicalId::new(id)?;
        self.outputs.insert(id.to_string(), output);
        Ok(())
    }

    /// Availability zones used by constructs, at most `max`
    ///
    /// With a region they are `<region>a`, `<region>b`, ...; without one they
    /// are `Fn::Select` over `Fn::GetAZs ""` and capped at two.
    pub fn availability_zones(&self, max: usize) -> Vec<Value> {
        match self.environment.region() {
            Some(region) => (b'a'..=b'z')
                .take(max)
                .map(|suffix| Value::String(format!("{region}{}", suffix as char)))
                .collect(),
            None => {
                if max > AGNOSTIC_AZ_COUNT {
                    warn!(
                        "Stack {} has no region; using {} availability zones instead of {}",
                        self.name(),
                        AGNOSTIC_AZ_COUNT,
                        max
                    );
                }
                (0..max.min(AGNOSTIC_AZ_COUNT))
                    .map(|i| intrinsic::select(i, intrinsic::get_azs("")))
                    .collect()
            }
        }
    }

    /// Validate the graph and render the template
    pub fn synth(&self) -> InfrastructureResult<Template> {
        self.graph.validate()?;
        self.check_attributes()?;
        let order = self.graph.topological_order()?;

        let mut resources = BTreeMap::new();
        for node in self.graph.nodes() {
            let mut metadata = Map::new();
            metadata.insert(PATH_METADATA_KEY.to_string(), json!(node.path.to_string()));

            resources.insert(
                node.logical_id.to_string(),
                TemplateResource {
                    resource_type: node.resource_type.as_str().to_string(),
                    properties: node.properties.clone(),
                    depends_on: self.graph.explicit_dependencies(&node.logical_id),
                    update_policy: node.update_policy.clone(),
                    metadata,
                },
            );
        }

        let categories: Vec<String> = self
            .graph
            .count_by_category()
            .into_iter()
            .map(|(category, count)| format!("{category}: {count}"))
            .collect();
        info!(
            "Synthesised stack {}: {} resources ({}), {} parameters, creation order starts at {}",
            self.name(),
            resources.len(),
            categories.join(", "),
            self.parameters.len(),
            order.first().map(LogicalId::as_str).unwrap_or("<empty>")
        );

        Ok(Template {
            format_version: FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            resources,
            outputs: self.outputs.clone(),
        })
    }

    fn node_mut(&mut self, handle: &ResourceHandle) -> InfrastructureResult<&mut ResourceNode> {
        self.graph
            .node_mut(handle.logical_id())
            .ok_or_else(|| InfrastructureError::InvalidConstruct {
                path: handle.path().to_string(),
                reason: "resource is not registered in this stack".to_string(),
            })
    }

    fn record_references(
        &mut self,
        from: &LogicalId,
        references: Vec<ReferenceTarget>,
    ) -> InfrastructureResult<()> {
        for target in references {
            if target.is_pseudo() || self.parameters.contains_key(target.logical_id()) {
                continue;
            }
            let to = LogicalId::new(target.logical_id()).map_err(|_| {
                InfrastructureError::DanglingReference {
                    from: from.to_string(),
                    to: target.logical_id().to_string(),
                }
            })?;
            if self.graph.add_edge(from.clone(), to.clone(), EdgeKind::Reference) {
                debug!("Reference edge {} -> {}", from, to);
            }
        }
        Ok(())
    }

    fn check_attributes(&self) -> InfrastructureResult<()> {
        for node in self.graph.nodes() {
            for value in node.properties.values() {
                for target in intrinsic::collect_references(value) {
                    let ReferenceTarget::GetAtt {
                        logical_id,
                        attribute,
                    } = target
                    else {
                        continue;
                    };
                    let Some(resource) = LogicalId::new(logical_id.as_str())
                        .ok()
                        .and_then(|id| self.graph.node(&id))
                    else {
                        return Err(InfrastructureError::DanglingReference {
                            from: node.logical_id.to_string(),
                            to: logical_id,
                        });
                    };
                    if !resource.resource_type.attributes().contains(&attribute.as_str()) {
                        return Err(InfrastructureError::UnknownAttribute {
                            resource: logical_id,
                            resource_type: resource.resource_type.to_string(),
                            attribute,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
