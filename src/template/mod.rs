// Copyright (c) 2025 - Cowboy AI, Inc.
//! Synthesised Template Document
//!
//! The template is the structured resource graph handed to the provisioning
//! engine. All maps are ordered so the same declaration always serialises to
//! byte-identical JSON.

pub mod intrinsic;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use intrinsic::ReferenceTarget;

/// Template format version written into every document
pub const FORMAT_VERSION: &str = "2010-09-09";

/// Metadata key carrying the construct path of a resource
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

/// A CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub parameters: BTreeMap<String, TemplateParameter>,

    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

impl Template {
    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The template as a JSON value
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Resources of the given provider type name
    pub fn resources_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == type_name)
    }
}

/// A single resource entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub properties: Map<String, Value>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub update_policy: Option<Value>,

    #[serde(skip_serializing_if = "Map::is_empty", default)]
    pub metadata: Map<String, Value>,
}

/// A template parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}

/// A template output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    pub value: Value,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
}
