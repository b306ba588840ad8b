// Copyright (c) 2025 - Cowboy AI, Inc.
//! CloudFormation Intrinsic Functions
//!
//! Property values are plain `serde_json::Value`s. Cross-resource references
//! are expressed with the intrinsics below, and [`collect_references`] reads
//! them back out so the stack can turn them into graph edges the moment a
//! resource is registered.

use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

/// Pseudo parameter prefix; `Ref`s to these never name a resource
pub const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

/// `{"Ref": logical_id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Base64": value}`
pub fn base64(value: impl Into<Value>) -> Value {
    json!({ "Fn::Base64": value.into() })
}

/// `{"Fn::Select": [index, list]}`
pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// `{"Fn::GetAZs": region}`; an empty region means the deploy region
pub fn get_azs(region: &str) -> Value {
    json!({ "Fn::GetAZs": region })
}

/// Tag list sorted by key
pub fn tags<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: Into<String>,
    V: Into<Value>,
{
    let mut pairs: Vec<(String, Value)> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Array(
        pairs
            .into_iter()
            .map(|(key, value)| json!({ "Key": key, "Value": value }))
            .collect(),
    )
}

/// A target named by a `Ref` or `Fn::GetAtt`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReferenceTarget {
    /// `Ref` to a resource, parameter or pseudo parameter
    Ref(String),
    /// `Fn::GetAtt` on a resource
    GetAtt { logical_id: String, attribute: String },
}

impl ReferenceTarget {
    /// Logical ID the reference points at
    pub fn logical_id(&self) -> &str {
        match self {
            Self::Ref(id) => id,
            Self::GetAtt { logical_id, .. } => logical_id,
        }
    }

    /// Whether the reference names a pseudo parameter
    pub fn is_pseudo(&self) -> bool {
        self.logical_id().starts_with(PSEUDO_PARAMETER_PREFIX)
    }
}

/// Collect every `Ref` / `Fn::GetAtt` target inside a property value
pub fn collect_references(value: &Value) -> BTreeSet<ReferenceTarget> {
    let mut out = BTreeSet::new();
    walk(value, &mut out);
    out
}

fn walk(value: &Value, out: &mut BTreeSet<ReferenceTarget>) {
    match value {
        Value::Object(map) => {
            if let Some(target) = as_reference(map) {
                out.insert(target);
                return;
            }
            for nested in map.values() {
                walk(nested, out);
            }
        }
        Value::Array(items) => {
            for nested in items {
                walk(nested, out);
            }
        }
        _ => {}
    }
}

fn as_reference(map: &Map<String, Value>) -> Option<ReferenceTarget> {
    if map.len() != 1 {
        return None;
    }

    if let Some(Value::String(id)) = map.get("Ref") {
        return Some(ReferenceTarget::Ref(id.clone()));
    }

    match map.get("Fn::GetAtt")? {
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(logical_id), Value::String(attribute)] => {
                Some(ReferenceTarget::GetAtt {
                    logical_id: logical_id.clone(),
                    attribute: attribute.clone(),
                })
            }
            _ => None,
        },
        // Short form: "LogicalId.Attribute"
        Value::String(dotted) => dotted.split_once('.').map(|(logical_id, attribute)| {
            ReferenceTarget::GetAtt {
                logical_id: logical_id.to_string(),
                attribute: attribute.to_string(),
            }
        }),
        _ => None,
    }
}

/// Logical ID named by a `Fn::GetAtt` with the given attribute, if `value` is one
pub fn get_att_target<'a>(value: &'a Value, attribute: &str) -> Option<&'a str> {
    let parts = value.get("Fn::GetAtt")?.as_array()?;
    match parts.as_slice() {
        [Value::String(logical_id), Value::String(attr)] if attr == attribute => {
            Some(logical_id.as_str())
        }
        _ => None,
    }
}
