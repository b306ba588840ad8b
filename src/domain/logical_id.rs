// Copyright (c) 2025 - Cowboy AI, Inc.
//! Construct Paths and Logical IDs
//!
//! Every resource is registered under a construct path below its stack
//! (`VPC/PublicSubnet1/Subnet`). The template logical ID is derived from that
//! path deterministically, so re-declaring the same topology always yields the
//! same identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Logical ID / construct path validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LogicalIdError {
    #[error("Logical ID is empty")]
    Empty,

    #[error("Logical ID exceeds maximum length of 255 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in logical ID: {0}")]
    InvalidCharacter(char),

    #[error("Construct id is empty")]
    EmptyComponent,

    #[error("Construct id cannot contain a path separator: {0}")]
    SeparatorInComponent(String),
}

/// CloudFormation logical ID value object
///
/// Invariants:
/// - 1 to 255 characters
/// - ASCII alphanumeric only
///
/// # Examples
///
/// ```rust
/// use cache_cluster_infrastructure::domain::LogicalId;
///
/// assert!(LogicalId::new("MySubnetGroup").is_ok());
/// assert!(LogicalId::new("my-subnet-group").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Maximum logical ID length accepted by CloudFormation
    pub const MAX_LENGTH: usize = 255;

    pub fn new(id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();

        if id.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if id.len() > Self::MAX_LENGTH {
            return Err(LogicalIdError::TooLong(id.len()));
        }

        if let Some(ch) = id.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(LogicalIdError::InvalidCharacter(ch));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = LogicalIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Path of a construct inside a stack
///
/// The first component is the stack name; the rest identify the construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructPath {
    components: Vec<String>,
}

impl ConstructPath {
    /// Construct id hidden from both the human part and the digest
    pub const HIDDEN_ID: &'static str = "Default";

    /// Construct id hidden from the human part only
    pub const HIDDEN_FROM_HUMAN_ID: &'static str = "Resource";

    /// Maximum length of the human-readable part of a logical ID
    const MAX_HUMAN_LENGTH: usize = 240;

    /// Digest length appended to multi-component logical IDs
    const DIGEST_LENGTH: usize = 8;

    /// Path of a stack root
    pub fn root(stack_name: impl Into<String>) -> Result<Self, LogicalIdError> {
        let stack_name = stack_name.into();
        Self::validate_component(&stack_name)?;
        Ok(Self {
            components: vec![stack_name],
        })
    }

    /// Path of a child construct
    pub fn child(&self, id: impl Into<String>) -> Result<Self, LogicalIdError> {
        let id = id.into();
        Self::validate_component(&id)?;
        let mut components = self.components.clone();
        components.push(id);
        Ok(Self { components })
    }

    fn validate_component(id: &str) -> Result<(), LogicalIdError> {
        if id.is_empty() {
            return Err(LogicalIdError::EmptyComponent);
        }
        if id.contains('/') {
            return Err(LogicalIdError::SeparatorInComponent(id.to_string()));
        }
        Ok(())
    }

    /// Stack name at the root of this path
    pub fn stack_name(&self) -> &str {
        self.components.first().map(String::as_str).unwrap_or_default()
    }

    /// Components below the stack root
    pub fn relative(&self) -> &[String] {
        self.components.get(1..).unwrap_or_default()
    }

    /// Last component
    pub fn id(&self) -> &str {
        self.components.last().map(String::as_str).unwrap_or_default()
    }

    /// Path below the stack root, slash-separated
    pub fn relative_path(&self) -> String {
        self.relative().join("/")
    }

    /// Derive the logical ID for a resource at this path
    ///
    /// A single component is used as-is (alphanumerics only). Longer paths
    /// join their components and append an 8-character digest of the path.
    pub fn logical_id(&self) -> Result<LogicalId, LogicalIdError> {
        let components: Vec<&str> = self
            .relative()
            .iter()
            .map(String::as_str)
            .filter(|c| *c != Self::HIDDEN_ID)
            .collect();

        if components.is_empty() {
            return Err(LogicalIdError::Empty);
        }

        if let [single] = components.as_slice() {
            return LogicalId::new(remove_non_alphanumeric(single));
        }

        let mut human: Vec<&str> = components
            .iter()
            .copied()
            .filter(|c| *c != Self::HIDDEN_FROM_HUMAN_ID)
            .collect();
        human.dedup();

        let human: String = human
            .iter()
            .map(|c| remove_non_alphanumeric(c))
            .collect::<String>()
            .chars()
            .take(Self::MAX_HUMAN_LENGTH)
            .collect();

        LogicalId::new(format!("{human}{}", path_digest(&components)))
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("/"))
    }
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Uppercase hex prefix of a name-based UUID over the joined path
fn path_digest(components: &[&str]) -> String {
    let joined = components.join("/");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, joined.as_bytes())
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(ConstructPath::DIGEST_LENGTH)
        .collect()
}
