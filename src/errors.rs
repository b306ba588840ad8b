// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for topology declaration

use thiserror::Error;

use crate::domain::{ComputeError, LogicalIdError, NetworkError, ValidationError};
use crate::user_data::UserDataError;

/// Errors that can occur while declaring or synthesising a topology
///
/// None of these describe cloud-side failures; each one is a contradiction
/// inside the declaration itself.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Invalid construct id or logical id
    #[error("Logical ID error: {0}")]
    LogicalId(#[from] LogicalIdError),

    /// Invalid address space or port
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Invalid sizing
    #[error("Compute error: {0}")]
    Compute(#[from] ComputeError),

    /// Violated topology invariant
    #[error("Invariant violated: {0}")]
    Invariant(#[from] ValidationError),

    /// Invalid boot script
    #[error("User data error: {0}")]
    UserData(#[from] UserDataError),

    /// Two resources resolved to the same logical ID
    #[error("Duplicate logical ID: {0}")]
    DuplicateLogicalId(String),

    /// A resource refers to a logical ID that was never declared
    #[error("Resource {from} references undeclared resource {to}")]
    DanglingReference { from: String, to: String },

    /// An attribute that the resource type does not expose
    #[error("Resource {resource} ({resource_type}) has no attribute {attribute}")]
    UnknownAttribute {
        resource: String,
        resource_type: String,
        attribute: String,
    },

    /// The depends-on graph contains a cycle
    #[error("Dependency cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    /// A construct was configured inconsistently
    #[error("Invalid construct {path}: {reason}")]
    InvalidConstruct { path: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Writing the template failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for topology operations
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;

impl From<serde_json::Error> for InfrastructureError {
    fn from(err: serde_json::Error) -> Self {
        InfrastructureError::Serialization(err.to_string())
    }
}
