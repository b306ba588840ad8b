// Copyright (c) 2025 - Cowboy AI, Inc.
//! Infrastructure Domain Models
//!
//! Value objects the topology is declared with, each validating its own
//! invariants on construction, plus graph-wide invariant checks.
//!
//! # Value Objects with Invariants
//!
//! - [`LogicalId`] - template logical IDs (`[A-Za-z0-9]{1,255}`)
//! - [`ConstructPath`] - construct paths and the logical IDs derived from them
//! - [`Ipv4Cidr`] - aligned IPv4 CIDR blocks
//! - [`CidrAllocator`] - sequential subnet allocation inside a parent block
//! - [`Port`] - protocol and port range of a security group rule
//! - [`InstanceType`] - fleet instance class and size
//! - [`Capacity`] - fleet size bounds (`min <= max`)
//! - [`CacheNodeType`] - ElastiCache node type
//! - [`ResourceType`] - resource type taxonomy
//!
//! # Graph Invariants
//!
//! See [`invariants`].

pub mod compute;
pub mod invariants;
pub mod logical_id;
pub mod network;
pub mod resource_type;

// Re-export value objects
pub use compute::{
    AzMode, CacheEngine, CacheNodeType, Capacity, ComputeError, InstanceClass, InstanceSize,
    InstanceType, MachineImage,
};
pub use invariants::{ValidationError, ValidationResult};
pub use logical_id::{ConstructPath, LogicalId, LogicalIdError};
pub use network::{CidrAllocator, Ipv4Cidr, NetworkError, Port, Protocol};
pub use resource_type::{ResourceCategory, ResourceType, UnknownResourceType};
