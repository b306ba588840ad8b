// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cache Cluster Infrastructure
//!
//! Declarative topology for a web fleet behind an application load balancer
//! with an ElastiCache tier, rendered as a CloudFormation template.
//!
//! # Architecture
//!
//! - [`domain`] - value objects and graph invariants
//! - [`template`] - intrinsic functions and the template document
//! - [`graph`] - resource nodes with explicit and reference edges
//! - [`stack`] - the construction context every resource is registered in
//! - [`constructs`] - VPC, security groups, fleet, load balancer, cache
//! - [`topology`] - the baseline, minimal and final declarations
//! - [`assertions`] - template inspection for tests
//! - [`config`] - synth configuration from the environment
//!
//! Declaration is pure: the same [`topology::TopologyParams`] always produce
//! the same graph and byte-identical template JSON.

pub mod assertions;
pub mod config;
pub mod constructs;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod stack;
pub mod template;
pub mod topology;
pub mod user_data;

pub use errors::{InfrastructureError, InfrastructureResult};
pub use stack::{Environment, Stack};
pub use template::Template;
pub use topology::{declare, synthesize, TopologyDeclaration, TopologyParams, TopologyVariant};
