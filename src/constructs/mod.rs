// Copyright (c) 2025 - Cowboy AI, Inc.
//! Constructs
//!
//! Higher level building blocks that each expand into several resources.
//! Every constructor takes the [`Stack`](crate::stack::Stack) by `&mut`, a
//! parent path and a construct id, and returns a value holding handles to the
//! resources it declared.

pub mod autoscaling;
pub mod elasticache;
pub mod load_balancer;
pub mod security_group;
pub mod vpc;

pub use autoscaling::{AutoScalingGroup, AutoScalingGroupProps};
pub use elasticache::{CacheCluster, CacheClusterProps, CacheSubnetGroup, CacheSubnetGroupProps};
pub use load_balancer::{ApplicationLoadBalancer, ApplicationLoadBalancerProps, Listener, TargetGroup};
pub use security_group::{Peer, SecurityGroup, SecurityGroupProps};
pub use vpc::{Subnet, SubnetConfiguration, SubnetKind, SubnetSelection, Vpc, VpcProps};
