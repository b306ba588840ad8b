// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cloud Resource Type Domain Model
//!
//! Defines the taxonomy of CloudFormation resource types the topology can
//! declare. Each variant maps to exactly one provider type name, which is
//! what ends up in the `Type` field of the synthesised template.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unknown resource type name
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unsupported resource type: {0}")]
pub struct UnknownResourceType(pub String);

/// Cloud resource type taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceType {
    // Network
    /// Virtual private cloud
    Vpc,
    /// Subnet inside a VPC
    Subnet,
    /// Route table
    RouteTable,
    /// Subnet ↔ route table association
    SubnetRouteTableAssociation,
    /// Single route entry
    Route,
    /// Internet gateway
    InternetGateway,
    /// Internet gateway ↔ VPC attachment
    VpcGatewayAttachment,
    /// Elastic IP
    ElasticIp,
    /// NAT gateway
    NatGateway,

    // Security
    /// Security group
    SecurityGroup,
    /// Standalone ingress rule
    SecurityGroupIngress,
    /// Standalone egress rule
    SecurityGroupEgress,

    // Identity
    /// IAM role
    IamRole,
    /// EC2 instance profile
    InstanceProfile,

    // Compute
    /// Autoscaling launch configuration
    LaunchConfiguration,
    /// Autoscaling group
    AutoScalingGroup,

    // Load balancing
    /// Application load balancer
    LoadBalancer,
    /// Load balancer listener
    Listener,
    /// Load balancer target group
    TargetGroup,

    // Cache
    /// ElastiCache subnet group
    CacheSubnetGroup,
    /// ElastiCache cluster
    CacheCluster,
}

impl ResourceType {
    /// Every supported type, in declaration order
    pub const ALL: [ResourceType; 21] = [
        Self::Vpc,
        Self::Subnet,
        Self::RouteTable,
        Self::SubnetRouteTableAssociation,
        Self::Route,
        Self::InternetGateway,
        Self::VpcGatewayAttachment,
        Self::ElasticIp,
        Self::NatGateway,
        Self::SecurityGroup,
        Self::SecurityGroupIngress,
        Self::SecurityGroupEgress,
        Self::IamRole,
        Self::InstanceProfile,
        Self::LaunchConfiguration,
        Self::AutoScalingGroup,
        Self::LoadBalancer,
        Self::Listener,
        Self::TargetGroup,
        Self::CacheSubnetGroup,
        Self::CacheCluster,
    ];

    /// Provider type name used in templates
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::SecurityGroupEgress => "AWS::EC2::SecurityGroupEgress",
            Self::IamRole => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::LaunchConfiguration => "AWS::AutoScaling::LaunchConfiguration",
            Self::AutoScalingGroup => "AWS::AutoScaling::AutoScalingGroup",
            Self::LoadBalancer => "AWS::ElasticLoadBalancingV2::LoadBalancer",
            Self::Listener => "AWS::ElasticLoadBalancingV2::Listener",
            Self::TargetGroup => "AWS::ElasticLoadBalancingV2::TargetGroup",
            Self::CacheSubnetGroup => "AWS::ElastiCache::SubnetGroup",
            Self::CacheCluster => "AWS::ElastiCache::CacheCluster",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vpc => "VPC",
            Self::Subnet => "Subnet",
            Self::RouteTable => "Route Table",
            Self::SubnetRouteTableAssociation => "Route Table Association",
            Self::Route => "Route",
            Self::InternetGateway => "Internet Gateway",
            Self::VpcGatewayAttachment => "Gateway Attachment",
            Self::ElasticIp => "Elastic IP",
            Self::NatGateway => "NAT Gateway",
            Self::SecurityGroup => "Security Group",
            Self::SecurityGroupIngress => "Ingress Rule",
            Self::SecurityGroupEgress => "Egress Rule",
            Self::IamRole => "IAM Role",
            Self::InstanceProfile => "Instance Profile",
            Self::LaunchConfiguration => "Launch Configuration",
            Self::AutoScalingGroup => "Auto Scaling Group",
            Self::LoadBalancer => "Load Balancer",
            Self::Listener => "Listener",
            Self::TargetGroup => "Target Group",
            Self::CacheSubnetGroup => "Cache Subnet Group",
            Self::CacheCluster => "Cache Cluster",
        }
    }

    /// Get the primary category for this resource type
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Vpc
            | Self::Subnet
            | Self::RouteTable
            | Self::SubnetRouteTableAssociation
            | Self::Route
            | Self::InternetGateway
            | Self::VpcGatewayAttachment
            | Self::ElasticIp
            | Self::NatGateway => ResourceCategory::Network,

            Self::SecurityGroup | Self::SecurityGroupIngress | Self::SecurityGroupEgress => {
                ResourceCategory::Security
            }

            Self::IamRole | Self::InstanceProfile => ResourceCategory::Identity,

            Self::LaunchConfiguration | Self::AutoScalingGroup => ResourceCategory::Compute,

            Self::LoadBalancer | Self::Listener | Self::TargetGroup => {
                ResourceCategory::LoadBalancing
            }

            Self::CacheSubnetGroup | Self::CacheCluster => ResourceCategory::Cache,
        }
    }

    /// Attributes readable through `Fn::GetAtt`
    ///
    /// Only the attributes this crate reads are listed.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Vpc => &["CidrBlock", "DefaultSecurityGroup", "VpcId"],
            Self::Subnet => &["AvailabilityZone", "SubnetId"],
            Self::ElasticIp => &["AllocationId", "PublicIp"],
            Self::SecurityGroup => &["GroupId", "VpcId"],
            Self::IamRole => &["Arn", "RoleId"],
            Self::InstanceProfile => &["Arn"],
            Self::LoadBalancer => &["DNSName", "LoadBalancerFullName", "CanonicalHostedZoneID"],
            Self::TargetGroup => &["TargetGroupFullName", "TargetGroupName"],
            Self::CacheCluster => &[
                "ConfigurationEndpoint.Address",
                "ConfigurationEndpoint.Port",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownResourceType(s.to_string()))
    }
}

impl TryFrom<String> for ResourceType {
    type Error = UnknownResourceType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.as_str().to_string()
    }
}

/// Resource category (high-level grouping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Addressing, routing and gateways
    Network,
    /// Traffic filters
    Security,
    /// Roles and profiles
    Identity,
    /// Instance fleets
    Compute,
    /// Public entry points
    LoadBalancing,
    /// Managed cache
    Cache,
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "Network"),
            Self::Security => write!(f, "Security"),
            Self::Identity => write!(f, "Identity"),
            Self::Compute => write!(f, "Compute"),
            Self::LoadBalancing => write!(f, "Load Balancing"),
            Self::Cache => write!(f, "Cache"),
        }
    }
}
