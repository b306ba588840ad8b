// Copyright (c) 2025 - Cowboy AI, Inc.
//! Virtual network with public and private subnet tiers
//!
//! Per availability zone every tier gets a subnet, a route table, an
//! association and a default route. Public subnets route through the internet
//! gateway and each hosts a NAT gateway; private subnets route through the NAT
//! gateway of their own zone.
//!
//! # Address allocation
//!
//! Subnets are allocated in tier order, then zone order, each aligned to its
//! prefix. Tiers without a fixed prefix share an even split of the space the
//! fixed tiers leave free, so the default two tiers across two zones of a
//! `/16` become four `/18`s.

use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{CidrAllocator, ConstructPath, Ipv4Cidr, ResourceType};
use crate::errors::{InfrastructureError, InfrastructureResult};
use crate::stack::{ResourceHandle, Stack};
use crate::template::intrinsic;

/// Default address space
pub const DEFAULT_CIDR: &str = "10.0.0.0/16";

/// Default number of availability zones
pub const DEFAULT_MAX_AZS: usize = 2;

/// Tier of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubnetKind {
    /// Routes to the internet gateway and hosts NAT gateways
    Public,
    /// Routes outbound traffic through the NAT gateway of its zone
    PrivateWithEgress,
}

impl SubnetKind {
    /// Value of the `aws-cdk:subnet-type` tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithEgress => "Private",
        }
    }
}

/// One subnet tier, repeated in every availability zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetConfiguration {
    pub name: String,
    pub kind: SubnetKind,
    /// Prefix length; `None` takes an even share of the free space
    pub cidr_mask: Option<u8>,
}

impl SubnetConfiguration {
    pub fn public(name: impl Into<String>, cidr_mask: Option<u8>) -> Self {
        Self {
            name: name.into(),
            kind: SubnetKind::Public,
            cidr_mask,
        }
    }

    pub fn private(name: impl Into<String>, cidr_mask: Option<u8>) -> Self {
        Self {
            name: name.into(),
            kind: SubnetKind::PrivateWithEgress,
            cidr_mask,
        }
    }
}

/// Which subnets a construct is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubnetSelection {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone)]
pub struct VpcProps {
    pub cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub subnet_configuration: Vec<SubnetConfiguration>,
}

impl VpcProps {
    /// Public and private tiers with the given prefix for both
    pub fn with_tier_mask(cidr_mask: Option<u8>) -> InfrastructureResult<Self> {
        Ok(Self {
            cidr: Ipv4Cidr::new(DEFAULT_CIDR)?,
            max_azs: DEFAULT_MAX_AZS,
            subnet_configuration: vec![
                SubnetConfiguration::public("Public", cidr_mask),
                SubnetConfiguration::private("Private", cidr_mask),
            ],
        })
    }
}

/// A declared subnet and its routing
#[derive(Debug, Clone)]
pub struct Subnet {
    pub kind: SubnetKind,
    pub cidr: Ipv4Cidr,
    pub availability_zone: Value,
    pub subnet: ResourceHandle,
    pub route_table: ResourceHandle,
    pub association: ResourceHandle,
    pub default_route: ResourceHandle,
}

impl Subnet {
    /// `{"Ref": <subnet>}`
    pub fn subnet_id(&self) -> Value {
        self.subnet.reference()
    }
}

/// A declared network
#[derive(Debug, Clone)]
pub struct Vpc {
    path: ConstructPath,
    vpc: ResourceHandle,
    cidr: Ipv4Cidr,
    availability_zones: Vec<Value>,
    public_subnets: Vec<Subnet>,
    private_subnets: Vec<Subnet>,
    nat_gateways: Vec<ResourceHandle>,
    internet_gateway: Option<ResourceHandle>,
}

impl Vpc {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        props: VpcProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;
        if props.subnet_configuration.is_empty() {
            return Err(InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: "at least one subnet tier is required".to_string(),
            });
        }
        let has_public = props
            .subnet_configuration
            .iter()
            .any(|c| c.kind == SubnetKind::Public);
        let has_private = props
            .subnet_configuration
            .iter()
            .any(|c| c.kind == SubnetKind::PrivateWithEgress);
        if has_private && !has_public {
            return Err(InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: "private subnets with egress need a public tier for NAT gateways"
                    .to_string(),
            });
        }

        let availability_zones = stack.availability_zones(props.max_azs);
        let cidrs = allocate_subnets(&props, availability_zones.len())?;

        let vpc = stack.add_resource(
            &path.child("Resource")?,
            ResourceType::Vpc,
            json!({
                "CidrBlock": props.cidr,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": intrinsic::tags([("Name", path.to_string())]),
            }),
        )?;

        let mut network = Self {
            path: path.clone(),
            vpc,
            cidr: props.cidr,
            availability_zones: availability_zones.clone(),
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            nat_gateways: Vec::new(),
            internet_gateway: None,
        };

        let mut gateway_attachment = None;
        if has_public {
            let igw = stack.add_resource(
                &path.child("IGW")?,
                ResourceType::InternetGateway,
                json!({ "Tags": intrinsic::tags([("Name", path.to_string())]) }),
            )?;
            let attachment = stack.add_resource(
                &path.child("VPCGW")?,
                ResourceType::VpcGatewayAttachment,
                json!({
                    "InternetGatewayId": igw.reference(),
                    "VpcId": network.vpc.reference(),
                }),
            )?;
            network.internet_gateway = Some(igw);
            gateway_attachment = Some(attachment);
        }

        // Public tiers first so private routes can target their NAT gateways
        let zone_count = availability_zones.len();
        for kind in [SubnetKind::Public, SubnetKind::PrivateWithEgress] {
            for (tier, config) in props.subnet_configuration.iter().enumerate() {
                if config.kind != kind {
                    continue;
                }
                for (index, zone) in availability_zones.iter().enumerate() {
                    let cidr = cidrs[tier * zone_count + index];
                    let subnet_path = path.child(format!("{}Subnet{}", config.name, index + 1))?;
                    match kind {
                        SubnetKind::Public => {
                            let subnet = network.public_subnet(
                                stack,
                                &subnet_path,
                                config,
                                cidr,
                                zone.clone(),
                                gateway_attachment.as_ref(),
                            )?;
                            network.public_subnets.push(subnet);
                        }
                        SubnetKind::PrivateWithEgress => {
                            let subnet = network.private_subnet(
                                stack,
                                &subnet_path,
                                config,
                                cidr,
                                zone.clone(),
                                index,
                            )?;
                            network.private_subnets.push(subnet);
                        }
                    }
                }
            }
        }

        debug!(
            "Declared network {} ({}) with {} public and {} private subnets",
            network.path,
            network.cidr,
            network.public_subnets.len(),
            network.private_subnets.len()
        );
        Ok(network)
    }

    fn subnet_common(
        &self,
        stack: &mut Stack,
        path: &ConstructPath,
        config: &SubnetConfiguration,
        cidr: Ipv4Cidr,
        zone: Value,
    ) -> InfrastructureResult<(ResourceHandle, ResourceHandle, ResourceHandle)> {
        let subnet = stack.add_resource(
            &path.child("Subnet")?,
            ResourceType::Subnet,
            json!({
                "AvailabilityZone": zone,
                "CidrBlock": cidr,
                "MapPublicIpOnLaunch": config.kind == SubnetKind::Public,
                "Tags": intrinsic::tags([
                    ("Name", path.to_string()),
                    ("aws-cdk:subnet-name", config.name.clone()),
                    ("aws-cdk:subnet-type", config.kind.tag().to_string()),
                ]),
                "VpcId": self.vpc.reference(),
            }),
        )?;
        let route_table = stack.add_resource(
            &path.child("RouteTable")?,
            ResourceType::RouteTable,
            json!({
                "Tags": intrinsic::tags([("Name", path.to_string())]),
                "VpcId": self.vpc.reference(),
            }),
        )?;
        let association = stack.add_resource(
            &path.child("RouteTableAssociation")?,
            ResourceType::SubnetRouteTableAssociation,
            json!({
                "RouteTableId": route_table.reference(),
                "SubnetId": subnet.reference(),
            }),
        )?;
        Ok((subnet, route_table, association))
    }

    fn public_subnet(
        &mut self,
        stack: &mut Stack,
        path: &ConstructPath,
        config: &SubnetConfiguration,
        cidr: Ipv4Cidr,
        zone: Value,
        gateway_attachment: Option<&ResourceHandle>,
    ) -> InfrastructureResult<Subnet> {
        let (subnet, route_table, association) =
            self.subnet_common(stack, path, config, cidr, zone.clone())?;

        let igw = self
            .internet_gateway
            .as_ref()
            .ok_or_else(|| InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: "public subnet without an internet gateway".to_string(),
            })?;
        let default_route = stack.add_resource(
            &path.child("DefaultRoute")?,
            ResourceType::Route,
            json!({
                "DestinationCidrBlock": Ipv4Cidr::ANY,
                "GatewayId": igw.reference(),
                "RouteTableId": route_table.reference(),
            }),
        )?;
        if let Some(attachment) = gateway_attachment {
            stack.add_dependency(&default_route, attachment)?;
        }

        let eip = stack.add_resource(
            &path.child("EIP")?,
            ResourceType::ElasticIp,
            json!({
                "Domain": "vpc",
                "Tags": intrinsic::tags([("Name", path.to_string())]),
            }),
        )?;
        let nat = stack.add_resource(
            &path.child("NATGateway")?,
            ResourceType::NatGateway,
            json!({
                "AllocationId": eip.attribute("AllocationId"),
                "SubnetId": subnet.reference(),
                "Tags": intrinsic::tags([("Name", path.to_string())]),
            }),
        )?;
        stack.add_dependency(&nat, &default_route)?;
        stack.add_dependency(&nat, &association)?;
        self.nat_gateways.push(nat);

        Ok(Subnet {
            kind: SubnetKind::Public,
            cidr,
            availability_zone: zone,
            subnet,
            route_table,
            association,
            default_route,
        })
    }

    fn private_subnet(
        &self,
        stack: &mut Stack,
        path: &ConstructPath,
        config: &SubnetConfiguration,
        cidr: Ipv4Cidr,
        zone: Value,
        zone_index: usize,
    ) -> InfrastructureResult<Subnet> {
        let (subnet, route_table, association) =
            self.subnet_common(stack, path, config, cidr, zone.clone())?;

        if self.nat_gateways.is_empty() {
            return Err(InfrastructureError::InvalidConstruct {
                path: path.to_string(),
                reason: "no NAT gateway to route through".to_string(),
            });
        }
        let nat = &self.nat_gateways[zone_index % self.nat_gateways.len()];
        let default_route = stack.add_resource(
            &path.child("DefaultRoute")?,
            ResourceType::Route,
            json!({
                "DestinationCidrBlock": Ipv4Cidr::ANY,
                "NatGatewayId": nat.reference(),
                "RouteTableId": route_table.reference(),
            }),
        )?;

        Ok(Subnet {
            kind: SubnetKind::PrivateWithEgress,
            cidr,
            availability_zone: zone,
            subnet,
            route_table,
            association,
            default_route,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// `{"Ref": <vpc>}`
    pub fn vpc_id(&self) -> Value {
        self.vpc.reference()
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.vpc
    }

    pub fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    pub fn availability_zones(&self) -> &[Value] {
        &self.availability_zones
    }

    /// NAT gateways, one per public subnet
    pub fn nat_gateways(&self) -> &[ResourceHandle] {
        &self.nat_gateways
    }

    pub fn public_subnets(&self) -> &[Subnet] {
        &self.public_subnets
    }

    pub fn private_subnets(&self) -> &[Subnet] {
        &self.private_subnets
    }

    pub fn select_subnets(&self, selection: SubnetSelection) -> InfrastructureResult<&[Subnet]> {
        let subnets = match selection {
            SubnetSelection::Public => &self.public_subnets,
            SubnetSelection::Private => &self.private_subnets,
        };
        if subnets.is_empty() {
            return Err(InfrastructureError::InvalidConstruct {
                path: self.path.to_string(),
                reason: format!("no {selection:?} subnets to select"),
            });
        }
        Ok(subnets)
    }

    /// Resources that must exist before the public subnets reach the internet
    pub fn internet_connectivity(&self) -> Vec<&ResourceHandle> {
        self.public_subnets
            .iter()
            .flat_map(|s| [&s.default_route, &s.association])
            .collect()
    }
}

/// CIDR blocks for every subnet, in tier order then zone order
fn allocate_subnets(props: &VpcProps, zone_count: usize) -> InfrastructureResult<Vec<Ipv4Cidr>> {
    let zones = zone_count as u64;
    let reserved: u64 = props
        .subnet_configuration
        .iter()
        .filter_map(|config| config.cidr_mask)
        .map(|mask| (1u64 << (32 - u32::from(mask.min(32)))) * zones)
        .sum();
    let unmasked = props
        .subnet_configuration
        .iter()
        .filter(|config| config.cidr_mask.is_none())
        .count()
        * zone_count;
    let share = if unmasked > 0 {
        Some(CidrAllocator::even_split_prefix(&props.cidr, reserved, unmasked)?)
    } else {
        None
    };

    let mut allocator = CidrAllocator::new(props.cidr);
    let mut blocks = Vec::with_capacity(props.subnet_configuration.len() * zone_count);
    for config in &props.subnet_configuration {
        let mask = match (config.cidr_mask, share) {
            (Some(mask), _) | (None, Some(mask)) => mask,
            (None, None) => continue,
        };
        for _ in 0..zone_count {
            blocks.push(allocator.allocate(mask)?);
        }
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Environment;

    fn declare(props: VpcProps) -> (Stack, Vpc) {
        let mut stack = Stack::new("Net", Environment::agnostic()).unwrap();
        let root = stack.root().clone();
        let vpc = Vpc::new(&mut stack, &root, "VPC", props).unwrap();
        (stack, vpc)
    }

    fn cidrs(subnets: &[Subnet]) -> Vec<String> {
        subnets.iter().map(|s| s.cidr.to_string()).collect()
    }

    #[test]
    fn test_default_split_is_four_eighteens() {
        let (_, vpc) = declare(VpcProps::with_tier_mask(None).unwrap());
        assert_eq!(cidrs(vpc.public_subnets()), vec!["10.0.0.0/18", "10.0.64.0/18"]);
        assert_eq!(cidrs(vpc.private_subnets()), vec!["10.0.128.0/18", "10.0.192.0/18"]);
    }

    #[test]
    fn test_fixed_masks_are_sequential() {
        let (_, vpc) = declare(VpcProps::with_tier_mask(Some(24)).unwrap());
        assert_eq!(cidrs(vpc.public_subnets()), vec!["10.0.0.0/24", "10.0.1.0/24"]);
        assert_eq!(cidrs(vpc.private_subnets()), vec!["10.0.2.0/24", "10.0.3.0/24"]);
    }

    #[test]
    fn test_mixed_masks_allocate_in_tier_order() {
        let props = |public, private| VpcProps {
            cidr: Ipv4Cidr::new(DEFAULT_CIDR).unwrap(),
            max_azs: 2,
            subnet_configuration: vec![
                SubnetConfiguration::public("Public", public),
                SubnetConfiguration::private("Private", private),
            ],
        };

        let (_, vpc) = declare(props(Some(24), None));
        assert_eq!(cidrs(vpc.public_subnets()), vec!["10.0.0.0/24", "10.0.1.0/24"]);
        assert_eq!(cidrs(vpc.private_subnets()), vec!["10.0.64.0/18", "10.0.128.0/18"]);

        let (_, vpc) = declare(props(None, Some(20)));
        assert_eq!(cidrs(vpc.public_subnets()), vec!["10.0.0.0/18", "10.0.64.0/18"]);
        assert_eq!(cidrs(vpc.private_subnets()), vec!["10.0.128.0/20", "10.0.144.0/20"]);
    }

    #[test]
    fn test_resource_counts() {
        let (stack, _) = declare(VpcProps::with_tier_mask(None).unwrap());
        let graph = stack.graph();
        assert_eq!(graph.count_of_type(ResourceType::Vpc), 1);
        assert_eq!(graph.count_of_type(ResourceType::Subnet), 4);
        assert_eq!(graph.count_of_type(ResourceType::RouteTable), 4);
        assert_eq!(graph.count_of_type(ResourceType::SubnetRouteTableAssociation), 4);
        assert_eq!(graph.count_of_type(ResourceType::Route), 4);
        assert_eq!(graph.count_of_type(ResourceType::InternetGateway), 1);
        assert_eq!(graph.count_of_type(ResourceType::VpcGatewayAttachment), 1);
        assert_eq!(graph.count_of_type(ResourceType::ElasticIp), 2);
        assert_eq!(graph.count_of_type(ResourceType::NatGateway), 2);
        assert!(stack.synth().is_ok());
    }

    #[test]
    fn test_private_routes_use_nat_of_same_zone() {
        let (stack, vpc) = declare(VpcProps::with_tier_mask(None).unwrap());
        let pairs = vpc.public_subnets().iter().zip(vpc.private_subnets());
        for ((public, private), nat) in pairs.zip(vpc.nat_gateways()) {
            let route = stack.graph().node(private.default_route.logical_id()).unwrap();
            assert_eq!(route.properties["NatGatewayId"], nat.reference());
            assert!(stack.graph().has_edge(nat.logical_id(), public.subnet.logical_id()));
            assert_eq!(public.availability_zone, private.availability_zone);
        }
    }

    #[test]
    fn test_vpc_logical_id_hides_resource() {
        let (_, vpc) = declare(VpcProps::with_tier_mask(None).unwrap());
        let id = vpc.handle().logical_id().as_str();
        assert!(id.starts_with("VPC"));
        assert_eq!(id.len(), "VPC".len() + 8);
    }

    #[test]
    fn test_private_without_public_rejected() {
        let mut stack = Stack::new("Net", Environment::agnostic()).unwrap();
        let root = stack.root().clone();
        let props = VpcProps {
            cidr: Ipv4Cidr::new(DEFAULT_CIDR).unwrap(),
            max_azs: 2,
            subnet_configuration: vec![SubnetConfiguration::private("Private", None)],
        };
        assert!(Vpc::new(&mut stack, &root, "VPC", props).is_err());
    }

    #[test]
    fn test_exhausted_space_is_an_error() {
        let mut stack = Stack::new("Net", Environment::agnostic()).unwrap();
        let root = stack.root().clone();
        let props = VpcProps {
            cidr: Ipv4Cidr::new("10.0.0.0/24").unwrap(),
            max_azs: 2,
            subnet_configuration: vec![
                SubnetConfiguration::public("Public", Some(24)),
                SubnetConfiguration::private("Private", Some(24)),
            ],
        };
        assert!(matches!(
            Vpc::new(&mut stack, &root, "VPC", props),
            Err(InfrastructureError::Network(_))
        ));
    }
}
