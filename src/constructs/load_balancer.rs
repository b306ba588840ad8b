// Copyright (c) 2025 - Cowboy AI, Inc.
//! Application load balancer, listener and target group
//!
//! The balancer sits in the public subnets and waits for their default routes.
//! Adding a fleet as a target registers the fleet with the target group and
//! opens the balancer-to-fleet path on the target port.

use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{ConstructPath, Port, ResourceType};
use crate::errors::InfrastructureResult;
use crate::stack::{ResourceHandle, Stack};

use super::autoscaling::AutoScalingGroup;
use super::security_group::{Peer, SecurityGroup, SecurityGroupProps};
use super::vpc::{SubnetSelection, Vpc};

#[derive(Debug, Clone, Default)]
pub struct ApplicationLoadBalancerProps {
    pub internet_facing: bool,
    /// Reuse an existing group instead of declaring one
    pub security_group: Option<SecurityGroup>,
}

#[derive(Debug, Clone)]
pub struct ApplicationLoadBalancer {
    path: ConstructPath,
    handle: ResourceHandle,
    security_group: SecurityGroup,
    vpc_id: Value,
}

impl ApplicationLoadBalancer {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        vpc: &Vpc,
        props: ApplicationLoadBalancerProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;
        let resource_path = path.child("Resource")?;

        let security_group = match props.security_group {
            Some(sg) => sg,
            None => {
                let description = format!(
                    "Automatically created Security Group for ELB {}",
                    resource_path.logical_id()?
                );
                SecurityGroup::new(
                    stack,
                    &path,
                    "SecurityGroup",
                    vpc,
                    SecurityGroupProps {
                        security_group_name: None,
                        description: Some(description),
                        allow_all_outbound: false,
                    },
                )?
            }
        };

        let selection = if props.internet_facing {
            SubnetSelection::Public
        } else {
            SubnetSelection::Private
        };
        let subnets: Vec<Value> = vpc
            .select_subnets(selection)?
            .iter()
            .map(|s| s.subnet_id())
            .collect();

        let scheme = if props.internet_facing {
            "internet-facing"
        } else {
            "internal"
        };
        let handle = stack.add_resource(
            &resource_path,
            ResourceType::LoadBalancer,
            json!({
                "LoadBalancerAttributes": [{"Key": "deletion_protection.enabled", "Value": "false"}],
                "Scheme": scheme,
                "SecurityGroups": [security_group.group_id()],
                "Subnets": subnets,
                "Type": "application",
            }),
        )?;

        if props.internet_facing {
            for dependency in vpc.internet_connectivity() {
                stack.add_dependency(&handle, dependency)?;
            }
        }

        Ok(Self {
            path,
            handle,
            security_group,
            vpc_id: vpc.vpc_id(),
        })
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    /// Declare an HTTP listener; `open` admits the whole internet on `port`
    pub fn add_listener(
        &self,
        stack: &mut Stack,
        id: &str,
        port: u16,
        open: bool,
    ) -> InfrastructureResult<Listener> {
        let path = self.path.child(id)?;
        let handle = stack.add_resource(
            &path.child("Resource")?,
            ResourceType::Listener,
            json!({
                "LoadBalancerArn": self.handle.reference(),
                "Port": port,
                "Protocol": "HTTP",
            }),
        )?;

        if open {
            self.security_group.add_ingress_rule(
                stack,
                &Peer::any_ipv4(),
                Port::tcp(port),
                Some(&format!("Allow from anyone on port {port}")),
            )?;
        }

        debug!("Declared listener {} on port {}", path, port);
        Ok(Listener {
            path,
            handle,
            security_group: self.security_group.clone(),
            vpc_id: self.vpc_id.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Listener {
    path: ConstructPath,
    handle: ResourceHandle,
    security_group: SecurityGroup,
    vpc_id: Value,
}

impl Listener {
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Forward to a new HTTP target group holding `targets`
    pub fn add_targets(
        &self,
        stack: &mut Stack,
        id: &str,
        port: u16,
        targets: &[&AutoScalingGroup],
    ) -> InfrastructureResult<TargetGroup> {
        let path = self.path.child(format!("{id}Group"))?;
        let handle = stack.add_resource(
            &path.child("Resource")?,
            ResourceType::TargetGroup,
            json!({
                "Port": port,
                "Protocol": "HTTP",
                "TargetGroupAttributes": [{"Key": "stickiness.enabled", "Value": "false"}],
                "TargetType": "instance",
                "VpcId": self.vpc_id,
            }),
        )?;
        let target_group = TargetGroup { handle };

        stack.set_property(
            &self.handle,
            "DefaultActions",
            json!([{"TargetGroupArn": target_group.arn(), "Type": "forward"}]),
        )?;

        for target in targets {
            target.attach_to_target_group(stack, &target_group)?;
            target.security_group().allow_from(
                stack,
                &self.security_group,
                Port::tcp(port),
                Some("Load balancer to target"),
            )?;
        }

        debug!("Declared target group {} with {} targets", path, targets.len());
        Ok(target_group)
    }
}

#[derive(Debug, Clone)]
pub struct TargetGroup {
    handle: ResourceHandle,
}

impl TargetGroup {
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// `{"Ref": <target group>}`, which resolves to its ARN
    pub fn arn(&self) -> Value {
        self.handle.reference()
    }
}
