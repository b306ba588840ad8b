// Copyright (c) 2025 - Cowboy AI, Inc.
//! Autoscaling web fleet
//!
//! Expands into an instance role and profile, a launch configuration and the
//! group itself. When no security group is supplied the fleet declares its own.

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::{Capacity, ConstructPath, InstanceType, MachineImage, ResourceType};
use crate::errors::InfrastructureResult;
use crate::stack::{ResourceHandle, Stack};
use crate::user_data::UserData;

use super::load_balancer::TargetGroup;
use super::security_group::{SecurityGroup, SecurityGroupProps};
use super::vpc::{SubnetSelection, Vpc};

#[derive(Debug, Clone)]
pub struct AutoScalingGroupProps {
    pub instance_type: InstanceType,
    pub machine_image: MachineImage,
    pub user_data: UserData,
    pub capacity: Capacity,
    pub security_group: Option<SecurityGroup>,
    pub subnets: SubnetSelection,
}

#[derive(Debug, Clone)]
pub struct AutoScalingGroup {
    path: ConstructPath,
    group: ResourceHandle,
    launch_configuration: ResourceHandle,
    role: ResourceHandle,
    security_group: SecurityGroup,
    capacity: Capacity,
}

impl AutoScalingGroup {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        vpc: &Vpc,
        props: AutoScalingGroupProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;

        let security_group = match props.security_group {
            Some(sg) => sg,
            None => {
                warn!("{} has no security group; declaring its own", path);
                SecurityGroup::new(
                    stack,
                    &path,
                    "InstanceSecurityGroup",
                    vpc,
                    SecurityGroupProps::default(),
                )?
            }
        };

        let role = stack.add_resource(
            &path.child("InstanceRole")?,
            ResourceType::IamRole,
            json!({
                "AssumeRolePolicyDocument": {
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": {"Service": "ec2.amazonaws.com"}
                    }],
                    "Version": "2012-10-17"
                },
                "Tags": [{"Key": "Name", "Value": path.to_string()}],
            }),
        )?;

        let profile = stack.add_resource(
            &path.child("InstanceProfile")?,
            ResourceType::InstanceProfile,
            json!({ "Roles": [role.reference()] }),
        )?;

        let image_parameter = stack.add_ssm_image_parameter(props.machine_image.parameter_name())?;
        let launch_configuration = stack.add_resource(
            &path.child("LaunchConfig")?,
            ResourceType::LaunchConfiguration,
            json!({
                "IamInstanceProfile": profile.reference(),
                "ImageId": {"Ref": image_parameter},
                "InstanceType": props.instance_type.to_string(),
                "SecurityGroups": [security_group.group_id()],
                "UserData": props.user_data.to_property(),
            }),
        )?;
        stack.add_dependency(&launch_configuration, &role)?;

        let subnet_ids: Vec<_> = vpc
            .select_subnets(props.subnets)?
            .iter()
            .map(|s| s.subnet_id())
            .collect();

        let group_properties = json!({
            "LaunchConfigurationName": launch_configuration.reference(),
            "MaxSize": props.capacity.max().to_string(),
            "MinSize": props.capacity.min().to_string(),
            "Tags": [{
                "Key": "Name",
                "PropagateAtLaunch": true,
                "Value": path.to_string()
            }],
            "VPCZoneIdentifier": subnet_ids,
        });

        let group = stack.add_resource(
            &path.child("ASG")?,
            ResourceType::AutoScalingGroup,
            group_properties,
        )?;
        stack.set_update_policy(
            &group,
            json!({
                "AutoScalingScheduledAction": {"IgnoreUnmodifiedGroupSizeProperties": true}
            }),
        )?;

        debug!(
            "Declared fleet {} of {} ({}-{} instances)",
            path,
            props.instance_type,
            props.capacity.min(),
            props.capacity.max()
        );

        Ok(Self {
            path,
            group,
            launch_configuration,
            role,
            security_group,
            capacity: props.capacity,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.group
    }

    pub fn launch_configuration(&self) -> &ResourceHandle {
        &self.launch_configuration
    }

    pub fn role(&self) -> &ResourceHandle {
        &self.role
    }

    pub fn security_group(&self) -> &SecurityGroup {
        &self.security_group
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Register the fleet's instances with `target_group`
    pub fn attach_to_target_group(
        &self,
        stack: &mut Stack,
        target_group: &TargetGroup,
    ) -> InfrastructureResult<()> {
        stack.append_property(&self.group, "TargetGroupARNs", target_group.arn())
    }
}
