// Copyright (c) 2025 - Cowboy AI, Inc.
//! Security groups and the rules between them
//!
//! Rules whose peer is a CIDR block are written inline on the group. Rules
//! whose peer is another group become standalone ingress/egress resources, so
//! two groups can refer to each other without a cycle in the graph.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::{ConstructPath, Ipv4Cidr, LogicalId, Port, Protocol, ResourceType};
use crate::errors::InfrastructureResult;
use crate::stack::{ResourceHandle, Stack};
use crate::template::intrinsic;

use super::vpc::Vpc;

/// Placeholder egress that matches no traffic
///
/// A group with an empty egress list would get the engine's allow-all
/// default, so a rule that cannot match anything stands in for "none".
pub const DISALLOW_ALL_CIDR: &str = "255.255.255.255/32";

/// The other side of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peer {
    Cidr(Ipv4Cidr),
    SecurityGroup(LogicalId),
}

impl Peer {
    pub fn any_ipv4() -> Self {
        Self::Cidr(Ipv4Cidr::ANY)
    }

    /// Name used in rule ids and default descriptions
    fn unique_id(&self) -> String {
        match self {
            Self::Cidr(cidr) => cidr.to_string(),
            Self::SecurityGroup(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityGroupProps {
    pub security_group_name: Option<String>,
    pub description: Option<String>,
    pub allow_all_outbound: bool,
}

impl Default for SecurityGroupProps {
    fn default() -> Self {
        Self {
            security_group_name: None,
            description: None,
            allow_all_outbound: true,
        }
    }
}

impl SecurityGroupProps {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            security_group_name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    path: ConstructPath,
    handle: ResourceHandle,
    allow_all_outbound: bool,
}

impl SecurityGroup {
    pub fn new(
        stack: &mut Stack,
        scope: &ConstructPath,
        id: &str,
        vpc: &Vpc,
        props: SecurityGroupProps,
    ) -> InfrastructureResult<Self> {
        let path = scope.child(id)?;
        let description = props
            .description
            .unwrap_or_else(|| path.to_string());

        let egress = if props.allow_all_outbound {
            json!([{
                "CidrIp": Ipv4Cidr::ANY,
                "Description": "Allow all outbound traffic by default",
                "IpProtocol": Protocol::All.as_str(),
            }])
        } else {
            let placeholder = Port::icmp(252, 86);
            json!([{
                "CidrIp": DISALLOW_ALL_CIDR,
                "Description": "Disallow all traffic",
                "FromPort": placeholder.from_port(),
                "IpProtocol": placeholder.protocol().as_str(),
                "ToPort": placeholder.to_port(),
            }])
        };

        let mut properties = Map::new();
        properties.insert("GroupDescription".to_string(), json!(description));
        if let Some(name) = props.security_group_name {
            properties.insert("GroupName".to_string(), json!(name));
        }
        properties.insert("SecurityGroupEgress".to_string(), egress);
        properties.insert("VpcId".to_string(), vpc.vpc_id());

        let handle = stack.add_resource(
            &path.child("Resource")?,
            ResourceType::SecurityGroup,
            Value::Object(properties),
        )?;

        Ok(Self {
            path,
            handle,
            allow_all_outbound: props.allow_all_outbound,
        })
    }

    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    pub fn logical_id(&self) -> &LogicalId {
        self.handle.logical_id()
    }

    /// `{"Fn::GetAtt": [<group>, "GroupId"]}`
    pub fn group_id(&self) -> Value {
        self.handle.attribute("GroupId")
    }

    pub fn allows_all_outbound(&self) -> bool {
        self.allow_all_outbound
    }

    /// This group as the peer of another group's rule
    pub fn peer(&self) -> Peer {
        Peer::SecurityGroup(self.logical_id().clone())
    }

    /// Admit traffic from `peer` on `port`
    pub fn add_ingress_rule(
        &self,
        stack: &mut Stack,
        peer: &Peer,
        port: Port,
        description: Option<&str>,
    ) -> InfrastructureResult<()> {
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("from {}:{}", peer.unique_id(), port));

        match peer {
            Peer::Cidr(cidr) => {
                let mut rule = port_fields(port);
                rule.insert("CidrIp".to_string(), json!(cidr));
                rule.insert("Description".to_string(), json!(description));
                if self.has_inline_rule(stack, "SecurityGroupIngress", &rule) {
                    return Ok(());
                }
                stack.append_property(&self.handle, "SecurityGroupIngress", Value::Object(rule))?;
            }
            Peer::SecurityGroup(source) => {
                let rule_path = self
                    .path
                    .child(format!("from {}:{}", peer.unique_id(), port))?;
                if stack.graph().contains(&rule_path.logical_id()?) {
                    return Ok(());
                }
                let mut rule = port_fields(port);
                rule.insert("Description".to_string(), json!(description));
                rule.insert("GroupId".to_string(), self.group_id());
                rule.insert(
                    "SourceSecurityGroupId".to_string(),
                    intrinsic::get_att(source.as_str(), "GroupId"),
                );
                stack.add_resource(&rule_path, ResourceType::SecurityGroupIngress, Value::Object(rule))?;
            }
        }
        debug!("Ingress on {} from {} port {}", self.path, peer.unique_id(), port);
        Ok(())
    }

    /// Permit traffic to `peer` on `port`; a no-op when all outbound is allowed
    pub fn add_egress_rule(
        &self,
        stack: &mut Stack,
        peer: &Peer,
        port: Port,
        description: Option<&str>,
    ) -> InfrastructureResult<()> {
        if self.allow_all_outbound {
            debug!("Egress on {} already allows all traffic", self.path);
            return Ok(());
        }
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("to {}:{}", peer.unique_id(), port));

        match peer {
            Peer::Cidr(cidr) => {
                let mut rule = port_fields(port);
                rule.insert("CidrIp".to_string(), json!(cidr));
                rule.insert("Description".to_string(), json!(description));
                if self.has_inline_rule(stack, "SecurityGroupEgress", &rule) {
                    return Ok(());
                }
                self.drop_disallow_placeholder(stack)?;
                stack.append_property(&self.handle, "SecurityGroupEgress", Value::Object(rule))?;
            }
            Peer::SecurityGroup(destination) => {
                let rule_path = self
                    .path
                    .child(format!("to {}:{}", peer.unique_id(), port))?;
                if stack.graph().contains(&rule_path.logical_id()?) {
                    return Ok(());
                }
                let mut rule = port_fields(port);
                rule.insert("Description".to_string(), json!(description));
                rule.insert(
                    "DestinationSecurityGroupId".to_string(),
                    intrinsic::get_att(destination.as_str(), "GroupId"),
                );
                rule.insert("GroupId".to_string(), self.group_id());
                stack.add_resource(&rule_path, ResourceType::SecurityGroupEgress, Value::Object(rule))?;
            }
        }
        debug!("Egress on {} to {} port {}", self.path, peer.unique_id(), port);
        Ok(())
    }

    /// Open `port` from `other` to this group: ingress here, egress there
    pub fn allow_from(
        &self,
        stack: &mut Stack,
        other: &SecurityGroup,
        port: Port,
        description: Option<&str>,
    ) -> InfrastructureResult<()> {
        self.add_ingress_rule(stack, &other.peer(), port, description)?;
        other.add_egress_rule(stack, &self.peer(), port, description)
    }

    fn has_inline_rule(&self, stack: &Stack, key: &str, rule: &Map<String, Value>) -> bool {
        stack
            .graph()
            .node(self.logical_id())
            .and_then(|n| n.properties.get(key))
            .and_then(Value::as_array)
            .is_some_and(|rules| rules.iter().any(|r| r.as_object() == Some(rule)))
    }

    fn drop_disallow_placeholder(&self, stack: &mut Stack) -> InfrastructureResult<()> {
        let remaining: Vec<Value> = stack
            .graph()
            .node(self.logical_id())
            .and_then(|n| n.properties.get("SecurityGroupEgress"))
            .and_then(Value::as_array)
            .map(|rules| {
                rules
                    .iter()
                    .filter(|r| r.get("CidrIp").and_then(Value::as_str) != Some(DISALLOW_ALL_CIDR))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        stack.set_property(&self.handle, "SecurityGroupEgress", Value::Array(remaining))
    }
}

fn port_fields(port: Port) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("IpProtocol".to_string(), json!(port.protocol().as_str()));
    if port.protocol() != Protocol::All {
        fields.insert("FromPort".to_string(), json!(port.from_port()));
        fields.insert("ToPort".to_string(), json!(port.to_port()));
    }
    fields
}
