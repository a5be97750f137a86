//! Declarative topology description handed to the apply target.
//!
//! A [`Template`] is the sole output of synthesis: resources keyed by
//! logical id plus the named outputs. Both maps are ordered so that the
//! serialized form is identical for identical inputs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackwire_common::error::{Result, StackwireError};
use stackwire_common::types::{OutputKey, RemovalPolicy};

use crate::graph::DependencyGraph;
use crate::token::Token;

/// Placement of a subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetKind {
    /// No inbound route from the internet; egress through the NAT gateway.
    PrivateWithEgress,
    /// Routed through the internet gateway.
    Public,
}

/// One inbound rule of a security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Transport protocol.
    pub protocol: String,
    /// Permitted port.
    pub port: u16,
    /// Permitted source address range.
    pub source: Token,
    /// Human-readable description.
    pub description: String,
}

/// Cross-origin rule of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRule {
    /// Permitted HTTP methods.
    pub allowed_methods: Vec<String>,
    /// Permitted origins.
    pub allowed_origins: Vec<String>,
    /// Permitted request headers.
    pub allowed_headers: Vec<String>,
    /// Response headers exposed to the browser.
    pub exposed_headers: Vec<String>,
    /// Preflight cache duration in seconds.
    pub max_age: u32,
}

/// One statement of an access policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    /// Granted actions.
    pub actions: Vec<String>,
    /// Resources the actions apply to.
    pub resources: Vec<Token>,
}

/// One container of a task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    /// Container name.
    pub name: String,
    /// Image URI.
    pub image: Token,
    /// Environment variables.
    pub environment: BTreeMap<String, Token>,
    /// Whether the task stops when this container stops.
    pub essential: bool,
}

/// A resource the apply target creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    /// Virtual network.
    Network {
        /// Network name.
        name: String,
        /// Address range.
        cidr_block: String,
    },
    /// Internet gateway attached to a network.
    InternetGateway {
        /// Owning network.
        network: Token,
    },
    /// Subnet of a network.
    Subnet {
        /// Subnet group name.
        name: String,
        /// Owning network.
        network: Token,
        /// Address block.
        cidr_block: String,
        /// Availability zone.
        availability_zone: Token,
        /// Placement.
        kind: SubnetKind,
    },
    /// NAT egress for private subnets.
    NatGateway {
        /// Public subnet hosting the gateway.
        subnet: Token,
    },
    /// Access-control group.
    SecurityGroup {
        /// Group name.
        name: String,
        /// Description.
        description: String,
        /// Owning network.
        network: Token,
        /// Inbound rules.
        ingress: Vec<IngressRule>,
        /// Whether all outbound traffic is permitted.
        allow_all_outbound: bool,
    },
    /// Serverless key-value cache.
    ServerlessCache {
        /// Cache name.
        name: String,
        /// Cache engine.
        engine: String,
        /// Attached security groups.
        security_group_ids: Vec<Token>,
        /// Subnets the cache is reachable from.
        subnet_ids: Vec<Token>,
    },
    /// Object-storage bucket.
    Bucket {
        /// Bucket name.
        bucket_name: String,
        /// Teardown behaviour.
        removal_policy: RemovalPolicy,
        /// Whether anonymous reads are permitted.
        public_read_access: bool,
        /// Cross-origin rules.
        cors: Vec<CorsRule>,
    },
    /// Container image repository.
    Repository {
        /// Repository name.
        repository_name: String,
        /// Teardown behaviour.
        removal_policy: RemovalPolicy,
    },
    /// Compute cluster.
    Cluster {
        /// Cluster name.
        cluster_name: String,
        /// Network the cluster runs in.
        network: Token,
        /// Whether container insights are collected.
        container_insights: bool,
    },
    /// Identity assumed by tasks.
    Role {
        /// Service principal allowed to assume the role.
        assumed_by: String,
        /// Managed policies attached to the role.
        managed_policies: Vec<String>,
    },
    /// Inline policy attached to a role.
    Policy {
        /// Role the policy is attached to.
        role: Token,
        /// Statements.
        statements: Vec<PolicyStatement>,
    },
    /// Serverless task definition.
    TaskDefinition {
        /// Task family.
        family: String,
        /// Launch compatibility.
        compatibility: String,
        /// Task network mode.
        network_mode: String,
        /// CPU units.
        cpu: String,
        /// Memory in MiB.
        memory: String,
        /// Role assumed by the running task.
        task_role: Token,
        /// Role used to pull the image.
        execution_role: Token,
        /// Containers.
        containers: Vec<ContainerDefinition>,
    },
    /// Long-running service.
    Service {
        /// Service name.
        service_name: String,
        /// Cluster the service runs in.
        cluster: Token,
        /// Task definition run by the service.
        task_definition: Token,
        /// Number of tasks kept running.
        desired_count: u32,
        /// Launch type.
        launch_type: String,
        /// Subnets tasks are placed in.
        subnet_ids: Vec<Token>,
        /// Security groups attached to tasks.
        security_group_ids: Vec<Token>,
        /// Whether tasks receive a public address.
        assign_public_ip: bool,
    },
}

impl Resource {
    /// Every token the resource carries.
    #[must_use]
    pub fn tokens(&self) -> Vec<&Token> {
        match self {
            Self::Network { .. } | Self::Bucket { .. } | Self::Repository { .. } | Self::Role { .. } => {
                Vec::new()
            }
            Self::InternetGateway { network } => vec![network],
            Self::Subnet {
                network,
                availability_zone,
                ..
            } => vec![network, availability_zone],
            Self::NatGateway { subnet } => vec![subnet],
            Self::SecurityGroup {
                network, ingress, ..
            } => std::iter::once(network)
                .chain(ingress.iter().map(|rule| &rule.source))
                .collect(),
            Self::ServerlessCache {
                security_group_ids,
                subnet_ids,
                ..
            } => security_group_ids.iter().chain(subnet_ids).collect(),
            Self::Cluster { network, .. } => vec![network],
            Self::Policy { role, statements } => std::iter::once(role)
                .chain(statements.iter().flat_map(|s| &s.resources))
                .collect(),
            Self::TaskDefinition {
                task_role,
                execution_role,
                containers,
                ..
            } => [task_role, execution_role]
                .into_iter()
                .chain(
                    containers
                        .iter()
                        .flat_map(|c| std::iter::once(&c.image).chain(c.environment.values())),
                )
                .collect(),
            Self::Service {
                cluster,
                task_definition,
                subnet_ids,
                security_group_ids,
                ..
            } => [cluster, task_definition]
                .into_iter()
                .chain(subnet_ids)
                .chain(security_group_ids)
                .collect(),
        }
    }

    /// Logical ids of the template resources this one depends on.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self.tokens().into_iter().flat_map(Token::references).collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// A named output, optionally exported for other stacks to import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOutput {
    /// Output value.
    pub value: Token,
    /// Stack-independent export name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
}

/// The complete description of one stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Human-readable description.
    pub description: String,
    /// Resources keyed by logical id.
    pub resources: BTreeMap<String, Resource>,
    /// Outputs keyed by their published name.
    pub outputs: BTreeMap<OutputKey, TemplateOutput>,
}

impl Template {
    /// Creates an empty template.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Adds a resource and returns a reference to it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the logical id is already taken.
    pub fn add(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<Token> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(StackwireError::config(format!(
                "duplicate logical id: \"{logical_id}\""
            )));
        }
        tracing::debug!(logical_id = %logical_id, "resource defined");
        let _ = self.resources.insert(logical_id.clone(), resource);
        Ok(Token::Ref(logical_id))
    }

    /// Sets a named output. Re-setting a name replaces its value.
    pub fn output(&mut self, key: OutputKey, value: Token, export_name: Option<String>) {
        let _ = self
            .outputs
            .insert(key, TemplateOutput { value, export_name });
    }

    /// Returns the resources in the order the apply target must create them.
    ///
    /// # Errors
    ///
    /// Returns [`StackwireError::Policy`] if a grant targets an undefined
    /// resource, [`StackwireError::NotFound`] if any other resource or output
    /// references an undefined logical id, or a configuration error if the
    /// references form a cycle.
    pub fn deployment_order(&self) -> Result<Vec<String>> {
        self.check_grants()?;
        let mut graph = DependencyGraph::new();
        for id in self.resources.keys() {
            let _ = graph.add_resource(id.as_str());
        }
        for (id, resource) in &self.resources {
            for dependency in resource.dependencies() {
                graph.add_dependency(id, dependency)?;
            }
        }
        for output in self.outputs.values() {
            for id in output.value.references() {
                if !self.resources.contains_key(id) {
                    return Err(StackwireError::NotFound {
                        kind: "resource",
                        id: id.to_string(),
                    });
                }
            }
        }
        graph.resolve_order()
    }

    fn check_grants(&self) -> Result<()> {
        for (id, resource) in &self.resources {
            let Resource::Policy { statements, .. } = resource else {
                continue;
            };
            let targets = statements
                .iter()
                .flat_map(|s| &s.resources)
                .flat_map(Token::references);
            for target in targets {
                if !self.resources.contains_key(target) {
                    return Err(StackwireError::Policy {
                        message: format!("{id} grants access to undefined resource \"{target}\""),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serializes the template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
