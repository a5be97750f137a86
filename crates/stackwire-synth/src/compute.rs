//! Compute composition.
//!
//! Declares the cluster, task definition, and service for the resolved
//! network and image, and wires in whichever optional resources this stage
//! resolved. A resource that was not resolved leaves no trace: no
//! environment key, no grant.

use std::collections::BTreeMap;

use stackwire_common::config::validate_task_size;
use stackwire_common::constants::{ENV_BUCKET_NAME, ENV_CACHE_HOST, ENV_CACHE_PORT};
use stackwire_common::error::{Result, StackwireError};

use crate::cache::CacheEndpoint;
use crate::network::NetworkContext;
use crate::registry::RegistryReference;
use crate::scope::Scope;
use crate::storage::StorageReference;
use crate::template::{ContainerDefinition, PolicyStatement, Resource, Template};
use crate::token::Token;

const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
const EXECUTION_POLICY: &str = "service-role/AmazonECSTaskExecutionRolePolicy";
const LAUNCH_TYPE: &str = "FARGATE";

/// Environment variables of the service container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerEnvironment {
    vars: BTreeMap<String, Token>,
}

impl ContainerEnvironment {
    /// Returns the value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Token> {
        self.vars.get(key)
    }

    /// Returns whether `key` is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns whether no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Variables with their values rendered.
    #[must_use]
    pub fn rendered(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, Token> {
        &self.vars
    }
}

/// Builds a [`ContainerEnvironment`] from the optional resources of a stage.
///
/// A key is inserted iff its source resource is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentBuilder<'a> {
    cache: Option<&'a CacheEndpoint>,
    storage: Option<&'a StorageReference>,
}

impl<'a> EnvironmentBuilder<'a> {
    /// Creates a builder with no resources.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache: None,
            storage: None,
        }
    }

    /// Sets the cache endpoint, if one was resolved.
    #[must_use]
    pub const fn cache(mut self, cache: Option<&'a CacheEndpoint>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the bucket, if one was resolved.
    #[must_use]
    pub const fn storage(mut self, storage: Option<&'a StorageReference>) -> Self {
        self.storage = storage;
        self
    }

    /// Produces the finished environment.
    #[must_use]
    pub fn build(self) -> ContainerEnvironment {
        let mut vars = BTreeMap::new();
        if let Some(cache) = self.cache {
            let _ = vars.insert(ENV_CACHE_HOST.to_string(), cache.host.clone());
            let _ = vars.insert(ENV_CACHE_PORT.to_string(), Token::literal(cache.port.to_string()));
        }
        if let Some(storage) = self.storage {
            let _ = vars.insert(
                ENV_BUCKET_NAME.to_string(),
                Token::literal(storage.bucket_name.as_str()),
            );
        }
        ContainerEnvironment { vars }
    }
}

/// Breadth of the storage grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageAccess {
    /// Object reads, writes, deletes, and listing.
    #[default]
    ReadWrite,
    /// Every storage action.
    Full,
}

impl StorageAccess {
    /// Actions granted at this breadth.
    #[must_use]
    pub fn actions(self) -> Vec<String> {
        let actions: &[&str] = match self {
            Self::ReadWrite => &[
                "s3:GetObject",
                "s3:PutObject",
                "s3:DeleteObject",
                "s3:ListBucket",
            ],
            Self::Full => &["s3:*"],
        };
        actions.iter().map(ToString::to_string).collect()
    }
}

/// Grants attached to the compute identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    grants: Vec<PolicyStatement>,
}

impl AccessPolicy {
    /// Policy with a storage grant iff a bucket was resolved.
    #[must_use]
    pub fn for_storage(storage: Option<&StorageReference>, access: StorageAccess) -> Self {
        let mut policy = Self::default();
        if let Some(storage) = storage {
            policy.grant_storage(storage, access);
        }
        policy
    }

    /// Grants `access` on the bucket and its objects.
    pub fn grant_storage(&mut self, storage: &StorageReference, access: StorageAccess) {
        tracing::debug!(bucket = %storage.bucket_name, ?access, "granting storage access");
        self.grants.push(PolicyStatement {
            actions: access.actions(),
            resources: vec![storage.bucket_arn.clone(), storage.objects_arn()],
        });
    }

    /// Returns the granted statements.
    #[must_use]
    pub fn grants(&self) -> &[PolicyStatement] {
        &self.grants
    }

    /// Returns whether the policy grants anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Returns whether any storage action is granted.
    #[must_use]
    pub fn has_storage_grant(&self) -> bool {
        self.grants
            .iter()
            .any(|g| g.actions.iter().any(|a| a.starts_with("s3:")))
    }

    /// Returns whether some grant targets exactly `resource`.
    #[must_use]
    pub fn grants_on(&self, resource: &Token) -> bool {
        self.grants.iter().any(|g| g.resources.contains(resource))
    }
}

/// Size and naming of the service task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// CPU units.
    pub cpu: String,
    /// Memory in MiB.
    pub memory: String,
    /// Name of the single container.
    pub container_name: String,
}

/// What the composer wires together. `network` and `registry` are mandatory.
#[derive(Debug, Clone, Copy)]
pub struct ComputeInputs<'a> {
    /// Resolved network.
    pub network: Option<&'a NetworkContext>,
    /// Published image.
    pub registry: Option<&'a RegistryReference>,
    /// Cache endpoint, if resolved.
    pub cache: Option<&'a CacheEndpoint>,
    /// Bucket, if resolved.
    pub storage: Option<&'a StorageReference>,
    /// Task size.
    pub task: &'a TaskSpec,
    /// Breadth of the storage grant.
    pub storage_access: StorageAccess,
}

/// The composed compute layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeService {
    /// Cluster name.
    pub cluster_name: String,
    /// Cluster identifier.
    pub cluster_arn: Token,
    /// Task definition identifier.
    pub task_definition_arn: Token,
    /// Service name.
    pub service_name: String,
    /// Security groups attached to the service.
    pub security_group_ids: Vec<Token>,
    /// Container environment.
    pub environment: ContainerEnvironment,
    /// Grants on the task identity.
    pub policy: AccessPolicy,
}

/// Declares the compute layer and wires the resolved resources into it.
///
/// # Errors
///
/// Returns a configuration error if the network or registry reference is
/// missing or the task size is unsupported.
pub fn compose_compute(
    template: &mut Template,
    scope: &Scope,
    inputs: &ComputeInputs<'_>,
) -> Result<ComputeService> {
    let network = inputs
        .network
        .ok_or_else(|| StackwireError::config("compute requires a resolved network"))?;
    let registry = inputs
        .registry
        .ok_or_else(|| StackwireError::config("compute requires a registry reference"))?;
    validate_task_size(&inputs.task.cpu, &inputs.task.memory)?;

    let cluster_id = scope.name("ecs-cluster");
    let cluster_name = scope.name("cluster");
    let cluster = template.add(
        cluster_id.as_str(),
        Resource::Cluster {
            cluster_name: cluster_name.clone(),
            network: network.network_id.clone(),
            container_insights: false,
        },
    )?;

    let execution_role = template.add(
        scope.name("execution-role"),
        Resource::Role {
            assumed_by: TASK_PRINCIPAL.into(),
            managed_policies: vec![EXECUTION_POLICY.into()],
        },
    )?;
    let task_role = template.add(
        scope.name("task-role"),
        Resource::Role {
            assumed_by: TASK_PRINCIPAL.into(),
            managed_policies: Vec::new(),
        },
    )?;

    let environment = EnvironmentBuilder::new()
        .cache(inputs.cache)
        .storage(inputs.storage)
        .build();
    let policy = AccessPolicy::for_storage(inputs.storage, inputs.storage_access);
    if !policy.is_empty() {
        let _ = template.add(
            scope.name("task-policy"),
            Resource::Policy {
                role: task_role.clone(),
                statements: policy.grants().to_vec(),
            },
        )?;
    }

    let task_definition = template.add(
        scope.name("task-def"),
        Resource::TaskDefinition {
            family: scope.name("task-def"),
            compatibility: LAUNCH_TYPE.into(),
            network_mode: "awsvpc".into(),
            cpu: inputs.task.cpu.clone(),
            memory: inputs.task.memory.clone(),
            task_role,
            execution_role,
            containers: vec![ContainerDefinition {
                name: inputs.task.container_name.clone(),
                image: registry.image_uri(scope),
                environment: environment.as_map().clone(),
                essential: true,
            }],
        },
    )?;

    let group_id = scope.name("service-sg");
    let _ = template.add(
        group_id.as_str(),
        Resource::SecurityGroup {
            name: group_id.clone(),
            description: "Security group attached to the compute service".into(),
            network: network.network_id.clone(),
            ingress: Vec::new(),
            allow_all_outbound: true,
        },
    )?;
    let security_group_ids = vec![Token::attr(group_id, "GroupId")];

    let service_name = scope.name("api");
    tracing::info!(
        service = %service_name,
        cluster = %cluster_name,
        env_keys = environment.len(),
        storage_grant = policy.has_storage_grant(),
        "composing compute service"
    );
    let _ = template.add(
        scope.name("service"),
        Resource::Service {
            service_name: service_name.clone(),
            cluster,
            task_definition: task_definition.clone(),
            desired_count: 1,
            launch_type: LAUNCH_TYPE.into(),
            subnet_ids: network.private_subnet_ids.clone(),
            security_group_ids: security_group_ids.clone(),
            assign_public_ip: false,
        },
    )?;

    Ok(ComputeService {
        cluster_name,
        cluster_arn: Token::attr(cluster_id, "Arn"),
        task_definition_arn: task_definition,
        service_name,
        security_group_ids,
        environment,
        policy,
    })
}
