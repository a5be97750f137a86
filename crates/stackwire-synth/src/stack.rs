//! One synthesis pass.
//!
//! Runs the resolvers in dependency order (network, then registry, cache,
//! and storage, then compute, then outputs) against a validated
//! [`SynthConfig`]. Either the whole stack is synthesized or an error is
//! returned; nothing partial escapes.

use stackwire_common::config::SynthConfig;
use stackwire_common::constants::APP_NAME;
use stackwire_common::error::Result;
use stackwire_common::types::{StackKind, Stage};

use crate::cache::{CacheEndpoint, bind_cache, provision_cache};
use crate::compute::{ComputeInputs, ComputeService, StorageAccess, TaskSpec, compose_compute};
use crate::network::{NetworkContext, resolve_network};
use crate::outputs::{OutputSet, publish_service, publish_storage};
use crate::registry::{RegistryReference, RepositoryDefinition, provision_repository};
use crate::scope::Scope;
use crate::storage::{StorageReference, StorageRequest, resolve_storage};
use crate::template::Template;

/// Everything a synthesis pass resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesis {
    /// Stack that was synthesized.
    pub kind: StackKind,
    /// Deployment stage.
    pub stage: Stage,
    /// Stack name.
    pub stack_name: String,
    /// Topology description for the apply target.
    pub template: Template,
    /// Rendered outputs.
    pub outputs: OutputSet,
    /// Resolved network, if the stack uses one.
    pub network: Option<NetworkContext>,
    /// Bound image, for the service stack.
    pub registry: Option<RegistryReference>,
    /// Created repository, for the registry stack.
    pub repository: Option<RepositoryDefinition>,
    /// Resolved cache endpoint.
    pub cache: Option<CacheEndpoint>,
    /// Resolved bucket.
    pub storage: Option<StorageReference>,
    /// Composed compute layer, for the service stack.
    pub compute: Option<ComputeService>,
}

impl Synthesis {
    fn empty(kind: StackKind, scope: &Scope, description: String) -> Self {
        Self {
            kind,
            stage: scope.stage(),
            stack_name: scope.name(&kind.to_string()),
            template: Template::new(description),
            outputs: OutputSet::default(),
            network: None,
            registry: None,
            repository: None,
            cache: None,
            storage: None,
            compute: None,
        }
    }
}

/// Synthesizes the stack of the given kind.
///
/// # Errors
///
/// Returns a configuration error for invalid inputs, or a resolution error
/// if the finished template references an undefined resource.
pub fn synthesize(config: &SynthConfig, kind: StackKind) -> Result<Synthesis> {
    let config = config.clone().normalized();
    config.validate(kind)?;

    let scope = Scope::new(config.namespace.as_str(), config.stage)
        .with_target(config.account.clone(), config.region.clone());
    let _span = tracing::info_span!("synthesize", %kind, stage = %config.stage).entered();

    let mut synthesis = match kind {
        StackKind::Service => synthesize_service(&config, &scope)?,
        StackKind::Registry => synthesize_registry(&scope)?,
        StackKind::Storage => synthesize_storage(&config, &scope)?,
    };

    let order = synthesis.template.deployment_order()?;
    synthesis.outputs = OutputSet::from_template(&synthesis.template);
    tracing::info!(
        stack = %synthesis.stack_name,
        resources = order.len(),
        outputs = synthesis.outputs.len(),
        "synthesis complete"
    );
    Ok(synthesis)
}

fn storage_request(config: &SynthConfig) -> StorageRequest<'_> {
    StorageRequest {
        base_name: &config.bucket_name,
        external_name: config.external_bucket_name.as_deref(),
        cors: config.bucket_cors,
        public_read: config.bucket_public_read,
    }
}

fn resolve_cache(
    template: &mut Template,
    scope: &Scope,
    config: &SynthConfig,
    network: &NetworkContext,
) -> Result<Option<CacheEndpoint>> {
    if !config.provision_cache {
        return Ok(None);
    }
    match &config.cache_host {
        Some(host) => bind_cache(host, config.cache_port.as_deref()).map(Some),
        None => provision_cache(template, scope, network).map(Some),
    }
}

fn synthesize_service(config: &SynthConfig, scope: &Scope) -> Result<Synthesis> {
    let mut synthesis = Synthesis::empty(
        StackKind::Service,
        scope,
        format!("{APP_NAME} compute service for {} ({})", scope.namespace(), scope.stage()),
    );
    let template = &mut synthesis.template;

    let network = resolve_network(template, scope, config.vpc_id.as_deref(), &config.vpc_cidr)?;
    let registry = RegistryReference::bind(&config.repository_name, &config.image_tag)?;
    let cache = resolve_cache(template, scope, config, &network)?;
    let storage = if config.provision_storage {
        Some(resolve_storage(template, scope, &storage_request(config))?)
    } else {
        None
    };

    let task = TaskSpec {
        cpu: config.cpu.clone(),
        memory: config.memory.clone(),
        container_name: config.container_name.clone(),
    };
    let storage_access = if config.storage_full_access {
        StorageAccess::Full
    } else {
        StorageAccess::ReadWrite
    };
    let compute = compose_compute(
        template,
        scope,
        &ComputeInputs {
            network: Some(&network),
            registry: Some(&registry),
            cache: cache.as_ref(),
            storage: storage.as_ref(),
            task: &task,
            storage_access,
        },
    )?;
    publish_service(template, &compute, &network, storage.as_ref(), cache.as_ref());

    synthesis.network = Some(network);
    synthesis.registry = Some(registry);
    synthesis.cache = cache;
    synthesis.storage = storage;
    synthesis.compute = Some(compute);
    Ok(synthesis)
}

fn synthesize_registry(scope: &Scope) -> Result<Synthesis> {
    let mut synthesis = Synthesis::empty(
        StackKind::Registry,
        scope,
        format!("{APP_NAME} image repository for {} ({})", scope.namespace(), scope.stage()),
    );
    synthesis.repository = Some(provision_repository(&mut synthesis.template, scope)?);
    Ok(synthesis)
}

fn synthesize_storage(config: &SynthConfig, scope: &Scope) -> Result<Synthesis> {
    let mut synthesis = Synthesis::empty(
        StackKind::Storage,
        scope,
        format!("{APP_NAME} storage for {} ({})", scope.namespace(), scope.stage()),
    );
    let template = &mut synthesis.template;

    let network = resolve_network(template, scope, config.vpc_id.as_deref(), &config.vpc_cidr)?;
    let storage = resolve_storage(template, scope, &storage_request(config))?;
    let cache = resolve_cache(template, scope, config, &network)?;
    publish_storage(template, Some(&storage), cache.as_ref());

    synthesis.network = Some(network);
    synthesis.storage = Some(storage);
    synthesis.cache = cache;
    Ok(synthesis)
}
