//! Configuration loading shared by every command.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML or
//! JSON file, then flags. Each flag falls back to an environment variable.
//! Upstream outputs only fill external references still unset after that.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use stackwire_common::config::SynthConfig;
use stackwire_common::error::StackwireError;
use stackwire_common::types::{OutputKey, Stage};

/// Configuration flags accepted by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Configuration file (YAML, or JSON with a `.json` extension).
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Outputs of an upstream stack, as a JSON object.
    #[arg(long)]
    pub upstream: Option<PathBuf>,

    /// Deployment stage (dev, stage, prod).
    #[arg(long, env = "CDK_DEPLOY_STAGE")]
    pub stage: Option<String>,

    /// Namespace prefix for resource names.
    #[arg(long, env = "STACK_NAMESPACE")]
    pub namespace: Option<String>,

    /// Target account.
    #[arg(long, env = "CDK_DEFAULT_ACCOUNT")]
    pub account: Option<String>,

    /// Target region.
    #[arg(long, env = "CDK_DEFAULT_REGION")]
    pub region: Option<String>,

    /// Address range for a new network.
    #[arg(long, env = "VPC_CIDR")]
    pub vpc_cidr: Option<String>,

    /// Existing network to bind to.
    #[arg(long, env = "VPC_ID")]
    pub vpc_id: Option<String>,

    /// Task CPU units.
    #[arg(long, env = "FARGATE_CPU_SPEC")]
    pub cpu: Option<String>,

    /// Task memory in MiB.
    #[arg(long, env = "FARGATE_MEM_SPEC")]
    pub memory: Option<String>,

    /// Repository holding the application image.
    #[arg(long, env = "ECR_REPO_NAME")]
    pub repository: Option<String>,

    /// Image tag.
    #[arg(long, env = "ECR_REPO_TAG")]
    pub tag: Option<String>,

    /// Container name inside the task definition.
    #[arg(long)]
    pub container_name: Option<String>,

    /// Base name of an owned bucket.
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket_name: Option<String>,

    /// Existing bucket to bind to.
    #[arg(long, env = "EXTERNAL_BUCKET_NAME")]
    pub external_bucket_name: Option<String>,

    /// Existing cache host to wire.
    #[arg(long, env = "CACHE_HOST")]
    pub cache_host: Option<String>,

    /// Port of the existing cache host.
    #[arg(long, env = "CACHE_PORT")]
    pub cache_port: Option<String>,

    /// Do not resolve storage for the service.
    #[arg(long)]
    pub no_storage: bool,

    /// Do not wire a cache into the service.
    #[arg(long)]
    pub no_cache: bool,

    /// Attach the browser upload CORS rule to an owned bucket.
    #[arg(long)]
    pub bucket_cors: bool,

    /// Allow anonymous reads on an owned bucket.
    #[arg(long)]
    pub bucket_public_read: bool,

    /// Grant every storage action instead of read/write.
    #[arg(long)]
    pub storage_full_access: bool,
}

impl ConfigArgs {
    /// Builds the configuration for one synthesis pass.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, the stage is
    /// unknown, or an upstream value is still an unresolved reference.
    pub fn load(&self) -> anyhow::Result<SynthConfig> {
        let mut config = match &self.config {
            Some(path) => read_config_file(path)?,
            None => SynthConfig::default(),
        };
        self.apply(&mut config)?;
        let mut config = config.normalized();

        if let Some(path) = &self.upstream {
            let upstream = read_upstream(path)?;
            tracing::debug!(path = %path.display(), outputs = upstream.len(), "consuming upstream outputs");
            config.consume_upstream(&upstream)?;
        }
        Ok(config)
    }

    fn apply(&self, config: &mut SynthConfig) -> anyhow::Result<()> {
        if let Some(stage) = self.stage.as_deref().filter(|s| !s.trim().is_empty()) {
            config.stage = stage.parse::<Stage>()?;
        }
        set(&mut config.namespace, self.namespace.as_ref());
        set(&mut config.vpc_cidr, self.vpc_cidr.as_ref());
        set(&mut config.cpu, self.cpu.as_ref());
        set(&mut config.memory, self.memory.as_ref());
        set(&mut config.repository_name, self.repository.as_ref());
        set(&mut config.image_tag, self.tag.as_ref());
        set(&mut config.container_name, self.container_name.as_ref());
        set(&mut config.bucket_name, self.bucket_name.as_ref());

        for (field, value) in [
            (&mut config.account, &self.account),
            (&mut config.region, &self.region),
            (&mut config.vpc_id, &self.vpc_id),
            (&mut config.external_bucket_name, &self.external_bucket_name),
            (&mut config.cache_host, &self.cache_host),
            (&mut config.cache_port, &self.cache_port),
        ] {
            if value.is_some() {
                field.clone_from(value);
            }
        }

        config.provision_storage &= !self.no_storage;
        config.provision_cache &= !self.no_cache;
        config.bucket_cors |= self.bucket_cors;
        config.bucket_public_read |= self.bucket_public_read;
        config.storage_full_access |= self.storage_full_access;
        Ok(())
    }
}

fn set(field: &mut String, value: Option<&String>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

fn read(path: &Path) -> Result<String, StackwireError> {
    std::fs::read_to_string(path).map_err(|source| StackwireError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Reads a configuration file. Missing keys take their defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn read_config_file(path: &Path) -> anyhow::Result<SynthConfig> {
    let content = read(path)?;
    let config = if is_json(path) {
        serde_json::from_str(&content).map_err(StackwireError::from)?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?
    };
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Reads a JSON object of upstream output names to values.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a JSON object of
/// strings, or names an unknown output.
pub fn read_upstream(path: &Path) -> anyhow::Result<BTreeMap<OutputKey, String>> {
    let content = read(path)?;
    let outputs: BTreeMap<OutputKey, String> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse upstream outputs: {}", path.display()))?;
    Ok(outputs)
}
