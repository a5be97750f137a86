//! Synthesis configuration model.
//!
//! Every input a synthesis pass reads lives in [`SynthConfig`], and every
//! default lives in its [`Default`] impl. Nothing downstream reads the
//! process environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StackwireError};
use crate::types::{OutputKey, StackKind, Stage};

/// Root configuration for one synthesis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Deployment stage being synthesized.
    pub stage: Stage,
    /// Namespace prefix for resource names. May be empty.
    pub namespace: String,
    /// Target account, used to render registry URIs when known.
    pub account: Option<String>,
    /// Target region, used to render registry URIs when known.
    pub region: Option<String>,
    /// Address range for a newly defined network.
    pub vpc_cidr: String,
    /// Existing network to bind to instead of defining one.
    pub vpc_id: Option<String>,
    /// Task CPU units.
    pub cpu: String,
    /// Task memory in MiB.
    pub memory: String,
    /// Repository holding the published application image.
    pub repository_name: String,
    /// Image tag within the repository.
    pub image_tag: String,
    /// Name of the container inside the task definition.
    pub container_name: String,
    /// Whether the service stack resolves storage at all, owned or external.
    pub provision_storage: bool,
    /// Base name of an owned bucket.
    pub bucket_name: String,
    /// Existing bucket to bind to instead of defining one.
    pub external_bucket_name: Option<String>,
    /// Attach the browser upload CORS rule to an owned bucket.
    pub bucket_cors: bool,
    /// Allow anonymous reads on an owned bucket.
    pub bucket_public_read: bool,
    /// Grant `s3:*` instead of the read/write action set.
    pub storage_full_access: bool,
    /// Whether a cache is wired into the service at all, provisioned or external.
    pub provision_cache: bool,
    /// Existing cache host to wire instead of provisioning one.
    pub cache_host: Option<String>,
    /// Port of the existing cache host.
    pub cache_port: Option<String>,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            stage: Stage::default(),
            namespace: constants::DEFAULT_NAMESPACE.into(),
            account: None,
            region: None,
            vpc_cidr: constants::DEFAULT_VPC_CIDR.into(),
            vpc_id: None,
            cpu: constants::DEFAULT_CPU.into(),
            memory: constants::DEFAULT_MEMORY_MIB.into(),
            repository_name: String::new(),
            image_tag: constants::DEFAULT_IMAGE_TAG.into(),
            container_name: constants::DEFAULT_CONTAINER_NAME.into(),
            provision_storage: true,
            bucket_name: constants::DEFAULT_BUCKET_BASE.into(),
            external_bucket_name: None,
            bucket_cors: false,
            bucket_public_read: false,
            storage_full_access: false,
            provision_cache: true,
            cache_host: None,
            cache_port: None,
        }
    }
}

impl SynthConfig {
    /// Trims string inputs and turns empty optional values into `None`.
    ///
    /// Empty strings mean "not supplied" so that unset environment
    /// variables and blank config entries never become placeholder values.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.namespace = self.namespace.trim().to_string();
        self.vpc_cidr = self.vpc_cidr.trim().to_string();
        self.cpu = self.cpu.trim().to_string();
        self.memory = self.memory.trim().to_string();
        self.repository_name = self.repository_name.trim().to_string();
        self.image_tag = self.image_tag.trim().to_string();
        self.container_name = self.container_name.trim().to_string();
        self.bucket_name = self.bucket_name.trim().to_string();
        if self.vpc_cidr.is_empty() {
            self.vpc_cidr = constants::DEFAULT_VPC_CIDR.into();
        }
        if self.bucket_name.is_empty() {
            self.bucket_name = constants::DEFAULT_BUCKET_BASE.into();
        }
        for field in [
            &mut self.account,
            &mut self.region,
            &mut self.vpc_id,
            &mut self.external_bucket_name,
            &mut self.cache_host,
            &mut self.cache_port,
        ] {
            *field = non_empty(field.take());
        }
        self
    }

    /// Checks the inputs a stack of the given kind depends on.
    ///
    /// Address ranges are parsed by the network resolver; everything else
    /// that can be checked without synthesizing is checked here.
    ///
    /// # Errors
    ///
    /// Returns [`StackwireError::Config`] for the first invalid input.
    pub fn validate(&self, kind: StackKind) -> Result<()> {
        check_namespace(&self.namespace)?;
        if let Some(name) = &self.external_bucket_name {
            validate_bucket_name(name)?;
        }
        if let Some(host) = &self.cache_host {
            check_resolved("cache host", host)?;
        }
        if let Some(port) = &self.cache_port {
            if self.cache_host.is_none() {
                return Err(StackwireError::config(
                    "cache port supplied without a cache host",
                ));
            }
            let _ = parse_port(port)?;
        }

        match kind {
            StackKind::Service => {
                if self.repository_name.is_empty() {
                    return Err(StackwireError::config("repository name must not be empty"));
                }
                if self.image_tag.is_empty() {
                    return Err(StackwireError::config("image tag must not be empty"));
                }
                if self.container_name.is_empty() {
                    return Err(StackwireError::config("container name must not be empty"));
                }
                validate_task_size(&self.cpu, &self.memory)?;
            }
            StackKind::Registry => {}
            StackKind::Storage => {
                if self.vpc_id.is_none() {
                    return Err(StackwireError::config(
                        "the storage stack requires an existing network id",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Fills unset external references from an upstream stage's outputs.
    ///
    /// `bucketName` becomes the external bucket and `cacheEndpoint` the
    /// external cache host. Values set explicitly are never overridden.
    ///
    /// # Errors
    ///
    /// Returns [`StackwireError::Config`] naming the output if a consumed
    /// value is still a deferred reference, i.e. the upstream stack's
    /// outputs were taken from synthesis rather than from the applied stack.
    pub fn consume_upstream(&mut self, outputs: &BTreeMap<OutputKey, String>) -> Result<()> {
        let consumed = |key: OutputKey| -> Result<Option<String>> {
            let value = non_empty(outputs.get(&key).cloned());
            if let Some(value) = &value {
                check_resolved(key.as_str(), value)?;
            }
            Ok(value)
        };
        if self.external_bucket_name.is_none() {
            self.external_bucket_name = consumed(OutputKey::BucketName)?;
        }
        if self.cache_host.is_none() {
            self.cache_host = consumed(OutputKey::CacheEndpoint)?;
        }
        Ok(())
    }
}

/// Rejects a value that still carries a `${...}` deferred reference.
///
/// # Errors
///
/// Returns [`StackwireError::Config`] naming `what` if `value` is unresolved.
pub fn check_resolved(what: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(StackwireError::config(format!(
            "{what} \"{value}\" is an unresolved reference; use the applied stack's value"
        )));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_namespace(namespace: &str) -> Result<()> {
    let valid = namespace
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !valid || namespace.starts_with('-') || namespace.ends_with('-') {
        return Err(StackwireError::config(format!(
            "namespace \"{namespace}\" must be lowercase alphanumerics and inner hyphens"
        )));
    }
    Ok(())
}

/// Parses a port string.
///
/// # Errors
///
/// Returns an error if the value is not a non-zero 16-bit integer.
pub fn parse_port(port: &str) -> Result<u16> {
    match port.trim().parse::<u16>() {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(StackwireError::config(format!("invalid port: \"{port}\""))),
    }
}

/// Validates an object-store bucket name.
///
/// # Errors
///
/// Returns an error if the name is not 3-63 characters of lowercase
/// alphanumerics, `-` and `.`, starting and ending with an alphanumeric.
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let edges_ok = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());
    if len_ok && chars_ok && edges_ok && !name.contains("..") {
        Ok(())
    } else {
        Err(StackwireError::config(format!("invalid bucket name: \"{name}\"")))
    }
}

/// Validates a serverless task size (CPU units, memory MiB).
///
/// # Errors
///
/// Returns an error if either value is not an integer or the pair is not a
/// supported combination.
pub fn validate_task_size(cpu: &str, memory: &str) -> Result<()> {
    let cpu_units: u32 = cpu
        .parse()
        .map_err(|_| StackwireError::config(format!("invalid CPU units: \"{cpu}\"")))?;
    let memory_mib: u32 = memory
        .parse()
        .map_err(|_| StackwireError::config(format!("invalid memory size: \"{memory}\"")))?;

    let supported = match cpu_units {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => (1024..=4096).contains(&memory_mib) && memory_mib % 1024 == 0,
        1024 => (2048..=8192).contains(&memory_mib) && memory_mib % 1024 == 0,
        2048 => (4096..=16384).contains(&memory_mib) && memory_mib % 1024 == 0,
        4096 => (8192..=30720).contains(&memory_mib) && memory_mib % 1024 == 0,
        8192 => (16384..=61440).contains(&memory_mib) && memory_mib % 4096 == 0,
        16384 => (32768..=122_880).contains(&memory_mib) && memory_mib % 8192 == 0,
        _ => false,
    };
    if supported {
        Ok(())
    } else {
        Err(StackwireError::config(format!(
            "unsupported task size: {cpu_units} CPU units with {memory_mib} MiB"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_config() -> SynthConfig {
        SynthConfig {
            repository_name: "api-server-dev".into(),
            ..SynthConfig::default()
        }
    }

    #[test]
    fn defaults_are_valid_for_service_once_repository_is_set() {
        assert!(service_config().validate(StackKind::Service).is_ok());
    }

    #[test]
    fn empty_repository_name_is_rejected() {
        let err = SynthConfig::default()
            .validate(StackKind::Service)
            .unwrap_err();
        assert!(err.to_string().contains("repository name"), "got: {err}");
    }

    #[test]
    fn registry_stack_needs_no_repository() {
        assert!(SynthConfig::default().validate(StackKind::Registry).is_ok());
    }

    #[test]
    fn storage_stack_requires_network_id() {
        let err = SynthConfig::default()
            .validate(StackKind::Storage)
            .unwrap_err();
        assert!(err.to_string().contains("existing network id"), "got: {err}");
    }

    #[test]
    fn normalized_drops_empty_optionals() {
        let config = SynthConfig {
            vpc_id: Some(String::new()),
            external_bucket_name: Some("  ".into()),
            cache_host: Some("cache.local".into()),
            bucket_name: String::new(),
            ..SynthConfig::default()
        }
        .normalized();
        assert_eq!(config.vpc_id, None);
        assert_eq!(config.external_bucket_name, None);
        assert_eq!(config.cache_host.as_deref(), Some("cache.local"));
        assert_eq!(config.bucket_name, constants::DEFAULT_BUCKET_BASE);
    }

    #[test]
    fn cache_port_without_host_is_rejected() {
        let config = SynthConfig {
            cache_port: Some("6379".into()),
            ..service_config()
        };
        assert!(config.validate(StackKind::Service).is_err());
    }

    #[test]
    fn bucket_name_rules() {
        assert!(validate_bucket_name("out-bucket").is_ok());
        assert!(validate_bucket_name("my.bucket.v2").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper-Case").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("double..dot").is_err());
    }

    #[test]
    fn task_size_combinations() {
        assert!(validate_task_size("256", "512").is_ok());
        assert!(validate_task_size("1024", "3072").is_ok());
        assert!(validate_task_size("256", "4096").is_err());
        assert!(validate_task_size("300", "512").is_err());
        assert!(validate_task_size("", "512").is_err());
    }

    #[test]
    fn consume_upstream_fills_only_unset_fields() {
        let mut upstream = BTreeMap::new();
        let _ = upstream.insert(OutputKey::BucketName, "api-output-dev".to_string());
        let _ = upstream.insert(OutputKey::CacheEndpoint, "cache.internal".to_string());

        let mut config = SynthConfig {
            cache_host: Some("explicit.host".into()),
            ..SynthConfig::default()
        };
        config.consume_upstream(&upstream).expect("consume");
        assert_eq!(config.external_bucket_name.as_deref(), Some("api-output-dev"));
        assert_eq!(config.cache_host.as_deref(), Some("explicit.host"));
    }

    #[test]
    fn consume_upstream_rejects_unresolved_reference() {
        let mut upstream = BTreeMap::new();
        let _ = upstream.insert(
            OutputKey::CacheEndpoint,
            "${api-serverless-cache-dev.Endpoint.Address}".to_string(),
        );
        let mut config = SynthConfig::default();
        let err = config.consume_upstream(&upstream).unwrap_err();
        assert!(err.to_string().contains("cacheEndpoint"), "got: {err}");
        assert_eq!(config.cache_host, None);
    }

    #[test]
    fn unresolved_cache_host_is_rejected() {
        let config = SynthConfig {
            cache_host: Some("${cache.Endpoint.Address}".into()),
            ..service_config()
        };
        let err = config.validate(StackKind::Service).unwrap_err();
        assert!(err.to_string().contains("unresolved reference"), "got: {err}");
    }

    #[test]
    fn config_deserializes_with_defaults_from_yaml() {
        let yaml = "stage: prod\nrepository_name: api-server-prod\n";
        let config: SynthConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.stage, Stage::Prod);
        assert_eq!(config.vpc_cidr, constants::DEFAULT_VPC_CIDR);
        assert!(config.provision_cache);
    }
}
