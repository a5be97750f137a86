//! Domain primitive types used across the Stackwire workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StackwireError;

/// A named deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Development stage.
    #[default]
    Dev,
    /// Pre-production stage.
    Stage,
    /// Production stage.
    Prod,
}

impl Stage {
    /// Returns the lowercase suffix used in resource names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Stage => "stage",
            Self::Prod => "prod",
        }
    }

    /// Returns whether this is the production stage.
    #[must_use]
    pub const fn is_prod(self) -> bool {
        matches!(self, Self::Prod)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StackwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "stage" => Ok(Self::Stage),
            "prod" => Ok(Self::Prod),
            other => Err(StackwireError::config(format!(
                "unknown deployment stage: \"{other}\" (expected dev, stage, or prod)"
            ))),
        }
    }
}

/// Which stack a synthesis pass produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    /// Network, cache, storage, and the compute service.
    #[default]
    Service,
    /// The container repository the build pipeline publishes into.
    Registry,
    /// Bucket and cache inside an existing network.
    Storage,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::Registry => write!(f, "registry"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

impl FromStr for StackKind {
    type Err = StackwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "registry" => Ok(Self::Registry),
            "storage" => Ok(Self::Storage),
            other => Err(StackwireError::config(format!("unknown stack kind: \"{other}\""))),
        }
    }
}

/// What happens to a resource when its stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    /// Delete the resource with the stack.
    Destroy,
    /// Orphan the resource so its data survives.
    Retain,
}

impl RemovalPolicy {
    /// Teardown policy for a resource owned by the given stage.
    #[must_use]
    pub const fn for_stage(stage: Stage) -> Self {
        if stage.is_prod() { Self::Retain } else { Self::Destroy }
    }
}

/// Stable names of the values a stack publishes for downstream stages.
///
/// The string forms are a contract: they never change once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKey {
    /// Task definition identifier.
    #[serde(rename = "newTaskDefArn")]
    TaskDefArn,
    /// Compute service name.
    #[serde(rename = "newSvcName")]
    ServiceName,
    /// Cluster name.
    #[serde(rename = "newClusterName")]
    ClusterName,
    /// Cluster identifier.
    #[serde(rename = "newClusterArn")]
    ClusterArn,
    /// Comma-joined private then public subnet ids.
    #[serde(rename = "subnets")]
    Subnets,
    /// Comma-joined security group ids attached to the service.
    #[serde(rename = "securityGroups")]
    SecurityGroups,
    /// Bucket name.
    #[serde(rename = "bucketName")]
    BucketName,
    /// Cache host address.
    #[serde(rename = "cacheEndpoint")]
    CacheEndpoint,
    /// Repository URI published by the registry stack.
    #[serde(rename = "reposServerUri")]
    RepositoryUri,
    /// Repository name published by the registry stack.
    #[serde(rename = "reposServerName")]
    RepositoryName,
}

impl OutputKey {
    /// Every key, in emission order.
    pub const ALL: [Self; 10] = [
        Self::TaskDefArn,
        Self::ServiceName,
        Self::ClusterName,
        Self::ClusterArn,
        Self::Subnets,
        Self::SecurityGroups,
        Self::BucketName,
        Self::CacheEndpoint,
        Self::RepositoryUri,
        Self::RepositoryName,
    ];

    /// Returns the published name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskDefArn => "newTaskDefArn",
            Self::ServiceName => "newSvcName",
            Self::ClusterName => "newClusterName",
            Self::ClusterArn => "newClusterArn",
            Self::Subnets => "subnets",
            Self::SecurityGroups => "securityGroups",
            Self::BucketName => "bucketName",
            Self::CacheEndpoint => "cacheEndpoint",
            Self::RepositoryUri => "reposServerUri",
            Self::RepositoryName => "reposServerName",
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKey {
    type Err = StackwireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StackwireError::NotFound {
                kind: "output",
                id: s.to_string(),
            })
    }
}
