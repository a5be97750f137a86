//! Output publication.
//!
//! Outputs are the only values downstream stages see. Names come from
//! [`OutputKey`] and never change; a name is present only when the
//! resource behind it exists for this stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stackwire_common::types::OutputKey;

use crate::cache::CacheEndpoint;
use crate::compute::ComputeService;
use crate::network::NetworkContext;
use crate::storage::StorageReference;
use crate::template::Template;
use crate::token::Token;

/// Rendered outputs of one stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSet(BTreeMap<OutputKey, String>);

impl OutputSet {
    /// Renders the outputs declared in `template`.
    #[must_use]
    pub fn from_template(template: &Template) -> Self {
        Self(
            template
                .outputs
                .iter()
                .map(|(key, output)| (*key, output.value.to_string()))
                .collect(),
        )
    }

    /// Returns the value published under `key`.
    #[must_use]
    pub fn get(&self, key: OutputKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// Returns whether `key` is published.
    #[must_use]
    pub fn contains(&self, key: OutputKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Published names, in emission order.
    pub fn keys(&self) -> impl Iterator<Item = OutputKey> + '_ {
        self.0.keys().copied()
    }

    /// Number of published values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<OutputKey, String> {
        &self.0
    }
}

fn comma_joined<'a>(ids: impl IntoIterator<Item = &'a Token>) -> Token {
    Token::join(",", ids.into_iter().cloned().collect())
}

/// Declares the service stack's outputs on `template`.
pub fn publish_service(
    template: &mut Template,
    compute: &ComputeService,
    network: &NetworkContext,
    storage: Option<&StorageReference>,
    cache: Option<&CacheEndpoint>,
) {
    template.output(OutputKey::TaskDefArn, compute.task_definition_arn.clone(), None);
    template.output(
        OutputKey::ServiceName,
        Token::literal(compute.service_name.as_str()),
        None,
    );
    template.output(
        OutputKey::ClusterName,
        Token::literal(compute.cluster_name.as_str()),
        None,
    );
    template.output(OutputKey::ClusterArn, compute.cluster_arn.clone(), None);
    template.output(OutputKey::Subnets, comma_joined(network.subnet_ids()), None);
    template.output(
        OutputKey::SecurityGroups,
        comma_joined(&compute.security_group_ids),
        None,
    );
    publish_storage(template, storage, cache);
}

/// Declares the bucket and cache outputs that apply to this stage.
///
/// `bucketName` is published for any resolved bucket; `cacheEndpoint` only
/// for a cache this stage provisioned.
pub fn publish_storage(
    template: &mut Template,
    storage: Option<&StorageReference>,
    cache: Option<&CacheEndpoint>,
) {
    if let Some(storage) = storage {
        template.output(
            OutputKey::BucketName,
            Token::literal(storage.bucket_name.as_str()),
            None,
        );
    }
    if let Some(cache) = cache.filter(|c| c.provisioned) {
        template.output(OutputKey::CacheEndpoint, cache.host.clone(), None);
    }
    tracing::debug!(outputs = template.outputs.len(), "outputs published");
}
