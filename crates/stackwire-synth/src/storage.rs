//! Object storage: bind to an external bucket or define an owned one.
//!
//! Owned buckets are named `<namespace>-<base>-<stage>` and carry a teardown
//! policy keyed by stage. External buckets add nothing to the template and
//! are never subject to a teardown policy.

use stackwire_common::config::validate_bucket_name;
use stackwire_common::constants::{CORS_EXPOSED_HEADERS, CORS_MAX_AGE_SECS};
use stackwire_common::error::Result;
use stackwire_common::types::{RemovalPolicy, Stage};

use crate::scope::Scope;
use crate::template::{CorsRule, Resource, Template};
use crate::token::Token;

/// A resolved bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReference {
    /// Bucket name.
    pub bucket_name: String,
    /// Bucket ARN.
    pub bucket_arn: Token,
    /// Whether this stage controls the bucket's lifecycle.
    pub owned: bool,
    /// Stage the bucket was resolved for.
    pub stage: Stage,
}

impl StorageReference {
    /// Teardown policy this synthesis applies, if any.
    #[must_use]
    pub const fn removal_policy(&self) -> Option<RemovalPolicy> {
        if self.owned {
            Some(RemovalPolicy::for_stage(self.stage))
        } else {
            None
        }
    }

    /// ARN matching every object in the bucket.
    #[must_use]
    pub fn objects_arn(&self) -> Token {
        Token::join("", vec![self.bucket_arn.clone(), Token::literal("/*")])
    }
}

/// How a bucket should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageRequest<'a> {
    /// Base name of an owned bucket.
    pub base_name: &'a str,
    /// Existing bucket to bind to.
    pub external_name: Option<&'a str>,
    /// Attach the browser upload CORS rule.
    pub cors: bool,
    /// Allow anonymous reads.
    pub public_read: bool,
}

/// Resolves the bucket for a synthesis pass.
///
/// # Errors
///
/// Returns a configuration error if the bound or composed bucket name is
/// not a valid bucket name.
pub fn resolve_storage(
    template: &mut Template,
    scope: &Scope,
    request: &StorageRequest<'_>,
) -> Result<StorageReference> {
    if let Some(name) = request.external_name {
        validate_bucket_name(name)?;
        tracing::info!(bucket = name, "binding to existing bucket");
        return Ok(StorageReference {
            bucket_name: name.to_string(),
            bucket_arn: Token::literal(format!("arn:aws:s3:::{name}")),
            owned: false,
            stage: scope.stage(),
        });
    }

    let bucket_name = scope.name(request.base_name);
    validate_bucket_name(&bucket_name)?;
    let removal_policy = RemovalPolicy::for_stage(scope.stage());
    let logical_id = scope.name("output-bucket");
    tracing::info!(bucket = %bucket_name, ?removal_policy, "defining owned bucket");

    let _ = template.add(
        logical_id.as_str(),
        Resource::Bucket {
            bucket_name: bucket_name.clone(),
            removal_policy,
            public_read_access: request.public_read,
            cors: if request.cors { vec![upload_cors_rule()] } else { Vec::new() },
        },
    )?;

    Ok(StorageReference {
        bucket_name,
        bucket_arn: Token::attr(logical_id, "Arn"),
        owned: true,
        stage: scope.stage(),
    })
}

/// Cross-origin rule permitting direct browser uploads and downloads.
#[must_use]
pub fn upload_cors_rule() -> CorsRule {
    CorsRule {
        allowed_methods: ["HEAD", "GET", "PUT", "POST", "DELETE"]
            .into_iter()
            .map(String::from)
            .collect(),
        allowed_origins: vec!["*".into()],
        allowed_headers: vec!["*".into()],
        exposed_headers: CORS_EXPOSED_HEADERS.into_iter().map(String::from).collect(),
        max_age: CORS_MAX_AGE_SECS,
    }
}
