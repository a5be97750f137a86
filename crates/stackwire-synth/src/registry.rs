//! Container registry references.
//!
//! The service stack only ever binds to an image that the build pipeline
//! already published. The registry stack is the one place a repository is
//! created.

use stackwire_common::error::{Result, StackwireError};
use stackwire_common::types::{OutputKey, RemovalPolicy};

use crate::scope::Scope;
use crate::template::{Resource, Template};
use crate::token::Token;

/// A published image, by repository name and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryReference {
    repository_name: String,
    tag: String,
}

impl RegistryReference {
    /// Binds to `repository_name:tag`.
    ///
    /// Whether the repository exists is only known to the apply target.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either part is empty.
    pub fn bind(repository_name: &str, tag: &str) -> Result<Self> {
        let repository_name = repository_name.trim();
        let tag = tag.trim();
        if repository_name.is_empty() {
            return Err(StackwireError::config("repository name must not be empty"));
        }
        if tag.is_empty() {
            return Err(StackwireError::config("image tag must not be empty"));
        }
        tracing::info!(repository = repository_name, tag, "binding to published image");
        Ok(Self {
            repository_name: repository_name.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Returns the repository name.
    #[must_use]
    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    /// Returns the image tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Full image URI within the target account's registry.
    #[must_use]
    pub fn image_uri(&self, scope: &Scope) -> Token {
        Token::join(
            "",
            vec![
                registry_host(scope),
                Token::literal(format!("/{}:{}", self.repository_name, self.tag)),
            ],
        )
    }
}

fn registry_host(scope: &Scope) -> Token {
    Token::join(
        "",
        vec![
            scope.account(),
            Token::literal(".dkr.ecr."),
            scope.region(),
            Token::literal(".amazonaws.com"),
        ],
    )
}

/// Export name of the repository URI output.
pub const REPOSITORY_URI_EXPORT: &str = "builderServerUri";
/// Export name of the repository name output.
pub const REPOSITORY_NAME_EXPORT: &str = "builderServerRepoName";

/// A repository created by the registry stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDefinition {
    /// Repository name.
    pub repository_name: String,
    /// Repository URI.
    pub uri: Token,
}

/// Defines the repository the build pipeline publishes the server image into
/// and exports its URI and name.
///
/// # Errors
///
/// Returns an error if the logical id is already taken in `template`.
pub fn provision_repository(template: &mut Template, scope: &Scope) -> Result<RepositoryDefinition> {
    let repository_name = scope.name("server");
    let logical_id = scope.name("repos-server");
    tracing::info!(repository = %repository_name, "defining image repository");

    let _ = template.add(
        logical_id.as_str(),
        Resource::Repository {
            repository_name: repository_name.clone(),
            removal_policy: RemovalPolicy::Retain,
        },
    )?;
    let uri = Token::attr(logical_id, "RepositoryUri");

    template.output(
        OutputKey::RepositoryUri,
        uri.clone(),
        Some(REPOSITORY_URI_EXPORT.into()),
    );
    template.output(
        OutputKey::RepositoryName,
        Token::literal(repository_name.as_str()),
        Some(REPOSITORY_NAME_EXPORT.into()),
    );

    Ok(RepositoryDefinition {
        repository_name,
        uri,
    })
}
