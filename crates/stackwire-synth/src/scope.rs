//! Naming scope shared by every resource in one synthesis pass.

use stackwire_common::types::Stage;

use crate::token::{Pseudo, Token};

/// Namespace, stage, and target environment of a synthesis pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    namespace: String,
    stage: Stage,
    account: Option<String>,
    region: Option<String>,
}

impl Scope {
    /// Creates a scope for the given namespace prefix and stage.
    #[must_use]
    pub fn new(namespace: impl Into<String>, stage: Stage) -> Self {
        Self {
            namespace: namespace.into(),
            stage,
            account: None,
            region: None,
        }
    }

    /// Pins the target account and region.
    #[must_use]
    pub fn with_target(mut self, account: Option<String>, region: Option<String>) -> Self {
        self.account = account;
        self.region = region;
        self
    }

    /// Returns the namespace prefix.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the deployment stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Builds `<namespace>-<kind>-<stage>`, dropping an empty namespace.
    #[must_use]
    pub fn name(&self, kind: &str) -> String {
        if self.namespace.is_empty() {
            format!("{kind}-{}", self.stage)
        } else {
            format!("{}-{kind}-{}", self.namespace, self.stage)
        }
    }

    /// Account id, or the pseudo parameter the apply target fills in.
    #[must_use]
    pub fn account(&self) -> Token {
        self.account
            .as_ref()
            .map_or(Token::Pseudo(Pseudo::AccountId), Token::literal)
    }

    /// Region, or the pseudo parameter the apply target fills in.
    #[must_use]
    pub fn region(&self) -> Token {
        self.region
            .as_ref()
            .map_or(Token::Pseudo(Pseudo::Region), Token::literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_includes_namespace_and_stage() {
        let scope = Scope::new("api", Stage::Prod);
        assert_eq!(scope.name("vpc"), "api-vpc-prod");
    }

    #[test]
    fn empty_namespace_is_dropped() {
        let scope = Scope::new("", Stage::Dev);
        assert_eq!(scope.name("output-bucket"), "output-bucket-dev");
    }

    #[test]
    fn region_falls_back_to_pseudo_parameter() {
        let scope = Scope::new("api", Stage::Dev);
        assert_eq!(scope.region(), Token::Pseudo(Pseudo::Region));
        let pinned = scope.with_target(None, Some("eu-west-1".into()));
        assert_eq!(pinned.region().to_string(), "eu-west-1");
    }
}
