//! Deferred values.
//!
//! Most identifiers only exist once the apply target has created the
//! resource. A [`Token`] names such a value symbolically; its [`Display`]
//! rendering is deterministic so outputs stay byte-stable across runs.
//!
//! [`Display`]: std::fmt::Display

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment values the apply target substitutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pseudo {
    /// Target account id.
    AccountId,
    /// Target region.
    Region,
}

impl fmt::Display for Pseudo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountId => write!(f, "${{AWS::AccountId}}"),
            Self::Region => write!(f, "${{AWS::Region}}"),
        }
    }
}

/// A value that is either known now or resolved at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// A value known at synthesis time.
    Literal(String),
    /// The primary identifier of a resource in this template.
    Ref(String),
    /// A named attribute of a resource in this template.
    Attr {
        /// Logical id of the resource.
        resource: String,
        /// Attribute name.
        attribute: String,
    },
    /// An attribute of a pre-existing resource outside this template.
    Lookup {
        /// External identifier of the resource.
        id: String,
        /// Attribute name.
        attribute: String,
    },
    /// An environment value substituted by the apply target.
    Pseudo(Pseudo),
    /// Concatenation of several values.
    Join {
        /// Separator placed between parts.
        separator: String,
        /// Parts, in order.
        parts: Vec<Token>,
    },
}

impl Token {
    /// A value known now.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// The primary identifier of `resource`.
    pub fn reference(resource: impl Into<String>) -> Self {
        Self::Ref(resource.into())
    }

    /// The `attribute` of `resource`.
    pub fn attr(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Attr {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// The `attribute` of an external resource.
    pub fn lookup(id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::Lookup {
            id: id.into(),
            attribute: attribute.into(),
        }
    }

    /// `parts` joined by `separator`.
    pub fn join(separator: impl Into<String>, parts: Vec<Self>) -> Self {
        Self::Join {
            separator: separator.into(),
            parts,
        }
    }

    /// Logical ids of the template resources this value depends on.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Ref(resource) | Self::Attr { resource, .. } => vec![resource.as_str()],
            Self::Join { parts, .. } => parts.iter().flat_map(Self::references).collect(),
            Self::Literal(_) | Self::Lookup { .. } | Self::Pseudo(_) => Vec::new(),
        }
    }

    /// Returns whether the value is fully known at synthesis time.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Literal(_) => true,
            Self::Join { parts, .. } => parts.iter().all(Self::is_resolved),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Ref(resource) => write!(f, "${{{resource}}}"),
            Self::Attr {
                resource,
                attribute,
            } => write!(f, "${{{resource}.{attribute}}}"),
            Self::Lookup { id, attribute } => write!(f, "${{lookup:{id}.{attribute}}}"),
            Self::Pseudo(pseudo) => write!(f, "{pseudo}"),
            Self::Join { separator, parts } => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}
