//! # stackwire-synth
//!
//! Resolve-or-create synthesis of a deployment stage's topology.
//!
//! Handles:
//! - **Template**: Resources, deferred values, and dependency ordering.
//! - **Network**: Binding to an existing network or carving a new one.
//! - **Registry / Cache / Storage**: Optional resources wired into the
//!   service only when resolved.
//! - **Compute**: Cluster, task definition, service, and access grants.
//! - **Outputs**: The stable named values downstream stages consume.
//! - **Stack**: One synthesis pass per stack kind.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cache;
pub mod cidr;
pub mod compute;
pub mod graph;
pub mod network;
pub mod outputs;
pub mod registry;
pub mod scope;
pub mod stack;
pub mod storage;
pub mod template;
pub mod token;

pub use outputs::OutputSet;
pub use stack::{Synthesis, synthesize};
pub use template::Template;
