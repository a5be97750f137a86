//! Managed cache provisioning.
//!
//! A provisioned cache is always created fresh for the stage, attached to
//! every private subnet of the resolved network, and guarded by its own
//! security group that admits only the network's address range on
//! [`CACHE_PORT`]. An externally supplied host is wired as-is.

use stackwire_common::config::{check_resolved, parse_port};
use stackwire_common::constants::{CACHE_ENGINE, CACHE_PORT};
use stackwire_common::error::{Result, StackwireError};

use crate::network::NetworkContext;
use crate::scope::Scope;
use crate::template::{IngressRule, Resource, Template};
use crate::token::Token;

/// Where the service reaches its cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEndpoint {
    /// Host address.
    pub host: Token,
    /// Service port.
    pub port: u16,
    /// Whether this stage provisioned the cache.
    pub provisioned: bool,
}

/// Defines a serverless cache inside `network`.
///
/// # Errors
///
/// Returns a configuration error if the network has no private subnets,
/// or if a logical id collides in `template`.
pub fn provision_cache(
    template: &mut Template,
    scope: &Scope,
    network: &NetworkContext,
) -> Result<CacheEndpoint> {
    if network.private_subnet_ids.is_empty() {
        return Err(StackwireError::config(
            "cannot place a cache in a network without private subnets",
        ));
    }

    let group_id = scope.name("cache-redis");
    let _ = template.add(
        group_id.as_str(),
        Resource::SecurityGroup {
            name: scope.name("cache-ecs"),
            description: "Security group for the serverless cache used by the service".into(),
            network: network.network_id.clone(),
            ingress: vec![IngressRule {
                protocol: "tcp".into(),
                port: CACHE_PORT,
                source: network.address_range.clone(),
                description: "Allow cache port from inside the network".into(),
            }],
            allow_all_outbound: true,
        },
    )?;

    let cache_id = scope.name("serverless-cache");
    tracing::info!(cache = %cache_id, port = CACHE_PORT, "defining serverless cache");
    let _ = template.add(
        cache_id.as_str(),
        Resource::ServerlessCache {
            name: cache_id.clone(),
            engine: CACHE_ENGINE.into(),
            security_group_ids: vec![Token::attr(group_id, "GroupId")],
            subnet_ids: network.private_subnet_ids.clone(),
        },
    )?;

    Ok(CacheEndpoint {
        host: Token::attr(cache_id, "Endpoint.Address"),
        port: CACHE_PORT,
        provisioned: true,
    })
}

/// Wires an existing cache host. The port defaults to [`CACHE_PORT`].
///
/// # Errors
///
/// Returns a configuration error if the host is empty or an unresolved
/// reference, or the port is invalid.
pub fn bind_cache(host: &str, port: Option<&str>) -> Result<CacheEndpoint> {
    let host = host.trim();
    if host.is_empty() {
        return Err(StackwireError::config("cache host must not be empty"));
    }
    check_resolved("cache host", host)?;
    let port = port.map_or(Ok(CACHE_PORT), parse_port)?;
    tracing::info!(host, port, "binding to existing cache");
    Ok(CacheEndpoint {
        host: Token::literal(host),
        port,
        provisioned: false,
    })
}
