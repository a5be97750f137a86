//! Network resolution: bind to an existing network or define a new one.
//!
//! A new network spans [`MAX_AZS`] availability zones with one private
//! (egress-capable) and one public `/24` subnet in each, a single NAT
//! gateway, and an internet gateway. A bound network contributes nothing to
//! the template; its subnets and address range are inherited lookups.

use stackwire_common::constants::{AZ_SUFFIXES, MAX_AZS, NAT_GATEWAYS, SUBNET_MASK};
use stackwire_common::error::{Result, StackwireError};

use crate::cidr::Ipv4Cidr;
use crate::scope::Scope;
use crate::template::{Resource, SubnetKind, Template};
use crate::token::Token;

/// The resolved network every other component is placed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    /// Address range of the network.
    pub address_range: Token,
    /// External identifier when the network was bound rather than created.
    pub existing_id: Option<String>,
    /// Identifier of the network.
    pub network_id: Token,
    /// Private subnet ids, one per availability zone, in zone order.
    pub private_subnet_ids: Vec<Token>,
    /// Public subnet ids, one per availability zone, in zone order.
    pub public_subnet_ids: Vec<Token>,
}

impl NetworkContext {
    /// Returns whether the network was bound to an existing one.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.existing_id.is_some()
    }

    /// Private then public subnet ids, in resolution order.
    pub fn subnet_ids(&self) -> impl Iterator<Item = &Token> {
        self.private_subnet_ids
            .iter()
            .chain(&self.public_subnet_ids)
    }
}

/// Resolves the network for a synthesis pass.
///
/// With `existing_id` the network is bound and `address_range` is ignored.
/// Otherwise a new network is defined over `address_range`.
///
/// # Errors
///
/// Returns a configuration error if a new network is requested over a
/// malformed address range or one too small for the subnet layout.
pub fn resolve_network(
    template: &mut Template,
    scope: &Scope,
    existing_id: Option<&str>,
    address_range: &str,
) -> Result<NetworkContext> {
    match existing_id {
        Some(id) => Ok(bind_network(id)),
        None => {
            let range = Ipv4Cidr::parse(address_range)?;
            define_network(template, scope, range)
        }
    }
}

fn bind_network(id: &str) -> NetworkContext {
    tracing::info!(network_id = id, "binding to existing network");
    NetworkContext {
        address_range: Token::lookup(id, "CidrBlock"),
        existing_id: Some(id.to_string()),
        network_id: Token::literal(id),
        private_subnet_ids: vec![Token::lookup(id, "PrivateSubnetIds")],
        public_subnet_ids: vec![Token::lookup(id, "PublicSubnetIds")],
    }
}

fn define_network(template: &mut Template, scope: &Scope, range: Ipv4Cidr) -> Result<NetworkContext> {
    let needed = u64::try_from(MAX_AZS * 2).unwrap_or(u64::MAX);
    if range.capacity(SUBNET_MASK) < needed {
        return Err(StackwireError::config(format!(
            "address range {range} cannot hold {needed} /{SUBNET_MASK} subnets"
        )));
    }

    let vpc_name = scope.name("vpc");
    tracing::info!(network = %vpc_name, %range, "defining new network");
    let network_id = template.add(
        vpc_name.as_str(),
        Resource::Network {
            name: vpc_name.clone(),
            cidr_block: range.to_string(),
        },
    )?;
    let _ = template.add(
        format!("{vpc_name}-igw"),
        Resource::InternetGateway {
            network: network_id.clone(),
        },
    )?;

    let mut block = 0u32;
    let mut subnets = |template: &mut Template, kind: SubnetKind, group: &str| -> Result<Vec<Token>> {
        let group_name = scope.name(group);
        let mut ids = Vec::with_capacity(MAX_AZS);
        for suffix in AZ_SUFFIXES {
            let cidr = range.subnet(SUBNET_MASK, block).ok_or_else(|| {
                StackwireError::config(format!("address range {range} exhausted at block {block}"))
            })?;
            block += 1;
            let id = template.add(
                format!("{group_name}-{suffix}"),
                Resource::Subnet {
                    name: group_name.clone(),
                    network: network_id.clone(),
                    cidr_block: cidr.to_string(),
                    availability_zone: Token::join(
                        "",
                        vec![scope.region(), Token::literal(suffix.to_string())],
                    ),
                    kind,
                },
            )?;
            ids.push(id);
        }
        Ok(ids)
    };
    let private_subnet_ids = subnets(template, SubnetKind::PrivateWithEgress, "subnet-private")?;
    let public_subnet_ids = subnets(template, SubnetKind::Public, "subnet-public")?;

    for (i, subnet) in public_subnet_ids.iter().take(NAT_GATEWAYS).enumerate() {
        let _ = template.add(
            format!("{vpc_name}-nat-{i}"),
            Resource::NatGateway {
                subnet: subnet.clone(),
            },
        )?;
    }

    Ok(NetworkContext {
        address_range: Token::literal(range.to_string()),
        existing_id: None,
        network_id,
        private_subnet_ids,
        public_subnet_ids,
    })
}

#[cfg(test)]
mod tests {
    use stackwire_common::types::Stage;

    use super::*;

    fn count_subnets(template: &Template, wanted: SubnetKind) -> usize {
        template
            .resources
            .values()
            .filter(|r| matches!(r, Resource::Subnet { kind, .. } if *kind == wanted))
            .count()
    }

    #[test]
    fn existing_network_defines_nothing() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        let network = resolve_network(&mut template, &scope, Some("vpc-0abc"), "20.0.0.0/16")
            .expect("bind");
        assert!(network.is_bound());
        assert!(template.resources.is_empty());
        assert_eq!(network.network_id.to_string(), "vpc-0abc");
        assert_eq!(
            network.address_range.to_string(),
            "${lookup:vpc-0abc.CidrBlock}"
        );
    }

    #[test]
    fn existing_network_ignores_malformed_range() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        assert!(resolve_network(&mut template, &scope, Some("vpc-0abc"), "garbage").is_ok());
    }

    #[test]
    fn new_network_has_two_private_and_two_public_subnets() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        let network =
            resolve_network(&mut template, &scope, None, "20.0.0.0/16").expect("define");
        assert!(!network.is_bound());
        assert_eq!(network.private_subnet_ids.len(), 2);
        assert_eq!(network.public_subnet_ids.len(), 2);
        assert_eq!(count_subnets(&template, SubnetKind::PrivateWithEgress), 2);
        assert_eq!(count_subnets(&template, SubnetKind::Public), 2);
    }

    #[test]
    fn subnets_are_slash_24_blocks_in_zone_order() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        let network =
            resolve_network(&mut template, &scope, None, "20.0.0.0/16").expect("define");
        let blocks: Vec<&str> = network
            .subnet_ids()
            .filter_map(|t| match t {
                Token::Ref(id) => template.resources.get(id),
                _ => None,
            })
            .filter_map(|r| match r {
                Resource::Subnet { cidr_block, .. } => Some(cidr_block.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            blocks,
            vec!["20.0.0.0/24", "20.0.1.0/24", "20.0.2.0/24", "20.0.3.0/24"]
        );
    }

    #[test]
    fn exactly_one_nat_gateway_in_first_public_subnet() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Stage);
        let network =
            resolve_network(&mut template, &scope, None, "20.0.0.0/16").expect("define");
        let nats: Vec<&Resource> = template
            .resources
            .values()
            .filter(|r| matches!(r, Resource::NatGateway { .. }))
            .collect();
        assert_eq!(nats.len(), 1);
        assert_eq!(
            nats[0],
            &Resource::NatGateway {
                subnet: network.public_subnet_ids[0].clone()
            }
        );
    }

    #[test]
    fn malformed_range_is_config_error() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        let err = resolve_network(&mut template, &scope, None, "20.0.0/16").unwrap_err();
        assert!(err.to_string().contains("malformed address range"), "got: {err}");
        assert!(template.resources.is_empty());
    }

    #[test]
    fn range_too_small_is_config_error() {
        let mut template = Template::new("test");
        let scope = Scope::new("api", Stage::Dev);
        let err = resolve_network(&mut template, &scope, None, "10.0.0.0/23").unwrap_err();
        assert!(err.to_string().contains("cannot hold"), "got: {err}");
    }
}
