//! IPv4 address ranges in CIDR notation, parsed with `nom`.
//!
//! Subnets of a range are carved sequentially: the n-th `/p` block of
//! `20.0.0.0/16` at `/24` is `20.0.n.0/24`.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use nom::{
    IResult, Parser,
    character::complete::{char, u8 as dec_u8},
    combinator::all_consuming,
    sequence::separated_pair,
};
use serde::{Deserialize, Serialize};
use stackwire_common::error::{Result, StackwireError};

/// An IPv4 network address with a prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

fn dotted_quad(input: &str) -> IResult<&str, Ipv4Addr> {
    let (input, (a, _, b, _, c, _, d)) = (
        dec_u8,
        char('.'),
        dec_u8,
        char('.'),
        dec_u8,
        char('.'),
        dec_u8,
    )
        .parse(input)?;
    Ok((input, Ipv4Addr::new(a, b, c, d)))
}

fn cidr(input: &str) -> IResult<&str, (Ipv4Addr, u8)> {
    separated_pair(dotted_quad, char('/'), dec_u8).parse(input)
}

const fn mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    }
}

impl Ipv4Cidr {
    /// Parses `a.b.c.d/p`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not a dotted quad with
    /// a prefix of at most 32, or if bits below the prefix are set.
    pub fn parse(input: &str) -> Result<Self> {
        let malformed = || StackwireError::config(format!("malformed address range: \"{input}\""));
        let (_, (network, prefix)) = all_consuming(cidr)
            .parse(input.trim())
            .map_err(|_| malformed())?;
        if prefix > 32 {
            return Err(malformed());
        }
        if u32::from(network) & !mask(prefix) != 0 {
            return Err(StackwireError::config(format!(
                "address range \"{input}\" has host bits set"
            )));
        }
        Ok(Self { network, prefix })
    }

    /// Returns the network address.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Returns the prefix length.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of `/prefix` blocks that fit in this range.
    #[must_use]
    pub const fn capacity(&self, prefix: u8) -> u64 {
        if prefix < self.prefix || prefix > 32 {
            0
        } else {
            1u64 << (prefix - self.prefix)
        }
    }

    /// The `index`-th `/prefix` block of this range.
    #[must_use]
    pub fn subnet(&self, prefix: u8, index: u32) -> Option<Self> {
        if u64::from(index) >= self.capacity(prefix) {
            return None;
        }
        let block = 1u64 << (32 - prefix);
        let start = u64::from(u32::from(self.network)) + u64::from(index) * block;
        let network = Ipv4Addr::from(u32::try_from(start).ok()?);
        Some(Self { network, prefix })
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = StackwireError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = StackwireError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}
