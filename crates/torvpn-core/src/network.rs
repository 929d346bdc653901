//! IPv4 network ranges excluded from redirection

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation
///
/// Host bits are masked on parse, so `127.0.0.1/8` becomes `127.0.0.0/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cidr {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Cidr {
    /// Build a network, masking any host bits
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(Error::invalid_cidr(
                format!("{addr}/{prefix}"),
                "prefix length must be 0-32",
            ));
        }
        let bits = u32::from(addr) & Self::mask(prefix);
        Ok(Self {
            addr: Ipv4Addr::from(bits),
            prefix,
        })
    }

    /// Construct from a known-good, already masked network
    pub(crate) const fn from_parts(addr: Ipv4Addr, prefix: u8) -> Self {
        Self { addr, prefix }
    }

    /// Network address
    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Whether `ip` falls inside this network
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & Self::mask(self.prefix) == u32::from(self.addr)
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        }
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };

        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::invalid_cidr(s, "not an IPv4 address"))?;
        let prefix = match prefix {
            Some(p) => p
                .parse::<u8>()
                .map_err(|_| Error::invalid_cidr(s, "prefix length is not a number"))?,
            None => 32,
        };

        Self::new(addr, prefix).map_err(|_| Error::invalid_cidr(s, "prefix length must be 0-32"))
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

impl TryFrom<String> for Cidr {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Cidr> for String {
    fn from(value: Cidr) -> Self {
        value.to_string()
    }
}

/// Ordered list of networks that bypass the daemon
///
/// Order is kept as configured; it is the order the accept rules land in
/// the chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Cidr>", into = "Vec<Cidr>")]
pub struct ExemptNetworks(Vec<Cidr>);

impl ExemptNetworks {
    /// Build from parsed networks, rejecting duplicates
    pub fn new(networks: Vec<Cidr>) -> Result<Self> {
        for (i, net) in networks.iter().enumerate() {
            if networks[..i].contains(net) {
                return Err(Error::config_value(
                    "filter.exempt_networks",
                    format!("duplicate network {net}"),
                ));
            }
        }
        Ok(Self(networks))
    }

    /// Parse a list of CIDR strings
    pub fn parse<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let networks = items
            .into_iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<Cidr>>>()?;
        Self::new(networks)
    }

    /// Local subnet and loopback, as shipped by default
    pub fn local_defaults() -> Self {
        Self(vec![
            Cidr::from_parts(Ipv4Addr::new(192, 168, 0, 0), 16),
            Cidr::from_parts(Ipv4Addr::new(127, 0, 0, 0), 8),
        ])
    }

    /// Networks in configured order
    pub fn iter(&self) -> impl Iterator<Item = &Cidr> {
        self.0.iter()
    }

    /// Number of networks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing is exempt
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether traffic to `ip` is exempt
    pub fn covers(&self, ip: Ipv4Addr) -> bool {
        self.0.iter().any(|net| net.contains(ip))
    }
}

impl TryFrom<Vec<Cidr>> for ExemptNetworks {
    type Error = Error;

    fn try_from(networks: Vec<Cidr>) -> Result<Self> {
        Self::new(networks)
    }
}

impl From<ExemptNetworks> for Vec<Cidr> {
    fn from(value: ExemptNetworks) -> Self {
        value.0
    }
}

impl<'a> IntoIterator for &'a ExemptNetworks {
    type Item = &'a Cidr;
    type IntoIter = std::slice::Iter<'a, Cidr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
