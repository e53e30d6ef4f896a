//! CIDR subnet matching for IP-range and client grants

use crate::error::{AccessError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// An IPv4 or IPv6 network in CIDR notation.
///
/// A bare address parses as a single-host network (`/32` or `/128`).
/// The stored network address is always masked, so `10.1.2.3/8` and
/// `10.0.0.0/8` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    network: IpAddr,
    prefix: u8,
}

impl Subnet {
    /// Parse `addr` or `addr/prefix`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (addr_part, prefix_part) = match input.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (input, None),
        };
        let addr = IpAddr::from_str(addr_part)
            .map_err(|_| AccessError::misconfigured(format!("invalid subnet address: {input}")))?;
        let max = max_prefix(&addr);
        let prefix = match prefix_part {
            Some(p) => p
                .parse::<u8>()
                .ok()
                .filter(|p| *p <= max)
                .ok_or_else(|| {
                    AccessError::misconfigured(format!("invalid subnet prefix: {input}"))
                })?,
            None => max,
        };
        // IPv4-mapped networks are stored as IPv4, the form requesters are compared in
        let (addr, prefix) = match addr {
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) if prefix >= 96 => (IpAddr::V4(v4), prefix - 96),
                Some(_) => {
                    return Err(AccessError::misconfigured(format!(
                        "IPv4-mapped subnet needs a prefix of at least 96: {input}"
                    )))
                }
                None => (addr, prefix),
            },
            IpAddr::V4(_) => (addr, prefix),
        };
        Ok(Self {
            network: mask(addr, prefix),
            prefix,
        })
    }

    /// The masked network address
    pub fn network(&self) -> IpAddr {
        self.network
    }

    /// The prefix length in bits
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Check whether `ip` lies inside this network.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are compared as IPv4.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        let ip = canonical(*ip);
        match (self.network, ip) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(ip, self.prefix) == self.network
            }
            _ => false,
        }
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Subnet {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self> {
        Subnet::parse(s)
    }
}

impl Serialize for Subnet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Subnet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Subnet::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Parse a requester address as supplied by the HTTP layer.
///
/// Returns `None` for anything that is not a plain IPv4/IPv6 literal.
pub fn parse_requester_ip(raw: &str) -> Option<IpAddr> {
    IpAddr::from_str(raw.trim()).ok().map(canonical)
}

/// True if `ip` is a loopback address (`127.0.0.0/8` or `::1`)
pub fn is_loopback(ip: &IpAddr) -> bool {
    canonical(*ip).is_loopback()
}

fn canonical(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(addr: IpAddr, prefix: u8) -> IpAddr {
    match addr {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let m = if prefix == 0 {
                0
            } else {
                u32::MAX << (32 - u32::from(prefix))
            };
            IpAddr::V4((bits & m).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let m = if prefix == 0 {
                0
            } else {
                u128::MAX << (128 - u32::from(prefix))
            };
            IpAddr::V6((bits & m).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_bare_address_is_single_host() {
        let subnet = Subnet::parse("192.168.1.10").unwrap();
        assert_eq!(subnet.prefix(), 32);
        assert!(subnet.contains(&ip("192.168.1.10")));
        assert!(!subnet.contains(&ip("192.168.1.11")));
    }

    #[test]
    fn test_slash_31_covers_adjacent_pair() {
        let subnet = Subnet::parse("192.168.1.10/31").unwrap();
        assert!(subnet.contains(&ip("192.168.1.10")));
        assert!(subnet.contains(&ip("192.168.1.11")));
        assert!(!subnet.contains(&ip("192.168.1.12")));
        assert!(!subnet.contains(&ip("192.168.1.9")));
    }

    #[test]
    fn test_network_is_masked() {
        let subnet = Subnet::parse("10.1.2.3/8").unwrap();
        assert_eq!(subnet.to_string(), "10.0.0.0/8");
        assert_eq!(subnet, Subnet::parse("10.0.0.0/8").unwrap());
    }

    #[test]
    fn test_zero_prefix_matches_family() {
        let any_v4 = Subnet::parse("0.0.0.0/0").unwrap();
        assert!(any_v4.contains(&ip("8.8.8.8")));
        assert!(!any_v4.contains(&ip("2001:db8::1")));
    }

    #[test]
    fn test_ipv6() {
        let subnet = Subnet::parse("2001:db8::/32").unwrap();
        assert!(subnet.contains(&ip("2001:db8:1::5")));
        assert!(!subnet.contains(&ip("2001:db9::5")));
    }

    #[test]
    fn test_ipv4_mapped_requester() {
        let subnet = Subnet::parse("192.168.0.0/16").unwrap();
        assert!(subnet.contains(&ip("::ffff:192.168.4.4")));
    }

    #[test]
    fn test_ipv4_mapped_network_is_stored_as_ipv4() {
        let subnet = Subnet::parse("::ffff:192.168.0.0/112").unwrap();
        assert_eq!(subnet.to_string(), "192.168.0.0/16");
        assert!(subnet.contains(&ip("192.168.0.5")));
        assert!(subnet.contains(&ip("::ffff:192.168.0.5")));
        assert!(!subnet.contains(&ip("192.169.0.5")));

        let host = Subnet::parse("::ffff:10.0.0.1").unwrap();
        assert_eq!(host.prefix(), 32);
        assert!(host.contains(&ip("10.0.0.1")));
    }

    #[test]
    fn test_short_ipv4_mapped_prefix_is_misconfigured() {
        let err = Subnet::parse("::ffff:192.168.0.0/64").unwrap_err();
        assert!(matches!(err, AccessError::MisconfiguredRule { .. }));
    }

    #[test]
    fn test_invalid_subnets_are_misconfigured() {
        for bad in ["", "300.1.1.1", "10.0.0.0/33", "10.0.0.0/x", "::1/129"] {
            let err = Subnet::parse(bad).unwrap_err();
            assert!(matches!(err, AccessError::MisconfiguredRule { .. }), "{bad}");
        }
    }

    #[test]
    fn test_requester_ip_parsing() {
        assert_eq!(parse_requester_ip(" 10.0.0.1 "), Some(ip("10.0.0.1")));
        assert_eq!(parse_requester_ip("unknown"), None);
        assert_eq!(parse_requester_ip("::ffff:127.0.0.1"), Some(ip("127.0.0.1")));
    }

    #[test]
    fn test_loopback() {
        assert!(is_loopback(&ip("127.0.0.1")));
        assert!(is_loopback(&ip("::1")));
        assert!(is_loopback(&ip("0:0:0:0:0:0:0:1")));
        assert!(!is_loopback(&ip("192.168.1.1")));
    }
}
