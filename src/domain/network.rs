// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4)")]
    InvalidPrefixLength(u8),

    #[error("Address {address} is not aligned to a /{prefix_length} boundary")]
    UnalignedNetwork { address: Ipv4Addr, prefix_length: u8 },

    #[error("Subnet prefix /{requested} does not fit inside {parent}")]
    SubnetTooLarge { parent: String, requested: u8 },

    #[error("Address space {parent} exhausted while allocating a /{requested}")]
    AddressSpaceExhausted { parent: String, requested: u8 },
}

/// IPv4 network block in CIDR notation
///
/// Invariants:
/// - Prefix length 0-32
/// - Network address has no host bits set
///
/// # Examples
///
/// ```rust
/// use cache_cluster_infrastructure::domain::Ipv4Cidr;
///
/// let cidr = Ipv4Cidr::new("10.0.0.0/16").unwrap();
/// assert_eq!(cidr.prefix_length(), 16);
/// assert_eq!(cidr.to_string(), "10.0.0.0/16");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Catch-all route destination
    pub const ANY: Self = Self {
        network: Ipv4Addr::UNSPECIFIED,
        prefix_length: 0,
    };

    /// Parse a CIDR block such as `10.0.0.0/16`
    ///
    /// # Invariants
    /// - Valid dotted-quad address
    /// - Prefix length 0-32
    /// - No host bits set
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let network = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(network, prefix_length)
    }

    /// Create from a network address and prefix length
    pub fn from_parts(network: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        let raw = u32::from(network);
        if raw & !Self::mask(prefix_length) != 0 {
            return Err(NetworkError::UnalignedNetwork {
                address: network,
                prefix_length,
            });
        }

        Ok(Self {
            network,
            prefix_length,
        })
    }

    fn mask(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_length))
        }
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses covered by the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix_length >= self.prefix_length
            && u32::from(other.network) & Self::mask(self.prefix_length) == u32::from(self.network)
    }

    /// Whether the two blocks share any address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    fn start(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    fn end(&self) -> u64 {
        self.start() + self.size()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_length)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Ipv4Cidr {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ipv4Cidr> for String {
    fn from(value: Ipv4Cidr) -> Self {
        value.to_string()
    }
}

/// Sequential subnet allocator over a parent block
///
/// Each allocation starts at the next free address rounded up to the
/// requested prefix boundary, so allocations never overlap.
#[derive(Debug, Clone)]
pub struct CidrAllocator {
    parent: Ipv4Cidr,
    next: u64,
}

impl CidrAllocator {
    pub fn new(parent: Ipv4Cidr) -> Self {
        Self {
            next: parent.start(),
            parent,
        }
    }

    /// Allocate the next `/prefix_length` block
    pub fn allocate(&mut self, prefix_length: u8) -> Result<Ipv4Cidr, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }
        if prefix_length < self.parent.prefix_length {
            return Err(NetworkError::SubnetTooLarge {
                parent: self.parent.to_string(),
                requested: prefix_length,
            });
        }

        let size = 1u64 << (32 - u32::from(prefix_length));
        let start = self.next.div_ceil(size) * size;
        if start + size > self.parent.end() {
            return Err(NetworkError::AddressSpaceExhausted {
                parent: self.parent.to_string(),
                requested: prefix_length,
            });
        }

        let network = u32::try_from(start).map_err(|_| NetworkError::AddressSpaceExhausted {
            parent: self.parent.to_string(),
            requested: prefix_length,
        })?;
        self.next = start + size;

        Ipv4Cidr::from_parts(Ipv4Addr::from(network), prefix_length)
    }

    /// Prefix length for `count` equal blocks in what `reserved` addresses leave free
    ///
    /// Each block is the largest power of two that fits `count` times into
    /// the free space.
    pub fn even_split_prefix(
        parent: &Ipv4Cidr,
        reserved: u64,
        count: usize,
    ) -> Result<u8, NetworkError> {
        let count = u64::try_from(count.max(1)).unwrap_or(u64::MAX);
        let share = parent.size().saturating_sub(reserved) / count;
        if share == 0 {
            return Err(NetworkError::AddressSpaceExhausted {
                parent: parent.to_string(),
                requested: 32,
            });
        }
        let host_bits = u8::try_from(share.ilog2())
            .map_err(|_| NetworkError::InvalidCidr(parent.to_string()))?;
        Ok(32u8.saturating_sub(host_bits))
    }
}

/// IP protocol carried by a security group rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    /// All protocols (`-1`)
    All,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
            Self::All => "-1",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protocol plus port range of a security group rule
///
/// # Examples
///
/// ```rust
/// use cache_cluster_infrastructure::domain::Port;
///
/// let port = Port::tcp(43334);
/// assert_eq!(port.to_string(), "43334");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Port {
    protocol: Protocol,
    from_port: u16,
    to_port: u16,
}

impl Port {
    /// Single TCP port
    pub fn tcp(port: u16) -> Self {
        Self {
            protocol: Protocol::Tcp,
            from_port: port,
            to_port: port,
        }
    }

    /// All traffic on all ports
    pub fn all_traffic() -> Self {
        Self {
            protocol: Protocol::All,
            from_port: 0,
            to_port: u16::MAX,
        }
    }

    /// ICMP type/code pair, encoded in the port fields
    pub fn icmp(icmp_type: u16, icmp_code: u16) -> Self {
        Self {
            protocol: Protocol::Icmp,
            from_port: icmp_type,
            to_port: icmp_code,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn from_port(&self) -> u16 {
        self.from_port
    }

    pub fn to_port(&self) -> u16 {
        self.to_port
    }

    /// Whether the rule covers the given TCP port
    pub fn covers_tcp(&self, port: u16) -> bool {
        match self.protocol {
            Protocol::All => true,
            Protocol::Tcp => self.from_port <= port && port <= self.to_port,
            Protocol::Udp | Protocol::Icmp => false,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Protocol::All => write!(f, "ALL TRAFFIC"),
            Protocol::Icmp => write!(f, "ICMP Type {} Code {}", self.from_port, self.to_port),
            Protocol::Tcp | Protocol::Udp if self.from_port == self.to_port => {
                write!(f, "{}", self.from_port)
            }
            Protocol::Tcp | Protocol::Udp => write!(f, "{}-{}", self.from_port, self.to_port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_cidr() {
        let cidr = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        assert_eq!(cidr.network(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(cidr.prefix_length(), 16);
        assert_eq!(cidr.size(), 65536);
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(Ipv4Cidr::new("10.0.0.0").is_err()); // No prefix
        assert!(Ipv4Cidr::new("10.0.0.0/33").is_err()); // Prefix too long
        assert!(Ipv4Cidr::new("10.0.0.256/24").is_err()); // Bad octet
        assert!(matches!(
            Ipv4Cidr::new("10.0.0.1/24"),
            Err(NetworkError::UnalignedNetwork { .. })
        ));
    }

    #[test]
    fn test_contains_and_overlaps() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let subnet = Ipv4Cidr::new("10.0.64.0/18").unwrap();
        let outside = Ipv4Cidr::new("10.1.0.0/24").unwrap();

        assert!(vpc.contains(&subnet));
        assert!(!subnet.contains(&vpc));
        assert!(vpc.overlaps(&subnet));
        assert!(!vpc.overlaps(&outside));
        assert!(Ipv4Cidr::ANY.contains(&outside));
    }

    #[test]
    fn test_even_split_allocation() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let prefix = CidrAllocator::even_split_prefix(&vpc, 0, 4).unwrap();
        assert_eq!(prefix, 18);

        let mut allocator = CidrAllocator::new(vpc);
        let blocks: Vec<String> = (0..4)
            .map(|_| allocator.allocate(prefix).unwrap().to_string())
            .collect();
        assert_eq!(
            blocks,
            vec!["10.0.0.0/18", "10.0.64.0/18", "10.0.128.0/18", "10.0.192.0/18"]
        );
        assert!(allocator.allocate(prefix).is_err());
    }

    #[test]
    fn test_even_split_respects_reserved_space() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        assert_eq!(CidrAllocator::even_split_prefix(&vpc, 0, 3).unwrap(), 18);
        assert_eq!(CidrAllocator::even_split_prefix(&vpc, 512, 2).unwrap(), 18);
        assert_eq!(CidrAllocator::even_split_prefix(&vpc, 32768, 2).unwrap(), 18);
        assert_eq!(CidrAllocator::even_split_prefix(&vpc, 32769, 2).unwrap(), 19);
        assert!(CidrAllocator::even_split_prefix(&vpc, 65536, 1).is_err());
    }

    #[test]
    fn test_allocation_aligns_to_prefix() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let mut allocator = CidrAllocator::new(vpc);

        assert_eq!(allocator.allocate(24).unwrap().to_string(), "10.0.0.0/24");
        // A larger block skips ahead to its own boundary
        assert_eq!(allocator.allocate(20).unwrap().to_string(), "10.0.16.0/20");
        assert_eq!(allocator.allocate(24).unwrap().to_string(), "10.0.32.0/24");
    }

    #[test]
    fn test_allocation_rejects_larger_than_parent() {
        let vpc = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        let mut allocator = CidrAllocator::new(vpc);
        assert!(matches!(
            allocator.allocate(8),
            Err(NetworkError::SubnetTooLarge { .. })
        ));
    }

    #[test]
    fn test_port_display() {
        assert_eq!(Port::tcp(80).to_string(), "80");
        assert_eq!(Port::all_traffic().to_string(), "ALL TRAFFIC");
    }

    #[test]
    fn test_port_coverage() {
        assert!(Port::tcp(43334).covers_tcp(43334));
        assert!(!Port::tcp(80).covers_tcp(43334));
        assert!(Port::all_traffic().covers_tcp(43334));
        assert!(!Port::icmp(252, 86).covers_tcp(252));
    }

    #[test]
    fn test_cidr_serde_roundtrip() {
        let cidr = Ipv4Cidr::new("10.0.0.0/24").unwrap();
        let json = serde_json::to_string(&cidr).unwrap();
        assert_eq!(json, "\"10.0.0.0/24\"");
    }
}
