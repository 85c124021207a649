//! network capability grammar: protocols, ports and grant ip specs

use std::fmt;
use std::str::FromStr;

/// lowest port a spec may name.
pub const MIN_PORT: u32 = 1;
/// highest port a spec may name.
pub const MAX_PORT: u32 = 65535;

/// error parsing a protocol, port or ip spec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    /// not of the form `protocol:ports` or `*`
    #[error("invalid format, expected 'protocol:port'")]
    InvalidFormat,
    /// protocol is not in the supported set
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    /// port is not a number
    #[error("invalid port: {0}")]
    InvalidPort(String),
    /// port is outside 1-65535
    #[error("port out of range: {0}")]
    PortOutOfRange(u32),
    /// range start is greater than its end
    #[error("start port {start} cannot be greater than end port {end}")]
    InvertedRange {
        /// first port of the range
        start: u16,
        /// last port of the range
        end: u16,
    },
}

/// network protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    /// `tcp`
    Tcp,
    /// `udp`
    Udp,
    /// `icmp`
    Icmp,
    /// `ah`
    Ah,
    /// `esp`
    Esp,
    /// `gre`
    Gre,
    /// `ipv6-icmp`
    Ipv6Icmp,
    /// `ospf`
    Ospf,
    /// `sctp`
    Sctp,
}

impl Protocol {
    /// every supported protocol.
    pub const ALL: [Protocol; 9] = [
        Protocol::Tcp,
        Protocol::Udp,
        Protocol::Icmp,
        Protocol::Ah,
        Protocol::Esp,
        Protocol::Gre,
        Protocol::Ipv6Icmp,
        Protocol::Ospf,
        Protocol::Sctp,
    ];

    /// parse a protocol name. names are lowercase, as written in policies.
    pub fn parse(s: &str) -> Result<Self, SpecError> {
        match s {
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            "icmp" => Ok(Protocol::Icmp),
            "ah" => Ok(Protocol::Ah),
            "esp" => Ok(Protocol::Esp),
            "gre" => Ok(Protocol::Gre),
            "ipv6-icmp" => Ok(Protocol::Ipv6Icmp),
            "ospf" => Ok(Protocol::Ospf),
            "sctp" => Ok(Protocol::Sctp),
            _ => Err(SpecError::UnsupportedProtocol(s.to_string())),
        }
    }

    /// the policy name of this protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Ah => "ah",
            Protocol::Esp => "esp",
            Protocol::Gre => "gre",
            Protocol::Ipv6Icmp => "ipv6-icmp",
            Protocol::Ospf => "ospf",
            Protocol::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::parse(s)
    }
}

/// ports a protocol spec applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSpec {
    /// `*`
    Any,
    /// a single port
    Single(u16),
    /// an inclusive range, `start <= end`
    #[allow(missing_docs)]
    Range { start: u16, end: u16 },
}

impl PortSpec {
    /// parse `*`, `443` or `8000-8080`.
    pub fn parse(s: &str) -> Result<Self, SpecError> {
        if s == "*" {
            return Ok(PortSpec::Any);
        }

        if let Some((start, end)) = s.split_once('-') {
            let start = parse_port(start)?;
            let end = parse_port(end)?;
            if start > end {
                return Err(SpecError::InvertedRange { start, end });
            }
            return Ok(PortSpec::Range { start, end });
        }

        Ok(PortSpec::Single(parse_port(s)?))
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Any => f.write_str("*"),
            PortSpec::Single(p) => write!(f, "{}", p),
            PortSpec::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

fn parse_port(s: &str) -> Result<u16, SpecError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SpecError::InvalidPort(s.to_string()));
    }
    // saturate so that absurdly long digit strings still report out of range
    let port = s.parse::<u32>().unwrap_or(u32::MAX);
    if !(MIN_PORT..=MAX_PORT).contains(&port) {
        return Err(SpecError::PortOutOfRange(port));
    }
    u16::try_from(port).map_err(|_| SpecError::PortOutOfRange(port))
}

/// a grant `ip` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpSpec {
    /// bare `*` - any protocol, any port
    Any,
    /// `protocol:ports`
    #[allow(missing_docs)]
    Protocol { protocol: Protocol, ports: PortSpec },
}

impl IpSpec {
    /// parse from string like "*", "tcp:443", "udp:*", "tcp:8000-8080"
    pub fn parse(s: &str) -> Result<Self, SpecError> {
        if s == "*" {
            return Ok(IpSpec::Any);
        }

        let (proto, ports) = s.split_once(':').ok_or(SpecError::InvalidFormat)?;
        let protocol = Protocol::parse(proto)?;
        let ports = PortSpec::parse(ports)?;
        Ok(IpSpec::Protocol { protocol, ports })
    }
}

impl fmt::Display for IpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpSpec::Any => f.write_str("*"),
            IpSpec::Protocol { protocol, ports } => write!(f, "{}:{}", protocol, ports),
        }
    }
}

impl FromStr for IpSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpSpec::parse(s)
    }
}
