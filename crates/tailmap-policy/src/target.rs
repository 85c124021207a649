//! rule targets: the tokens that appear in `src`, `dst` and `via`.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use tailmap_types::Email;

/// prefix of group references.
pub const GROUP_PREFIX: &str = "group:";
/// prefix of tag references.
pub const TAG_PREFIX: &str = "tag:";
/// prefix of autogroup references.
pub const AUTOGROUP_PREFIX: &str = "autogroup:";
/// prefix of posture references.
pub const POSTURE_PREFIX: &str = "posture:";

/// error parsing a rule target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// the token is the empty string.
    #[error("target cannot be empty")]
    Empty,
    /// a prefixed reference with nothing after the prefix (e.g. `group:`).
    #[error("'{0}' reference must have a name")]
    EmptyName(&'static str),
}

/// a classified rule target.
///
/// anything that is not a wildcard, a prefixed reference, an email or an ip
/// address is taken to be a bare host name. Those are never rejected here;
/// whether they resolve against `hosts` is decided when the graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `*`
    Wildcard,
    /// group reference, name without prefix (e.g. "group:eng" -> "eng").
    Group(String),
    /// tag reference, name without prefix.
    Tag(String),
    /// autogroup reference, name without prefix. Any name is accepted.
    Autogroup(String),
    /// a user email.
    User(Email),
    /// an ip address or cidr. Bare addresses become host prefixes.
    Address(IpNet),
    /// a bare identifier, expected to name an entry in `hosts`.
    Host(String),
}

impl Target {
    /// parse a target token.
    pub fn parse(s: &str) -> Result<Self, TargetError> {
        if s.is_empty() {
            return Err(TargetError::Empty);
        }
        if s == "*" {
            return Ok(Target::Wildcard);
        }
        if let Some(name) = s.strip_prefix(GROUP_PREFIX) {
            return named(name, GROUP_PREFIX).map(Target::Group);
        }
        if let Some(name) = s.strip_prefix(TAG_PREFIX) {
            return named(name, TAG_PREFIX).map(Target::Tag);
        }
        if let Some(name) = s.strip_prefix(AUTOGROUP_PREFIX) {
            return named(name, AUTOGROUP_PREFIX).map(Target::Autogroup);
        }
        if let Ok(email) = Email::new(s) {
            return Ok(Target::User(email));
        }
        if let Some(net) = parse_address(s) {
            return Ok(Target::Address(net));
        }
        Ok(Target::Host(s.to_string()))
    }

    /// whether this is the `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Target::Wildcard)
    }
}

fn named(name: &str, prefix: &'static str) -> Result<String, TargetError> {
    if name.is_empty() {
        return Err(TargetError::EmptyName(prefix));
    }
    Ok(name.to_string())
}

/// parse an ip address or cidr. A bare address becomes a full-length prefix.
pub fn parse_address(s: &str) -> Option<IpNet> {
    if s.contains('/') {
        return s.parse::<IpNet>().ok();
    }
    s.parse::<IpAddr>().ok().map(IpNet::from)
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Wildcard => f.write_str("*"),
            Target::Group(name) => write!(f, "{}{}", GROUP_PREFIX, name),
            Target::Tag(name) => write!(f, "{}{}", TAG_PREFIX, name),
            Target::Autogroup(name) => write!(f, "{}{}", AUTOGROUP_PREFIX, name),
            Target::User(email) => f.write_str(email.as_str()),
            Target::Address(net) if net.prefix_len() == net.max_prefix_len() => {
                write!(f, "{}", net.addr())
            }
            Target::Address(net) => write!(f, "{}", net),
            Target::Host(name) => f.write_str(name),
        }
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::parse(s)
    }
}
