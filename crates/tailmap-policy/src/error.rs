//! error types for tailmap-policy.

use std::fmt;
use std::path::PathBuf;

use tailmap_types::PolicyTooLarge;
use thiserror::Error;

use crate::capability::SpecError;
use crate::hujson::SyntaxError;
use crate::target::TargetError;

/// errors that can occur while loading a policy.
#[derive(Debug, Error)]
pub enum Error {
    /// the policy could not be read or decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// the policy decoded but is not well-formed.
    #[error("policy validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// failures before a document exists: io, dialect and json errors.
#[derive(Debug, Error)]
pub enum ParseError {
    /// the policy file is missing or unreadable.
    #[error("failed to read policy file {path:?}: {source}")]
    Unreadable {
        /// path of the policy file.
        path: PathBuf,
        /// the underlying io error.
        source: std::io::Error,
    },

    /// the policy text is larger than the accepted maximum.
    #[error(transparent)]
    TooLarge(#[from] PolicyTooLarge),

    /// comment or string syntax could not be normalized to json.
    #[error("failed to normalize policy: {0}")]
    Syntax(#[from] SyntaxError),

    /// the normalized text is not valid json.
    #[error("failed to parse policy JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// the top-level json value is not an object.
    #[error("policy must be a JSON object at the top level")]
    NotAnObject,
}

/// a document-level validation failure.
///
/// named map entries (groups, hosts, ...) are identified by key, rule lists
/// by their zero-based index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// a named entry in one of the policy maps is invalid.
    #[error("invalid {section} entry {name:?}: {cause}")]
    InvalidEntry {
        /// the section holding the entry.
        section: Section,
        /// the entry's key.
        name: String,
        /// the specific failure.
        cause: RuleError,
    },

    /// an acl or grant rule is invalid.
    #[error("invalid {section} rule at index {index}: {cause}")]
    InvalidRule {
        /// `acls` or `grants`.
        section: Section,
        /// the zero-based index of the rule.
        index: usize,
        /// the specific failure.
        cause: RuleError,
    },
}

impl ValidationError {
    /// the section the failure was found in.
    pub fn section(&self) -> Section {
        match self {
            ValidationError::InvalidEntry { section, .. }
            | ValidationError::InvalidRule { section, .. } => *section,
        }
    }

    /// the rule index, for failures inside `acls` or `grants`.
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationError::InvalidRule { index, .. } => Some(*index),
            ValidationError::InvalidEntry { .. } => None,
        }
    }

    /// the specific failure.
    pub fn cause(&self) -> &RuleError {
        match self {
            ValidationError::InvalidEntry { cause, .. }
            | ValidationError::InvalidRule { cause, .. } => cause,
        }
    }
}

/// the specific reason an entry or rule was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// name does not carry the section's prefix.
    #[error("name must start with '{0}'")]
    MissingPrefix(&'static str),

    /// name is empty (or only a prefix).
    #[error("name cannot be empty")]
    EmptyName,

    /// a group, tag or posture has no members, owners or rules.
    #[error("must have at least one {0}")]
    Empty(&'static str),

    /// group member is neither an email nor a group/tag/autogroup reference.
    #[error("invalid member '{0}'")]
    InvalidMember(String),

    /// host value is not an ip address or cidr.
    #[error("invalid IP address or CIDR '{0}'")]
    InvalidAddress(String),

    /// tag owner is not an email address.
    #[error("tag owner must be a valid email address: '{0}'")]
    InvalidOwner(String),

    /// a posture rule is blank.
    #[error("posture rule cannot be empty")]
    EmptyPostureRule,

    /// acl action is missing.
    #[error("action cannot be empty")]
    MissingAction,

    /// acl action is not `accept` or `drop`.
    #[error("action must be 'accept' or 'drop', got '{0}'")]
    InvalidAction(String),

    /// rule has no sources.
    #[error("src cannot be empty")]
    EmptySrc,

    /// rule has no destinations.
    #[error("dst cannot be empty")]
    EmptyDst,

    /// a src, dst or via target is malformed.
    #[error("invalid {field} '{value}': {cause}")]
    InvalidTarget {
        /// which list the target came from.
        field: Field,
        /// the raw target.
        value: String,
        /// why it was rejected.
        cause: TargetError,
    },

    /// acl `proto` is not a supported protocol.
    #[error("invalid protocol '{value}': {cause}")]
    InvalidProtocol {
        /// the raw protocol.
        value: String,
        /// why it was rejected.
        cause: SpecError,
    },

    /// a grant `ip` entry does not parse as `protocol:ports`.
    #[error("invalid ip spec '{value}': {cause}")]
    InvalidIpSpec {
        /// the raw spec.
        value: String,
        /// why it was rejected.
        cause: SpecError,
    },

    /// a posture reference is not of the form `posture:name`.
    #[error("invalid {field} '{value}': posture reference must start with 'posture:'")]
    InvalidPostureRef {
        /// `srcPosture` or `dstPosture`.
        field: Field,
        /// the raw reference.
        value: String,
    },
}

/// top-level policy sections, displayed as their json keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// `groups`
    Groups,
    /// `hosts`
    Hosts,
    /// `tagOwners`
    TagOwners,
    /// `postures`
    Postures,
    /// `autogroups`
    Autogroups,
    /// `acls`
    Acls,
    /// `grants`
    Grants,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Section::Groups => "groups",
            Section::Hosts => "hosts",
            Section::TagOwners => "tagOwners",
            Section::Postures => "postures",
            Section::Autogroups => "autogroups",
            Section::Acls => "acls",
            Section::Grants => "grants",
        };
        f.write_str(s)
    }
}

/// rule fields that hold targets or posture references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `src`
    Src,
    /// `dst`
    Dst,
    /// `via`
    Via,
    /// `srcPosture`
    SrcPosture,
    /// `dstPosture`
    DstPosture,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Src => "src",
            Field::Dst => "dst",
            Field::Via => "via",
            Field::SrcPosture => "srcPosture",
            Field::DstPosture => "dstPosture",
        };
        f.write_str(s)
    }
}

/// result type for tailmap-policy operations.
pub type Result<T> = std::result::Result<T, Error>;
