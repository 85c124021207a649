//! acl and grant rule definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce;

/// the two rule dialects a policy can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleKind {
    /// legacy `acls` entry.
    #[serde(rename = "ACL")]
    Acl,
    /// modern `grants` entry.
    #[serde(rename = "Grant")]
    Grant,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Acl => f.write_str("ACL"),
            RuleKind::Grant => f.write_str("Grant"),
        }
    }
}

/// acl rule action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AclAction {
    /// allow matching traffic.
    Accept,
    /// drop matching traffic.
    Drop,
}

impl AclAction {
    /// parse an action keyword. matching is case-sensitive, like the policy format.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(AclAction::Accept),
            "drop" => Some(AclAction::Drop),
            _ => None,
        }
    }

    /// the keyword as written in policies.
    pub fn as_str(&self) -> &'static str {
        match self {
            AclAction::Accept => "accept",
            AclAction::Drop => "drop",
        }
    }
}

impl fmt::Display for AclAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a legacy acl rule.
///
/// `action` is kept as written so that unknown actions survive decoding and
/// are reported by validation; use [`AclRule::action_kind`] after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    /// `accept` or `drop`.
    #[serde(default, deserialize_with = "coerce::string")]
    pub action: String,

    /// source targets.
    #[serde(default, deserialize_with = "coerce::string_list")]
    pub src: Vec<String>,

    /// destination targets.
    #[serde(default, deserialize_with = "coerce::string_list")]
    pub dst: Vec<String>,

    /// optional ip protocol restriction (e.g. `tcp`).
    #[serde(
        default,
        deserialize_with = "coerce::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub proto: Option<String>,
}

impl AclRule {
    /// create an accept rule from src to dst.
    pub fn accept(src: &[&str], dst: &[&str]) -> Self {
        Self {
            action: AclAction::Accept.as_str().to_string(),
            src: src.iter().map(|s| s.to_string()).collect(),
            dst: dst.iter().map(|s| s.to_string()).collect(),
            proto: None,
        }
    }

    /// the typed action, if the raw action is valid.
    pub fn action_kind(&self) -> Option<AclAction> {
        AclAction::parse(&self.action)
    }
}

/// a grant rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRule {
    /// source targets - who can initiate the connection.
    #[serde(default, deserialize_with = "coerce::string_list")]
    pub src: Vec<String>,

    /// destination targets - what can be accessed.
    #[serde(default, deserialize_with = "coerce::string_list")]
    pub dst: Vec<String>,

    /// network capabilities as `protocol:ports` strings.
    #[serde(
        default,
        deserialize_with = "coerce::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ip: Vec<String>,

    /// routers the traffic must pass through.
    #[serde(
        default,
        deserialize_with = "coerce::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub via: Vec<String>,

    /// postures the source device must satisfy.
    #[serde(
        default,
        deserialize_with = "coerce::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub src_posture: Vec<String>,

    /// postures the destination device must satisfy.
    #[serde(
        default,
        deserialize_with = "coerce::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dst_posture: Vec<String>,

    /// application capabilities, keyed by capability name. values are opaque.
    #[serde(
        default,
        deserialize_with = "coerce::object_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub app: BTreeMap<String, Value>,
}

impl GrantRule {
    /// create a grant from src to dst with the given ip specs.
    pub fn new(src: &[&str], dst: &[&str], ip: &[&str]) -> Self {
        Self {
            src: src.iter().map(|s| s.to_string()).collect(),
            dst: dst.iter().map(|s| s.to_string()).collect(),
            ip: ip.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// application capability names, in key order.
    pub fn applications(&self) -> Vec<String> {
        self.app.keys().cloned().collect()
    }

    /// src and dst posture references combined.
    pub fn postures(&self) -> Vec<String> {
        self.src_posture
            .iter()
            .chain(self.dst_posture.iter())
            .cloned()
            .collect()
    }
}
