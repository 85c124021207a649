//! the typed policy document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coerce;
use crate::error::ValidationError;
use crate::rule::{AclRule, GrantRule};
use crate::target::{AUTOGROUP_PREFIX, GROUP_PREFIX, TAG_PREFIX};
use crate::validator;

/// a decoded tailscale policy.
///
/// every field decodes leniently (see the coercion rules in the crate docs),
/// so a document always exists for any json object. Call
/// [`PolicyDocument::validate`] before trusting its contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    /// group name (`group:...`) to members.
    #[serde(
        default,
        deserialize_with = "coerce::string_list_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub groups: BTreeMap<String, Vec<String>>,

    /// host alias to ip address or cidr.
    #[serde(
        default,
        deserialize_with = "coerce::string_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub hosts: BTreeMap<String, String>,

    /// tag name (`tag:...`) to owners.
    #[serde(
        default,
        deserialize_with = "coerce::string_list_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub tag_owners: BTreeMap<String, Vec<String>>,

    /// posture name (`posture:...`) to rule expressions.
    #[serde(
        default,
        deserialize_with = "coerce::string_list_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub postures: BTreeMap<String, Vec<String>>,

    /// autogroup name (`autogroup:...`) to members.
    #[serde(
        default,
        deserialize_with = "coerce::string_list_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub autogroups: BTreeMap<String, Vec<String>>,

    /// legacy acl rules, in file order.
    #[serde(
        default,
        deserialize_with = "coerce::object_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub acls: Vec<AclRule>,

    /// grant rules, in file order.
    #[serde(
        default,
        deserialize_with = "coerce::object_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub grants: Vec<GrantRule>,
}

/// entry counts per policy section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStats {
    /// number of groups.
    pub groups: usize,
    /// number of hosts.
    pub hosts: usize,
    /// number of tags with owners.
    pub tag_owners: usize,
    /// number of acl rules.
    pub acls: usize,
    /// number of grant rules.
    pub grants: usize,
    /// number of postures.
    pub postures: usize,
}

impl PolicyDocument {
    /// check the document, returning the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validator::validate(self)
    }

    /// entry counts per section.
    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            groups: self.groups.len(),
            hosts: self.hosts.len(),
            tag_owners: self.tag_owners.len(),
            acls: self.acls.len(),
            grants: self.grants.len(),
            postures: self.postures.len(),
        }
    }

    /// whether `name` is a group: prefixed, or defined in `groups` or
    /// `autogroups`.
    pub fn is_group(&self, name: &str) -> bool {
        name.starts_with(GROUP_PREFIX)
            || name.starts_with(AUTOGROUP_PREFIX)
            || self.groups.contains_key(name)
            || self.autogroups.contains_key(name)
    }

    /// whether `name` is a tag: prefixed or defined in `tagOwners`.
    pub fn is_tag(&self, name: &str) -> bool {
        name.starts_with(TAG_PREFIX) || self.tag_owners.contains_key(name)
    }

    /// whether `name` is defined in `hosts`.
    pub fn is_host(&self, name: &str) -> bool {
        self.hosts.contains_key(name)
    }

    /// members of a group or autogroup, if defined.
    pub fn group_members(&self, name: &str) -> Option<&[String]> {
        self.groups
            .get(name)
            .or_else(|| self.autogroups.get(name))
            .map(Vec::as_slice)
    }

    /// owners of a tag, if defined.
    pub fn tag_owners(&self, name: &str) -> Option<&[String]> {
        self.tag_owners.get(name).map(Vec::as_slice)
    }

    /// address of a host alias, if defined.
    pub fn host_ip(&self, name: &str) -> Option<&str> {
        self.hosts.get(name).map(String::as_str)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn names(prefix: &'static str) -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,10}".prop_map(move |n| format!("{}{}", prefix, n))
    }

    fn members() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z]{1,8}@[a-z]{1,8}\\.com", 1..5)
    }

    fn document() -> impl Strategy<Value = PolicyDocument> {
        (
            prop::collection::btree_map(names("group:"), members(), 0..5),
            prop::collection::btree_map(
                "[a-z]{1,10}",
                (0u8..=255, 0u8..=255).prop_map(|(a, b)| format!("10.{}.{}.1", a, b)),
                0..5,
            ),
            prop::collection::btree_map(names("tag:"), members(), 0..5),
        )
            .prop_map(|(groups, hosts, tag_owners)| PolicyDocument {
                groups,
                hosts,
                tag_owners,
                ..PolicyDocument::default()
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// decode(encode(doc)) keeps every key and member list in order
        #[test]
        fn encode_decode_roundtrip(doc in document()) {
            let json = serde_json::to_string(&doc).unwrap();
            let decoded: PolicyDocument = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(&decoded.groups, &doc.groups);
            prop_assert_eq!(&decoded.hosts, &doc.hosts);
            prop_assert_eq!(&decoded.tag_owners, &doc.tag_owners);
            prop_assert_eq!(decoded, doc);
        }
    }
}
