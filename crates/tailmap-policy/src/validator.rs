//! semantic validation of a decoded policy document.
//!
//! checks run in a fixed order and stop at the first violation:
//! 1. group, tag and posture names, and their membership
//! 2. autogroup names
//! 3. host addresses
//! 4. tag owners
//! 5. acl rules, by index
//! 6. grant rules, by index
//!
//! map sections iterate in key order, so the reported violation is stable.

use tailmap_types::Email;
use tracing::warn;

use crate::capability::{IpSpec, Protocol};
use crate::document::PolicyDocument;
use crate::error::{Field, RuleError, Section, ValidationError};
use crate::posture::PostureExpr;
use crate::rule::{AclAction, AclRule, GrantRule};
use crate::target::{
    AUTOGROUP_PREFIX, GROUP_PREFIX, POSTURE_PREFIX, TAG_PREFIX, Target, parse_address,
};

/// validate a whole document, returning the first violation.
pub fn validate(doc: &PolicyDocument) -> Result<(), ValidationError> {
    validate_groups(doc)?;
    validate_tag_names(doc)?;
    validate_postures(doc)?;
    validate_autogroups(doc)?;
    validate_hosts(doc)?;
    validate_tag_owners(doc)?;

    for (index, rule) in doc.acls.iter().enumerate() {
        validate_acl(rule).map_err(|cause| ValidationError::InvalidRule {
            section: Section::Acls,
            index,
            cause,
        })?;
    }

    for (index, rule) in doc.grants.iter().enumerate() {
        validate_grant(doc, index, rule).map_err(|cause| ValidationError::InvalidRule {
            section: Section::Grants,
            index,
            cause,
        })?;
    }

    Ok(())
}

fn entry_error(section: Section, name: &str, cause: RuleError) -> ValidationError {
    ValidationError::InvalidEntry {
        section,
        name: name.to_string(),
        cause,
    }
}

/// the name must be `prefix` followed by at least one character.
fn check_name(name: &str, prefix: &'static str) -> Result<(), RuleError> {
    match name.strip_prefix(prefix) {
        None => Err(RuleError::MissingPrefix(prefix)),
        Some("") => Err(RuleError::EmptyName),
        Some(_) => Ok(()),
    }
}

fn is_reference(s: &str) -> bool {
    [GROUP_PREFIX, TAG_PREFIX, AUTOGROUP_PREFIX]
        .iter()
        .any(|prefix| s.len() > prefix.len() && s.starts_with(prefix))
}

fn validate_member(member: &str) -> Result<(), RuleError> {
    if Email::is_valid(member) || is_reference(member) {
        Ok(())
    } else {
        Err(RuleError::InvalidMember(member.to_string()))
    }
}

fn validate_groups(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, members) in &doc.groups {
        let check = || -> Result<(), RuleError> {
            check_name(name, GROUP_PREFIX)?;
            if members.is_empty() {
                return Err(RuleError::Empty("member"));
            }
            members.iter().try_for_each(|m| validate_member(m))
        };
        check().map_err(|cause| entry_error(Section::Groups, name, cause))?;
    }
    Ok(())
}

fn validate_tag_names(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, owners) in &doc.tag_owners {
        let check = || -> Result<(), RuleError> {
            check_name(name, TAG_PREFIX)?;
            if owners.is_empty() {
                return Err(RuleError::Empty("owner"));
            }
            Ok(())
        };
        check().map_err(|cause| entry_error(Section::TagOwners, name, cause))?;
    }
    Ok(())
}

fn validate_postures(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, rules) in &doc.postures {
        let check = || -> Result<(), RuleError> {
            check_name(name, POSTURE_PREFIX)?;
            if rules.is_empty() {
                return Err(RuleError::Empty("rule"));
            }
            for rule in rules {
                if rule.trim().is_empty() {
                    return Err(RuleError::EmptyPostureRule);
                }
                if let Err(e) = rule.parse::<PostureExpr>() {
                    warn!(posture = %name, rule = %rule, error = %e, "unrecognized posture expression");
                }
            }
            Ok(())
        };
        check().map_err(|cause| entry_error(Section::Postures, name, cause))?;
    }
    Ok(())
}

fn validate_autogroups(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, members) in &doc.autogroups {
        let check = || -> Result<(), RuleError> {
            check_name(name, AUTOGROUP_PREFIX)?;
            members.iter().try_for_each(|m| validate_member(m))
        };
        check().map_err(|cause| entry_error(Section::Autogroups, name, cause))?;
    }
    Ok(())
}

fn validate_hosts(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, address) in &doc.hosts {
        let check = || -> Result<(), RuleError> {
            if name.is_empty() {
                return Err(RuleError::EmptyName);
            }
            parse_address(address)
                .map(|_| ())
                .ok_or_else(|| RuleError::InvalidAddress(address.clone()))
        };
        check().map_err(|cause| entry_error(Section::Hosts, name, cause))?;
    }
    Ok(())
}

fn validate_tag_owners(doc: &PolicyDocument) -> Result<(), ValidationError> {
    for (name, owners) in &doc.tag_owners {
        for owner in owners {
            if !Email::is_valid(owner) {
                return Err(entry_error(
                    Section::TagOwners,
                    name,
                    RuleError::InvalidOwner(owner.clone()),
                ));
            }
        }
    }
    Ok(())
}

fn validate_targets(field: Field, targets: &[String]) -> Result<(), RuleError> {
    for value in targets {
        Target::parse(value).map_err(|cause| RuleError::InvalidTarget {
            field,
            value: value.clone(),
            cause,
        })?;
    }
    Ok(())
}

fn validate_acl(rule: &AclRule) -> Result<(), RuleError> {
    if rule.action.is_empty() {
        return Err(RuleError::MissingAction);
    }
    if AclAction::parse(&rule.action).is_none() {
        return Err(RuleError::InvalidAction(rule.action.clone()));
    }
    if rule.src.is_empty() {
        return Err(RuleError::EmptySrc);
    }
    if rule.dst.is_empty() {
        return Err(RuleError::EmptyDst);
    }
    validate_targets(Field::Src, &rule.src)?;
    validate_targets(Field::Dst, &rule.dst)?;

    if let Some(proto) = &rule.proto {
        Protocol::parse(proto).map_err(|cause| RuleError::InvalidProtocol {
            value: proto.clone(),
            cause,
        })?;
    }
    Ok(())
}

fn validate_posture_refs(
    doc: &PolicyDocument,
    index: usize,
    field: Field,
    refs: &[String],
) -> Result<(), RuleError> {
    for value in refs {
        if check_name(value, POSTURE_PREFIX).is_err() {
            return Err(RuleError::InvalidPostureRef {
                field,
                value: value.clone(),
            });
        }
        if !doc.postures.contains_key(value) {
            warn!(grant = index, %field, posture = %value, "grant references undefined posture");
        }
    }
    Ok(())
}

fn validate_grant(doc: &PolicyDocument, index: usize, rule: &GrantRule) -> Result<(), RuleError> {
    if rule.src.is_empty() {
        return Err(RuleError::EmptySrc);
    }
    if rule.dst.is_empty() {
        return Err(RuleError::EmptyDst);
    }
    validate_targets(Field::Src, &rule.src)?;
    validate_targets(Field::Dst, &rule.dst)?;

    for spec in &rule.ip {
        IpSpec::parse(spec).map_err(|cause| RuleError::InvalidIpSpec {
            value: spec.clone(),
            cause,
        })?;
    }

    validate_targets(Field::Via, &rule.via)?;
    validate_posture_refs(doc, index, Field::SrcPosture, &rule.src_posture)?;
    validate_posture_refs(doc, index, Field::DstPosture, &rule.dst_posture)?;
    Ok(())
}
