//! the policy parsing pipeline: text -> strict json -> document -> validation.

use std::path::Path;

use serde_json::Value;
use tailmap_types::check_policy_size;
use tracing::{debug, warn};

use crate::document::PolicyDocument;
use crate::error::{ParseError, Result};
use crate::hujson;
use crate::line_index::{RuleLineIndex, scan_rule_lines};
use crate::rule::RuleKind;

/// a validated document together with the source lines of its rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPolicy {
    /// the validated document.
    pub document: PolicyDocument,
    /// line numbers of acl and grant rules in the source text.
    pub lines: RuleLineIndex,
}

/// decode policy text into a document without validating it.
pub fn decode(raw: &str) -> std::result::Result<PolicyDocument, ParseError> {
    check_policy_size(raw)?;
    let json = hujson::normalize(raw)?;
    let value: Value = serde_json::from_str(&json)?;
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

/// parse and validate policy text.
pub fn parse(raw: &str) -> Result<ParsedPolicy> {
    let document = decode(raw)?;
    let lines = scan_rule_lines(raw);

    for (kind, rules) in [
        (RuleKind::Acl, document.acls.len()),
        (RuleKind::Grant, document.grants.len()),
    ] {
        let found = lines.lines(kind).len();
        if found != rules {
            warn!(%kind, rules, lines = found, "rule line numbers do not line up with rules");
        }
    }

    document.validate()?;

    let stats = document.stats();
    debug!(
        groups = stats.groups,
        hosts = stats.hosts,
        tag_owners = stats.tag_owners,
        acls = stats.acls,
        grants = stats.grants,
        postures = stats.postures,
        "parsed policy"
    );

    Ok(ParsedPolicy { document, lines })
}

/// read, parse and validate a policy file.
pub fn parse_file(path: &Path) -> Result<ParsedPolicy> {
    let raw = std::fs::read_to_string(path).map_err(|source| ParseError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, bytes = raw.len(), "read policy file");
    parse(&raw)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::capability::SpecError;
    use crate::error::{Error, RuleError, Section};

    const POLICY: &str = r#"{
  // engineering
  "groups": {
    "group:eng": ["alice@example.com", "bob@example.com"],
  },
  "hosts": {
    "db": "10.0.0.5", /* primary */
  },
  "tagOwners": {
    "tag:web": ["alice@example.com"],
  },
  "acls": [
    {"action": "accept", "src": ["group:eng"], "dst": ["db"]},
  ],
  "grants": [
    {
      "src": ["group:eng"],
      "dst": ["tag:web"],
      "ip": ["tcp:443"],
    },
  ],
}
"#;

    #[test]
    fn test_parse_hujson_policy() {
        let parsed = parse(POLICY).unwrap();
        let stats = parsed.document.stats();
        assert_eq!(stats.groups, 1);
        assert_eq!(stats.acls, 1);
        assert_eq!(stats.grants, 1);
        assert_eq!(parsed.lines.acls, vec![13]);
        assert_eq!(parsed.lines.grants, vec![16]);
        assert_eq!(parsed.document.host_ip("db"), Some("10.0.0.5"));
    }

    #[test]
    fn test_unknown_protocol_fails() {
        let raw = r#"{"grants": [{"src": ["group:eng"], "dst": ["tag:web"], "ip": ["xx:80"]}]}"#;
        let err = parse(raw).unwrap_err();
        let Error::Validation(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(err.section(), Section::Grants);
        assert_eq!(err.index(), Some(0));
        assert_eq!(
            err.cause(),
            &RuleError::InvalidIpSpec {
                value: "xx:80".to_string(),
                cause: SpecError::UnsupportedProtocol("xx".to_string()),
            }
        );
        let message = err.to_string();
        assert!(message.contains("index 0"));
        assert!(message.contains("xx"));
    }

    #[test]
    fn test_inverted_port_range_fails() {
        let raw = r#"{"grants": [{"src": ["*"], "dst": ["*"], "ip": ["tcp:8000-7000"]}]}"#;
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_invalid_action_names_index() {
        let raw = r#"{"acls": [
            {"action": "accept", "src": ["*"], "dst": ["*:*"]},
            {"action": "permit", "src": ["*"], "dst": ["*:*"]}
        ]}"#;
        let err = parse(raw).unwrap_err();
        let Error::Validation(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(err.index(), Some(1));
        assert_eq!(
            err.to_string(),
            "invalid acls rule at index 1: action must be 'accept' or 'drop', got 'permit'"
        );
    }

    #[test]
    fn test_group_as_tag_owner_fails() {
        let raw = r#"{
            "groups": {"group:ops": ["a@x.com"]},
            "tagOwners": {"tag:web": ["group:ops"]}
        }"#;
        let err = parse(raw).unwrap_err();
        let Error::Validation(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(err.section(), Section::TagOwners);
        assert_eq!(
            err.cause(),
            &RuleError::InvalidOwner("group:ops".to_string())
        );
        assert!(err.to_string().contains("valid email address"));
    }

    #[test]
    fn test_non_string_src_elements_dropped() {
        // after dropping non-strings, src is empty
        let raw = r#"{"acls": [{"action": "accept", "src": [1, 2], "dst": ["*:*"]}]}"#;
        let err = parse(raw).unwrap_err();
        let Error::Validation(err) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(err.cause(), &RuleError::EmptySrc);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse("{\"a\": \"open").unwrap_err(),
            Error::Parse(ParseError::Syntax(_))
        ));
        assert!(matches!(
            parse("{\"a\": }").unwrap_err(),
            Error::Parse(ParseError::Json(_))
        ));
        assert!(matches!(
            parse("[1, 2]").unwrap_err(),
            Error::Parse(ParseError::NotAnObject)
        ));
        assert!(matches!(
            parse("").unwrap_err(),
            Error::Parse(ParseError::Json(_))
        ));
    }

    #[test]
    fn test_too_large() {
        let raw = format!("{{\"x\": \"{}\"}}", "a".repeat(tailmap_types::MAX_POLICY_SIZE));
        assert!(matches!(
            parse(&raw).unwrap_err(),
            Error::Parse(ParseError::TooLarge(_))
        ));
    }

    #[test]
    fn test_empty_object_is_valid() {
        let parsed = parse("{}").unwrap();
        assert_eq!(parsed.document, PolicyDocument::default());
        assert_eq!(parsed.lines, RuleLineIndex::default());
    }

    #[test]
    fn test_decode_skips_validation() {
        let doc = decode(r#"{"groups": {"eng": []}}"#).unwrap();
        assert!(doc.groups.contains_key("eng"));
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(POLICY.as_bytes()).unwrap();
        let parsed = parse_file(file.path()).unwrap();
        assert_eq!(parsed.document.grants.len(), 1);
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file(Path::new("/nonexistent/policy.hujson")).unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::Unreadable { .. })
        ));
        assert!(err.to_string().contains("/nonexistent/policy.hujson"));
    }
}
