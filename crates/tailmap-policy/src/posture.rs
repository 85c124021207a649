//! device posture rule expressions
//!
//! posture definitions are descriptive only: expressions are parsed so that
//! malformed rules can be reported, never evaluated against devices.

use std::fmt;
use std::str::FromStr;

/// a namespaced posture attribute (e.g., `node:os`, `custom:tier`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostureAttr {
    /// namespace (node, custom, ip)
    pub namespace: String,
    /// attribute name within the namespace
    pub name: String,
}

impl PostureAttr {
    /// create a new posture attribute
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PostureAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// comparison operators for posture expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostureOp {
    /// equality (==)
    Eq,
    /// inequality (!=)
    Ne,
    /// less than (<)
    Lt,
    /// less than or equal (<=)
    Le,
    /// greater than (>)
    Gt,
    /// greater than or equal (>=)
    Ge,
    /// list membership (IN)
    In,
    /// list exclusion (NOT IN)
    NotIn,
    /// attribute is set (IS SET)
    IsSet,
    /// attribute is not set (NOT SET)
    NotSet,
}

impl PostureOp {
    fn as_str(&self) -> &'static str {
        match self {
            PostureOp::Eq => "==",
            PostureOp::Ne => "!=",
            PostureOp::Lt => "<",
            PostureOp::Le => "<=",
            PostureOp::Gt => ">",
            PostureOp::Ge => ">=",
            PostureOp::In => "IN",
            PostureOp::NotIn => "NOT IN",
            PostureOp::IsSet => "IS SET",
            PostureOp::NotSet => "NOT SET",
        }
    }
}

/// a parsed posture expression
#[derive(Debug, Clone, PartialEq)]
pub enum PostureExpr {
    /// comparison with a string value (e.g., `node:os == 'linux'`)
    Compare {
        /// the attribute to compare
        attr: PostureAttr,
        /// the comparison operator
        op: PostureOp,
        /// the value to compare against
        value: String,
    },
    /// list membership (e.g., `node:os IN ['macos', 'linux']`)
    InList {
        /// the attribute to check
        attr: PostureAttr,
        /// In or NotIn
        op: PostureOp,
        /// list of values to check against
        values: Vec<String>,
    },
    /// presence check (e.g., `custom:managed IS SET`)
    Presence {
        /// the attribute to check
        attr: PostureAttr,
        /// IsSet or NotSet
        op: PostureOp,
    },
}

impl PostureExpr {
    /// the attribute this expression inspects
    pub fn attr(&self) -> &PostureAttr {
        match self {
            PostureExpr::Compare { attr, .. }
            | PostureExpr::InList { attr, .. }
            | PostureExpr::Presence { attr, .. } => attr,
        }
    }
}

impl fmt::Display for PostureExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostureExpr::Compare { attr, op, value } => {
                write!(f, "{} {} '{}'", attr, op.as_str(), value)
            }
            PostureExpr::InList { attr, op, values } => {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
                write!(f, "{} {} [{}]", attr, op.as_str(), quoted.join(", "))
            }
            PostureExpr::Presence { attr, op } => write!(f, "{} {}", attr, op.as_str()),
        }
    }
}

/// error parsing a posture expression
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostureParseError {
    /// invalid expression syntax
    #[error("invalid posture expression: {0}")]
    InvalidSyntax(String),
    /// invalid attribute format
    #[error("invalid attribute format: {0}")]
    InvalidAttribute(String),
    /// invalid value
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl FromStr for PostureExpr {
    type Err = PostureParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_posture_expr(s)
    }
}

fn parse_posture_expr(s: &str) -> Result<PostureExpr, PostureParseError> {
    let s = s.trim();

    for (suffix, op) in [("NOT SET", PostureOp::NotSet), ("IS SET", PostureOp::IsSet)] {
        if let Some(rest) = s.strip_suffix(suffix) {
            let attr = parse_attr(rest)?;
            return Ok(PostureExpr::Presence { attr, op });
        }
    }

    for (sep, op) in [(" NOT IN ", PostureOp::NotIn), (" IN ", PostureOp::In)] {
        if let Some((attr_part, list_part)) = s.split_once(sep) {
            let attr = parse_attr(attr_part)?;
            let values = parse_list(list_part)?;
            return Ok(PostureExpr::InList { attr, op, values });
        }
    }

    // order matters: >= before >, etc.
    for (op_str, op) in [
        ("==", PostureOp::Eq),
        ("!=", PostureOp::Ne),
        (">=", PostureOp::Ge),
        ("<=", PostureOp::Le),
        (">", PostureOp::Gt),
        ("<", PostureOp::Lt),
    ] {
        if let Some((attr_part, value_part)) = s.split_once(op_str) {
            let attr = parse_attr(attr_part)?;
            let value = parse_string_value(value_part)?;
            return Ok(PostureExpr::Compare { attr, op, value });
        }
    }

    Err(PostureParseError::InvalidSyntax(s.to_string()))
}

fn parse_attr(s: &str) -> Result<PostureAttr, PostureParseError> {
    let s = s.trim();
    let (namespace, name) = s
        .split_once(':')
        .ok_or_else(|| PostureParseError::InvalidAttribute(s.to_string()))?;

    if namespace.is_empty() || name.is_empty() || name.contains(char::is_whitespace) {
        return Err(PostureParseError::InvalidAttribute(s.to_string()));
    }

    Ok(PostureAttr::new(namespace, name))
}

fn parse_string_value(s: &str) -> Result<String, PostureParseError> {
    let s = s.trim();
    s.strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .map(str::to_string)
        .ok_or_else(|| PostureParseError::InvalidValue(format!("expected quoted string: {}", s)))
}

fn parse_list(s: &str) -> Result<Vec<String>, PostureParseError> {
    let s = s.trim();
    let inner = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| PostureParseError::InvalidValue(format!("expected list: {}", s)))?;

    if inner.trim().is_empty() {
        return Ok(vec![]);
    }

    inner.split(',').map(parse_string_value).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn arbitrary_string_never_panics(s in ".*") {
            let _ = s.parse::<PostureExpr>();
        }

        #[test]
        fn equality_reparses(ns in "[a-z]{1,8}", name in "[a-zA-Z]{1,12}", value in "[a-zA-Z0-9.]{0,12}") {
            let text = format!("{}:{} == '{}'", ns, name, value);
            let expr: PostureExpr = text.parse().unwrap();
            prop_assert_eq!(expr.to_string(), text);
        }
    }
}
