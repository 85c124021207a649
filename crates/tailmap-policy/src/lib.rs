//! policy parsing and validation for tailmap.
//!
//! this crate turns tailscale policy files (json with comments and trailing
//! commas, a.k.a. hujson) into a typed [`PolicyDocument`]. Parsing is lenient
//! about element types and strict about semantics: entries that do not coerce
//! to the expected shape are dropped, then the whole document is validated and
//! the first violation aborts the parse.

#![warn(missing_docs)]

pub mod capability;
mod coerce;
pub mod document;
pub mod error;
pub mod hujson;
pub mod line_index;
pub mod parser;
pub mod posture;
pub mod rule;
pub mod target;
pub mod validator;

pub use capability::{IpSpec, PortSpec, Protocol};
pub use document::{PolicyDocument, PolicyStats};
pub use error::{Error, Field, ParseError, Result, RuleError, Section, ValidationError};
pub use line_index::{RuleLineIndex, scan_rule_lines};
pub use parser::{ParsedPolicy, decode, parse, parse_file};
pub use posture::PostureExpr;
pub use rule::{AclAction, AclRule, GrantRule, RuleKind};
pub use target::{Target, TargetError};
