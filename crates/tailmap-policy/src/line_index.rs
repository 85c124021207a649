//! source line numbers for acl and grant rules.
//!
//! decoding loses positions, so rule lines are recovered by scanning the raw
//! policy text separately. The scan is best-effort: it never fails, and on
//! malformed input it simply records fewer lines.

use serde::{Deserialize, Serialize};

use crate::rule::RuleKind;

/// 1-based line numbers of rule objects, aligned with the rule lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleLineIndex {
    /// line of the `{` opening each entry of `acls`.
    pub acls: Vec<usize>,
    /// line of the `{` opening each entry of `grants`.
    pub grants: Vec<usize>,
}

impl RuleLineIndex {
    /// lines recorded for one rule kind.
    pub fn lines(&self, kind: RuleKind) -> &[usize] {
        match kind {
            RuleKind::Acl => &self.acls,
            RuleKind::Grant => &self.grants,
        }
    }

    /// line of the rule at `index`, if one was recorded.
    pub fn line(&self, kind: RuleKind, index: usize) -> Option<usize> {
        self.lines(kind).get(index).copied()
    }

    fn lines_mut(&mut self, kind: RuleKind) -> &mut Vec<usize> {
        match kind {
            RuleKind::Acl => &mut self.acls,
            RuleKind::Grant => &mut self.grants,
        }
    }
}

fn section_kind(key: &str) -> Option<RuleKind> {
    match key {
        "acls" => Some(RuleKind::Acl),
        "grants" => Some(RuleKind::Grant),
        _ => None,
    }
}

/// scanner state between significant tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// nothing in particular.
    Any,
    /// a top-level key naming a rule section was just read.
    Colon(RuleKind),
    /// `"acls":` or `"grants":` was just read.
    Array(RuleKind),
}

/// scan raw (hujson) policy text for the lines of acl and grant rule objects.
///
/// a rule is recorded for every `{` that is a direct element of the array
/// value of a top-level `"acls"` or `"grants"` key. Braces inside strings,
/// comments and nested objects are ignored. If a section key appears twice,
/// the later one wins, matching how the document is decoded.
pub fn scan_rule_lines(raw: &str) -> RuleLineIndex {
    let mut index = RuleLineIndex::default();
    let mut stack: Vec<char> = Vec::new();
    let mut expect = Expect::Any;
    // the open section and the stack depth of its array
    let mut section: Option<RuleKind> = None;
    let mut line = 1;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            '"' => {
                let mut key = String::new();
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if escaped == '\n' {
                                    line += 1;
                                }
                                key.push(escaped);
                            }
                        }
                        '"' => break,
                        '\n' => {
                            line += 1;
                            key.push(s);
                        }
                        _ => key.push(s),
                    }
                }
                expect = match section_kind(&key) {
                    Some(kind) if stack.len() == 1 => Expect::Colon(kind),
                    _ => Expect::Any,
                };
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&s) = chars.peek() {
                    if s == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for s in chars.by_ref() {
                    if s == '\n' {
                        line += 1;
                    }
                    if prev == '*' && s == '/' {
                        break;
                    }
                    prev = s;
                }
            }
            ':' => {
                expect = match expect {
                    Expect::Colon(kind) => Expect::Array(kind),
                    _ => Expect::Any,
                };
            }
            '[' => {
                if let Expect::Array(kind) = expect {
                    section = Some(kind);
                    index.lines_mut(kind).clear();
                }
                stack.push('[');
                expect = Expect::Any;
            }
            '{' => {
                if let Some(kind) = section
                    && stack.len() == 2
                {
                    index.lines_mut(kind).push(line);
                }
                stack.push('{');
                expect = Expect::Any;
            }
            '}' | ']' => {
                stack.pop();
                if stack.len() < 2 {
                    section = None;
                }
                expect = Expect::Any;
            }
            c if c.is_whitespace() => {}
            _ => expect = Expect::Any,
        }
    }

    index
}
