//! hujson ("human json") normalization.
//!
//! tailscale policies are written in json extended with `//` and `/* */`
//! comments and trailing commas. [`normalize`] rewrites such text into strict
//! json that `serde_json` accepts. Comments and trailing commas are replaced
//! in place rather than re-serialized, so line numbers in later json errors
//! still point at the original text.

use std::fmt;

/// what went wrong while normalizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// a string literal is not closed before the end of input.
    UnterminatedString,
    /// a `/*` comment is not closed before the end of input.
    UnterminatedComment,
    /// a `/` outside a string that does not start a comment.
    UnexpectedSlash,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnterminatedString => f.write_str("unterminated string"),
            SyntaxErrorKind::UnterminatedComment => f.write_str("unterminated block comment"),
            SyntaxErrorKind::UnexpectedSlash => f.write_str("unexpected '/'"),
        }
    }
}

/// a normalization failure with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct SyntaxError {
    /// the failure.
    pub kind: SyntaxErrorKind,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column (in chars) of the offending token.
    pub column: usize,
}

/// tracks the current position while walking the input.
struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            chars: s.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn next(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn error(&self, kind: SyntaxErrorKind, line: usize, column: usize) -> SyntaxError {
        SyntaxError { kind, line, column }
    }
}

/// rewrite hujson into strict json.
///
/// - a leading byte order mark is dropped
/// - `//` comments are removed up to (not including) the newline
/// - `/* */` comments become a single space; newlines inside them are kept
/// - a comma followed only by whitespace or comments before `}` or `]` is
///   replaced by a space
///
/// string contents, including escapes and comment-like text, pass through
/// untouched. Anything else that is not valid json is left for the json
/// decoder to report.
pub fn normalize(input: &str) -> Result<String, SyntaxError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut out = String::with_capacity(input.len());
    let mut cursor = Cursor::new(input);
    // byte offset in `out` of a comma that may turn out to be trailing
    let mut pending_comma: Option<usize> = None;

    while let Some(c) = cursor.peek() {
        let (line, column) = (cursor.line, cursor.column);
        match c {
            '"' => {
                pending_comma = None;
                copy_string(&mut cursor, &mut out)?;
            }
            '/' => {
                cursor.next();
                match cursor.peek() {
                    Some('/') => skip_line_comment(&mut cursor),
                    Some('*') => {
                        cursor.next();
                        skip_block_comment(&mut cursor, &mut out, line, column)?;
                    }
                    _ => {
                        return Err(cursor.error(SyntaxErrorKind::UnexpectedSlash, line, column));
                    }
                }
            }
            ',' => {
                cursor.next();
                pending_comma = Some(out.len());
                out.push(',');
            }
            '}' | ']' => {
                cursor.next();
                if let Some(at) = pending_comma.take() {
                    out.replace_range(at..at + 1, " ");
                }
                out.push(c);
            }
            c if c.is_whitespace() => {
                cursor.next();
                out.push(c);
            }
            _ => {
                cursor.next();
                pending_comma = None;
                out.push(c);
            }
        }
    }

    Ok(out)
}

fn copy_string(cursor: &mut Cursor<'_>, out: &mut String) -> Result<(), SyntaxError> {
    let (line, column) = (cursor.line, cursor.column);
    // opening quote
    if let Some(quote) = cursor.next() {
        out.push(quote);
    }
    while let Some(c) = cursor.next() {
        out.push(c);
        match c {
            '\\' => {
                if let Some(escaped) = cursor.next() {
                    out.push(escaped);
                }
            }
            '"' => return Ok(()),
            _ => {}
        }
    }
    Err(cursor.error(SyntaxErrorKind::UnterminatedString, line, column))
}

fn skip_line_comment(cursor: &mut Cursor<'_>) {
    while let Some(c) = cursor.peek() {
        if c == '\n' {
            break;
        }
        cursor.next();
    }
}

fn skip_block_comment(
    cursor: &mut Cursor<'_>,
    out: &mut String,
    line: usize,
    column: usize,
) -> Result<(), SyntaxError> {
    out.push(' ');
    while let Some(c) = cursor.next() {
        match c {
            '*' if cursor.peek() == Some('/') => {
                cursor.next();
                return Ok(());
            }
            '\n' => out.push('\n'),
            _ => {}
        }
    }
    Err(cursor.error(SyntaxErrorKind::UnterminatedComment, line, column))
}
