//! Line-oriented guest scripts.
//!
//! Each non-blank line is either `import name [as alias]` or a call
//! `module.function(arg, ...)` with literal arguments. `#` starts a comment.

use std::io::Write;

use anyhow::{Context, Result};
use jsffi_core::{BridgeError, GuestValue, Session};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("SyntaxError: {0}")]
pub struct SyntaxError(String);

impl SyntaxError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Import { module: String, alias: Option<String> },
    Call { target: String, args: Vec<GuestValue> },
}

/// A script line that failed, with the 1-based line number.
#[derive(Debug, thiserror::Error)]
pub enum ScriptFailure {
    #[error("line {line}: {error}")]
    Syntax { line: usize, error: SyntaxError },
    #[error("line {line}: {message}")]
    Guest { line: usize, message: String },
}

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<Stmt>, SyntaxError> {
    let mut p = Parser::new(line);
    if p.at_end() {
        return Ok(None);
    }

    let head = p.dotted_name()?;
    if head == "import" {
        p.skip_ws();
        let module = p.dotted_name()?;
        p.skip_ws();
        let alias = match p.ident() {
            Some("as") => {
                p.skip_ws();
                Some(
                    p.ident()
                        .ok_or_else(|| SyntaxError::new("expected name after 'as'"))?
                        .to_string(),
                )
            }
            Some(other) => return Err(SyntaxError::new(format!("unexpected '{other}'"))),
            None => None,
        };
        p.finish()?;
        return Ok(Some(Stmt::Import { module, alias }));
    }

    p.skip_ws();
    p.expect('(')?;
    let mut args = Vec::new();
    loop {
        p.skip_ws();
        if p.eat(')') {
            break;
        }
        args.push(p.literal()?);
        p.skip_ws();
        if p.eat(',') {
            continue;
        }
        p.expect(')')?;
        break;
    }
    p.finish()?;
    Ok(Some(Stmt::Call { target: head, args }))
}

/// Parse a single literal such as `"hello"`, `b"\x00"` or `42`.
pub fn parse_literal(src: &str) -> Result<GuestValue, SyntaxError> {
    let mut p = Parser::new(src);
    p.skip_ws();
    let value = p.literal()?;
    p.finish()?;
    Ok(value)
}

/// Run `source` in `session`. With `echo`, each call's result is written to
/// `out` the way an interactive prompt would show it.
pub fn execute(
    source: &str,
    session: &mut Session<'_>,
    echo: bool,
    out: &mut dyn Write,
) -> Result<usize> {
    let mut calls = 0;
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        let stmt = match parse_line(text) {
            Ok(Some(stmt)) => stmt,
            Ok(None) => continue,
            Err(error) => return Err(ScriptFailure::Syntax { line, error }.into()),
        };
        debug!(line, ?stmt, "executing");

        let outcome = match stmt {
            Stmt::Import { module, alias } => session
                .import_as(&module, alias.as_deref().unwrap_or(&module))
                .map(|_| None),
            Stmt::Call { target, args } => session.call(&target, &args).map(Some),
        };

        match outcome {
            Ok(Some(result)) => {
                calls += 1;
                if echo {
                    writeln!(out, "{result}").context("failed to write result")?;
                }
            }
            Ok(None) => {}
            Err(err) => return Err(guest_failure(line, &err).into()),
        }
    }
    Ok(calls)
}

fn guest_failure(line: usize, err: &BridgeError) -> ScriptFailure {
    ScriptFailure::Guest {
        line,
        message: err.to_guest_message(),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), SyntaxError> {
        if self.eat(expected) {
            return Ok(());
        }
        match self.peek() {
            Some(found) => Err(SyntaxError::new(format!(
                "expected '{expected}', found '{found}'"
            ))),
            None => Err(SyntaxError::new(format!("expected '{expected}'"))),
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.rest().is_empty() || self.rest().starts_with('#')
    }

    fn finish(&mut self) -> Result<(), SyntaxError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(SyntaxError::new(format!(
                "unexpected trailing input '{}'",
                self.rest().trim_end()
            )))
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        self.pos += end;
        Some(&rest[..end])
    }

    fn dotted_name(&mut self) -> Result<String, SyntaxError> {
        let mut name = self
            .ident()
            .ok_or_else(|| SyntaxError::new("expected a name"))?
            .to_string();
        while self.eat('.') {
            let part = self
                .ident()
                .ok_or_else(|| SyntaxError::new("expected a name after '.'"))?;
            name.push('.');
            name.push_str(part);
        }
        Ok(name)
    }

    fn literal(&mut self) -> Result<GuestValue, SyntaxError> {
        match self.peek() {
            Some('"') | Some('\'') => {
                let bytes = self.quoted(false)?;
                String::from_utf8(bytes)
                    .map(GuestValue::str)
                    .map_err(|_| SyntaxError::new("invalid UTF-8 in string literal"))
            }
            Some(c) if c.is_ascii_digit() || c == '-' => self.number(),
            Some(_) => {
                let word = self
                    .ident()
                    .ok_or_else(|| SyntaxError::new("expected a literal"))?;
                match word {
                    "b" if matches!(self.peek(), Some('"') | Some('\'')) => {
                        Ok(GuestValue::Bytes(self.quoted(true)?))
                    }
                    "True" => Ok(GuestValue::Bool(true)),
                    "False" => Ok(GuestValue::Bool(false)),
                    "None" => Ok(GuestValue::None),
                    "bytearray" => self.bytearray(),
                    other => Err(SyntaxError::new(format!("name '{other}' is not a literal"))),
                }
            }
            None => Err(SyntaxError::new("expected a literal")),
        }
    }

    fn bytearray(&mut self) -> Result<GuestValue, SyntaxError> {
        self.skip_ws();
        self.expect('(')?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(GuestValue::ByteArray(Vec::new()));
        }
        let inner = match self.literal()? {
            GuestValue::Bytes(bytes) => bytes,
            other => {
                return Err(SyntaxError::new(format!(
                    "bytearray() expects bytes, not '{}'",
                    other.type_name()
                )))
            }
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(GuestValue::ByteArray(inner))
    }

    fn number(&mut self) -> Result<GuestValue, SyntaxError> {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let text = rest[..end].replace('_', "");
        self.pos += end;

        if text.contains('.') {
            text.parse::<f64>()
                .map(GuestValue::Float)
                .map_err(|_| SyntaxError::new(format!("invalid float literal '{text}'")))
        } else {
            text.parse::<i64>()
                .map(GuestValue::Int)
                .map_err(|_| SyntaxError::new(format!("invalid int literal '{text}'")))
        }
    }

    /// Body of a quoted literal, escapes resolved. In bytes mode `\xNN` is a
    /// raw byte and only ASCII source characters are allowed.
    fn quoted(&mut self, bytes_mode: bool) -> Result<Vec<u8>, SyntaxError> {
        let quote = self
            .bump()
            .ok_or_else(|| SyntaxError::new("expected a quote"))?;
        let mut out = Vec::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| SyntaxError::new("unterminated string literal"))?;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                if bytes_mode && !c.is_ascii() {
                    return Err(SyntaxError::new(
                        "bytes can only contain ASCII literal characters",
                    ));
                }
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                continue;
            }

            let escaped = self
                .bump()
                .ok_or_else(|| SyntaxError::new("unterminated string literal"))?;
            match escaped {
                'n' => out.push(b'\n'),
                't' => out.push(b'\t'),
                'r' => out.push(b'\r'),
                '0' => out.push(0),
                '\\' => out.push(b'\\'),
                '\'' => out.push(b'\''),
                '"' => out.push(b'"'),
                'x' => {
                    let hex: String = [self.bump(), self.bump()].into_iter().flatten().collect();
                    let value = u8::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.len() == 2)
                        .ok_or_else(|| SyntaxError::new(format!("invalid \\x escape '{hex}'")))?;
                    if bytes_mode || value.is_ascii() {
                        out.push(value);
                    } else {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(char::from(value).encode_utf8(&mut buf).as_bytes());
                    }
                }
                other => {
                    return Err(SyntaxError::new(format!("unknown escape '\\{other}'")));
                }
            }
        }
    }
}
