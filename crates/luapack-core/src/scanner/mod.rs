//! Reference scanner.
//!
//! Finds every `require` call with a static argument in one module's source,
//! in source order, together with the byte span of the whole call so the
//! emitter can substitute it without touching anything else.

mod lexer;


pub use lexer::{Lexer, Token, TokenKind};

use crate::span::Span;
use std::fmt;

const REQUIRE: &str = "require";

/// A module reference as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    /// The (decoded) string the module was required by
    pub literal: String,
    /// The whole call, from `require` to the closing `)` or string
    pub span: Span,
}

/// Result of scanning one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub references: Vec<RawReference>,
    /// `require` mentioned without being called, e.g. `local r = require`
    pub value_uses: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// A `require` call whose argument is not known until run time
    DynamicReference { call: String, span: Span },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::DynamicReference { call, span } => {
                write!(f, "non-static require `{}` at line {}", call, span.line)
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Scan a module and return its references in source order
pub fn scan(source: &str) -> Result<Vec<RawReference>, ScanError> {
    Scanner::new(source).scan().map(|result| result.references)
}

/// Maps byte offsets to 1-based line and column
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    fn position(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        (line as u32, (offset - line_start + 1) as u32)
    }

    fn line_end(&self, offset: usize, source_len: usize) -> usize {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        self.line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(source_len)
    }
}

pub struct Scanner<'a> {
    source: &'a str,
    tokens: Vec<Token<'a>>,
    lines: LineIndex,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Lexer::new(source).tokenize(),
            lines: LineIndex::new(source),
        }
    }

    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        let mut result = ScanResult::default();

        for (index, token) in self.tokens.iter().enumerate() {
            if !token.is_name(REQUIRE) {
                continue;
            }

            let previous = index.checked_sub(1).map(|i| &self.tokens[i]);
            // `obj.require`, `obj:require` and `function require` are not calls
            // of the global require
            if previous.is_some_and(|prev| {
                prev.is_symbol(".") || prev.is_symbol(":") || prev.is_name("function")
            }) {
                continue;
            }

            match self.tokens.get(index + 1) {
                Some(Token {
                    kind: TokenKind::Str(literal),
                    end,
                    ..
                }) => {
                    result.references.push(RawReference {
                        literal: literal.clone(),
                        span: self.span(token.start, *end),
                    });
                }
                Some(next) if next.is_symbol("(") => {
                    result.references.push(self.parenthesized_call(index)?);
                }
                Some(next) if next.is_symbol("{") => {
                    return Err(self.dynamic(token.start, self.matching_close(index + 1)));
                }
                Some(next) if next.is_symbol("=") || previous.is_some_and(|p| p.is_name("local")) => {}
                _ => result.value_uses.push(self.span(token.start, token.end)),
            }
        }

        Ok(result)
    }

    /// `require ( "a" .. 'b' )` starting at the `require` token
    fn parenthesized_call(&self, require_index: usize) -> Result<RawReference, ScanError> {
        let start = self.tokens[require_index].start;
        let mut index = require_index + 2;
        let mut literal = String::new();

        loop {
            match self.tokens.get(index) {
                Some(Token {
                    kind: TokenKind::Str(part),
                    ..
                }) => literal.push_str(part),
                _ => return Err(self.dynamic(start, self.matching_close(require_index + 1))),
            }
            index += 1;

            match self.tokens.get(index) {
                Some(token) if token.is_symbol("..") => index += 1,
                Some(token) if token.is_symbol(")") => {
                    return Ok(RawReference {
                        literal,
                        span: self.span(start, token.end),
                    });
                }
                _ => return Err(self.dynamic(start, self.matching_close(require_index + 1))),
            }
        }
    }

    /// End offset of the bracket matching the one at `open_index`, if any
    fn matching_close(&self, open_index: usize) -> Option<usize> {
        let mut depth = 0usize;
        for token in &self.tokens[open_index..] {
            match token.kind {
                TokenKind::Symbol("(" | "{" | "[") => depth += 1,
                TokenKind::Symbol(")" | "}" | "]") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(token.end);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn dynamic(&self, start: usize, end: Option<usize>) -> ScanError {
        let end = end.unwrap_or_else(|| self.lines.line_end(start, self.source.len()));
        let call = self
            .source
            .get(start..end)
            .unwrap_or_default()
            .trim_end()
            .to_string();
        ScanError::DynamicReference {
            call,
            span: self.span(start, end),
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.lines.position(start);
        Span::new(start, end, line, column)
    }
}
