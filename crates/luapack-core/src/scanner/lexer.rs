//! Minimal Lua tokenizer.
//!
//! Only what the reference scanner needs: names, string literals (decoded),
//! numbers and punctuation, with comments and whitespace skipped. Byte
//! offsets are kept on every token so calls can be rewritten in place.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    Name(&'a str),
    /// Decoded contents of a short or long string literal
    Str(String),
    Number,
    Symbol(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.kind, TokenKind::Symbol(s) if s == symbol)
    }

    pub fn is_name(&self, name: &str) -> bool {
        matches!(self.kind, TokenKind::Name(n) if n == name)
    }
}

const TWO_CHAR_SYMBOLS: [&str; 9] = ["..", "==", "~=", "<=", ">=", "::", "//", "<<", ">>"];

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let bytes = source.as_bytes();
        let mut pos = if source.starts_with('\u{feff}') { 3 } else { 0 };
        // A first line starting with `#` is not Lua
        if bytes.get(pos) == Some(&b'#') {
            while pos < bytes.len() && bytes[pos] != b'\n' {
                pos += 1;
            }
        }
        Self { source, bytes, pos }
    }

    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        self.skip_trivia();
        let start = self.pos;
        let byte = self.peek()?;

        let kind = match byte {
            b'"' | b'\'' => TokenKind::Str(self.read_short_string(byte)),
            b'[' => match self.long_bracket_level() {
                Some(level) => TokenKind::Str(self.read_long_bracket(level)),
                None => {
                    self.pos += 1;
                    TokenKind::Symbol(&self.source[start..self.pos])
                }
            },
            b'0'..=b'9' => {
                self.read_number();
                TokenKind::Number
            }
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => {
                self.read_number();
                TokenKind::Number
            }
            b'.' if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') => {
                self.pos += 3;
                TokenKind::Symbol(&self.source[start..self.pos])
            }
            b if is_name_start(b) => {
                while self.peek().is_some_and(is_name_continue) {
                    self.pos += 1;
                }
                TokenKind::Name(&self.source[start..self.pos])
            }
            _ => {
                let two = self.bytes.get(start..start + 2);
                let is_pair = two.is_some_and(|pair| {
                    TWO_CHAR_SYMBOLS
                        .iter()
                        .any(|symbol| symbol.as_bytes() == pair)
                });
                self.pos += if is_pair { 2 } else { 1 };
                TokenKind::Symbol(&self.source[start..self.pos])
            }
        };

        Some(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c) => self.pos += 1,
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.pos += 2;
                    if let Some(level) = self.long_bracket_level() {
                        self.read_long_bracket(level);
                    } else {
                        while self.peek().is_some_and(|b| b != b'\n') {
                            self.pos += 1;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    /// Level of a long bracket opening at the current position (`[[` is 0,
    /// `[==[` is 2), or `None` if this `[` does not open one.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    /// Consume a long bracket of the given level and return its contents.
    /// An unterminated bracket runs to the end of the source.
    fn read_long_bracket(&mut self, level: usize) -> String {
        self.pos += level + 2;
        // A newline right after the opening bracket is not part of the string
        if self.peek() == Some(b'\r') {
            self.pos += 1;
            if self.peek() == Some(b'\n') {
                self.pos += 1;
            }
        } else if self.peek() == Some(b'\n') {
            self.pos += 1;
            if self.peek() == Some(b'\r') {
                self.pos += 1;
            }
        }

        let content_start = self.pos;
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b']' {
                let closes = (1..=level).all(|i| self.peek_at(i) == Some(b'='))
                    && self.peek_at(level + 1) == Some(b']');
                if closes {
                    let content = &self.bytes[content_start..self.pos];
                    self.pos += level + 2;
                    return String::from_utf8_lossy(content).into_owned();
                }
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.bytes[content_start..]).into_owned()
    }

    /// Consume a quoted string, decoding escapes. An unescaped newline or
    /// the end of input ends an unterminated string.
    fn read_short_string(&mut self, quote: u8) -> String {
        self.pos += 1;
        let mut decoded = Vec::new();

        while let Some(byte) = self.peek() {
            match byte {
                b if b == quote => {
                    self.pos += 1;
                    break;
                }
                b'\n' | b'\r' => break,
                b'\\' => {
                    self.pos += 1;
                    self.read_escape(&mut decoded);
                }
                b => {
                    decoded.push(b);
                    self.pos += 1;
                }
            }
        }

        String::from_utf8_lossy(&decoded).into_owned()
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) {
        let Some(byte) = self.peek() else {
            return;
        };
        self.pos += 1;
        match byte {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\n' | b'\r' => {
                // Line continuation, \r\n and \n\r count as one newline
                if matches!(self.peek(), Some(next) if (next == b'\n' || next == b'\r') && next != byte)
                {
                    self.pos += 1;
                }
                out.push(b'\n');
            }
            b'z' => {
                while self
                    .peek()
                    .is_some_and(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c))
                {
                    self.pos += 1;
                }
            }
            b'x' => {
                let mut value = 0u8;
                for _ in 0..2 {
                    match self.peek().and_then(|b| (b as char).to_digit(16)) {
                        Some(digit) => {
                            value = value.wrapping_mul(16).wrapping_add(digit as u8);
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(value);
            }
            b'u' if self.peek() == Some(b'{') => {
                self.pos += 1;
                let mut value: u32 = 0;
                while let Some(digit) = self.peek().and_then(|b| (b as char).to_digit(16)) {
                    value = value.saturating_mul(16).saturating_add(digit);
                    self.pos += 1;
                }
                if self.peek() == Some(b'}') {
                    self.pos += 1;
                }
                let ch = char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u8; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            b'0'..=b'9' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ b'0'..=b'9') => {
                            value = value * 10 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push(value.min(255) as u8);
            }
            other => out.push(other),
        }
    }

    fn read_number(&mut self) {
        while let Some(byte) = self.peek() {
            let is_exponent_sign = matches!(byte, b'+' | b'-')
                && self.pos > 0
                && matches!(self.bytes[self.pos - 1], b'e' | b'E' | b'p' | b'P');
            if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'_' || is_exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_name_continue(byte: u8) -> bool {
    is_name_start(byte) || byte.is_ascii_digit()
}
