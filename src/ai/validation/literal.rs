//! Relaxed Literal Parser
//!
//! Fallback parser for near-JSON model output written in Python literal
//! syntax. Accepted grammar:
//!
//! - strings in single, double or triple quotes, with `r`/`u`/`b` prefixes
//!   and backslash escapes; adjacent literals concatenate
//! - `True`/`False`/`None` and `true`/`false`/`null`
//! - integers (decimal, `0x`, `0o`, `0b`, `_` separators) and floats, with
//!   an optional leading sign
//! - lists `[...]`, tuples `(...)` and sets `{a, b}` (all as arrays)
//! - dicts `{k: v}` with string or scalar keys
//! - trailing commas and `#` comments
//!
//! Non-string dict keys are rendered in their JSON text form.

use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 128;

/// Parse failure with the character offset where it was detected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for LiteralError {}

type ParseResult<T> = std::result::Result<T, LiteralError>;

/// Parse `input` as a single Python literal
pub fn parse_literal(input: &str) -> ParseResult<Value> {
    let mut parser = LiteralParser::new(input);
    parser.parse_document()
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            depth: 0,
        }
    }

    fn parse_document(&mut self) -> ParseResult<Value> {
        let value = self.parse_value()?;
        self.skip_whitespace();
        if self.pos < self.chars.len() {
            return Err(self.error("unexpected trailing characters"));
        }
        Ok(value)
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => {
                self.pos -= 1;
                Err(self.error(format!("expected '{expected}', found '{c}'")))
            }
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => self.pos += 1,
                '#' => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '\\' if matches!(self.peek_at(1), Some('\n')) => self.pos += 2,
                _ => break,
            }
        }
    }

    /// Length of the string prefix if a string literal starts here
    fn string_start(&self) -> Option<usize> {
        let mut len = 0;
        while let Some(c) = self.peek_at(len) {
            if matches!(c, '\'' | '"') {
                return Some(len);
            }
            if len < 2 && matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B') {
                len += 1;
                continue;
            }
            return None;
        }
        None
    }

    // =========================================================================
    // Values
    // =========================================================================

    fn parse_value(&mut self) -> ParseResult<Value> {
        self.skip_whitespace();

        if self.string_start().is_some() {
            return self.parse_strings();
        }

        let Some(c) = self.peek() else {
            return Err(self.error("unexpected end of input"));
        };

        match c {
            '{' => self.nested(Self::parse_brace),
            '[' => self.nested(Self::parse_list),
            '(' => self.nested(Self::parse_paren),
            '+' | '-' => self.parse_signed(),
            c if c.is_ascii_digit() || c == '.' => self.parse_number(false),
            c if c.is_alphabetic() || c == '_' => self.parse_word(),
            c => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> ParseResult<Value>) -> ParseResult<Value> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_word(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(format!("malformed node or string: {word}")))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Containers
    // -------------------------------------------------------------------------

    fn parse_list(&mut self) -> ParseResult<Value> {
        self.expect('[')?;
        self.parse_sequence(']').map(Value::Array)
    }

    /// Items up to `close`, with the opening delimiter already consumed
    fn parse_sequence(&mut self, close: char) -> ParseResult<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }

            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }
    }

    /// `()` is an empty tuple, `(x)` is just `x`, `(x,)` is a tuple
    fn parse_paren(&mut self) -> ParseResult<Value> {
        self.expect('(')?;
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Value::Array(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();
        match self.peek() {
            Some(')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(',') => {
                self.pos += 1;
                let mut items = vec![first];
                items.extend(self.parse_sequence(')')?);
                Ok(Value::Array(items))
            }
            _ => Err(self.error("expected ',' or ')'")),
        }
    }

    /// Dict or set, decided by whether the first item is followed by ':'
    fn parse_brace(&mut self) -> ParseResult<Value> {
        self.expect('{')?;
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();

        if self.peek() != Some(':') {
            let mut items = vec![first];
            match self.peek() {
                Some('}') => self.pos += 1,
                Some(',') => {
                    self.pos += 1;
                    items.extend(self.parse_sequence('}')?);
                }
                _ => return Err(self.error("expected ',', ':' or '}'")),
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            let key_text = self.key_to_string(key)?;
            self.expect(':')?;
            let value = self.parse_value()?;
            map.insert(key_text, value);

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some('}') {
                        self.pos += 1;
                        return Ok(Value::Object(map));
                    }
                }
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }

            key = self.parse_value()?;
            self.skip_whitespace();
        }
    }

    fn key_to_string(&self, key: Value) -> ParseResult<String> {
        match key {
            Value::String(s) => Ok(s),
            Value::Array(_) | Value::Object(_) => Err(self.error("unhashable dict key")),
            scalar => Ok(scalar.to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------------

    /// One or more adjacent string literals, concatenated
    fn parse_strings(&mut self) -> ParseResult<Value> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_whitespace();
            if self.string_start().is_some() {
                out.push_str(&self.parse_string()?);
            } else {
                self.pos = save;
                return Ok(Value::String(out));
            }
        }
    }

    fn parse_string(&mut self) -> ParseResult<String> {
        let prefix_len = self.string_start().unwrap_or(0);
        let prefix: String = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .collect::<String>()
            .to_ascii_lowercase();
        self.pos += prefix_len;

        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let quote = self
            .bump()
            .ok_or_else(|| self.error("expected string quote"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("unterminated string literal"));
            };

            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }

            match c {
                '\n' if !triple => {
                    return Err(self.error("EOL while scanning string literal"));
                }
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.parse_escape(&mut out, bytes)?,
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String, bytes: bool) -> ParseResult<()> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated string literal"));
        };

        match c {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'a' => out.push('\u{7}'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(self.code_point(code)?);
            }
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(self.code_point(code)?);
            }
            'u' if !bytes => {
                let code = self.hex_digits(4)?;
                out.push(self.code_point(code)?);
            }
            'U' if !bytes => {
                let code = self.hex_digits(8)?;
                out.push(self.code_point(code)?);
            }
            'N' if !bytes => {
                return Err(self.error("named unicode escapes are not supported"));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> ParseResult<u32> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .peek()
                .and_then(|d| d.to_digit(16))
                .ok_or_else(|| self.error("truncated hex escape"))?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(code)
    }

    fn code_point(&self, code: u32) -> ParseResult<char> {
        char::from_u32(code).ok_or_else(|| self.error(format!("invalid code point {code:#x}")))
    }

    // -------------------------------------------------------------------------
    // Numbers
    // -------------------------------------------------------------------------

    fn parse_signed(&mut self) -> ParseResult<Value> {
        let negative = self.bump() == Some('-');
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(negative),
            _ => Err(self.error("sign must be followed by a number")),
        }
    }

    fn parse_number(&mut self, negative: bool) -> ParseResult<Value> {
        let start = self.pos;
        let sign = if negative { "-" } else { "" };

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let digits = digits.replace('_', "");
            return i64::from_str_radix(&format!("{sign}{digits}"), radix)
                .map(Value::from)
                .map_err(|_| LiteralError {
                    position: start,
                    message: format!("invalid base-{radix} integer"),
                });
        }

        let mut text = self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;

        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit() || c == '_'));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let exponent_start = self.pos;
            let mut exponent = String::from("e");
            self.pos += 1;
            if let Some(sign @ ('+' | '-')) = self.peek() {
                exponent.push(sign);
                self.pos += 1;
            }
            let digits = self.take_while(|c| c.is_ascii_digit() || c == '_');
            if digits.is_empty() {
                self.pos = exponent_start;
            } else {
                is_float = true;
                exponent.push_str(&digits);
                text.push_str(&exponent);
            }
        }

        if matches!(self.peek(), Some('j' | 'J')) {
            return Err(self.error("complex numbers are not supported"));
        }

        let text = format!("{sign}{}", text.replace('_', ""));
        if text.trim_start_matches('-') == "." || text.is_empty() {
            return Err(LiteralError {
                position: start,
                message: "invalid number".to_string(),
            });
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(n));
            }
            if let Ok(n) = text.parse::<u64>() {
                return Ok(Value::from(n));
            }
        }

        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                position: start,
                message: format!("invalid number '{text}'"),
            })
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if pred(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }
}
