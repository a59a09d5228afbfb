//! Recursive-descent parser for literal tool arguments.
//!
//! Only literal syntax is accepted: strings, numbers, booleans, `None`, and
//! lists/tuples/dicts built from literals. Names, operators, calls and
//! attribute access are rejected, so nothing in model output is ever
//! evaluated.

use crate::core::types::{Literal, ToolInvocation};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected} at offset {offset}")]
    Expected {
        expected: &'static str,
        offset: usize,
    },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },
    #[error("invalid number literal '{text}'")]
    InvalidNumber { text: String },
    #[error("'{name}' is not a literal value")]
    NotLiteral { name: String },
    #[error("unexpected input at offset {offset}")]
    TrailingInput { offset: usize },
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword,
    #[error("literal nested deeper than {MAX_DEPTH} levels")]
    TooDeep,
}

/// Parse a whole input as exactly one literal.
pub fn parse_literal(src: &str) -> Result<Literal, ParseError> {
    let mut parser = Parser::new(src);
    let value = parser.value(0)?;
    parser.expect_end()?;
    Ok(value)
}

/// Parse a call expression of the form `name(arg, ..., key=arg)`.
pub fn parse_call(src: &str) -> Result<ToolInvocation, ParseError> {
    let mut parser = Parser::new(src);
    parser.skip_ws();
    let name = parser
        .identifier()
        .ok_or(ParseError::Expected {
            expected: "tool name",
            offset: parser.pos,
        })?
        .to_string();
    parser.skip_ws();
    parser.expect_char('(', "'(' after tool name")?;
    let (args, kwargs) = parser.arguments()?;
    parser.expect_end()?;
    Ok(ToolInvocation { name, args, kwargs })
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char, label: &'static str) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.bump();
            return Ok(());
        }
        Err(ParseError::Expected {
            expected: label,
            offset: self.pos,
        })
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(ParseError::TrailingInput { offset: self.pos });
        }
        Ok(())
    }

    fn identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if ch == '_' || ch.is_alphabetic() => {
                self.bump();
            }
            _ => return None,
        }
        while let Some(ch) = self.peek() {
            if ch == '_' || ch.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        Some(&self.src[start..self.pos])
    }

    /// Argument list after the opening `(`, consuming the closing `)`.
    #[allow(clippy::type_complexity)]
    fn arguments(&mut self) -> Result<(Vec<Literal>, Vec<(String, Literal)>), ParseError> {
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.bump();
                return Ok((args, kwargs));
            }
            if let Some(key) = self.keyword() {
                self.skip_ws();
                let value = self.value(1)?;
                kwargs.push((key, value));
            } else {
                if !kwargs.is_empty() {
                    return Err(ParseError::PositionalAfterKeyword);
                }
                args.push(self.value(1)?);
            }
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                _ => {
                    return Err(ParseError::Expected {
                        expected: "',' or ')'",
                        offset: self.pos,
                    });
                }
            }
        }
    }

    /// `name=` prefix of a keyword argument; restores position when absent.
    fn keyword(&mut self) -> Option<String> {
        let start = self.pos;
        if let Some(name) = self.identifier() {
            self.skip_ws();
            if self.peek() == Some('=') && self.peek_nth(1) != Some('=') {
                self.bump();
                return Some(name.to_string());
            }
        }
        self.pos = start;
        None
    }

    fn value(&mut self, depth: usize) -> Result<Literal, ParseError> {
        if depth > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        self.skip_ws();
        let Some(ch) = self.peek() else {
            return Err(ParseError::Expected {
                expected: "a literal",
                offset: self.pos,
            });
        };
        match ch {
            '"' | '\'' => self.strings(),
            'r' | 'R' if matches!(self.peek_nth(1), Some('"' | '\'')) => self.strings(),
            '[' => {
                self.bump();
                let items = self.sequence(']', depth)?;
                Ok(Literal::List(items.0))
            }
            '(' => {
                self.bump();
                let (items, trailing_comma) = self.sequence(')', depth)?;
                if items.len() == 1 && !trailing_comma {
                    return Ok(items.into_iter().next().unwrap_or(Literal::None));
                }
                Ok(Literal::Tuple(items))
            }
            '{' => {
                self.bump();
                self.dict(depth)
            }
            '-' | '+' => {
                self.bump();
                self.skip_ws();
                match self.value(depth + 1)? {
                    Literal::Int(value) if ch == '-' => Ok(Literal::Int(-value)),
                    Literal::Float(value) if ch == '-' => Ok(Literal::Float(-value)),
                    value @ (Literal::Int(_) | Literal::Float(_)) => Ok(value),
                    other => Err(ParseError::NotLiteral {
                        name: format!("{ch}{other}"),
                    }),
                }
            }
            c if c.is_ascii_digit() => self.number(),
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
            _ => {
                let offset = self.pos;
                let Some(name) = self.identifier() else {
                    return Err(ParseError::Expected {
                        expected: "a literal",
                        offset,
                    });
                };
                match name {
                    "True" | "true" => Ok(Literal::Bool(true)),
                    "False" | "false" => Ok(Literal::Bool(false)),
                    "None" | "null" => Ok(Literal::None),
                    other => Err(ParseError::NotLiteral {
                        name: other.to_string(),
                    }),
                }
            }
        }
    }

    /// Comma-separated items up to `close`. Returns whether a trailing comma was seen.
    fn sequence(&mut self, close: char, depth: usize) -> Result<(Vec<Literal>, bool), ParseError> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok((items, trailing_comma));
            }
            items.push(self.value(depth + 1)?);
            trailing_comma = false;
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    trailing_comma = true;
                }
                Some(c) if c == close => {}
                _ => {
                    return Err(ParseError::Expected {
                        expected: "',' or closing bracket",
                        offset: self.pos,
                    });
                }
            }
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Literal, ParseError> {
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Literal::Dict(entries));
            }
            let key = self.value(depth + 1)?;
            self.skip_ws();
            self.expect_char(':', "':' in dict literal")?;
            let value = self.value(depth + 1)?;
            entries.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                _ => {
                    return Err(ParseError::Expected {
                        expected: "',' or '}'",
                        offset: self.pos,
                    });
                }
            }
        }
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self) -> Result<Literal, ParseError> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            let next_is_string = match self.peek() {
                Some('"' | '\'') => true,
                Some('r' | 'R') => matches!(self.peek_nth(1), Some('"' | '\'')),
                _ => false,
            };
            if !next_is_string {
                self.pos = save;
                return Ok(Literal::Str(out));
            }
            out.push_str(&self.string()?);
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let raw = matches!(self.peek(), Some('r' | 'R'));
        if raw {
            self.bump();
        }
        let Some(quote) = self.bump() else {
            return Err(ParseError::UnterminatedString { offset: start });
        };
        let triple = self.peek() == Some(quote) && self.peek_nth(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let mut out = String::new();
        loop {
            let Some(ch) = self.bump() else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            if ch == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_nth(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    return Ok(out);
                }
                out.push(ch);
                continue;
            }
            if ch == '\n' && !triple {
                return Err(ParseError::UnterminatedString { offset: start });
            }
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            let escape_at = self.pos - 1;
            let Some(next) = self.bump() else {
                return Err(ParseError::UnterminatedString { offset: start });
            };
            if raw {
                out.push('\\');
                out.push(next);
                continue;
            }
            match next {
                '\n' => {}
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'a' => out.push('\u{07}'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0c}'),
                'v' => out.push('\u{0b}'),
                '0'..='7' => {
                    let mut value = next.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        match self.peek().and_then(|c| c.to_digit(8)) {
                            Some(digit) => {
                                value = value * 8 + digit;
                                self.bump();
                            }
                            None => break,
                        }
                    }
                    out.push(char::from_u32(value).ok_or(ParseError::InvalidEscape {
                        offset: escape_at,
                    })?);
                }
                'x' => out.push(self.hex_escape(2, escape_at)?),
                'u' => out.push(self.hex_escape(4, escape_at)?),
                'U' => out.push(self.hex_escape(8, escape_at)?),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, offset: usize) -> Result<char, ParseError> {
        let rest = self.rest();
        let hex = rest
            .get(..digits)
            .filter(|h| h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or(ParseError::InvalidEscape { offset })?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidEscape { offset })?;
        self.pos += digits;
        char::from_u32(value).ok_or(ParseError::InvalidEscape { offset })
    }

    fn number(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        let mut prev = '\0';
        while let Some(ch) = self.peek() {
            let exponent_sign = matches!(ch, '+' | '-')
                && matches!(prev, 'e' | 'E')
                && !self.src[start..self.pos].starts_with("0x")
                && !self.src[start..self.pos].starts_with("0X");
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || exponent_sign {
                prev = ch;
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];
        let invalid = || ParseError::InvalidNumber {
            text: text.to_string(),
        };
        if text.starts_with('_') || text.ends_with('_') || text.contains("__") {
            return Err(invalid());
        }
        let cleaned = text.replace('_', "");
        let lower = cleaned.to_ascii_lowercase();
        for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
            if let Some(digits) = lower.strip_prefix(prefix) {
                return i64::from_str_radix(digits, radix)
                    .map(Literal::Int)
                    .map_err(|_| invalid());
            }
        }
        if lower.contains(['.', 'e']) {
            if !lower.chars().all(|c| c.is_ascii_digit() || "+-.e".contains(c)) {
                return Err(invalid());
            }
            return lower.parse::<f64>().map(Literal::Float).map_err(|_| invalid());
        }
        if !lower.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        lower.parse::<i64>().map(Literal::Int).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(value: &str) -> Literal {
        Literal::Str(value.to_string())
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse_literal("42").expect("int"), Literal::Int(42));
        assert_eq!(parse_literal("-7").expect("neg"), Literal::Int(-7));
        assert_eq!(parse_literal("1_000").expect("sep"), Literal::Int(1000));
        assert_eq!(parse_literal("0x1F").expect("hex"), Literal::Int(31));
        assert_eq!(parse_literal("2.5e-1").expect("float"), Literal::Float(0.25));
        assert_eq!(parse_literal(".5").expect("dot float"), Literal::Float(0.5));
        assert_eq!(parse_literal("True").expect("bool"), Literal::Bool(true));
        assert_eq!(parse_literal("false").expect("bool"), Literal::Bool(false));
        assert_eq!(parse_literal("None").expect("none"), Literal::None);
    }

    #[test]
    fn parses_strings_with_escapes() {
        assert_eq!(parse_literal(r#""a\nb""#).expect("dq"), s("a\nb"));
        assert_eq!(parse_literal(r"'it\'s'").expect("sq"), s("it's"));
        assert_eq!(parse_literal(r#""\x41é""#).expect("hex"), s("Aé"));
        assert_eq!(parse_literal(r#"r"\d+""#).expect("raw"), s(r"\d+"));
        assert_eq!(parse_literal(r#""\d""#).expect("unknown escape"), s(r"\d"));
        assert_eq!(parse_literal(r#""ab" 'cd'"#).expect("concat"), s("abcd"));
    }

    #[test]
    fn parses_triple_quoted_multiline_string() {
        let src = "\"\"\"print('hi')\nprint(\"x\")\n\"\"\"";
        assert_eq!(
            parse_literal(src).expect("triple"),
            s("print('hi')\nprint(\"x\")\n")
        );
    }

    #[test]
    fn parses_containers() {
        assert_eq!(
            parse_literal("[1, 'a', (2,), {'k': None},]").expect("list"),
            Literal::List(vec![
                Literal::Int(1),
                s("a"),
                Literal::Tuple(vec![Literal::Int(2)]),
                Literal::Dict(vec![(s("k"), Literal::None)]),
            ])
        );
        assert_eq!(parse_literal("()").expect("unit"), Literal::Tuple(Vec::new()));
        assert_eq!(parse_literal("(3)").expect("paren"), Literal::Int(3));
    }

    #[test]
    fn rejects_non_literals() {
        assert!(matches!(
            parse_literal("__import__('os')"),
            Err(ParseError::NotLiteral { .. })
        ));
        assert!(matches!(
            parse_literal("x"),
            Err(ParseError::NotLiteral { .. })
        ));
        assert!(parse_literal("1 + 2").is_err());
        assert!(parse_literal("'a'.upper()").is_err());
        assert!(parse_literal("{1, 2}").is_err());
        assert!(parse_literal("-'a'").is_err());
        assert!(parse_literal("'open").is_err());
        assert!(parse_literal("'line\nbreak'").is_err());
        assert!(parse_literal("12abc").is_err());
    }

    #[test]
    fn rejects_excessive_nesting() {
        let src = format!("{}{}", "[".repeat(100), "]".repeat(100));
        assert_eq!(parse_literal(&src), Err(ParseError::TooDeep));
    }

    #[test]
    fn parses_call_with_positional_and_keyword_args() {
        let call = parse_call("write_to_file('a.txt', \"hi\", mode='overwrite')").expect("call");
        assert_eq!(call.name, "write_to_file");
        assert_eq!(call.args, vec![s("a.txt"), s("hi")]);
        assert_eq!(call.kwargs, vec![("mode".to_string(), s("overwrite"))]);
    }

    #[test]
    fn parses_call_without_args() {
        let call = parse_call("  list_todos ( ) ").expect("call");
        assert_eq!(call.name, "list_todos");
        assert!(call.args.is_empty());
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn rejects_malformed_calls() {
        assert!(parse_call("list_todos").is_err());
        assert!(parse_call("create_file('a', ").is_err());
        assert!(parse_call("create_file('a') extra").is_err());
        assert!(parse_call("create_file(path)").is_err());
        assert_eq!(
            parse_call("create_file(path='a', 'b')"),
            Err(ParseError::PositionalAfterKeyword)
        );
        assert!(parse_call("os.system('rm -rf /')").is_err());
    }
}
