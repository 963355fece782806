// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Zero-copy tokenizer for FHIRPath expressions
//!
//! Tokens borrow their text from the input. Character classes are resolved
//! through 256-entry lookup tables and keywords through a single `match`.
//! Each token records the byte offset it starts at so that parse errors can
//! point at the offending position.

use super::error::{ParseError, ParseResult};

/// Token with zero-copy string slices
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'input> {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Decimal literal text, parsed on demand (e.g., 3.14)
    Decimal(&'input str),
    /// String literal content with escapes still in place
    String(&'input str),
    /// Date literal text without `@` (e.g., 2023-01-01)
    Date(&'input str),
    /// DateTime literal text without `@` (e.g., 2023-01-01T12:00:00Z)
    DateTime(&'input str),
    /// Time literal text without `@T` (e.g., 12:00:00)
    Time(&'input str),

    // Identifiers
    /// Plain identifier
    Identifier(&'input str),
    /// Backtick-delimited identifier, never a keyword
    QuotedIdentifier(&'input str),

    // Operators
    /// Addition operator (+)
    Plus,
    /// Subtraction operator (-)
    Minus,
    /// Multiplication operator (*)
    Multiply,
    /// Division operator (/)
    Divide,
    /// Modulo operator (mod keyword)
    Mod,
    /// Integer division operator (div keyword)
    Div,
    /// Equality operator (=)
    Equal,
    /// Inequality operator (!=)
    NotEqual,
    /// Less than operator (<)
    LessThan,
    /// Less than or equal operator (<=)
    LessThanOrEqual,
    /// Greater than operator (>)
    GreaterThan,
    /// Greater than or equal operator (>=)
    GreaterThanOrEqual,
    /// Equivalence operator (~)
    Equivalent,
    /// Non-equivalence operator (!~)
    NotEquivalent,
    /// Logical AND operator (and keyword)
    And,
    /// Logical OR operator (or keyword)
    Or,
    /// Logical XOR operator (xor keyword)
    Xor,
    /// Logical implication operator (implies keyword)
    Implies,
    /// Union operator (|)
    Union,
    /// Membership operator (in keyword)
    In,
    /// Contains operator (contains keyword)
    Contains,
    /// Ampersand operator (&) for string concatenation
    Ampersand,
    /// Type checking operator (is keyword)
    Is,
    /// Type casting operator (as keyword)
    As,

    // Punctuation
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Left square bracket [
    LeftBracket,
    /// Right square bracket ]
    RightBracket,
    /// Left curly brace {
    LeftBrace,
    /// Right curly brace }
    RightBrace,
    /// Dot operator (.) for member access
    Dot,
    /// Comma separator (,)
    Comma,
    /// Percent sign (%) introducing an external constant
    Percent,

    // Special variables
    /// `$this`
    DollarThis,
    /// `$index`
    DollarIndex,
    /// `$total`
    DollarTotal,
    /// Boolean literal true
    True,
    /// Boolean literal false
    False,
}

impl<'input> Token<'input> {
    /// Get keyword token from an identifier-shaped word
    #[inline]
    pub fn from_keyword(s: &str) -> Option<Token<'static>> {
        match s {
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "xor" => Some(Token::Xor),
            "implies" => Some(Token::Implies),
            "is" => Some(Token::Is),
            "as" => Some(Token::As),
            "in" => Some(Token::In),
            "contains" => Some(Token::Contains),
            "div" => Some(Token::Div),
            "mod" => Some(Token::Mod),
            _ => None,
        }
    }

    /// Source text of a keyword token, used where keywords act as member names
    /// (`.contains('x')`, `.is(Quantity)`)
    pub fn keyword_text(&self) -> Option<&'static str> {
        match self {
            Token::True => Some("true"),
            Token::False => Some("false"),
            Token::And => Some("and"),
            Token::Or => Some("or"),
            Token::Xor => Some("xor"),
            Token::Implies => Some("implies"),
            Token::Is => Some("is"),
            Token::As => Some("as"),
            Token::In => Some("in"),
            Token::Contains => Some("contains"),
            Token::Div => Some("div"),
            Token::Mod => Some("mod"),
            _ => None,
        }
    }

    /// Get identifier text for plain and quoted identifiers
    #[inline]
    pub fn as_identifier(&self) -> Option<&'input str> {
        match self {
            Token::Identifier(s) | Token::QuotedIdentifier(s) => Some(s),
            _ => None,
        }
    }

    /// Short human-readable rendering for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(i) => i.to_string(),
            Token::Decimal(s) => (*s).to_string(),
            Token::String(s) => format!("'{s}'"),
            Token::Date(s) | Token::DateTime(s) => format!("@{s}"),
            Token::Time(s) => format!("@T{s}"),
            Token::Identifier(s) => (*s).to_string(),
            Token::QuotedIdentifier(s) => format!("`{s}`"),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Multiply => "*".into(),
            Token::Divide => "/".into(),
            Token::Equal => "=".into(),
            Token::NotEqual => "!=".into(),
            Token::LessThan => "<".into(),
            Token::LessThanOrEqual => "<=".into(),
            Token::GreaterThan => ">".into(),
            Token::GreaterThanOrEqual => ">=".into(),
            Token::Equivalent => "~".into(),
            Token::NotEquivalent => "!~".into(),
            Token::Union => "|".into(),
            Token::Ampersand => "&".into(),
            Token::LeftParen => "(".into(),
            Token::RightParen => ")".into(),
            Token::LeftBracket => "[".into(),
            Token::RightBracket => "]".into(),
            Token::LeftBrace => "{".into(),
            Token::RightBrace => "}".into(),
            Token::Dot => ".".into(),
            Token::Comma => ",".into(),
            Token::Percent => "%".into(),
            Token::DollarThis => "$this".into(),
            Token::DollarIndex => "$index".into(),
            Token::DollarTotal => "$total".into(),
            other => other.keyword_text().unwrap_or("?").to_string(),
        }
    }
}

/// true = valid identifier character
static ID_CHAR_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = matches!(i as u8, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_');
        i += 1;
    }
    table
};

/// true = valid first character of an identifier
static ID_START_TABLE: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = matches!(i as u8, b'A'..=b'Z' | b'a'..=b'z' | b'_');
        i += 1;
    }
    table
};

/// Single-character operators that never start a longer token
#[inline(always)]
fn lookup_single_char_operator(byte: u8) -> Option<Token<'static>> {
    match byte {
        b'.' => Some(Token::Dot),
        b'(' => Some(Token::LeftParen),
        b')' => Some(Token::RightParen),
        b',' => Some(Token::Comma),
        b'+' => Some(Token::Plus),
        b'-' => Some(Token::Minus),
        b'*' => Some(Token::Multiply),
        b'[' => Some(Token::LeftBracket),
        b']' => Some(Token::RightBracket),
        b'{' => Some(Token::LeftBrace),
        b'}' => Some(Token::RightBrace),
        b'&' => Some(Token::Ampersand),
        b'%' => Some(Token::Percent),
        b'|' => Some(Token::Union),
        b'~' => Some(Token::Equivalent),
        _ => None,
    }
}

/// Tokenizer over a FHIRPath expression
#[derive(Clone)]
pub struct Tokenizer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    token_start: usize,
}

impl<'input> Tokenizer<'input> {
    /// Create a new tokenizer
    #[inline]
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            token_start: 0,
        }
    }

    /// Byte offset where the most recently returned token starts
    #[inline(always)]
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Current byte offset
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Two-character comparison operators and their single-character fallbacks
    #[inline(always)]
    fn lookup_comparison_operator(first: u8, second: Option<u8>) -> Option<(Token<'static>, usize)> {
        match (first, second) {
            (b'!', Some(b'=')) => Some((Token::NotEqual, 2)),
            (b'!', Some(b'~')) => Some((Token::NotEquivalent, 2)),
            (b'<', Some(b'=')) => Some((Token::LessThanOrEqual, 2)),
            (b'>', Some(b'=')) => Some((Token::GreaterThanOrEqual, 2)),
            (b'=', _) => Some((Token::Equal, 1)),
            (b'<', _) => Some((Token::LessThan, 1)),
            (b'>', _) => Some((Token::GreaterThan, 1)),
            _ => None,
        }
    }

    #[inline(always)]
    fn is_id_start(ch: u8) -> bool {
        ID_START_TABLE[ch as usize]
    }

    #[inline(always)]
    fn is_id_continue(ch: u8) -> bool {
        ID_CHAR_TABLE[ch as usize]
    }

    fn skip_whitespace_and_comments(&mut self) -> ParseResult<()> {
        loop {
            while let Some(b' ' | b'\t' | b'\r' | b'\n') = self.peek_byte(0) {
                self.pos += 1;
            }
            match (self.peek_byte(0), self.peek_byte(1)) {
                (Some(b'/'), Some(b'/')) => {
                    self.pos += 2;
                    while let Some(byte) = self.peek_byte(0) {
                        self.pos += 1;
                        if byte == b'\n' {
                            break;
                        }
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match (self.peek_byte(0), self.peek_byte(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                return Err(ParseError::syntax(
                                    start,
                                    "unclosed multi-line comment",
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_number(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        while matches!(self.peek_byte(0), Some(b'0'..=b'9')) {
            self.pos += 1;
        }

        let is_decimal =
            self.peek_byte(0) == Some(b'.') && matches!(self.peek_byte(1), Some(b'0'..=b'9'));
        if is_decimal {
            self.pos += 1;
            while matches!(self.peek_byte(0), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            return Ok(Token::Decimal(&self.input[start..self.pos]));
        }

        let text = &self.input[start..self.pos];
        text.parse::<i64>()
            .map(Token::Integer)
            .map_err(|_| ParseError::InvalidLiteral {
                literal_type: "integer".into(),
                value: text.to_string().into(),
                position: start,
            })
    }

    fn parse_identifier(&mut self) -> &'input str {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(Self::is_id_continue) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Scan a quoted literal, honouring backslash escapes; returns the raw content
    fn parse_delimited(&mut self, quote: u8) -> ParseResult<&'input str> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        while let Some(byte) = self.peek_byte(0) {
            match byte {
                b'\\' => self.pos += 2,
                b if b == quote => {
                    let content = &self.input[start..self.pos];
                    self.pos += 1;
                    return Ok(content);
                }
                _ => self.pos += 1,
            }
        }
        Err(ParseError::UnclosedString { position: open })
    }

    fn parse_special_variable(&mut self) -> ParseResult<Token<'input>> {
        let start = self.pos;
        self.pos += 1;
        let name = self.parse_identifier();
        match name {
            "this" => Ok(Token::DollarThis),
            "index" => Ok(Token::DollarIndex),
            "total" => Ok(Token::DollarTotal),
            _ => Err(ParseError::UnexpectedToken {
                token: format!("${name}").into(),
                position: start,
            }),
        }
    }

    fn consume_digits(&mut self, count: usize) -> bool {
        let available = self.bytes[self.pos..]
            .iter()
            .take(count)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if available == count {
            self.pos += count;
            true
        } else {
            false
        }
    }

    /// `-DD` style component: separator followed by exactly `digits` digits
    fn consume_component(&mut self, separator: u8, digits: usize) -> bool {
        if self.peek_byte(0) != Some(separator) {
            return false;
        }
        let checkpoint = self.pos;
        self.pos += 1;
        if self.consume_digits(digits) {
            true
        } else {
            self.pos = checkpoint;
            false
        }
    }

    fn parse_time_part(&mut self) {
        if !self.consume_digits(2) {
            return;
        }
        if self.consume_component(b':', 2) && self.consume_component(b':', 2) {
            if self.peek_byte(0) == Some(b'.') && matches!(self.peek_byte(1), Some(b'0'..=b'9')) {
                self.pos += 1;
                while matches!(self.peek_byte(0), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_timezone(&mut self) {
        match self.peek_byte(0) {
            Some(b'Z') => self.pos += 1,
            Some(b'+' | b'-') => {
                let checkpoint = self.pos;
                self.pos += 1;
                if !(self.consume_digits(2) && self.consume_component(b':', 2)) {
                    self.pos = checkpoint;
                }
            }
            _ => {}
        }
    }

    fn parse_temporal_literal(&mut self) -> ParseResult<Token<'input>> {
        let at = self.pos;
        self.pos += 1;

        if self.peek_byte(0) == Some(b'T') {
            self.pos += 1;
            let start = self.pos;
            self.parse_time_part();
            if self.pos == start {
                return Err(ParseError::InvalidLiteral {
                    literal_type: "time".into(),
                    value: "@T".into(),
                    position: at,
                });
            }
            return Ok(Token::Time(&self.input[start..self.pos]));
        }

        let start = self.pos;
        if !self.consume_digits(4) {
            return Err(ParseError::InvalidLiteral {
                literal_type: "date".into(),
                value: self.input[at..self.pos].to_string().into(),
                position: at,
            });
        }
        if self.consume_component(b'-', 2) {
            self.consume_component(b'-', 2);
        }

        if self.peek_byte(0) == Some(b'T') {
            self.pos += 1;
            self.parse_time_part();
            self.parse_timezone();
            Ok(Token::DateTime(&self.input[start..self.pos]))
        } else {
            Ok(Token::Date(&self.input[start..self.pos]))
        }
    }

    /// Produce the next token, or `None` at end of input
    pub fn next_token(&mut self) -> ParseResult<Option<Token<'input>>> {
        self.skip_whitespace_and_comments()?;
        self.token_start = self.pos;

        let Some(byte) = self.peek_byte(0) else {
            return Ok(None);
        };

        if let Some(token) = lookup_single_char_operator(byte) {
            self.pos += 1;
            return Ok(Some(token));
        }

        let token = match byte {
            b'=' | b'!' | b'<' | b'>' => {
                match Self::lookup_comparison_operator(byte, self.peek_byte(1)) {
                    Some((token, consumed)) => {
                        self.pos += consumed;
                        token
                    }
                    None => {
                        return Err(ParseError::UnexpectedToken {
                            token: (byte as char).to_string().into(),
                            position: self.pos,
                        });
                    }
                }
            }
            b'/' => {
                self.pos += 1;
                Token::Divide
            }
            b'$' => self.parse_special_variable()?,
            b'0'..=b'9' => self.parse_number()?,
            b'\'' => Token::String(self.parse_delimited(b'\'')?),
            b'`' => Token::QuotedIdentifier(self.parse_delimited(b'`')?),
            b'@' => self.parse_temporal_literal()?,
            ch if Self::is_id_start(ch) => {
                let ident = self.parse_identifier();
                Token::from_keyword(ident).unwrap_or(Token::Identifier(ident))
            }
            _ => {
                let ch = self.input[self.pos..].chars().next().unwrap_or('?');
                return Err(ParseError::UnexpectedToken {
                    token: ch.to_string().into(),
                    position: self.pos,
                });
            }
        };

        Ok(Some(token))
    }

    /// Tokenize the whole input, pairing each token with its start offset
    pub fn tokenize_all(&mut self) -> ParseResult<Vec<(Token<'input>, usize)>> {
        let mut tokens = Vec::with_capacity(16);
        while let Some(token) = self.next_token()? {
            tokens.push((token, self.token_start));
        }
        Ok(tokens)
    }
}

/// Tokenize an expression
pub fn tokenize(input: &str) -> ParseResult<Vec<(Token<'_>, usize)>> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<Token<'_>> {
        tokenize(input)
            .expect("tokenize")
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_tokenizer_basic() {
        assert_eq!(
            kinds("Patient.name"),
            vec![Token::Identifier("Patient"), Token::Dot, Token::Identifier("name")]
        );
    }

    #[test]
    fn keywords_and_operators() {
        assert_eq!(
            kinds("a != b and c <= 1 implies d !~ e"),
            vec![
                Token::Identifier("a"),
                Token::NotEqual,
                Token::Identifier("b"),
                Token::And,
                Token::Identifier("c"),
                Token::LessThanOrEqual,
                Token::Integer(1),
                Token::Implies,
                Token::Identifier("d"),
                Token::NotEquivalent,
                Token::Identifier("e"),
            ]
        );
    }

    #[test]
    fn literals_and_positions() {
        let tokens = tokenize("'it\\'s' | 1.5 | @2020-01 | @T10:30 | `div`").expect("tokenize");
        let values: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            values,
            vec![
                Token::String("it\\'s"),
                Token::Union,
                Token::Decimal("1.5"),
                Token::Union,
                Token::Date("2020-01"),
                Token::Union,
                Token::Time("10:30"),
                Token::Union,
                Token::QuotedIdentifier("div"),
            ]
        );
        assert_eq!(tokens[2].1, 10);
    }

    #[test]
    fn datetime_with_timezone() {
        assert_eq!(
            kinds("@2020-01-01T10:00:00.123+02:00"),
            vec![Token::DateTime("2020-01-01T10:00:00.123+02:00")]
        );
        assert_eq!(kinds("@2020-01-01T"), vec![Token::DateTime("2020-01-01T")]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // trailing\n/* block */ .b"),
            vec![Token::Identifier("a"), Token::Dot, Token::Identifier("b")]
        );
    }

    #[test]
    fn special_variables() {
        assert_eq!(
            kinds("$this $index $total"),
            vec![Token::DollarThis, Token::DollarIndex, Token::DollarTotal]
        );
        assert!(tokenize("$that").is_err());
    }

    #[test]
    fn unclosed_string_reports_start() {
        let err = tokenize("name = 'abc").unwrap_err();
        assert_eq!(err, ParseError::UnclosedString { position: 7 });
    }

    #[test]
    fn unknown_character_is_rejected() {
        let err = tokenize("a # b").unwrap_err();
        assert_eq!(err.position(), 2);
    }
}
