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

//! Pratt parser for FHIRPath expressions
//!
//! Binary operators are handled by precedence climbing over [`Precedence`];
//! invocation (`.member`, `.fn()`, `[index]`) is handled as a postfix loop on
//! top of primary expressions.

use super::error::{ParseError, ParseResult};
use super::tokenizer::{Token, Tokenizer};
use octofhir_fhirpath_ast::{
    Arguments, BinaryOperator, ExpressionNode, LiteralValue, SpecialVariable, UnaryOperator,
};

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Lowest precedence - implies (right associative)
    Implies = 1,
    /// Logical OR and XOR
    Or = 2,
    /// Logical AND
    And = 3,
    /// Membership operators (in, contains)
    Membership = 4,
    /// Equality operators (=, !=, ~, !~)
    Equality = 5,
    /// Inequality operators (<, >, <=, >=)
    Inequality = 6,
    /// Union operator (|)
    Union = 7,
    /// Type operators (is, as)
    Type = 8,
    /// Additive operators (+, -, &)
    Additive = 9,
    /// Multiplicative operators (*, /, div, mod)
    Multiplicative = 10,
    /// Unary operators (+, -)
    Unary = 11,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    #[inline(always)]
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Implies => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Membership,
            Precedence::Membership => Precedence::Equality,
            Precedence::Equality => Precedence::Inequality,
            Precedence::Inequality => Precedence::Union,
            Precedence::Union => Precedence::Type,
            Precedence::Type => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Unary,
            Precedence::Unary => Precedence::Unary,
        }
    }

    /// Check if this precedence is right associative
    #[inline(always)]
    pub const fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Implies)
    }
}

#[inline]
fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Implies => Some(Precedence::Implies),
        Token::Or | Token::Xor => Some(Precedence::Or),
        Token::And => Some(Precedence::And),
        Token::In | Token::Contains => Some(Precedence::Membership),
        Token::Equal | Token::NotEqual | Token::Equivalent | Token::NotEquivalent => {
            Some(Precedence::Equality)
        }
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual => Some(Precedence::Inequality),
        Token::Union => Some(Precedence::Union),
        Token::Is | Token::As => Some(Precedence::Type),
        Token::Plus | Token::Minus | Token::Ampersand => Some(Precedence::Additive),
        Token::Multiply | Token::Divide | Token::Div | Token::Mod => {
            Some(Precedence::Multiplicative)
        }
        _ => None,
    }
}

#[inline]
fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Multiply => Some(BinaryOperator::Multiply),
        Token::Divide => Some(BinaryOperator::Divide),
        Token::Div => Some(BinaryOperator::IntegerDivide),
        Token::Mod => Some(BinaryOperator::Modulo),
        Token::Ampersand => Some(BinaryOperator::Concatenate),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::Equivalent => Some(BinaryOperator::Equivalent),
        Token::NotEquivalent => Some(BinaryOperator::NotEquivalent),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        Token::Xor => Some(BinaryOperator::Xor),
        Token::Implies => Some(BinaryOperator::Implies),
        Token::In => Some(BinaryOperator::In),
        Token::Contains => Some(BinaryOperator::Contains),
        Token::Union => Some(BinaryOperator::Union),
        _ => None,
    }
}

/// Calendar duration keywords accepted as quantity units (`3 days`)
fn is_calendar_unit(word: &str) -> bool {
    matches!(
        word,
        "year"
            | "years"
            | "month"
            | "months"
            | "week"
            | "weeks"
            | "day"
            | "days"
            | "hour"
            | "hours"
            | "minute"
            | "minutes"
            | "second"
            | "seconds"
            | "millisecond"
            | "milliseconds"
    )
}

/// Pratt parser over a [`Tokenizer`]
pub struct PrattParser<'input> {
    tokenizer: Tokenizer<'input>,
    current_token: Option<Token<'input>>,
    current_pos: usize,
}

impl<'input> PrattParser<'input> {
    /// Create a new parser; the first token is read on [`PrattParser::parse`]
    pub fn new(input: &'input str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
            current_token: None,
            current_pos: 0,
        }
    }

    #[inline(always)]
    fn advance(&mut self) -> ParseResult<()> {
        self.current_token = self.tokenizer.next_token()?;
        self.current_pos = self.tokenizer.token_start();
        Ok(())
    }

    #[inline(always)]
    fn current(&self) -> Option<&Token<'input>> {
        self.current_token.as_ref()
    }

    fn unexpected(&self) -> ParseError {
        match &self.current_token {
            Some(token) => ParseError::UnexpectedToken {
                token: token.describe().into(),
                position: self.current_pos,
            },
            None => ParseError::UnexpectedEof {
                position: self.current_pos,
            },
        }
    }

    fn expect(&mut self, expected: Token<'static>, description: &'static str) -> ParseResult<()> {
        match &self.current_token {
            Some(token) if *token == expected => self.advance(),
            Some(token) => Err(ParseError::ExpectedToken {
                expected: description.into(),
                found: token.describe().into(),
                position: self.current_pos,
            }),
            None => Err(ParseError::UnexpectedEof {
                position: self.current_pos,
            }),
        }
    }

    /// Parse a whole expression; trailing tokens are an error
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        self.advance()?;
        if self.current_token.is_none() {
            return Err(ParseError::syntax(0, "empty expression"));
        }
        let expression = self.parse_expression_with_precedence(Precedence::Implies)?;
        if self.current_token.is_some() {
            return Err(self.unexpected());
        }
        Ok(expression)
    }

    fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_unary()?;

        while let Some(current_token) = self.current() {
            let precedence = match get_precedence(current_token) {
                Some(prec) if prec >= min_precedence => prec,
                _ => break,
            };

            match current_token {
                Token::Is => {
                    self.advance()?;
                    let type_name = self.parse_type_specifier()?;
                    left = ExpressionNode::type_check(left, type_name);
                    continue;
                }
                Token::As => {
                    self.advance()?;
                    let type_name = self.parse_type_specifier()?;
                    left = ExpressionNode::type_cast(left, type_name);
                    continue;
                }
                _ => {}
            }

            let op = token_to_binary_op(current_token).ok_or_else(|| self.unexpected())?;
            self.advance()?;

            let next_min = if precedence.is_right_associative() {
                precedence
            } else {
                precedence.next_level()
            };
            let right = self.parse_expression_with_precedence(next_min)?;
            left = ExpressionNode::binary_op(op, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<ExpressionNode> {
        let op = match self.current() {
            Some(Token::Minus) => UnaryOperator::Minus,
            Some(Token::Plus) => UnaryOperator::Plus,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        self.advance()?;
        let operand = self.parse_unary()?;

        if op == UnaryOperator::Minus {
            if let ExpressionNode::Literal(literal) = &operand {
                let negated = match literal {
                    LiteralValue::Integer(i) => Some(LiteralValue::Integer(-i)),
                    LiteralValue::Decimal(d) => Some(LiteralValue::Decimal(format!("-{d}"))),
                    LiteralValue::Quantity { value, unit } => Some(LiteralValue::Quantity {
                        value: format!("-{value}"),
                        unit: unit.clone(),
                    }),
                    _ => None,
                };
                if let Some(negated) = negated {
                    return Ok(ExpressionNode::literal(negated));
                }
            }
        }
        Ok(ExpressionNode::unary_op(op, operand))
    }

    /// Parse a type name after `is`/`as`: `Type`, `FHIR.Type`, or `(Type)`
    fn parse_type_specifier(&mut self) -> ParseResult<String> {
        let parenthesized = matches!(self.current(), Some(Token::LeftParen));
        if parenthesized {
            self.advance()?;
        }

        let mut type_name = match self.current().and_then(Token::as_identifier) {
            Some(name) => name.to_string(),
            None => {
                return Err(ParseError::ExpectedToken {
                    expected: "type name".into(),
                    found: self
                        .current()
                        .map(Token::describe)
                        .unwrap_or_else(|| "end of input".into())
                        .into(),
                    position: self.current_pos,
                });
            }
        };
        self.advance()?;

        while let Some(Token::Dot) = self.current() {
            self.advance()?;
            match self.current().and_then(Token::as_identifier) {
                Some(part) => {
                    type_name.push('.');
                    type_name.push_str(part);
                    self.advance()?;
                }
                None => return Err(self.unexpected()),
            }
        }

        if parenthesized {
            self.expect(Token::RightParen, "')'")?;
        }
        Ok(type_name)
    }

    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let Some(token) = self.current_token.clone() else {
            return Err(self.unexpected());
        };
        let position = self.current_pos;

        match token {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => {
                self.advance()?;
                if let Some(Token::LeftParen) = self.current() {
                    let args = self.parse_arguments()?;
                    Ok(ExpressionNode::function_call(name, args))
                } else {
                    Ok(ExpressionNode::identifier(name))
                }
            }

            Token::Integer(value) => {
                self.advance()?;
                match self.parse_quantity_unit()? {
                    Some(unit) => Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: value.to_string(),
                        unit,
                    })),
                    None => Ok(ExpressionNode::literal(LiteralValue::Integer(value))),
                }
            }

            Token::Decimal(value) => {
                self.advance()?;
                match self.parse_quantity_unit()? {
                    Some(unit) => Ok(ExpressionNode::literal(LiteralValue::Quantity {
                        value: value.to_string(),
                        unit,
                    })),
                    None => Ok(ExpressionNode::literal(LiteralValue::Decimal(
                        value.to_string(),
                    ))),
                }
            }

            Token::String(raw) => {
                self.advance()?;
                let value = process_string_escapes(raw, position)?;
                Ok(ExpressionNode::literal(LiteralValue::String(value)))
            }

            Token::True | Token::False => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Boolean(
                    token == Token::True,
                )))
            }

            Token::Date(text) => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Date(text.to_string())))
            }
            Token::DateTime(text) => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::DateTime(
                    text.to_string(),
                )))
            }
            Token::Time(text) => {
                self.advance()?;
                Ok(ExpressionNode::literal(LiteralValue::Time(text.to_string())))
            }

            Token::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression_with_precedence(Precedence::Implies)?;
                self.expect(Token::RightParen, "')'")?;
                Ok(inner)
            }

            Token::LeftBrace => {
                self.advance()?;
                self.expect(Token::RightBrace, "'}'")?;
                Ok(ExpressionNode::literal(LiteralValue::Empty))
            }

            Token::Percent => {
                self.advance()?;
                let name = match self.current_token.clone() {
                    Some(Token::Identifier(name)) | Some(Token::QuotedIdentifier(name)) => {
                        name.to_string()
                    }
                    Some(Token::String(raw)) => process_string_escapes(raw, self.current_pos)?,
                    Some(other) => match other.keyword_text() {
                        Some(keyword) => keyword.to_string(),
                        None => return Err(self.unexpected()),
                    },
                    None => return Err(self.unexpected()),
                };
                self.advance()?;
                Ok(ExpressionNode::variable(name))
            }

            Token::DollarThis => {
                self.advance()?;
                Ok(ExpressionNode::Special(SpecialVariable::This))
            }
            Token::DollarIndex => {
                self.advance()?;
                Ok(ExpressionNode::Special(SpecialVariable::Index))
            }
            Token::DollarTotal => {
                self.advance()?;
                Ok(ExpressionNode::Special(SpecialVariable::Total))
            }

            // `is(T)`, `as(T)`, `contains(x)` invoked on the implicit focus
            Token::Is | Token::As | Token::Contains | Token::In => {
                let name = token.keyword_text().unwrap_or_default();
                self.advance()?;
                if let Some(Token::LeftParen) = self.current() {
                    let args = self.parse_arguments()?;
                    Ok(ExpressionNode::function_call(name, args))
                } else {
                    Err(ParseError::UnexpectedToken {
                        token: name.into(),
                        position,
                    })
                }
            }

            _ => Err(self.unexpected()),
        }
    }

    /// Unit following a numeric literal, if any: `'mg'` or a calendar keyword
    fn parse_quantity_unit(&mut self) -> ParseResult<Option<String>> {
        match self.current_token.clone() {
            Some(Token::String(raw)) => {
                let unit = process_string_escapes(raw, self.current_pos)?;
                self.advance()?;
                Ok(Some(unit))
            }
            Some(Token::Identifier(word)) if is_calendar_unit(word) => {
                self.advance()?;
                Ok(Some(word.to_string()))
            }
            _ => Ok(None),
        }
    }

    /// Parse `( expr, expr, ... )`; the current token is the opening parenthesis
    fn parse_arguments(&mut self) -> ParseResult<Arguments> {
        self.expect(Token::LeftParen, "'('")?;
        let mut args = Arguments::new();

        if let Some(Token::RightParen) = self.current() {
            self.advance()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression_with_precedence(Precedence::Implies)?);
            match self.current() {
                Some(Token::Comma) => self.advance()?,
                Some(Token::RightParen) => {
                    self.advance()?;
                    return Ok(args);
                }
                Some(_) => {
                    return Err(ParseError::ExpectedToken {
                        expected: "',' or ')'".into(),
                        found: self.current().map(Token::describe).unwrap_or_default().into(),
                        position: self.current_pos,
                    });
                }
                None => {
                    return Err(ParseError::UnexpectedEof {
                        position: self.current_pos,
                    });
                }
            }
        }
    }

    /// Postfix invocations: member access, method calls and indexers
    fn parse_postfix(&mut self, mut left: ExpressionNode) -> ParseResult<ExpressionNode> {
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.advance()?;
                    let name = match self.current() {
                        Some(token) => match token.as_identifier().or_else(|| token.keyword_text()) {
                            Some(name) => name.to_string(),
                            None => return Err(self.unexpected()),
                        },
                        None => return Err(self.unexpected()),
                    };
                    self.advance()?;

                    left = if let Some(Token::LeftParen) = self.current() {
                        let args = self.parse_arguments()?;
                        ExpressionNode::method_call(left, name, args)
                    } else {
                        ExpressionNode::path(left, name)
                    };
                }
                Some(Token::LeftBracket) => {
                    self.advance()?;
                    let index = self.parse_expression_with_precedence(Precedence::Implies)?;
                    self.expect(Token::RightBracket, "']'")?;
                    left = ExpressionNode::index(left, index);
                }
                _ => return Ok(left),
            }
        }
    }
}

/// Resolve backslash escapes inside a string or quoted identifier literal
fn process_string_escapes(raw: &str, position: usize) -> ParseResult<String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('\'') => result.push('\''),
            Some('"') => result.push('"'),
            Some('`') => result.push('`'),
            Some('\\') => result.push('\\'),
            Some('/') => result.push('/'),
            Some('f') => result.push('\u{000C}'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => result.push(c),
                    None => {
                        return Err(ParseError::InvalidEscape {
                            sequence: format!("\\u{hex}").into(),
                            position,
                        });
                    }
                }
            }
            Some(other) => {
                return Err(ParseError::InvalidEscape {
                    sequence: format!("\\{other}").into(),
                    position,
                });
            }
            None => {
                return Err(ParseError::InvalidEscape {
                    sequence: "\\".into(),
                    position,
                });
            }
        }
    }
    Ok(result)
}

/// Parse an expression with the Pratt parser
pub fn parse_expression_pratt(input: &str) -> ParseResult<ExpressionNode> {
    PrattParser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> ExpressionNode {
        parse_expression_pratt(input).expect("parse")
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Additive > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::And);
        assert!(Precedence::And > Precedence::Or);
        assert!(Precedence::Or > Precedence::Implies);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(parse("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
    }

    #[test]
    fn implies_is_right_associative() {
        assert_eq!(
            parse("a implies b implies c").to_string(),
            "(a implies (b implies c))"
        );
        assert_eq!(parse("a - b - c").to_string(), "((a - b) - c)");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(parse("a or b and c").to_string(), "(a or (b and c))");
    }

    #[test]
    fn method_chains_and_indexers() {
        assert_eq!(
            parse("Patient.name[0].given.where($this.startsWith('J')).exists()").to_string(),
            "Patient.name[0].given.where($this.startsWith('J')).exists()"
        );
    }

    #[test]
    fn type_operators_take_qualified_names() {
        assert_eq!(
            parse("value is FHIR.Quantity").to_string(),
            "(value is FHIR.Quantity)"
        );
        assert_eq!(parse("value as (string)").to_string(), "(value as string)");
    }

    #[test]
    fn keywords_are_allowed_after_dot() {
        assert_eq!(
            parse("name.given.contains('x')").to_string(),
            "name.given.contains('x')"
        );
        assert_eq!(parse("value.is(Quantity)").to_string(), "value.is(Quantity)");
    }

    #[test]
    fn literals() {
        assert_eq!(
            parse("5 'mg'"),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "5".into(),
                unit: "mg".into()
            })
        );
        assert_eq!(
            parse("-3 days"),
            ExpressionNode::literal(LiteralValue::Quantity {
                value: "-3".into(),
                unit: "days".into()
            })
        );
        assert_eq!(parse("{}"), ExpressionNode::literal(LiteralValue::Empty));
        assert_eq!(parse("-1"), ExpressionNode::literal(LiteralValue::Integer(-1)));
        assert_eq!(
            parse("'a\\u0041\\n'"),
            ExpressionNode::literal(LiteralValue::String("aA\n".into()))
        );
    }

    #[test]
    fn external_constants() {
        assert_eq!(parse("%resource"), ExpressionNode::variable("resource"));
        assert_eq!(parse("%`vs-name`"), ExpressionNode::variable("vs-name"));
        assert_eq!(parse("%'quoted'"), ExpressionNode::variable("quoted"));
    }

    #[test]
    fn errors_carry_positions() {
        let err = parse_expression_pratt("name.where(").unwrap_err();
        assert_eq!(err, ParseError::UnexpectedEof { position: 11 });

        let err = parse_expression_pratt("a b").unwrap_err();
        assert_eq!(err.position(), 2);

        let err = parse_expression_pratt("'bad \\q'").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEscape { .. }));

        assert!(parse_expression_pratt("").is_err());
        assert!(parse_expression_pratt("a * * b").is_err());
    }
}
