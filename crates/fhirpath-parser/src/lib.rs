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

//! FHIRPath expression parser
//!
//! A hand-written tokenizer feeds a Pratt parser that produces
//! [`ExpressionNode`] trees. [`ParseCache`] memoizes parsed expressions for
//! repeated evaluation.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod pratt;
pub mod tokenizer;

pub use cache::{ParseCache, ParseCacheConfig, ParseCacheStats, SharedAst};
pub use error::{ParseError, ParseResult};
pub use pratt::{Precedence, PrattParser, parse_expression_pratt};
pub use tokenizer::{Token, Tokenizer, tokenize};

use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::Result;

/// Parse a FHIRPath expression string into an AST
///
/// Syntax errors are reported as [`octofhir_fhirpath_core::EvalError::SyntaxError`]
/// carrying the expression text and the byte offset of the failure.
pub fn parse(input: &str) -> Result<ExpressionNode> {
    log::trace!("parsing '{input}'");
    parse_expression_pratt(input).map_err(|e| e.into_eval_error(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_core::EvalError;
    use rstest::rstest;

    #[rstest]
    #[case("Patient.name.given")]
    #[case("name.where(use = 'official').given.first()")]
    #[case("telecom.all(system.exists() implies value.exists())")]
    #[case("(a | b).count() > 1 and c.empty()")]
    #[case("value.ofType(Quantity).value >= 5 'mg'")]
    #[case("%resource.id = %context.id")]
    #[case("@2020-01-01 < today() or birthDate ~ @2020")]
    #[case("-5 mod 3 div 1")]
    #[case("`div`.exists() xor true")]
    #[case("children().select($this.is(FHIR.string))")]
    fn parses_valid_expressions(#[case] input: &str) {
        assert!(parse(input).is_ok(), "failed to parse {input}");
    }

    #[rstest]
    #[case("name.", 5)]
    #[case("name.where(use = )", 17)]
    #[case("a = = b", 4)]
    #[case("'open", 0)]
    fn reports_syntax_errors_with_position(#[case] input: &str, #[case] position: usize) {
        match parse(input) {
            Err(EvalError::SyntaxError {
                position: actual,
                expression,
                ..
            }) => {
                assert_eq!(actual, position);
                assert_eq!(expression, input);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
