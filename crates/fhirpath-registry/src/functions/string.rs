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

//! String functions
//!
//! All of them operate on a single string input; an empty, multi-item or
//! non-string input yields empty, as does an empty argument.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, PrimitiveValue};

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::functions::{integer_arg, singleton_string, string_arg};
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

static REGEX_CACHE: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// Compile `pattern`, reusing earlier compilations
fn compiled(pattern: &str, function: &str) -> Result<Regex> {
    if let Some(regex) = REGEX_CACHE.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern)
        .map_err(|err| EvalError::invalid_argument(function, format!("invalid regex: {err}")))?;
    REGEX_CACHE.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// String operation applied to the input string and the arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOperation {
    /// `startsWith(prefix)`
    StartsWith,
    /// `endsWith(suffix)`
    EndsWith,
    /// `contains(substring)`
    Contains,
    /// `matches(regex)`
    Matches,
    /// `replaceMatches(regex, substitution)`
    ReplaceMatches,
    /// `length()`
    Length,
    /// `substring(start [, length])`
    Substring,
    /// `upper()`
    Upper,
    /// `lower()`
    Lower,
    /// `indexOf(substring)`
    IndexOf,
    /// `replace(pattern, substitution)`
    Replace,
    /// `trim()`
    Trim,
    /// `toChars()`
    ToChars,
}

impl StringOperation {
    fn signature(self) -> FunctionSignature {
        match self {
            Self::StartsWith => FunctionSignature::fixed("startsWith", 1),
            Self::EndsWith => FunctionSignature::fixed("endsWith", 1),
            Self::Contains => FunctionSignature::fixed("contains", 1),
            Self::Matches => FunctionSignature::fixed("matches", 1),
            Self::ReplaceMatches => FunctionSignature::fixed("replaceMatches", 2),
            Self::Length => FunctionSignature::no_args("length"),
            Self::Substring => FunctionSignature::new("substring", 1, 2),
            Self::Upper => FunctionSignature::no_args("upper"),
            Self::Lower => FunctionSignature::no_args("lower"),
            Self::IndexOf => FunctionSignature::fixed("indexOf", 1),
            Self::Replace => FunctionSignature::fixed("replace", 2),
            Self::Trim => FunctionSignature::no_args("trim"),
            Self::ToChars => FunctionSignature::no_args("toChars"),
        }
    }

    const ALL: [StringOperation; 13] = [
        Self::StartsWith,
        Self::EndsWith,
        Self::Contains,
        Self::Matches,
        Self::ReplaceMatches,
        Self::Length,
        Self::Substring,
        Self::Upper,
        Self::Lower,
        Self::IndexOf,
        Self::Replace,
        Self::Trim,
        Self::ToChars,
    ];
}

/// String function dispatching on [`StringOperation`]
pub struct StringFunction {
    operation: StringOperation,
    signature: FunctionSignature,
}

impl StringFunction {
    /// Function performing `operation`
    pub fn new(operation: StringOperation) -> Self {
        Self {
            operation,
            signature: operation.signature(),
        }
    }

    fn apply(&self, input: &str, args: &[Collection]) -> Result<Collection> {
        let name = self.signature.name;
        let text = |index| string_arg(args, index, name);
        let value = match self.operation {
            StringOperation::StartsWith => {
                text(0)?.map(|prefix| PrimitiveValue::Boolean(input.starts_with(&prefix)))
            }
            StringOperation::EndsWith => {
                text(0)?.map(|suffix| PrimitiveValue::Boolean(input.ends_with(&suffix)))
            }
            StringOperation::Contains => {
                text(0)?.map(|needle| PrimitiveValue::Boolean(input.contains(&needle)))
            }
            StringOperation::Matches => match text(0)? {
                Some(pattern) => Some(PrimitiveValue::Boolean(
                    compiled(&pattern, name)?.is_match(input),
                )),
                None => None,
            },
            StringOperation::ReplaceMatches => match (text(0)?, text(1)?) {
                (Some(pattern), Some(substitution)) => Some(PrimitiveValue::string(
                    compiled(&pattern, name)?.replace_all(input, substitution.as_str()),
                )),
                _ => None,
            },
            StringOperation::Length => Some(PrimitiveValue::Integer(input.chars().count() as i64)),
            StringOperation::Substring => {
                let Some(start) = integer_arg(args, 0, name)? else {
                    return Ok(Collection::empty());
                };
                let length = integer_arg(args, 1, name)?;
                let char_count = input.chars().count() as i64;
                if start < 0 || start >= char_count {
                    None
                } else {
                    let take = length.map_or(usize::MAX, |l| l.max(0) as usize);
                    Some(PrimitiveValue::string(
                        input
                            .chars()
                            .skip(start as usize)
                            .take(take)
                            .collect::<String>(),
                    ))
                }
            }
            StringOperation::Upper => Some(PrimitiveValue::string(input.to_uppercase())),
            StringOperation::Lower => Some(PrimitiveValue::string(input.to_lowercase())),
            StringOperation::IndexOf => text(0)?.map(|needle| {
                let index = input
                    .find(&needle)
                    .map_or(-1, |byte| input[..byte].chars().count() as i64);
                PrimitiveValue::Integer(index)
            }),
            StringOperation::Replace => match (text(0)?, text(1)?) {
                (Some(pattern), Some(substitution)) if pattern.is_empty() => {
                    let mut out = String::from(substitution.as_str());
                    for ch in input.chars() {
                        out.push(ch);
                        out.push_str(&substitution);
                    }
                    Some(PrimitiveValue::string(out))
                }
                (Some(pattern), Some(substitution)) => {
                    Some(PrimitiveValue::string(input.replace(&pattern, &substitution)))
                }
                _ => None,
            },
            StringOperation::Trim => Some(PrimitiveValue::string(input.trim())),
            StringOperation::ToChars => {
                return Ok(input
                    .chars()
                    .map(|ch| PrimitiveValue::string(ch.to_string()).into())
                    .collect());
            }
        };
        Ok(value.map(Collection::single).unwrap_or_default())
    }
}

impl FhirPathFunction for StringFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn evaluate(&self, focus: &Collection, args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        let Some(input) = singleton_string(focus) else {
            return Ok(Collection::empty());
        };
        self.apply(&input, args)
    }
}

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    for operation in StringOperation::ALL {
        builder.register_function(StringFunction::new(operation));
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{integers, run, strings};
    use octofhir_fhirpath_core::EvalError;
    use octofhir_fhirpath_model::Collection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("startsWith('Hel')", Collection::boolean(true))]
    #[case("endsWith('lo')", Collection::boolean(true))]
    #[case("contains('ell')", Collection::boolean(true))]
    #[case("matches('^H.*o$')", Collection::boolean(true))]
    #[case("matches('[0-9]')", Collection::boolean(false))]
    #[case("replaceMatches('l+', 'L')", strings(&["HeLo"]))]
    #[case("length()", integers(&[5]))]
    #[case("substring(1, 3)", strings(&["ell"]))]
    #[case("substring(3)", strings(&["lo"]))]
    #[case("substring(9)", Collection::empty())]
    #[case("upper()", strings(&["HELLO"]))]
    #[case("lower()", strings(&["hello"]))]
    #[case("indexOf('l')", integers(&[2]))]
    #[case("indexOf('z')", integers(&[-1]))]
    #[case("replace('l', 'x')", strings(&["Hexxo"]))]
    #[case("toChars()", strings(&["H", "e", "l", "l", "o"]))]
    fn string_functions(#[case] expression: &str, #[case] expected: Collection) {
        assert_eq!(run(strings(&["Hello"]), expression).expect("evaluates"), expected);
    }

    #[test]
    fn non_string_or_plural_input_is_empty() {
        assert_eq!(run(integers(&[1]), "length()").expect("ok"), Collection::empty());
        assert_eq!(run(strings(&["a", "b"]), "upper()").expect("ok"), Collection::empty());
        assert_eq!(run(Collection::empty(), "startsWith('a')").expect("ok"), Collection::empty());
    }

    #[test]
    fn invalid_regex_is_reported() {
        assert!(matches!(
            run(strings(&["a"]), "matches('(')"),
            Err(EvalError::InvalidArgument { .. })
        ));
    }
}
