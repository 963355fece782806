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

//! Expression AST node definitions

use crate::operator::{BinaryOperator, UnaryOperator};
use smallvec::SmallVec;
use std::fmt;

/// Argument list of a function or method call
pub type Arguments = SmallVec<[ExpressionNode; 4]>;

/// AST representation of FHIRPath expressions
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpressionNode {
    /// Literal value (string, number, boolean, etc.)
    Literal(LiteralValue),

    /// Member name at the start of an expression (`name` in `name.given`)
    Identifier(String),

    /// Member navigation (`base.path`)
    Path {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Member name
        path: String,
    },

    /// Binary operation (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Unary sign operation
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// Function call without an explicit receiver (`exists()`)
    FunctionCall(Box<FunctionCallData>),

    /// Method call on an expression (`name.exists()`)
    MethodCall(Box<MethodCallData>),

    /// Index access (`collection[index]`)
    Index {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Index expression
        index: Box<ExpressionNode>,
    },

    /// Type check (`value is Type`)
    TypeCheck {
        /// Expression to check
        expression: Box<ExpressionNode>,
        /// Type name
        type_name: String,
    },

    /// Type cast (`value as Type`)
    TypeCast {
        /// Expression to cast
        expression: Box<ExpressionNode>,
        /// Target type name
        type_name: String,
    },

    /// External constant (`%resource`, `%context`, ...)
    Variable(String),

    /// Iteration variable (`$this`, `$index`, `$total`)
    Special(SpecialVariable),
}

/// Iteration variables bound by lambda-style functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecialVariable {
    /// `$this`
    This,
    /// `$index`
    Index,
    /// `$total`
    Total,
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Function call data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Function arguments
    pub args: Arguments,
}

/// Method call data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodCallData {
    /// Base expression to call method on
    pub base: ExpressionNode,
    /// Method name
    pub method: String,
    /// Method arguments
    pub args: Arguments,
}

/// Literal values in FHIRPath
///
/// Numeric and temporal literals keep their source text; the evaluator
/// converts them to typed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LiteralValue {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Decimal literal (stored as string to preserve precision)
    Decimal(String),
    /// String literal, escapes already processed
    String(String),
    /// Date literal without the leading `@`
    Date(String),
    /// DateTime literal without the leading `@`
    DateTime(String),
    /// Time literal without the leading `@T`
    Time(String),
    /// Quantity literal
    Quantity {
        /// Numeric value
        value: String,
        /// Unit
        unit: String,
    },
    /// The empty collection `{}`
    Empty,
}

impl ExpressionNode {
    /// Create a literal expression
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    /// Create an identifier expression
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }

    /// Create a path navigation expression
    pub fn path(base: ExpressionNode, path: impl Into<String>) -> Self {
        Self::Path {
            base: Box::new(base),
            path: path.into(),
        }
    }

    /// Create a binary operation
    pub fn binary_op(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    /// Create a unary operation
    pub fn unary_op(op: UnaryOperator, operand: ExpressionNode) -> Self {
        Self::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a function call
    pub fn function_call(name: impl Into<String>, args: impl Into<Arguments>) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            args: args.into(),
        }))
    }

    /// Create a method call
    pub fn method_call(
        base: ExpressionNode,
        method: impl Into<String>,
        args: impl Into<Arguments>,
    ) -> Self {
        Self::MethodCall(Box::new(MethodCallData {
            base,
            method: method.into(),
            args: args.into(),
        }))
    }

    /// Create an index expression
    pub fn index(base: ExpressionNode, index: ExpressionNode) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a type check expression
    pub fn type_check(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        Self::TypeCheck {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    /// Create a type cast expression
    pub fn type_cast(expression: ExpressionNode, type_name: impl Into<String>) -> Self {
        Self::TypeCast {
            expression: Box::new(expression),
            type_name: type_name.into(),
        }
    }

    /// Create an external constant reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Get the identifier name if this is a bare identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Type name carried by a type-specifier argument (`ofType(Quantity)`,
    /// `is(FHIR.string)`), if the argument has that shape
    pub fn as_type_specifier(&self) -> Option<String> {
        match self {
            Self::Identifier(name) => Some(name.clone()),
            Self::Path { base, path } => base
                .as_type_specifier()
                .map(|namespace| format!("{namespace}.{path}")),
            _ => None,
        }
    }

    /// Number of nodes in this expression tree
    pub fn complexity(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Identifier(_) | Self::Variable(_) | Self::Special(_) => 1,
            Self::Path { base, .. } => 1 + base.complexity(),
            Self::BinaryOp(data) => 1 + data.left.complexity() + data.right.complexity(),
            Self::UnaryOp { operand, .. } => 1 + operand.complexity(),
            Self::FunctionCall(data) => {
                1 + data.args.iter().map(Self::complexity).sum::<usize>()
            }
            Self::MethodCall(data) => {
                1 + data.base.complexity() + data.args.iter().map(Self::complexity).sum::<usize>()
            }
            Self::Index { base, index } => 1 + base.complexity() + index.complexity(),
            Self::TypeCheck { expression, .. } | Self::TypeCast { expression, .. } => {
                1 + expression.complexity()
            }
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &Arguments) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Identifier(name) => f.write_str(name),
            Self::Path { base, path } => write!(f, "{base}.{path}"),
            Self::BinaryOp(data) => write!(f, "({} {} {})", data.left, data.op, data.right),
            Self::UnaryOp { op, operand } => write!(f, "{op}{operand}"),
            Self::FunctionCall(data) => {
                write!(f, "{}(", data.name)?;
                write_args(f, &data.args)?;
                f.write_str(")")
            }
            Self::MethodCall(data) => {
                write!(f, "{}.{}(", data.base, data.method)?;
                write_args(f, &data.args)?;
                f.write_str(")")
            }
            Self::Index { base, index } => write!(f, "{base}[{index}]"),
            Self::TypeCheck {
                expression,
                type_name,
            } => write!(f, "({expression} is {type_name})"),
            Self::TypeCast {
                expression,
                type_name,
            } => write!(f, "({expression} as {type_name})"),
            Self::Variable(name) => write!(f, "%{name}"),
            Self::Special(SpecialVariable::This) => f.write_str("$this"),
            Self::Special(SpecialVariable::Index) => f.write_str("$index"),
            Self::Special(SpecialVariable::Total) => f.write_str("$total"),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Decimal(d) => f.write_str(d),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Self::Date(d) | Self::DateTime(d) => write!(f, "@{d}"),
            Self::Time(t) => write!(f, "@T{t}"),
            Self::Quantity { value, unit } => write!(f, "{value} '{unit}'"),
            Self::Empty => f.write_str("{}"),
        }
    }
}
