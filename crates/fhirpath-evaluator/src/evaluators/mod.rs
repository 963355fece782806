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

//! Specialized evaluators for the different kinds of expression
//!
//! Each evaluator is a unit struct with associated functions working on
//! already evaluated operands, so the engine only decides what to evaluate
//! and in which order.

pub mod arithmetic;
pub mod collection;
pub mod comparison;
pub mod literal;
pub mod logical;
pub mod navigation;

pub use arithmetic::ArithmeticEvaluator;
pub use collection::CollectionEvaluator;
pub use comparison::ComparisonEvaluator;
pub use literal::LiteralEvaluator;
pub use logical::LogicalEvaluator;
pub use navigation::NavigationEvaluator;
