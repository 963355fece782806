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

//! Filtering and projection: `where`, `select`, `repeat`, `iif`, `trace`

use octofhir_fhirpath_ast::ExpressionNode;
use octofhir_fhirpath_core::{EvalError, Result};
use octofhir_fhirpath_model::{Collection, Item};

use crate::function::{LambdaEvaluationContext, LambdaFunction};
use crate::functions::singleton_string;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_lambda(WhereFunction)
        .register_lambda(SelectFunction)
        .register_lambda(RepeatFunction)
        .register_lambda(IifFunction)
        .register_lambda(TraceFunction);
}

/// `where(criteria)`: items for which the criteria is true
pub struct WhereFunction;

impl LambdaFunction for WhereFunction {
    static_signature!(FunctionSignature::fixed("where", 1));

    fn documentation(&self) -> &str {
        "Returns a collection containing only those elements in the input collection for which the criteria expression evaluates to true."
    }

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let mut result = Collection::empty();
        for (index, item) in focus.iter().enumerate() {
            if context
                .evaluate_for_item(&args[0], item, index)?
                .as_singleton_boolean()
                == Some(true)
            {
                result.push(item.clone());
            }
        }
        Ok(result)
    }
}

/// `select(projection)`: flattened projection results
pub struct SelectFunction;

impl LambdaFunction for SelectFunction {
    static_signature!(FunctionSignature::fixed("select", 1));

    fn documentation(&self) -> &str {
        "Evaluates the projection expression for each item in the input collection and flattens the results."
    }

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let mut result = Collection::empty();
        for (index, item) in focus.iter().enumerate() {
            result.extend(context.evaluate_for_item(&args[0], item, index)?);
        }
        Ok(result)
    }
}

/// `repeat(projection)`: transitive closure of the projection
///
/// Items already collected are not projected again, so cyclic projections
/// terminate.
pub struct RepeatFunction;

impl LambdaFunction for RepeatFunction {
    static_signature!(FunctionSignature::fixed("repeat", 1));

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let mut result = Collection::empty();
        let mut pending = focus.clone();
        while !pending.is_empty() {
            let mut next = Collection::empty();
            for (index, item) in pending.iter().enumerate() {
                for projected in context.evaluate_for_item(&args[0], item, index)? {
                    if !already_collected(&result, &projected) {
                        result.push(projected.clone());
                        next.push(projected);
                    }
                }
            }
            pending = next;
        }
        Ok(result)
    }
}

/// Nodes are compared by identity, computed values by equality
fn already_collected(result: &Collection, item: &Item) -> bool {
    match item {
        Item::Node(node) => result.iter().any(|seen| seen.as_node() == Some(node)),
        Item::Value(_) => result.contains_item(item),
    }
}

/// `iif(criterion, true-result [, otherwise-result])`
pub struct IifFunction;

impl LambdaFunction for IifFunction {
    static_signature!(FunctionSignature::new("iif", 2, 3));

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let criterion = context.evaluate_for_collection(&args[0], focus)?;
        let decision = match criterion.as_singleton_boolean() {
            Some(b) => b,
            None if criterion.is_empty() => false,
            None => {
                return Err(EvalError::invalid_argument(
                    "iif",
                    "criterion must evaluate to a boolean or empty",
                ));
            }
        };
        if decision {
            context.evaluate_for_collection(&args[1], focus)
        } else if let Some(otherwise) = args.get(2) {
            context.evaluate_for_collection(otherwise, focus)
        } else {
            Ok(Collection::empty())
        }
    }
}

/// `trace(name [, projection])`: logs and returns the input unchanged
pub struct TraceFunction;

impl LambdaFunction for TraceFunction {
    static_signature!(FunctionSignature::new("trace", 1, 2));

    fn evaluate_with_lambda(
        &self,
        focus: &Collection,
        args: &[ExpressionNode],
        context: &LambdaEvaluationContext<'_>,
    ) -> Result<Collection> {
        let name = singleton_string(&context.evaluate_for_collection(&args[0], focus)?)
            .unwrap_or_default();
        let traced = match args.get(1) {
            Some(projection) => context.evaluate_for_collection(projection, focus)?,
            None => focus.clone(),
        };
        if !traced.is_empty() {
            log::debug!(target: "fhirpath::trace", "{name}: {traced}");
        }
        Ok(focus.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::{integers, run};
    use octofhir_fhirpath_core::EvalError;
    use octofhir_fhirpath_model::{Collection, Item, NodeRef, NodeTreeBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn where_keeps_order_and_duplicates() {
        assert_eq!(
            run(integers(&[2, 1, 2, 3]), "where($this = 2)").expect("ok"),
            integers(&[2, 2])
        );
    }

    #[test]
    fn select_flattens() {
        let mut builder = NodeTreeBuilder::resource("Patient");
        let root = builder.root();
        for given in [["Jim", "Bob"], ["Ann", "Lee"]] {
            let name = builder.push_element(root, "name", "HumanName").expect("name");
            for g in given {
                builder.push_primitive(name, "given", "string", g).expect("given");
            }
        }
        let patient = NodeRef::root(builder.build());
        let names: Collection = patient.children_named("name").map(Item::Node).collect();
        let given = run(names, "select(given)").expect("ok");
        let paths: Vec<_> = given.iter().filter_map(Item::path).collect();
        assert_eq!(
            paths,
            vec![
                "Patient.name[0].given[0]",
                "Patient.name[0].given[1]",
                "Patient.name[1].given[0]",
                "Patient.name[1].given[1]",
            ]
        );
    }

    #[test]
    fn repeat_walks_nested_items() {
        let mut builder = NodeTreeBuilder::resource("Questionnaire");
        let root = builder.root();
        let outer = builder.push_element(root, "item", "BackboneElement").expect("item");
        let inner = builder.push_element(outer, "item", "BackboneElement").expect("item");
        builder.push_element(inner, "item", "BackboneElement").expect("item");
        let questionnaire = NodeRef::root(builder.build());
        let all = run(Collection::single(questionnaire), "repeat(item)").expect("ok");
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn iif_branches() {
        assert_eq!(run(integers(&[1]), "iif($this = 1, 'yes', 'no')").expect("ok").to_string(), "[yes]");
        assert_eq!(run(integers(&[2]), "iif($this = 1, 'yes')").expect("ok"), Collection::empty());
        assert!(matches!(
            run(integers(&[2]), "iif('x', 'yes')"),
            Err(EvalError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn trace_returns_input() {
        assert_eq!(run(integers(&[1, 2]), "trace('values')").expect("ok"), integers(&[1, 2]));
    }
}
