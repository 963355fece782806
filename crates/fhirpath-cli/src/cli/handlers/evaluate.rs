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

//! Handler for the evaluate command

use std::path::Path;
use std::time::Instant;

use super::CommandOutput;
use crate::cli::context::CliContext;
use crate::cli::output::render_collection;

/// Evaluate `expression` against the resource read from `input`
///
/// Evaluation errors are reported as a failed command, not as an `Err`.
pub fn handle_evaluate(
    expression: &str,
    input: Option<&Path>,
    variables: &[String],
    context: &CliContext,
) -> anyhow::Result<CommandOutput> {
    let resource = context.load_resource(input)?;
    let engine = context.engine(&[], false)?;

    let mut evaluation = engine.validator().context_for(&resource);
    for (name, value) in context.variables(variables)? {
        evaluation.set_variable(name, value);
    }

    let start = Instant::now();
    let result = engine.validator().engine().evaluate(expression, &evaluation);
    tracing::debug!(elapsed = ?start.elapsed(), "evaluated expression");

    match result {
        Ok(collection) => Ok(CommandOutput::ok(render_collection(
            context.output_format,
            expression,
            &collection,
        )?)),
        Err(error) => Ok(CommandOutput::failed(format!("error: {error}"))),
    }
}
