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

//! Handler for the functions command

use octofhir_fhirpath_core::UNBOUNDED_ARITY;
use octofhir_fhirpath_registry::FunctionRegistry;
use serde_json::json;

use super::CommandOutput;
use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

/// List the standard library with arities
pub fn handle_functions(context: &CliContext) -> anyhow::Result<CommandOutput> {
    let registry = FunctionRegistry::standard();
    let mut names: Vec<&str> = registry.names().collect();
    names.sort_unstable();

    let entries = names.into_iter().filter_map(|name| registry.get(name));
    let text = match context.output_format {
        OutputFormat::Json => serde_json::to_string_pretty(
            &entries
                .map(|function| {
                    let signature = function.signature();
                    json!({
                        "name": function.name(),
                        "minArity": signature.min_arity,
                        "maxArity": (signature.max_arity != UNBOUNDED_ARITY).then_some(signature.max_arity),
                        "lambda": function.is_lambda(),
                    })
                })
                .collect::<Vec<_>>(),
        )?,
        OutputFormat::Raw => entries.map(|function| function.name().to_string()).collect::<Vec<_>>().join("\n"),
        OutputFormat::Pretty => entries
            .map(|function| {
                let signature = function.signature();
                let arity = match (signature.min_arity, signature.max_arity) {
                    (min, max) if min == max => format!("{min}"),
                    (min, UNBOUNDED_ARITY) => format!("{min}+"),
                    (min, max) => format!("{min}..{max}"),
                };
                format!("{:<24} args: {arity}", function.name())
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Ok(CommandOutput::ok(text))
}
