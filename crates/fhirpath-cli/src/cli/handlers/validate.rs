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

//! Handler for the validate command

use octofhir_fhirpath_validator::ValidationOutcome;
use std::path::{Path, PathBuf};

use super::CommandOutput;
use crate::cli::context::CliContext;
use crate::cli::output::render_issues;

/// Validate the resource read from `input`
///
/// Fails when any error-level issue is found. Constraint faults are
/// returned as `Err`, since they point at the constraint sets rather than
/// the data.
pub fn handle_validate(
    input: Option<&Path>,
    constraints: &[PathBuf],
    fail_fast: bool,
    context: &CliContext,
) -> anyhow::Result<CommandOutput> {
    let resource = context.load_resource(input)?;
    let engine = context.engine(constraints, fail_fast)?;

    let issues = engine.validate(&resource)?;
    tracing::info!(
        resource = resource.type_name(),
        errors = issues.error_count(),
        warnings = issues.warning_count(),
        "validation complete"
    );

    let text = render_issues(context.output_format, &issues)?;
    Ok(if issues.has_errors() {
        CommandOutput::failed(text)
    } else {
        CommandOutput::ok(text)
    })
}
