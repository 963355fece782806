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

//! Handler for the check command

use octofhir_fhirpath_parser::ParseCache;
use serde_json::json;

use super::CommandOutput;
use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

/// Parse `expression` without evaluating it
pub fn handle_check(expression: &str, context: &CliContext) -> anyhow::Result<CommandOutput> {
    let parsed = ParseCache::new().get_or_parse(expression);
    let output = match (&parsed, context.output_format) {
        (_, OutputFormat::Json) => serde_json::to_string_pretty(&json!({
            "expression": expression,
            "valid": parsed.is_ok(),
            "error": parsed.as_ref().err().map(ToString::to_string),
        }))?,
        (Ok(_), _) => format!("ok: {expression}"),
        (Err(error), _) => format!("error: {error}"),
    };
    Ok(if parsed.is_ok() {
        CommandOutput::ok(output)
    } else {
        CommandOutput::failed(output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::CliConfig;

    #[test]
    fn reports_syntax_errors() -> anyhow::Result<()> {
        let context = CliContext::new(CliConfig::default(), None);
        assert!(handle_check("name.where(given = 'Ann')", &context)?.success);

        let failed = handle_check("name.where(", &context)?;
        assert!(!failed.success);
        assert!(failed.text.starts_with("error: "));
        Ok(())
    }
}
