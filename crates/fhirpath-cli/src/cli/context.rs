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

//! Shared state for command handlers

use anyhow::{Context as _, bail};
use octofhir_fhirpath_constraint::{ConstraintRegistry, ConstraintSet};
use octofhir_fhirpath_evaluator::EvaluationConfig;
use octofhir_fhirpath_model::{Collection, NodeRef, PrimitiveValue, TypeHints, tree_from_json};
use octofhir_fhirpath_validator::{ValidationEngine, ValidatorConfig};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::config::CliConfig;
use super::output::OutputFormat;

/// Resolved settings of one CLI invocation
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Effective output format
    pub output_format: OutputFormat,
    /// Effective configuration
    pub config: CliConfig,
}

impl CliContext {
    /// Merge the configuration file with command-line overrides
    pub fn new(config: CliConfig, output_format: Option<OutputFormat>) -> Self {
        Self {
            output_format: output_format.or(config.output_format).unwrap_or_default(),
            config,
        }
    }

    /// Type hints from the configured file, or the built-in core hints
    pub fn type_hints(&self) -> anyhow::Result<TypeHints> {
        match &self.config.type_hints {
            Some(path) => {
                let text = read_file(path)?;
                serde_json::from_str(&text).with_context(|| format!("invalid type hints in {}", path.display()))
            }
            None => Ok(TypeHints::fhir_core()),
        }
    }

    /// Read and convert the resource named by `input`
    pub fn load_resource(&self, input: Option<&Path>) -> anyhow::Result<NodeRef> {
        let text = match input {
            Some(path) if path != Path::new("-") => read_file(path)?,
            _ => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text).context("cannot read stdin")?;
                text
            }
        };
        let json: Value = serde_json::from_str(&text).context("input is not valid JSON")?;
        let tree = tree_from_json(&json, &self.type_hints()?)?;
        Ok(NodeRef::root(tree))
    }

    /// Engine loaded with the configured and the extra constraint files
    pub fn engine(&self, extra_constraints: &[PathBuf], fail_fast: bool) -> anyhow::Result<ValidationEngine> {
        let mut builder = ConstraintRegistry::builder();
        for path in self.config.constraint_files.iter().chain(extra_constraints) {
            let set = ConstraintSet::from_json(&read_file(path)?)
                .with_context(|| format!("invalid constraint set {}", path.display()))?;
            tracing::debug!(path = %path.display(), types = set.types.len(), providers = set.providers.len(), "loading constraint set");
            set.apply(&mut builder)
                .with_context(|| format!("cannot register constraint set {}", path.display()))?;
        }

        let mut evaluation = EvaluationConfig::default();
        if let Some(depth) = self.config.max_recursion_depth {
            evaluation.max_recursion_depth = depth;
        }
        let config = ValidatorConfig::default()
            .with_fail_fast(fail_fast || self.config.fail_fast)
            .with_evaluation(evaluation);

        Ok(ValidationEngine::builder()
            .constraints(builder.build()?)
            .config(config)
            .build())
    }

    /// Configured variables followed by `extra`, parsed as `name=value`
    pub fn variables(&self, extra: &[String]) -> anyhow::Result<Vec<(String, Collection)>> {
        self.config
            .variables
            .iter()
            .chain(extra)
            .map(|spec| parse_variable(spec))
            .collect()
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Parse `name=value`; the value is read as JSON when it is a JSON scalar,
/// otherwise as a plain string
pub fn parse_variable(spec: &str) -> anyhow::Result<(String, Collection)> {
    let Some((name, raw)) = spec.split_once('=') else {
        bail!("variable '{spec}' is not in the form name=value");
    };
    let name = name.trim().trim_start_matches('%');
    if name.is_empty() {
        bail!("variable '{spec}' has an empty name");
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Bool(b)) => PrimitiveValue::Boolean(b),
        Ok(Value::Number(n)) if n.is_i64() => PrimitiveValue::Integer(n.as_i64().unwrap_or_default()),
        Ok(Value::String(s)) => PrimitiveValue::from(s),
        _ => PrimitiveValue::from(raw.trim_matches('\'')),
    };
    Ok((name.to_string(), Collection::single(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("flag=true", "flag", "[true]")]
    #[case("n=42", "n", "[42]")]
    #[case("%site='north'", "site", "[north]")]
    #[case("s=\"quoted\"", "s", "[quoted]")]
    #[case("x=1.5", "x", "[1.5]")]
    fn variables_parse(#[case] spec: &str, #[case] name: &str, #[case] shown: &str) {
        let (parsed, value) = parse_variable(spec).expect("parses");
        assert_eq!(parsed, name);
        assert_eq!(value.to_string(), shown);
    }

    #[rstest]
    #[case("novalue")]
    #[case("=1")]
    fn malformed_variables_fail(#[case] spec: &str) {
        assert!(parse_variable(spec).is_err());
    }

    #[test]
    fn command_line_format_wins() {
        let config = CliConfig {
            output_format: Some(OutputFormat::Json),
            ..CliConfig::default()
        };
        assert_eq!(CliContext::new(config.clone(), None).output_format, OutputFormat::Json);
        assert_eq!(
            CliContext::new(config, Some(OutputFormat::Raw)).output_format,
            OutputFormat::Raw
        );
        assert_eq!(CliContext::new(CliConfig::default(), None).output_format, OutputFormat::Pretty);
    }
}
