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

//! Output formatting for CLI commands

use clap::ValueEnum;
use octofhir_fhirpath_model::{Collection, Item, PrimitiveValue};
use octofhir_fhirpath_validator::{Issue, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable listing (default)
    #[default]
    Pretty,
    /// JSON for tooling
    Json,
    /// Bare values, one collection per line
    Raw,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Raw => write!(f, "raw"),
        }
    }
}

fn primitive_json(value: &PrimitiveValue) -> Value {
    match value {
        PrimitiveValue::Boolean(b) => Value::Bool(*b),
        PrimitiveValue::Integer(i) => Value::from(*i),
        other => Value::String(other.to_string()),
    }
}

fn item_json(item: &Item) -> Value {
    let mut entry = Map::new();
    entry.insert("type".into(), item.type_name().into());
    if let Some(path) = item.path() {
        entry.insert("path".into(), path.into());
    }
    if let Some(value) = item.primitive() {
        entry.insert("value".into(), primitive_json(value));
    }
    Value::Object(entry)
}

/// Render an evaluation result
pub fn render_collection(format: OutputFormat, expression: &str, result: &Collection) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Raw => result.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "expression": expression,
            "result": result.iter().map(item_json).collect::<Vec<_>>(),
        }))?,
        OutputFormat::Pretty => {
            if result.is_empty() {
                return Ok("(empty)".to_string());
            }
            result
                .iter()
                .map(|item| match item.path() {
                    Some(path) => format!("- {item} : {} @ {path}", item.type_name()),
                    None => format!("- {item} : {}", item.type_name()),
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
    })
}

/// Render validation issues
pub fn render_issues(format: OutputFormat, issues: &[Issue]) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(issues)?,
        OutputFormat::Raw => issues.iter().map(Issue::to_string).collect::<Vec<_>>().join("\n"),
        OutputFormat::Pretty => {
            let mut lines: Vec<String> = issues.iter().map(Issue::to_string).collect();
            lines.push(format!(
                "{} error(s), {} warning(s)",
                issues.error_count(),
                issues.warning_count()
            ));
            lines.join("\n")
        }
    })
}
