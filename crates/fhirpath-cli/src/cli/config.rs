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

//! CLI configuration file support

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::output::OutputFormat;

/// Configuration file looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = ".fhirvalidate.toml";

/// CLI configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Default output format
    pub output_format: Option<OutputFormat>,

    /// Constraint set files loaded by `validate`
    pub constraint_files: Vec<PathBuf>,

    /// JSON type hints replacing the built-in core hints
    pub type_hints: Option<PathBuf>,

    /// Default external constants in the form "name=value"
    pub variables: Vec<String>,

    /// Stop validation at the first error-level issue
    pub fail_fast: bool,

    /// Maximum expression nesting depth
    pub max_recursion_depth: Option<usize>,
}

impl CliConfig {
    /// Load `path` when given, else `./.fhirvalidate.toml` when present, else defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::load_from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        let config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Sample configuration with comments
    pub fn sample_config() -> String {
        r#"# FHIRPath validation CLI configuration
# Place at ./.fhirvalidate.toml or pass --config <FILE>

# Default output format (pretty, json, raw)
output_format = "pretty"

# Constraint sets loaded by `validate`
constraint_files = [
    # "constraints/core.json",
]

# Type hints replacing the built-in core hints
# type_hints = "hints.json"

# Default external constants (format: name=value)
variables = [
    # "site='north'",
]

fail_fast = false
max_recursion_depth = 1000
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sample_config_parses() {
        let config: CliConfig = toml::from_str(&CliConfig::sample_config()).expect("valid TOML");
        assert_eq!(config.output_format, Some(OutputFormat::Pretty));
        assert!(config.constraint_files.is_empty());
        assert_eq!(config.max_recursion_depth, Some(1000));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: CliConfig = toml::from_str("fail_fast = true").expect("valid TOML");
        assert_eq!(
            config,
            CliConfig {
                fail_fast: true,
                ..CliConfig::default()
            }
        );
    }
}
