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

//! CLI module for FHIRPath evaluation and constraint validation

pub mod config;
pub mod context;
pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

#[derive(Parser, Clone, Debug)]
#[command(name = "octofhir-fhirvalidate")]
#[command(about = "Evaluate FHIRPath expressions and validate FHIR resources against invariants")]
#[command(version)]
#[command(author = "OctoFHIR Team <funyloony@gmail.com>")]
pub struct Cli {
    /// Configuration file (TOML); defaults to ./.fhirvalidate.toml when present
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', value_enum, global = true)]
    pub output_format: Option<OutputFormat>,

    /// Only log errors
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Log at debug level
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Evaluate a FHIRPath expression against a FHIR resource
    Evaluate {
        /// FHIRPath expression to evaluate
        expression: String,
        /// JSON file holding the resource; reads stdin when absent or `-`
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// External constants in the form name=value (repeatable)
        #[arg(long = "var", short = 'V')]
        variables: Vec<String>,
    },
    /// Validate a FHIR resource against constraint sets
    Validate {
        /// JSON file holding the resource; reads stdin when absent or `-`
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Constraint set files (JSON), added after those named in the config
        #[arg(short, long = "constraints")]
        constraints: Vec<PathBuf>,
        /// Stop at the first error-level issue
        #[arg(long)]
        fail_fast: bool,
    },
    /// Check the syntax of a FHIRPath expression
    Check {
        /// FHIRPath expression to check
        expression: String,
    },
    /// List the functions of the standard library
    Functions,
}

impl Cli {
    /// Log filter implied by the verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }
}

/// Install the global subscriber; `RUST_LOG` overrides the flags
///
/// Records emitted through the `log` facade are forwarded to `tracing`.
pub fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
