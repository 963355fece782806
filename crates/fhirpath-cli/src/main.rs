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

//! FHIRPath evaluation and validation CLI

use clap::Parser;
use fhirvalidate_cli::cli::config::CliConfig;
use fhirvalidate_cli::cli::context::CliContext;
use fhirvalidate_cli::cli::handlers::{
    CommandOutput, handle_check, handle_evaluate, handle_functions, handle_validate,
};
use fhirvalidate_cli::cli::{Cli, Commands, init_logging};
use std::process::ExitCode;

fn run(cli: &Cli) -> anyhow::Result<CommandOutput> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let context = CliContext::new(config, cli.output_format);

    match &cli.command {
        Commands::Evaluate {
            expression,
            input,
            variables,
        } => handle_evaluate(expression, input.as_deref(), variables, &context),
        Commands::Validate {
            input,
            constraints,
            fail_fast,
        } => handle_validate(input.as_deref(), constraints, *fail_fast, &context),
        Commands::Check { expression } => handle_check(expression, &context),
        Commands::Functions => handle_functions(&context),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(output) => {
            println!("{}", output.text);
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}
