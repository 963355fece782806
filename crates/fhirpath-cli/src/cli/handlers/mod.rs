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

//! Command handlers
//!
//! Each handler returns the text to print and whether the command
//! succeeded; `main` owns stdout and the exit code.

pub mod check;
pub mod evaluate;
pub mod functions;
pub mod validate;

pub use check::handle_check;
pub use evaluate::handle_evaluate;
pub use functions::handle_functions;
pub use validate::handle_validate;

/// Printed output and outcome of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text for stdout
    pub text: String,
    /// Whether the process should exit with success
    pub success: bool,
}

impl CommandOutput {
    /// Successful output
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    /// Failed output
    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}
