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

//! Findings recorded by functions while an expression is evaluated

/// Severity of a [`SupplementalIssue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplementalSeverity {
    /// The data is invalid
    Error,
    /// The data is suspicious
    Warning,
    /// Informational only
    Information,
}

/// Kind of a [`SupplementalIssue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplementalCode {
    /// A code is not in the value set it is bound to
    CodeInvalid,
}

/// Finding reported by a function during evaluation
///
/// Collected on the [`EvaluationContext`](crate::EvaluationContext) and
/// handed to the caller next to the expression result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalIssue {
    /// Severity
    pub severity: SupplementalSeverity,
    /// Kind
    pub code: SupplementalCode,
    /// Human-readable text
    pub text: String,
    /// Path of the node the finding is about
    pub path: String,
    /// Constraint under evaluation when the finding was recorded
    pub constraint_id: Option<String>,
}

impl SupplementalIssue {
    /// Informational `code-invalid` finding at `path`
    pub fn code_invalid(text: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: SupplementalSeverity::Information,
            code: SupplementalCode::CodeInvalid,
            text: text.into(),
            path: path.into(),
            constraint_id: None,
        }
    }
}
