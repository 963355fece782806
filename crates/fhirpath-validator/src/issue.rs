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

//! Validation findings

use octofhir_fhirpath_constraint::{Constraint, Level};
use octofhir_fhirpath_registry::{SupplementalCode, SupplementalIssue, SupplementalSeverity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an [`Issue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Failed error-level constraint
    Error,
    /// Failed warning-level constraint
    Warning,
    /// Finding recorded by a function, such as a code outside a non-required binding
    Information,
}

impl From<SupplementalSeverity> for IssueSeverity {
    fn from(severity: SupplementalSeverity) -> Self {
        match severity {
            SupplementalSeverity::Error => IssueSeverity::Error,
            SupplementalSeverity::Warning => IssueSeverity::Warning,
            SupplementalSeverity::Information => IssueSeverity::Information,
        }
    }
}

impl From<Level> for IssueSeverity {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => IssueSeverity::Error,
            Level::Warning => IssueSeverity::Warning,
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSeverity::Error => f.write_str("ERROR"),
            IssueSeverity::Warning => f.write_str("WARNING"),
            IssueSeverity::Information => f.write_str("INFORMATION"),
        }
    }
}

/// Kind of an [`Issue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCode {
    /// A constraint expression evaluated to `false`
    Invariant,
    /// A code is not in the value set it is bound to
    CodeInvalid,
}

impl From<SupplementalCode> for IssueCode {
    fn from(code: SupplementalCode) -> Self {
        match code {
            SupplementalCode::CodeInvalid => IssueCode::CodeInvalid,
        }
    }
}

/// One failed constraint, or one function finding, at one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Severity, from the constraint level
    pub severity: IssueSeverity,
    /// [`IssueCode::Invariant`] for failed constraints
    pub code: IssueCode,
    /// `id: description`, or just `id` without a description
    pub text: String,
    /// Path of the node the finding is about
    pub path: String,
}

impl Issue {
    /// Issue for `constraint` failing at `path`
    pub fn invariant(constraint: &Constraint, path: impl Into<String>) -> Self {
        Self {
            severity: constraint.level.into(),
            code: IssueCode::Invariant,
            text: constraint.issue_text(),
            path: path.into(),
        }
    }

    /// Issue for a finding recorded while a constraint was evaluated
    pub fn supplemental(issue: SupplementalIssue) -> Self {
        let text = match &issue.constraint_id {
            Some(id) => format!("{id}: {}", issue.text),
            None => issue.text,
        };
        Self {
            severity: issue.severity.into(),
            code: issue.code.into(),
            text,
            path: issue.path,
        }
    }

    /// Whether this is an error-level issue
    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.text)
    }
}

/// Summaries over a list of issues
pub trait ValidationOutcome {
    /// Whether any issue is error-level
    fn has_errors(&self) -> bool;

    /// Number of error-level issues
    fn error_count(&self) -> usize;

    /// Number of warning-level issues
    fn warning_count(&self) -> usize;
}

impl ValidationOutcome for [Issue] {
    fn has_errors(&self) -> bool {
        self.iter().any(Issue::is_error)
    }

    fn error_count(&self) -> usize {
        self.iter().filter(|issue| issue.is_error()).count()
    }

    fn warning_count(&self) -> usize {
        self.iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }
}

/// Whether any of `issues` is error-level
pub fn has_errors(issues: &[Issue]) -> bool {
    issues.has_errors()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_lowercase_codes() {
        let constraint = Constraint::warning("foo-1", "family.exists()").with_description("Family required");
        let issue = Issue::invariant(&constraint, "Patient.name[0]");
        assert_eq!(
            serde_json::to_value(&issue).expect("encodes"),
            json!({
                "severity": "warning",
                "code": "invariant",
                "text": "foo-1: Family required",
                "path": "Patient.name[0]"
            })
        );
        assert_eq!(issue.to_string(), "WARNING Patient.name[0]: foo-1: Family required");
    }

    #[test]
    fn supplemental_findings_serialize_kebab_case_codes() {
        let issue = Issue::supplemental(SupplementalIssue::code_invalid(
            "Code 'x' is not in value set 'vs'",
            "Observation.code",
        ));
        assert_eq!(
            serde_json::to_value(&issue).expect("encodes"),
            json!({
                "severity": "information",
                "code": "code-invalid",
                "text": "Code 'x' is not in value set 'vs'",
                "path": "Observation.code"
            })
        );
        assert_eq!(issue.to_string(), "INFORMATION Observation.code: Code 'x' is not in value set 'vs'");
    }

    #[test]
    fn outcome_counts() {
        let error = Issue::invariant(&Constraint::error("a", "false"), "Patient");
        let warning = Issue::invariant(&Constraint::warning("b", "false"), "Patient");
        let mut finding = SupplementalIssue::code_invalid("Code 'x' is not in value set 'vs'", "Patient");
        finding.constraint_id = Some("c".to_string());
        let information = Issue::supplemental(finding);
        assert_eq!(information.text, "c: Code 'x' is not in value set 'vs'");
        let issues = vec![error, warning.clone(), warning, information];
        assert!(has_errors(&issues));
        assert_eq!(issues.error_count(), 1);
        assert_eq!(issues.warning_count(), 2);
        assert!(!issues[1..].has_errors());
    }
}
