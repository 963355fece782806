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

//! Validator configuration

use octofhir_fhirpath_evaluator::EvaluationConfig;

/// Configuration of a [`Validator`](crate::Validator)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Stop the traversal after the first error-level issue
    pub fail_fast_on_error_level: bool,
    /// Evaluation limits for every constraint expression
    pub evaluation: EvaluationConfig,
}

impl ValidatorConfig {
    /// Enable or disable fail-fast
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast_on_error_level = enabled;
        self
    }

    /// Replace the evaluation configuration
    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }
}
