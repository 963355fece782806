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

use octofhir_fhirpath_validator::{ValidationEngine, ValidationError, bootstrap};

#[test]
fn engine_installs_once() {
    assert!(matches!(bootstrap::engine(), Err(ValidationError::NotInstalled)));
    assert!(!bootstrap::is_installed());

    bootstrap::install(ValidationEngine::builder().build()).expect("first install succeeds");
    assert!(bootstrap::is_installed());
    assert!(bootstrap::engine().is_ok());

    assert!(matches!(
        bootstrap::install(ValidationEngine::builder().build()),
        Err(ValidationError::AlreadyInstalled)
    ));
}
