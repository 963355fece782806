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

//! Process-wide engine
//!
//! Applications that validate from many places install one engine at
//! startup and reach it through [`engine`].

use once_cell::sync::OnceCell;

use crate::engine::ValidationEngine;
use crate::error::{Result, ValidationError};

static ENGINE: OnceCell<ValidationEngine> = OnceCell::new();

/// Install the process-wide engine; fails if one is already installed
pub fn install(engine: ValidationEngine) -> Result<&'static ValidationEngine> {
    let mut installed = false;
    let current = ENGINE.get_or_init(|| {
        installed = true;
        engine
    });
    if installed {
        tracing::info!("validation engine installed");
        Ok(current)
    } else {
        Err(ValidationError::AlreadyInstalled)
    }
}

/// The installed engine
pub fn engine() -> Result<&'static ValidationEngine> {
    ENGINE.get().ok_or(ValidationError::NotInstalled)
}

/// Whether an engine is installed
pub fn is_installed() -> bool {
    ENGINE.get().is_some()
}
