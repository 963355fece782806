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

//! Constraint selection for removals and replacements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::constraint::{Constraint, Location};

type MatchFn = Arc<dyn Fn(&Constraint) -> bool + Send + Sync>;

/// Selects constraints by id, location and source, or by a closure
///
/// Every criterion that is set must hold. A predicate with no criterion
/// matches nothing, so an empty removal never wipes a list.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintPredicate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip)]
    custom: Option<MatchFn>,
}

impl ConstraintPredicate {
    /// Match constraints with this id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::default().and_id(id)
    }

    /// Match constraints evaluated at this location
    pub fn by_location(location: Location) -> Self {
        Self::default().and_location(location)
    }

    /// Match constraints from this source
    pub fn by_source(source: impl Into<String>) -> Self {
        Self::default().and_source(source)
    }

    /// Match constraints accepted by `matcher`
    pub fn custom(matcher: impl Fn(&Constraint) -> bool + Send + Sync + 'static) -> Self {
        Self {
            custom: Some(Arc::new(matcher)),
            ..Self::default()
        }
    }

    /// Also require this id
    pub fn and_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Also require this location
    pub fn and_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Also require this source
    pub fn and_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    fn is_unconstrained(&self) -> bool {
        self.id.is_none() && self.location.is_none() && self.source.is_none() && self.custom.is_none()
    }

    /// Whether `constraint` is selected
    pub fn matches(&self, constraint: &Constraint) -> bool {
        if self.is_unconstrained() {
            return false;
        }
        self.id.as_ref().is_none_or(|id| *id == constraint.id)
            && self
                .location
                .as_ref()
                .is_none_or(|location| *location == constraint.location)
            && self
                .source
                .as_ref()
                .is_none_or(|source| constraint.source.as_ref() == Some(source))
            && self.custom.as_ref().is_none_or(|matcher| matcher(constraint))
    }
}

impl fmt::Debug for ConstraintPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("ConstraintPredicate");
        if let Some(id) = &self.id {
            debug.field("id", id);
        }
        if let Some(location) = &self.location {
            debug.field("location", location);
        }
        if let Some(source) = &self.source {
            debug.field("source", source);
        }
        if self.custom.is_some() {
            debug.field("custom", &"<closure>");
        }
        debug.finish()
    }
}
