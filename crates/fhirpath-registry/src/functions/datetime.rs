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

//! Clock functions: `now()`, `today()`, `timeOfDay()`

use octofhir_fhirpath_core::Result;
use octofhir_fhirpath_model::{
    Collection, PrecisionDate, PrecisionDateTime, PrecisionTime, PrimitiveValue,
};

use crate::context::EvaluationContext;
use crate::function::FhirPathFunction;
use crate::registry::FunctionRegistryBuilder;
use crate::signature::FunctionSignature;

pub(crate) fn register(builder: &mut FunctionRegistryBuilder) {
    builder
        .register_function(NowFunction)
        .register_function(TodayFunction)
        .register_function(TimeOfDayFunction);
}

/// `now()`
pub struct NowFunction;

impl FhirPathFunction for NowFunction {
    static_signature!(FunctionSignature::no_args("now"));

    fn evaluate(&self, _focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::single(PrimitiveValue::DateTime(PrecisionDateTime::now())))
    }
}

/// `today()`
pub struct TodayFunction;

impl FhirPathFunction for TodayFunction {
    static_signature!(FunctionSignature::no_args("today"));

    fn evaluate(&self, _focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::single(PrimitiveValue::Date(PrecisionDate::today())))
    }
}

/// `timeOfDay()`
pub struct TimeOfDayFunction;

impl FhirPathFunction for TimeOfDayFunction {
    static_signature!(FunctionSignature::no_args("timeOfDay"));

    fn evaluate(&self, _focus: &Collection, _args: &[Collection], _context: &EvaluationContext) -> Result<Collection> {
        Ok(Collection::single(PrimitiveValue::Time(PrecisionTime::now())))
    }
}

#[cfg(test)]
mod tests {
    use crate::functions::test_support::run;
    use octofhir_fhirpath_model::{Collection, Item};

    #[test]
    fn clock_functions_produce_one_value() {
        for (expression, type_name) in [
            ("now()", "DateTime"),
            ("today()", "Date"),
            ("timeOfDay()", "Time"),
        ] {
            let result = run(Collection::empty(), expression).expect("ok");
            assert_eq!(result.singleton().map(Item::type_name), Some(type_name));
        }
    }
}
