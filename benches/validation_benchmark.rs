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

//! Parse cache and validation throughput

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use octofhir_fhirvalidate::parser::{ParseCache, parse_expression_pratt};
use octofhir_fhirvalidate::prelude::*;
use serde_json::json;
use std::hint::black_box;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("simple", "name.family"),
    ("medium", "name.where(use = 'official').given.first()"),
    (
        "complex",
        "telecom.where(system = 'phone').exists() implies name.all(family.exists() or given.count() > 1)",
    ),
];

fn patient(names: usize) -> NodeRef {
    let names: Vec<_> = (0..names)
        .map(|i| json!({"use": if i == 0 { "official" } else { "usual" }, "family": format!("F{i}"), "given": ["A", "B"]}))
        .collect();
    let resource = json!({
        "resourceType": "Patient",
        "id": "bench",
        "active": true,
        "name": names,
        "telecom": [{"system": "phone", "value": "555"}]
    });
    let tree = tree_from_json(&resource, &TypeHints::fhir_core()).expect("valid resource");
    NodeRef::root(tree)
}

fn constraints() -> std::sync::Arc<ConstraintRegistry> {
    let mut builder = ConstraintRegistry::builder();
    builder
        .declare_type("Patient", None)
        .and_then(|b| b.declare_type("HumanName", None))
        .and_then(|b| b.base_constraint("Patient", Constraint::error("pat-1", "name.exists() or active = false")))
        .and_then(|b| b.base_constraint("Patient", Constraint::warning("foo-1", "family.exists()").at("name")))
        .and_then(|b| b.base_constraint("HumanName", Constraint::error("hn-1", "given.count() < 10")))
        .expect("valid declarations");
    builder.build().expect("valid hierarchy")
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    for (complexity, expression) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("uncached", complexity), expression, |b, expr| {
            b.iter(|| black_box(parse_expression_pratt(black_box(expr))))
        });

        let cache = ParseCache::new();
        group.bench_with_input(BenchmarkId::new("cached", complexity), expression, |b, expr| {
            b.iter(|| black_box(cache.get_or_parse(black_box(expr))))
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let engine = FhirPathEngine::new();
    let resource = patient(3);
    let context = EvaluationContext::new(Collection::single(resource), FunctionRegistry::standard());

    for (complexity, expression) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("patient", complexity), expression, |b, expr| {
            b.iter(|| black_box(engine.evaluate(black_box(expr), &context)))
        });
    }

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let engine = ValidationEngine::builder().constraints(constraints()).build();

    for names in [1, 10, 100] {
        let resource = patient(names);
        group.throughput(Throughput::Elements(names as u64));
        group.bench_with_input(BenchmarkId::new("patient_names", names), &resource, |b, resource| {
            b.iter(|| black_box(engine.validate(black_box(resource))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate, bench_validate);
criterion_main!(benches);
