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

//! Build node trees from decoded FHIR JSON
//!
//! Objects with a `resourceType` become resource nodes, other objects become
//! elements and scalars become primitives. Element types come from
//! [`TypeHints`]; choice fields (`valueQuantity`, `effectiveDateTime`) take
//! their type from the suffix. Fields that start with `_` (primitive
//! extensions) are skipped.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::Decimal;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ModelError, Result};
use crate::node::{NodeId, NodeTree, NodeTreeBuilder};
use crate::temporal::{PrecisionDate, PrecisionDateTime, PrecisionTime};
use crate::value::PrimitiveValue;

/// FHIR primitive type names, as they appear as choice suffixes (`valueDateTime`)
const PRIMITIVE_TYPES: &[&str] = &[
    "base64Binary",
    "boolean",
    "canonical",
    "code",
    "date",
    "dateTime",
    "decimal",
    "id",
    "instant",
    "integer",
    "markdown",
    "oid",
    "positiveInt",
    "string",
    "time",
    "unsignedInt",
    "uri",
    "url",
    "uuid",
];

/// Declared types of fields, keyed by `(owner type, field name)`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeHints {
    #[serde(default)]
    fields: FxHashMap<String, FxHashMap<String, String>>,
    #[serde(default)]
    choice_prefixes: FxHashSet<String>,
}

impl TypeHints {
    /// Hints with no field types and no choice prefixes
    pub fn new() -> Self {
        Self::default()
    }

    /// Hints covering the common data types used across core resources
    pub fn fhir_core() -> Self {
        let mut hints = Self::new();
        for prefix in [
            "value",
            "effective",
            "onset",
            "abatement",
            "deceased",
            "multipleBirth",
            "occurrence",
            "performed",
            "born",
            "timing",
        ] {
            hints = hints.with_choice_prefix(prefix);
        }

        const ANY: &str = "*";
        let common = [
            ("meta", "Meta"),
            ("text", "Narrative"),
            ("extension", "Extension"),
            ("modifierExtension", "Extension"),
            ("identifier", "Identifier"),
            ("name", "HumanName"),
            ("telecom", "ContactPoint"),
            ("address", "Address"),
            ("period", "Period"),
            ("code", "CodeableConcept"),
            ("coding", "Coding"),
            ("category", "CodeableConcept"),
            ("subject", "Reference"),
            ("patient", "Reference"),
            ("performer", "Reference"),
            ("managingOrganization", "Reference"),
            ("generalPractitioner", "Reference"),
            ("contact", "BackboneElement"),
            ("communication", "BackboneElement"),
            ("link", "BackboneElement"),
            ("component", "BackboneElement"),
            ("referenceRange", "BackboneElement"),
            ("interpretation", "CodeableConcept"),
            ("maritalStatus", "CodeableConcept"),
            ("photo", "Attachment"),
            ("low", "Quantity"),
            ("high", "Quantity"),
            ("issued", "instant"),
            ("birthDate", "date"),
            ("gender", "code"),
            ("status", "code"),
            ("id", "id"),
            ("url", "uri"),
            ("system", "uri"),
            ("reference", "string"),
            ("active", "boolean"),
        ];
        for (field, type_name) in common {
            hints = hints.with_field(ANY, field, type_name);
        }
        hints
            .with_field("Coding", "code", "code")
            .with_field("Quantity", "code", "code")
            .with_field("Quantity", "value", "decimal")
            .with_field("Quantity", "unit", "string")
            .with_field("Identifier", "value", "string")
            .with_field("ContactPoint", "value", "string")
            .with_field("Extension", "url", "uri")
            .with_field("Organization", "name", "string")
            .with_field("Practitioner", "name", "HumanName")
            .with_field("HumanName", "given", "string")
            .with_field("HumanName", "family", "string")
            .with_field("Period", "start", "dateTime")
            .with_field("Period", "end", "dateTime")
    }

    /// Declare the type of `owner.field`; `owner` may be `*` for any owner
    pub fn with_field(mut self, owner: &str, field: &str, type_name: &str) -> Self {
        self.fields
            .entry(owner.to_string())
            .or_default()
            .insert(field.to_string(), type_name.to_string());
        self
    }

    /// Declare a choice-type prefix (`value` for `value[x]`)
    pub fn with_choice_prefix(mut self, prefix: &str) -> Self {
        self.choice_prefixes.insert(prefix.to_string());
        self
    }

    /// Declared type of `owner.field`
    pub fn field_type(&self, owner: &str, field: &str) -> Option<&str> {
        self.fields
            .get(owner)
            .and_then(|fields| fields.get(field))
            .or_else(|| self.fields.get("*").and_then(|fields| fields.get(field)))
            .map(String::as_str)
    }

    /// Type named by the suffix of a choice field (`valueQuantity` → `Quantity`)
    pub fn choice_type(&self, field: &str) -> Option<String> {
        self.choice_prefixes.iter().find_map(|prefix| {
            let suffix = field.strip_prefix(prefix.as_str())?;
            if !suffix.starts_with(|c: char| c.is_ascii_uppercase()) {
                return None;
            }
            let mut lowered = suffix.to_string();
            lowered[..1].make_ascii_lowercase();
            if PRIMITIVE_TYPES.contains(&lowered.as_str()) {
                Some(lowered)
            } else {
                Some(suffix.to_string())
            }
        })
    }

    fn resolve(&self, owner: &str, field: &str) -> Option<String> {
        self.field_type(owner, field)
            .map(str::to_string)
            .or_else(|| self.choice_type(field))
    }
}

/// Build a node tree from a decoded resource
pub fn tree_from_json(resource: &Value, hints: &TypeHints) -> Result<Arc<NodeTree>> {
    let object = resource
        .as_object()
        .ok_or_else(|| ModelError::invalid_json("resource must be a JSON object"))?;
    let resource_type = object
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::invalid_json("missing resourceType"))?;

    let mut builder = NodeTreeBuilder::resource(resource_type);
    let root = builder.root();
    add_fields(&mut builder, root, resource_type, object, hints)?;
    let tree = builder.build();
    log::trace!("built {resource_type} tree with {} nodes", tree.len());
    Ok(tree)
}

fn add_fields(
    builder: &mut NodeTreeBuilder,
    parent: NodeId,
    owner_type: &str,
    object: &serde_json::Map<String, Value>,
    hints: &TypeHints,
) -> Result<()> {
    for (field, value) in object {
        if field == "resourceType" || field.starts_with('_') {
            continue;
        }
        let declared = hints.resolve(owner_type, field);
        match value {
            Value::Array(members) => {
                for member in members {
                    add_value(builder, parent, field, declared.as_deref(), member, true, hints)?;
                }
            }
            other => add_value(builder, parent, field, declared.as_deref(), other, false, hints)?,
        }
    }
    Ok(())
}

fn add_value(
    builder: &mut NodeTreeBuilder,
    parent: NodeId,
    field: &str,
    declared: Option<&str>,
    value: &Value,
    repeating: bool,
    hints: &TypeHints,
) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(_) => {
            log::debug!("skipping nested array in field '{field}'");
            Ok(())
        }
        Value::Object(object) => {
            if let Some(resource_type) = object.get("resourceType").and_then(Value::as_str) {
                let id = builder.resource_child(parent, field, resource_type, repeating)?;
                return add_fields(builder, id, resource_type, object, hints);
            }
            let type_name = declared.unwrap_or("Element");
            let id = if repeating {
                builder.push_element(parent, field, type_name)?
            } else {
                builder.element(parent, field, type_name)?
            };
            add_fields(builder, id, type_name, object, hints)
        }
        scalar => {
            let (type_name, primitive) = convert_scalar(scalar, declared)?;
            if repeating {
                builder.push_primitive(parent, field, &type_name, primitive)?;
            } else {
                builder.typed_primitive(parent, field, &type_name, primitive)?;
            }
            Ok(())
        }
    }
}

fn convert_scalar(value: &Value, declared: Option<&str>) -> Result<(String, PrimitiveValue)> {
    let primitive = match value {
        Value::Bool(b) => PrimitiveValue::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), declared) {
            (Some(i), Some("decimal")) => PrimitiveValue::Decimal(Decimal::from(i)),
            (Some(i), _) => PrimitiveValue::Integer(i),
            (None, _) => {
                let text = n.to_string();
                let decimal = Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .map_err(|_| ModelError::invalid_json(format!("unsupported number {text}")))?;
                PrimitiveValue::Decimal(decimal)
            }
        },
        Value::String(text) => convert_string(text, declared),
        _ => return Err(ModelError::invalid_json("expected a scalar")),
    };
    let type_name = declared
        .map(str::to_string)
        .unwrap_or_else(|| primitive.fhir_type_name().to_string());
    Ok((type_name, primitive))
}

/// Strings carry dates, times and binaries in FHIR JSON; anything that does
/// not parse as its declared type stays a string
fn convert_string(text: &str, declared: Option<&str>) -> PrimitiveValue {
    let parsed = match declared {
        Some("date") => PrecisionDate::parse(text).map(PrimitiveValue::Date),
        Some("dateTime" | "instant") => PrecisionDateTime::parse(text).map(PrimitiveValue::DateTime),
        Some("time") => PrecisionTime::parse(text).map(PrimitiveValue::Time),
        Some("base64Binary") => STANDARD
            .decode(text)
            .ok()
            .map(|bytes| PrimitiveValue::Binary(Arc::from(bytes))),
        _ => None,
    };
    parsed.unwrap_or_else(|| PrimitiveValue::string(text))
}
