//! Flattens a CEDAR template instance into plain JSON.
//!
//! Root provenance members are dropped, `{"@value": ..}` wrappers are
//! unwrapped (with XSD numeric and boolean conversion), `@id` becomes `iri`
//! and `rdfs:label` becomes `label`.

use serde_json::{Map, Number, Value};

/// Root members that describe the instance rather than its content.
const ROOT_METADATA: &[&str] = &[
    "@context",
    "schema:isBasedOn",
    "schema:name",
    "schema:description",
    "pav:createdOn",
    "pav:createdBy",
    "pav:derivedFrom",
    "oslc:modifiedBy",
    "@id",
];

const ELEMENT_INSTANCE_PREFIX: &str = "https://repo.metadatacenter.org/template-element-instances/";

/// Cleans a raw instance document.
pub fn clean_template_instance_response(raw: &Value) -> Value {
    match raw {
        Value::Object(root) => {
            let content: Map<String, Value> = root
                .iter()
                .filter(|(key, _)| !ROOT_METADATA.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            transform_object(&content)
        }
        other => transform(other),
    }
}

fn transform(value: &Value) -> Value {
    match value {
        Value::Object(object) => transform_object(object),
        Value::Array(items) => Value::Array(items.iter().map(transform).collect()),
        scalar => scalar.clone(),
    }
}

fn transform_object(object: &Map<String, Value>) -> Value {
    if let Some(flat) = flatten_value(object) {
        return flat;
    }

    let has_value = object.contains_key("@value");
    let mut out = Map::with_capacity(object.len());
    for (key, value) in object {
        match key.as_str() {
            "@context" => continue,
            "@type" | "@value" if has_value => continue,
            "@id" if is_element_instance_id(value) => continue,
            _ => {}
        }
        out.insert(rename_key(key).to_string(), transform(value));
    }
    Value::Object(out)
}

/// Unwraps `{"@value": v}` and `{"@value": v, "@type": t}`.
///
/// Objects carrying anything else next to `@value` are left as objects.
fn flatten_value(object: &Map<String, Value>) -> Option<Value> {
    let value = object.get("@value")?;
    match (object.len(), object.get("@type")) {
        (1, _) => Some(value.clone()),
        (2, Some(xsd_type)) => Some(convert_xsd(value, xsd_type.as_str().unwrap_or_default())),
        _ => None,
    }
}

/// Converts a literal according to its XSD type; the original is kept when
/// conversion fails.
fn convert_xsd(value: &Value, xsd_type: &str) -> Value {
    let converted = match xsd_type {
        "xsd:decimal" | "xsd:float" | "xsd:double" => to_float(value),
        "xsd:int" | "xsd:integer" | "xsd:long" | "xsd:short" | "xsd:byte" => to_integer(value),
        "xsd:boolean" => Some(Value::Bool(to_bool(value))),
        _ => None,
    };
    converted.unwrap_or_else(|| value.clone())
}

fn to_float(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    Number::from_f64(parsed).map(Value::Number)
}

fn to_integer(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => n.as_f64().filter(|f| f.is_finite())?.trunc() as i64,
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        Value::Bool(b) => i64::from(*b),
        _ => return None,
    };
    Some(Value::from(parsed))
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1"),
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(members) => !members.is_empty(),
        Value::Null => false,
    }
}

fn rename_key(key: &str) -> &str {
    match key {
        "@id" => "iri",
        "rdfs:label" => "label",
        other => other,
    }
}

fn is_element_instance_id(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|id| id.contains(ELEMENT_INSTANCE_PREFIX))
}
