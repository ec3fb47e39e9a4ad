//! Reduces a CEDAR template JSON-LD document to a [`SimplifiedTemplate`].

use serde_json::{Map, Value};

use crate::models::template::{
    ClassOption, ControlledTermDefault, Datatype, DefaultValue, ElementDefinition,
    FieldDefinition, SimplifiedTemplate, TemplateNode, ValueConstraint,
};

const TEMPLATE_FIELD: &str = "https://schema.metadatacenter.org/core/TemplateField";
const TEMPLATE_ELEMENT: &str = "https://schema.metadatacenter.org/core/TemplateElement";

const UNNAMED_TEMPLATE: &str = "Unnamed Template";

/// Simplifies a raw template, keeping its children in UI order.
pub fn clean_template_response(raw: &Value) -> SimplifiedTemplate {
    let children = raw.as_object().map(ordered_children).unwrap_or_default();
    SimplifiedTemplate::new(template_name(raw), children)
}

fn template_name(raw: &Value) -> String {
    if let Some(name) = str_member(raw, "schema:name").filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    let title = str_member(raw, "title").unwrap_or_default();
    let stripped = title
        .replace(" template schema", "")
        .replace("template schema", "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        UNNAMED_TEMPLATE.to_string()
    } else {
        stripped.to_string()
    }
}

/// Children named in `_ui.order`, classified by `@type`. Arrays are
/// classified by the `@type` of their `items`.
fn ordered_children(container: &Map<String, Value>) -> Vec<TemplateNode> {
    let Some(properties) = container.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    ui_order(container)
        .filter_map(|name| {
            let child = properties.get(name)?.as_object()?;
            transform_child(name, child)
        })
        .collect()
}

fn transform_child(name: &str, child: &Map<String, Value>) -> Option<TemplateNode> {
    let kind = match type_of(child) {
        Some(kind) => kind,
        None if is_array(child) => child.get("items").and_then(Value::as_object).and_then(type_of)?,
        None => return None,
    };

    match kind {
        TEMPLATE_FIELD => Some(TemplateNode::Field(transform_field(name, child))),
        TEMPLATE_ELEMENT => Some(TemplateNode::Element(transform_element(name, child))),
        _ => None,
    }
}

// == Fields ==
fn transform_field(name: &str, raw: &Map<String, Value>) -> FieldDefinition {
    let multivalued = is_array(raw);
    let data = item_data(raw);
    let constraints = data.get("_valueConstraints");

    let header = Header::read(name, data);
    FieldDefinition {
        name: header.name,
        description: header.description,
        label: header.label,
        datatype: datatype(data),
        required: header.required,
        multivalued,
        pattern: constraints
            .and_then(|c| c.get("regex"))
            .and_then(Value::as_str)
            .map(str::to_string),
        default_value: constraints.and_then(default_value),
        permissible_values: constraints.and_then(permissible_values),
    }
}

fn datatype(data: &Map<String, Value>) -> Datatype {
    let declared = data
        .get("properties")
        .and_then(|p| p.get("@value"))
        .and_then(|v| v.get("type"));

    let names: Vec<&str> = match declared {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    if names.contains(&"number") {
        Datatype::Decimal
    } else if names.contains(&"integer") {
        Datatype::Integer
    } else if names.contains(&"boolean") {
        Datatype::Boolean
    } else {
        Datatype::String
    }
}

fn default_value(constraints: &Value) -> Option<DefaultValue> {
    match constraints.get("defaultValue") {
        Some(Value::Object(term)) => {
            if let (Some(label), Some(iri)) = (
                term.get("rdfs:label").and_then(Value::as_str),
                term.get("termUri").and_then(Value::as_str),
            ) {
                return Some(DefaultValue::Term(ControlledTermDefault {
                    label: label.to_string(),
                    iri: iri.to_string(),
                }));
            }
        }
        Some(Value::Null) | None => {}
        Some(scalar) => return Some(DefaultValue::Scalar(scalar.clone())),
    }

    array_member(constraints, "branches").find_map(|branch| {
        Some(DefaultValue::Term(ControlledTermDefault {
            label: branch.get("name")?.as_str()?.to_string(),
            iri: branch.get("uri")?.as_str()?.to_string(),
        }))
    })
}

fn permissible_values(constraints: &Value) -> Option<Vec<ValueConstraint>> {
    let mut result = Vec::new();

    let literals = collect_str(constraints, "literals", "label");
    if !literals.is_empty() {
        result.push(ValueConstraint::Literal { options: literals });
    }

    let acronyms = collect_str(constraints, "ontologies", "acronym");
    if !acronyms.is_empty() {
        result.push(ValueConstraint::Ontology { ontology_acronyms: acronyms });
    }

    // Value sets are searched the same way as ontologies.
    let value_sets = collect_str(constraints, "valueSets", "name");
    if !value_sets.is_empty() {
        result.push(ValueConstraint::Ontology { ontology_acronyms: value_sets });
    }

    let classes: Vec<ClassOption> = array_member(constraints, "classes")
        .filter_map(|class| {
            Some(ClassOption {
                label: class.get("prefLabel")?.as_str()?.to_string(),
                term_iri: class.get("@id")?.as_str()?.to_string(),
            })
        })
        .collect();
    if !classes.is_empty() {
        result.push(ValueConstraint::Class { options: classes });
    }

    result.extend(array_member(constraints, "branches").filter_map(|branch| {
        Some(ValueConstraint::Branch {
            ontology_acronym: branch.get("acronym")?.as_str()?.to_string(),
            branch_iri: branch.get("uri")?.as_str()?.to_string(),
        })
    }));

    (!result.is_empty()).then_some(result)
}

// == Elements ==
fn transform_element(name: &str, raw: &Map<String, Value>) -> ElementDefinition {
    let data = item_data(raw);
    let header = Header::read(name, data);

    ElementDefinition {
        name: header.name,
        description: header.description,
        label: header.label,
        datatype: Datatype::Element,
        required: header.required,
        multivalued: is_array(raw),
        children: ordered_children(data),
    }
}

// == Helpers ==
/// Members shared by fields and elements.
struct Header {
    name: String,
    description: String,
    label: String,
    required: bool,
}

impl Header {
    fn read(fallback_name: &str, data: &Map<String, Value>) -> Self {
        let name = data
            .get("schema:name")
            .and_then(Value::as_str)
            .unwrap_or(fallback_name)
            .to_string();
        let label = data
            .get("skos:prefLabel")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name.clone());

        Self {
            description: data
                .get("schema:description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: data
                .get("_valueConstraints")
                .and_then(|c| c.get("requiredValue"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            name,
            label,
        }
    }
}

fn ui_order(container: &Map<String, Value>) -> impl Iterator<Item = &str> {
    container
        .get("_ui")
        .and_then(|ui| ui.get("order"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn type_of(data: &Map<String, Value>) -> Option<&str> {
    match data.get("@type")?.as_str()? {
        kind @ (TEMPLATE_FIELD | TEMPLATE_ELEMENT) => Some(kind),
        _ => None,
    }
}

fn is_array(data: &Map<String, Value>) -> bool {
    data.get("type").and_then(Value::as_str) == Some("array") && data.contains_key("items")
}

/// The item schema of an array, or the node itself.
fn item_data(raw: &Map<String, Value>) -> &Map<String, Value> {
    if is_array(raw) {
        if let Some(items) = raw.get("items").and_then(Value::as_object) {
            return items;
        }
    }
    raw
}

fn str_member<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(Value::as_str)
}

fn array_member<'a>(value: &'a Value, name: &str) -> impl Iterator<Item = &'a Value> {
    value.get(name).and_then(Value::as_array).into_iter().flatten()
}

fn collect_str(constraints: &Value, list: &str, member: &str) -> Vec<String> {
    array_member(constraints, list)
        .filter_map(|item| item.get(member).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}
