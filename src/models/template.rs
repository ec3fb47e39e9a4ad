//! Simplified template model
//!
//! The compact shape CEDAR templates are reduced to before being handed to a
//! client. Absent optional members are omitted from the serialized output.

use serde::Serialize;
use serde_json::Value;

/// Value type of a field, or `element` for nested elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    String,
    Integer,
    Decimal,
    Boolean,
    Element,
}

/// A class a controlled field may take, with its term IRI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassOption {
    pub label: String,
    pub term_iri: String,
}

/// Where the permissible values of a controlled field come from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueConstraint {
    Literal { options: Vec<String> },
    Ontology { ontology_acronyms: Vec<String> },
    Class { options: Vec<ClassOption> },
    Branch { ontology_acronym: String, branch_iri: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlledTermDefault {
    pub label: String,
    pub iri: String,
}

/// Default value of a field: a controlled term or a plain JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Term(ControlledTermDefault),
    Scalar(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub description: String,
    pub label: String,
    #[serde(rename = "type")]
    pub datatype: Datatype,
    pub required: bool,
    pub multivalued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissible_values: Option<Vec<ValueConstraint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementDefinition {
    pub name: String,
    pub description: String,
    pub label: String,
    #[serde(rename = "type")]
    pub datatype: Datatype,
    pub required: bool,
    pub multivalued: bool,
    pub children: Vec<TemplateNode>,
}

/// A child of a template or element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateNode {
    Field(FieldDefinition),
    Element(ElementDefinition),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplifiedTemplate {
    /// Always `template`
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub children: Vec<TemplateNode>,
}

impl SimplifiedTemplate {
    pub fn new(name: impl Into<String>, children: Vec<TemplateNode>) -> Self {
        Self {
            kind: "template",
            name: name.into(),
            children,
        }
    }
}
