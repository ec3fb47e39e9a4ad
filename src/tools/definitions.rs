//! Tool catalogue advertised through `tools/list`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::requests::{
    DEFAULT_INSTANCE_LIMIT, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_INSTANCE_LIMIT, MAX_PAGE_SIZE,
};

pub const GET_TEMPLATE: &str = "get_template";
pub const GET_INSTANCES_BASED_ON_TEMPLATE: &str = "get_instances_based_on_template";
pub const TERM_SEARCH_FROM_BRANCH: &str = "term_search_from_branch";
pub const TERM_SEARCH_FROM_ONTOLOGY: &str = "term_search_from_ontology";
pub const GET_BRANCH_CHILDREN: &str = "get_branch_children";
pub const GET_CLASS_TREE: &str = "get_class_tree";
pub const REMOVE_STALE_CACHE_ENTRIES: &str = "remove_stale_cache_entries";
pub const CLEAR_CACHE: &str = "clear_cache";

/// A tool as described to MCP clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn string_arg(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn paging_args() -> (Value, Value) {
    (
        json!({
            "type": "integer",
            "minimum": 1,
            "default": DEFAULT_PAGE,
            "description": "1-based result page"
        }),
        json!({
            "type": "integer",
            "minimum": 1,
            "maximum": MAX_PAGE_SIZE,
            "default": DEFAULT_PAGE_SIZE,
            "description": "Results per page"
        }),
    )
}

/// Every tool this server exposes, in listing order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let (page, page_size) = paging_args();

    vec![
        ToolDefinition {
            name: GET_TEMPLATE,
            description: "Get a template from the CEDAR repository, simplified to its fields \
                          and elements in display order.",
            input_schema: schema(
                json!({
                    "template_id": string_arg("Template UUID or full repository IRI")
                }),
                &["template_id"],
            ),
        },
        ToolDefinition {
            name: GET_INSTANCES_BASED_ON_TEMPLATE,
            description: "Get one page of template instances based on a CEDAR template, \
                          cleaned of JSON-LD metadata.",
            input_schema: schema(
                json!({
                    "template_id": string_arg("Template UUID or full repository IRI"),
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_INSTANCE_LIMIT,
                        "default": DEFAULT_INSTANCE_LIMIT
                    },
                    "offset": {"type": "integer", "minimum": 0, "default": 0}
                }),
                &["template_id"],
            ),
        },
        ToolDefinition {
            name: TERM_SEARCH_FROM_BRANCH,
            description: "Search BioPortal for ontology terms within one branch of an ontology.",
            input_schema: schema(
                json!({
                    "search_string": string_arg("Term label or keyword, e.g. aspirin"),
                    "ontology_acronym": string_arg("Ontology acronym, e.g. CHEBI"),
                    "branch_iri": string_arg("IRI of the branch root"),
                    "page": page.clone(),
                    "page_size": page_size.clone()
                }),
                &["search_string", "ontology_acronym", "branch_iri"],
            ),
        },
        ToolDefinition {
            name: TERM_SEARCH_FROM_ONTOLOGY,
            description: "Search BioPortal for ontology terms across an entire ontology.",
            input_schema: schema(
                json!({
                    "search_string": string_arg("Term label or keyword, e.g. melanoma"),
                    "ontology_acronym": string_arg("Ontology acronym, e.g. NCIT"),
                    "page": page,
                    "page_size": page_size
                }),
                &["search_string", "ontology_acronym"],
            ),
        },
        ToolDefinition {
            name: GET_BRANCH_CHILDREN,
            description: "Fetch the immediate children of a branch in a BioPortal ontology.",
            input_schema: schema(
                json!({
                    "branch_iri": string_arg("IRI of the branch"),
                    "ontology_acronym": string_arg("Ontology acronym, e.g. HRAVS")
                }),
                &["branch_iri", "ontology_acronym"],
            ),
        },
        ToolDefinition {
            name: GET_CLASS_TREE,
            description: "Fetch the hierarchy from the ontology roots down to a class.",
            input_schema: schema(
                json!({
                    "class_iri": string_arg("IRI of the class"),
                    "ontology_acronym": string_arg("Ontology acronym, e.g. DOID")
                }),
                &["class_iri", "ontology_acronym"],
            ),
        },
        ToolDefinition {
            name: REMOVE_STALE_CACHE_ENTRIES,
            description: "Remove expired entries from the ontology search cache.",
            input_schema: schema(json!({}), &[]),
        },
        ToolDefinition {
            name: CLEAR_CACHE,
            description: "Remove every entry from the ontology search cache.",
            input_schema: schema(json!({}), &[]),
        },
    ]
}
