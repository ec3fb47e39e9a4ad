//! Tool argument DTOs
//!
//! Arguments of each tool as they arrive in `tools/call`. Defaults are
//! applied during deserialization; `validate` reports the first problem.

use serde::Deserialize;

use crate::cache::SearchParams;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

pub const DEFAULT_INSTANCE_LIMIT: i64 = 10;
pub const MAX_INSTANCE_LIMIT: i64 = 100;

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_instance_limit() -> i64 {
    DEFAULT_INSTANCE_LIMIT
}

fn require(name: &str, value: &str) -> Option<String> {
    value
        .trim()
        .is_empty()
        .then(|| format!("`{name}` cannot be empty"))
}

fn check_paging(page: u32, page_size: u32) -> Option<String> {
    if page == 0 {
        return Some("`page` must be 1 or greater".to_string());
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Some(format!("`page_size` must be between 1 and {MAX_PAGE_SIZE}"));
    }
    None
}

/// Arguments of `get_template`.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRequest {
    /// Template UUID or full repository IRI
    pub template_id: String,
}

impl TemplateRequest {
    pub fn validate(&self) -> Option<String> {
        require("template_id", &self.template_id)
    }
}

/// Arguments of `get_instances_based_on_template`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstancesRequest {
    pub template_id: String,
    #[serde(default = "default_instance_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl InstancesRequest {
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = require("template_id", &self.template_id) {
            return Some(error);
        }
        if !(1..=MAX_INSTANCE_LIMIT).contains(&self.limit) {
            return Some(format!(
                "Invalid limit parameter. Must be between 1 and {MAX_INSTANCE_LIMIT}."
            ));
        }
        if self.offset < 0 {
            return Some("Invalid offset parameter. Must be 0 or greater.".to_string());
        }
        None
    }
}

/// Arguments of `term_search_from_branch`.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchSearchRequest {
    pub search_string: String,
    pub ontology_acronym: String,
    pub branch_iri: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl BranchSearchRequest {
    pub fn validate(&self) -> Option<String> {
        require("search_string", &self.search_string)
            .or_else(|| require("ontology_acronym", &self.ontology_acronym))
            .or_else(|| require("branch_iri", &self.branch_iri))
            .or_else(|| check_paging(self.page, self.page_size))
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            ontology: self.ontology_acronym.clone(),
            branch: Some(self.branch_iri.clone()),
            query: self.search_string.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Arguments of `term_search_from_ontology`.
#[derive(Debug, Clone, Deserialize)]
pub struct OntologySearchRequest {
    pub search_string: String,
    pub ontology_acronym: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl OntologySearchRequest {
    pub fn validate(&self) -> Option<String> {
        require("search_string", &self.search_string)
            .or_else(|| require("ontology_acronym", &self.ontology_acronym))
            .or_else(|| check_paging(self.page, self.page_size))
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            ontology: self.ontology_acronym.clone(),
            branch: None,
            query: self.search_string.clone(),
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Arguments of `get_branch_children`.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchChildrenRequest {
    pub branch_iri: String,
    pub ontology_acronym: String,
}

impl BranchChildrenRequest {
    pub fn validate(&self) -> Option<String> {
        require("branch_iri", &self.branch_iri)
            .or_else(|| require("ontology_acronym", &self.ontology_acronym))
    }
}

/// Arguments of `get_class_tree`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassTreeRequest {
    pub class_iri: String,
    pub ontology_acronym: String,
}

impl ClassTreeRequest {
    pub fn validate(&self) -> Option<String> {
        require("class_iri", &self.class_iri)
            .or_else(|| require("ontology_acronym", &self.ontology_acronym))
    }
}
