//! Tool dispatch
//!
//! Every tool takes its JSON arguments and returns a JSON payload. BioPortal
//! lookups go through the search cache; CEDAR calls do not.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::cache::{CacheKey, KeyBuilder, SearchCache};
use crate::error::{ApiResult, CacheResult, Result, ToolError};
use crate::models::{
    BranchChildrenRequest, BranchSearchRequest, ClassTreeRequest, ClearResponse, InstancesRequest,
    OntologySearchRequest, SweepResponse, TemplateRequest,
};
use crate::processing::{clean_template_instance_response, clean_template_response};
use crate::tools::definitions::*;

/// Runs the tool called `name` with `arguments`.
pub async fn call_tool(state: &AppState, name: &str, arguments: Value) -> Result<Value> {
    debug!(tool = name, "Calling tool");
    match name {
        GET_TEMPLATE => get_template(state, parse_args(arguments)?).await,
        GET_INSTANCES_BASED_ON_TEMPLATE => get_instances(state, parse_args(arguments)?).await,
        TERM_SEARCH_FROM_BRANCH => search_branch(state, parse_args(arguments)?).await,
        TERM_SEARCH_FROM_ONTOLOGY => search_ontology(state, parse_args(arguments)?).await,
        GET_BRANCH_CHILDREN => branch_children(state, parse_args(arguments)?).await,
        GET_CLASS_TREE => class_tree(state, parse_args(arguments)?).await,
        REMOVE_STALE_CACHE_ENTRIES => remove_stale_entries(&state.cache).await,
        CLEAR_CACHE => clear_cache(&state.cache).await,
        unknown => Err(ToolError::UnknownTool(unknown.to_string())),
    }
}

/// Decodes tool arguments; a missing argument object counts as empty.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn check(problem: Option<String>) -> Result<()> {
    problem.map_or(Ok(()), |msg| Err(ToolError::InvalidParams(msg)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ToolError::Internal(e.to_string()))
}

/// Serves a BioPortal lookup through the cache.
///
/// A key that cannot be derived only costs the cache, never the lookup.
async fn cached<F, Fut>(cache: &SearchCache, key: CacheResult<CacheKey>, fetch: F) -> Result<Value>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<Value>>,
{
    match key {
        Ok(key) => Ok(cache.get_or_fetch(&key, fetch).await?),
        Err(e) => {
            warn!(error = %e, "Cache key derivation failed, fetching uncached");
            Ok(fetch().await?)
        }
    }
}

// == CEDAR ==
async fn get_template(state: &AppState, req: TemplateRequest) -> Result<Value> {
    check(req.validate())?;
    let raw = state.cedar.get_template(&req.template_id).await?;
    to_json(&clean_template_response(&raw))
}

async fn get_instances(state: &AppState, req: InstancesRequest) -> Result<Value> {
    check(req.validate())?;
    // validate() bounds both values
    let limit = req.limit as u32;
    let offset = req.offset as u64;

    let page = state
        .cedar
        .search_instance_ids(&req.template_id, limit, offset)
        .await?;

    let mut instances = Vec::with_capacity(page.instance_ids.len());
    let mut errors = Vec::new();
    for instance_id in &page.instance_ids {
        match state.cedar.get_instance(instance_id).await {
            Ok(raw) => instances.push(clean_template_instance_response(&raw)),
            Err(e) => {
                warn!(instance = %instance_id, error = %e, "Failed to fetch template instance");
                errors.push(json!({"instance_id": instance_id, "error": e.to_string()}));
            }
        }
    }

    let mut response = json!({
        "instances": instances,
        "pagination": to_json(&page.pagination)?,
    });
    if !errors.is_empty() {
        response["errors"] = Value::Array(errors);
    }
    Ok(response)
}

// == BioPortal ==
async fn search_branch(state: &AppState, req: BranchSearchRequest) -> Result<Value> {
    check(req.validate())?;
    let params = req.search_params();
    let key = params.cache_key(TERM_SEARCH_FROM_BRANCH);
    cached(&state.cache, key, || state.bioportal.search_terms(&params)).await
}

async fn search_ontology(state: &AppState, req: OntologySearchRequest) -> Result<Value> {
    check(req.validate())?;
    let params = req.search_params();
    let key = params.cache_key(TERM_SEARCH_FROM_ONTOLOGY);
    cached(&state.cache, key, || state.bioportal.search_terms(&params)).await
}

async fn branch_children(state: &AppState, req: BranchChildrenRequest) -> Result<Value> {
    check(req.validate())?;
    let key = KeyBuilder::new(GET_BRANCH_CHILDREN)
        .ident("ontology", &req.ontology_acronym)
        .ident("branch", &req.branch_iri)
        .build();
    cached(&state.cache, key, || {
        state
            .bioportal
            .branch_children(&req.ontology_acronym, &req.branch_iri)
    })
    .await
}

async fn class_tree(state: &AppState, req: ClassTreeRequest) -> Result<Value> {
    check(req.validate())?;
    let key = KeyBuilder::new(GET_CLASS_TREE)
        .ident("ontology", &req.ontology_acronym)
        .ident("class", &req.class_iri)
        .build();
    cached(&state.cache, key, || {
        state.bioportal.class_tree(&req.ontology_acronym, &req.class_iri)
    })
    .await
}

// == Cache Maintenance ==
async fn remove_stale_entries(cache: &SearchCache) -> Result<Value> {
    let report = cache.sweep_expired().await?;
    to_json(&SweepResponse::from(report))
}

async fn clear_cache(cache: &SearchCache) -> Result<Value> {
    let cleared_count = cache.clear_all().await?;
    to_json(&ClearResponse { cleared_count })
}
