//! CEDAR resource-server client: templates, instance search and instances.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::clients::http::{get_json, RetryPolicy};
use crate::error::{ApiError, ApiResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// == Pagination ==
/// Paging metadata for one page of template instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total_count: u64,
    pub limit: u32,
    pub offset: u64,
    pub current_page: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    /// Derives the page numbers for a window of `limit` items at `offset`.
    pub fn new(total_count: u64, limit: u32, offset: u64) -> Self {
        let per_page = u64::from(limit.max(1));
        Self {
            total_count,
            limit,
            offset,
            current_page: offset / per_page + 1,
            total_pages: total_count.div_ceil(per_page),
            has_next: offset + per_page < total_count,
            has_previous: offset > 0,
        }
    }
}

/// Instance identifiers found by one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePage {
    pub instance_ids: Vec<String>,
    pub pagination: Pagination,
}

// == CEDAR Client ==
pub struct CedarClient {
    http: Client,
    resource_url: String,
    repo_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl fmt::Debug for CedarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CedarClient")
            .field("resource_url", &self.resource_url)
            .field("repo_url", &self.repo_url)
            .finish_non_exhaustive()
    }
}

impl CedarClient {
    /// Creates a client for the resource server at `resource_url`.
    ///
    /// `repo_url` is the prefix used to expand bare template UUIDs.
    pub fn new(resource_url: &str, repo_url: &str, api_key: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            resource_url: resource_url.trim_end_matches('/').to_string(),
            repo_url: repo_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Expands a bare template UUID to its full repository IRI.
    pub fn template_iri(&self, template_id: &str) -> String {
        let id = template_id.trim();
        if id.starts_with("https://") || id.starts_with("http://") {
            id.to_string()
        } else {
            format!("{}/templates/{}", self.repo_url, id)
        }
    }

    // == Templates ==
    /// Fetches the raw JSON-LD of a template.
    pub async fn get_template(&self, template_id: &str) -> ApiResult<Value> {
        let iri = self.template_iri(template_id);
        let url = format!("{}/templates/{}", self.resource_url, urlencoding::encode(&iri));
        debug!(template = %iri, "Fetching CEDAR template");
        get_json(self.get(url), &self.retry).await
    }

    // == Instance Search ==
    /// Finds one page of instances based on `template_id`.
    pub async fn search_instance_ids(
        &self,
        template_id: &str,
        limit: u32,
        offset: u64,
    ) -> ApiResult<InstancePage> {
        let iri = self.template_iri(template_id);
        let request = self.get(format!("{}/search", self.resource_url)).query(&[
            ("version", "latest".to_string()),
            ("is_based_on", iri.clone()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);

        debug!(template = %iri, limit, offset, "Searching CEDAR instances");
        let body = get_json(request, &self.retry).await?;
        parse_instance_page(&body, limit, offset)
    }

    // == Instances ==
    /// Fetches the raw JSON-LD of a template instance.
    pub async fn get_instance(&self, instance_id: &str) -> ApiResult<Value> {
        let url = format!(
            "{}/template-instances/{}",
            self.resource_url,
            urlencoding::encode(instance_id.trim())
        );
        get_json(self.get(url), &self.retry).await
    }

    fn get(&self, url: String) -> RequestBuilder {
        self.http
            .get(url)
            .header("Accept", "application/json")
            .header("Authorization", format!("apiKey {}", self.api_key))
    }
}

fn parse_instance_page(body: &Value, limit: u32, offset: u64) -> ApiResult<InstancePage> {
    let total_count = body
        .get("totalCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let resources = match body.get("resources") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(ApiError::Decode("`resources` is not an array".to_string())),
    };

    let instance_ids = resources
        .iter()
        .filter_map(|resource| resource.get("@id").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    Ok(InstancePage {
        instance_ids,
        pagination: Pagination::new(total_count, limit, offset),
    })
}
