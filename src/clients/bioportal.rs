//! BioPortal REST client: term search, branch children and class trees.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use crate::cache::{normalize_text, SearchParams};
use crate::clients::http::{get_json, RetryPolicy};
use crate::error::ApiResult;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields requested for every search hit.
const SEARCH_INCLUDE: &str = "prefLabel,synonym,definition";

// == BioPortal Client ==
pub struct BioPortalClient {
    http: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl fmt::Debug for BioPortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BioPortalClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl BioPortalClient {
    /// Creates a client for the BioPortal API rooted at `base_url`.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the 429 backoff policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    // == Term Search ==
    /// Searches an ontology, optionally restricted to the subtree under
    /// `params.branch`. Returns the raw BioPortal page.
    pub async fn search_terms(&self, params: &SearchParams) -> ApiResult<Value> {
        let mut query: Vec<(&str, String)> = vec![
            ("q", normalize_text(&params.query)),
            ("ontologies", params.ontology.trim().to_string()),
            ("page", params.page.to_string()),
            ("pagesize", params.page_size.to_string()),
            ("include", SEARCH_INCLUDE.to_string()),
            ("display_context", "false".to_string()),
            ("display_links", "false".to_string()),
        ];
        if let Some(branch) = &params.branch {
            query.push(("subtree_root_id", branch.trim().to_string()));
        }

        debug!(ontology = %params.ontology, branch = ?params.branch, "BioPortal term search");
        let request = self.get(format!("{}/search", self.base_url)).query(&query);
        get_json(request, &self.retry).await
    }

    // == Branch Children ==
    /// Immediate children of `branch_iri`, with their preferred labels.
    pub async fn branch_children(&self, ontology: &str, branch_iri: &str) -> ApiResult<Value> {
        let url = self.class_url(ontology, branch_iri, "children");
        debug!(url = %url, "BioPortal branch children");

        let request = self.get(url).query(&[
            ("display_context", "false"),
            ("display_links", "false"),
            ("include_views", "false"),
            ("pagesize", "999"),
            ("include", "prefLabel"),
        ]);
        get_json(request, &self.retry).await
    }

    // == Class Tree ==
    /// The hierarchy from the ontology roots down to `class_iri`.
    pub async fn class_tree(&self, ontology: &str, class_iri: &str) -> ApiResult<Value> {
        let url = self.class_url(ontology, class_iri, "tree");
        debug!(url = %url, "BioPortal class tree");

        let request = self.get(url).query(&[
            ("display_context", "false"),
            ("display_links", "false"),
            ("include", "prefLabel"),
        ]);
        get_json(request, &self.retry).await
    }

    fn class_url(&self, ontology: &str, iri: &str, suffix: &str) -> String {
        format!(
            "{}/ontologies/{}/classes/{}/{}",
            self.base_url,
            urlencoding::encode(ontology.trim()),
            urlencoding::encode(iri.trim()),
            suffix
        )
    }

    fn get(&self, url: String) -> RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("apiKey token={}", self.api_key))
    }
}
