//! Cache Key Module
//!
//! Derives stable cache keys from the semantic parameters of a lookup.
//!
//! A key is the SHA-256 of a canonical JSON document
//! `{"operation": ..., "params": {...}}` whose parameter map is sorted by
//! name. Absent optional parameters are omitted. Every string is trimmed;
//! free text also has internal whitespace runs collapsed, matching what is
//! sent upstream. Identifiers such as IRIs keep their internal whitespace.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

// == Cache Key ==
/// Normalized fingerprint of a logical query: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives a key from a flat JSON object of scalar parameters.
    ///
    /// Nested arrays or objects and non-finite numbers are rejected rather
    /// than approximated.
    pub fn from_json(operation: &str, params: &Value) -> CacheResult<Self> {
        let object = match params {
            Value::Object(map) => map,
            Value::Null => return KeyBuilder::new(operation).build(),
            other => {
                return Err(CacheError::KeyDerivation(format!(
                    "parameters must be an object, got {}",
                    json_type_name(other)
                )))
            }
        };

        let mut builder = KeyBuilder::new(operation);
        for (name, value) in object {
            builder = builder.value(name, value)?;
        }
        builder.build()
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Key Builder ==
/// Accumulates named parameters and produces a [`CacheKey`].
///
/// Errors are deferred to [`KeyBuilder::build`] so call sites can chain.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    operation: String,
    params: BTreeMap<String, Value>,
    error: Option<String>,
}

#[derive(Serialize)]
struct Canonical<'a> {
    operation: &'a str,
    params: &'a BTreeMap<String, Value>,
}

impl KeyBuilder {
    /// Starts a key for the named operation (e.g. a tool name).
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.trim().to_string(),
            params: BTreeMap::new(),
            error: None,
        }
    }

    /// Adds a string parameter.
    pub fn str(self, name: &str, value: &str) -> Self {
        self.insert(name, Value::String(normalize_text(value)))
    }

    /// Adds an optional string parameter; `None` is omitted.
    pub fn opt_str(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.str(name, v),
            None => self.skip(name),
        }
    }

    /// Adds an identifier parameter (acronym, IRI): trimmed only.
    ///
    /// Internal whitespace reaches the upstream request unchanged, so it must
    /// also reach the key.
    pub fn ident(self, name: &str, value: &str) -> Self {
        self.insert(name, Value::String(value.trim().to_string()))
    }

    /// Adds an optional identifier parameter; `None` is omitted.
    pub fn opt_ident(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.ident(name, v),
            None => self.skip(name),
        }
    }

    /// Adds an integer parameter.
    pub fn int(self, name: &str, value: i64) -> Self {
        self.insert(name, Value::Number(Number::from(value)))
    }

    /// Adds a boolean parameter.
    pub fn bool(self, name: &str, value: bool) -> Self {
        self.insert(name, Value::Bool(value))
    }

    /// Adds a JSON scalar parameter, rejecting unsupported types.
    pub fn value(self, name: &str, value: &Value) -> CacheResult<Self> {
        match value {
            Value::Null => Ok(self.skip(name)),
            Value::Bool(b) => Ok(self.bool(name, *b)),
            Value::String(s) => Ok(self.str(name, s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(self.int(name, i))
                } else if n.as_u64().is_some() {
                    Ok(self.insert(name, Value::Number(n.clone())))
                } else {
                    // serde_json never holds NaN/inf, but integral floats
                    // must collapse onto their integer form.
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    if !f.is_finite() {
                        return Err(CacheError::KeyDerivation(format!(
                            "parameter '{name}' is not a finite number"
                        )));
                    }
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Ok(self.int(name, f as i64))
                    } else {
                        Ok(self.insert(name, Value::Number(n.clone())))
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => Err(CacheError::KeyDerivation(format!(
                "parameter '{name}' has unsupported type {}",
                json_type_name(value)
            ))),
        }
    }

    /// Produces the key, or the first error recorded while building.
    pub fn build(self) -> CacheResult<CacheKey> {
        if let Some(err) = self.error {
            return Err(CacheError::KeyDerivation(err));
        }
        if self.operation.is_empty() {
            return Err(CacheError::KeyDerivation(
                "operation name must not be empty".to_string(),
            ));
        }

        let canonical = serde_json::to_string(&Canonical {
            operation: &self.operation,
            params: &self.params,
        })
        .map_err(|e| CacheError::KeyDerivation(e.to_string()))?;

        let digest = Sha256::digest(canonical.as_bytes());
        Ok(CacheKey(format!("{:x}", digest)))
    }

    fn insert(mut self, name: &str, value: Value) -> Self {
        let name = name.trim();
        if self.error.is_some() {
            return self;
        }
        if name.is_empty() {
            self.error = Some("parameter name must not be empty".to_string());
            return self;
        }
        if self.params.insert(name.to_string(), value).is_some() {
            self.error = Some(format!("duplicate parameter '{name}'"));
        }
        self
    }

    fn skip(mut self, name: &str) -> Self {
        if self.error.is_none() && name.trim().is_empty() {
            self.error = Some("parameter name must not be empty".to_string());
        }
        self
    }
}

// == Search Parameters ==
/// Every parameter that shapes an ontology term search result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Ontology acronym, e.g. `CHEBI`
    pub ontology: String,
    /// Optional branch root IRI restricting the search
    pub branch: Option<String>,
    /// Free-text query
    pub query: String,
    /// 1-based page number
    pub page: u32,
    /// Results per page
    pub page_size: u32,
}

impl SearchParams {
    /// Derives the cache key for this search under the given operation name.
    pub fn cache_key(&self, operation: &str) -> CacheResult<CacheKey> {
        KeyBuilder::new(operation)
            .ident("ontology", &self.ontology)
            .opt_ident("branch", self.branch.as_deref())
            .str("query", &self.query)
            .int("page", i64::from(self.page))
            .int("page_size", i64::from(self.page_size))
            .build()
    }
}

/// Trims and collapses internal whitespace runs to a single space.
pub fn normalize_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
