//! PostgREST-compatible HTTP store
//!
//! Predicates become query-string filters (`col=eq.v`, `col=gte.ts`,
//! `col=in.("a","b")`), so filtering happens server-side.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::Value;

use super::{Collection, Predicate, Query, ReportStore};
use crate::types::{ReportError, Result};

/// Default HTTP request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.table())
    }

    /// Translate a query into PostgREST query-string parameters
    pub fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for predicate in query.predicates() {
            let value = match predicate {
                Predicate::Eq(_, v) => format!("eq.{}", v),
                Predicate::Gte(_, ts) => {
                    format!("gte.{}", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                Predicate::Lte(_, ts) => {
                    format!("lte.{}", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
                }
                Predicate::In(_, values) => {
                    let quoted: Vec<String> = values
                        .iter()
                        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
                        .collect();
                    format!("in.({})", quoted.join(","))
                }
            };
            params.push((predicate.column().to_string(), value));
        }
        params
    }
}

#[async_trait]
impl ReportStore for RestStore {
    fn name(&self) -> &str {
        &self.base_url
    }

    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Value>> {
        let mut request = self
            .client
            .get(self.endpoint(collection))
            .query(&Self::query_params(query));
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Store(format!(
                "{} returned {}: {}",
                collection,
                status,
                body.trim()
            )));
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }
}
