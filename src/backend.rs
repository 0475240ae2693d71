//! HTTP client for the hosted backend: REST tables and edge functions.

use crate::config::Config;
use crate::error::BackendError;
use crate::retry::{with_retry_if, RetryConfig};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Filter, ordering and paging parameters for a table request.
///
/// Rendered in the REST layer's query-string dialect, e.g.
/// `status=eq.active&order=created_at.desc&limit=20`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned columns
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn neq(mut self, column: &str, value: impl ToString) -> Self {
        self.params
            .push((column.to_string(), format!("neq.{}", value.to_string())));
        self
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.params.push((column.to_string(), "is.null".to_string()));
        self
    }

    /// Match any of `values`
    pub fn any_of<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let list = values
            .iter()
            .map(|v| list_value(v.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.params
            .push((column.to_string(), format!("in.({})", list)));
        self
    }

    /// Match rows where any of the given `(column, value)` pairs is equal
    pub fn or_eq(mut self, pairs: &[(&str, &str)]) -> Self {
        let filters = pairs
            .iter()
            .map(|(column, value)| format!("{}.eq.{}", column, list_value(value)))
            .collect::<Vec<_>>()
            .join(",");
        self.params.push(("or".to_string(), format!("({})", filters)));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{}.{}", column, direction)));
        self
    }

    /// Cap the number of rows; a later call replaces an earlier one
    pub fn limit(mut self, limit: u32) -> Self {
        self.params.retain(|(key, _)| key != "limit");
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether the query carries at least one row filter.
    ///
    /// Updates and deletes refuse to run without one.
    pub fn has_filter(&self) -> bool {
        self.params
            .iter()
            .any(|(key, _)| !matches!(key.as_str(), "select" | "order" | "limit"))
    }
}

/// Render a value inside an `in.(..)` or `or=(..)` list.
///
/// Values holding list syntax are double-quoted with `"` and `\` escaped,
/// so they cannot close the list or add filter branches.
fn list_value(value: &str) -> String {
    let reserved = |c: char| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\') || c.is_whitespace();
    if !value.is_empty() && !value.contains(reserved) {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Client for the backend's REST and edge-function surfaces.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
    retry: RetryConfig,
}

impl BackendClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
            retry: RetryConfig::backend_call(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = Self::new(&config.backend_url, &config.backend_anon_key);
        match &config.backend_access_token {
            Some(token) => client.with_access_token(token),
            None => client,
        }
    }

    /// Act on behalf of a signed-in user instead of the anonymous role
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Override the retry policy used for reads and function calls
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url, name)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Fetch all rows of `table` matching `query`.
    ///
    /// Transient failures are retried per the client's retry policy.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Vec<T>, BackendError> {
        debug!("Selecting from {} with {:?}", table, query.params());
        with_retry_if(
            &self.retry,
            &format!("Select from {}", table),
            || async {
                let response = self
                    .authorize(self.http.get(self.rest_url(table)))
                    .query(query.params())
                    .send()
                    .await?;
                parse_response(response).await
            },
            BackendError::is_retryable,
        )
        .await
    }

    /// Fetch exactly one row, failing with `NotFound` when nothing matches.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<T, BackendError> {
        // Replaces any caller limit rather than sending a second one
        let query = query.clone().limit(1);
        self.select::<T>(table, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("no matching row in {}", table)))
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<T, BackendError> {
        debug!("Inserting into {}", table);
        let response = self
            .authorize(self.http.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let rows: Vec<T> = parse_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::malformed(None, format!("insert into {} returned no row", table)))
    }

    /// Apply `patch` to every row matching `query` and return the updated rows.
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
        patch: &B,
    ) -> Result<Vec<T>, BackendError> {
        if !query.has_filter() {
            return Err(BackendError::Validation(format!(
                "refusing to update every row of {}",
                table
            )));
        }
        debug!("Updating {} with {:?}", table, query.params());
        let response = self
            .authorize(self.http.patch(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(query.params())
            .json(patch)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Delete every row matching `query`.
    pub async fn delete(&self, table: &str, query: &Query) -> Result<(), BackendError> {
        if !query.has_filter() {
            return Err(BackendError::Validation(format!(
                "refusing to delete every row of {}",
                table
            )));
        }
        debug!("Deleting from {} with {:?}", table, query.params());
        let response = self
            .authorize(self.http.delete(self.rest_url(table)))
            .query(query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_response(status.as_u16(), &body));
        }
        Ok(())
    }

    /// Invoke an edge function once with a JSON body.
    ///
    /// Callers decide on retries; see [`BackendClient::invoke_with_retry`].
    pub async fn invoke<B: Serialize, T: DeserializeOwned>(
        &self,
        function: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .authorize(self.http.post(self.function_url(function)))
            .json(body)
            .send()
            .await?;
        parse_response(response).await
    }

    /// Invoke an edge function, retrying transient failures.
    pub async fn invoke_with_retry<B: Serialize, T: DeserializeOwned>(
        &self,
        function: &str,
        body: &B,
        retry: &RetryConfig,
    ) -> Result<T, BackendError> {
        with_retry_if(
            retry,
            &format!("Function {}", function),
            || self.invoke(function, body),
            BackendError::is_retryable,
        )
        .await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(BackendError::from_response(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| BackendError::malformed(Some(status.as_u16()), e))
}
