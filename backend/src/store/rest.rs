//! Client for the hosted data service, a PostgREST-style HTTP API.
//!
//! Filters travel as `column=op.value` query parameters, ordering as
//! `order=`, paging as `offset`/`limit`. Counts come from the
//! `Content-Range` header of a `HEAD` request sent with `Prefer: count=exact`.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{MatchFilters, MatchQuery, MatchStore};
use crate::error::{StoreError, StoreResult};
use crate::models::{League, NewMatch, RawMatchRow, Team};

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// `base_url` is the REST root the tables hang off, e.g.
    /// `https://project.supabase.co/rest/v1`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("goalscope/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn get_json<T: DeserializeOwned>(&self, table: &str, params: &[(String, String)]) -> StoreResult<T> {
        let response = self.request(Method::GET, table).query(params).send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(format!("{} rows: {}", table, e)))
    }
}

/// Query parameters for one page of `matches`.
pub fn select_params(query: &MatchQuery) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(query.filters.predicates().iter().map(|p| p.to_rest_param()));
    params.push(("order".to_string(), query.order.to_rest()));
    params.push(("offset".to_string(), query.page.offset().to_string()));
    params.push(("limit".to_string(), query.page.limit().to_string()));
    params
}

/// Same predicates as `select_params`, no order or window.
pub fn count_params(filters: &MatchFilters) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "id".to_string())];
    params.extend(filters.predicates().iter().map(|p| p.to_rest_param()));
    params
}

/// Total from a `Content-Range` value such as `0-24/318` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// PostgREST errors are JSON objects with a `message`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

#[async_trait]
impl MatchStore for RestStore {
    async fn select_matches(&self, query: &MatchQuery) -> StoreResult<Vec<RawMatchRow>> {
        let params = select_params(query);
        tracing::debug!("GET matches {:?}", params);
        self.get_json("matches", &params).await
    }

    async fn count_matches(&self, filters: &MatchFilters) -> StoreResult<u64> {
        let response = self
            .request(Method::HEAD, "matches")
            .header("Prefer", "count=exact")
            .query(&count_params(filters))
            .send()
            .await?;
        let response = check_status(response).await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Decode("count response has no Content-Range header".to_string()))?;

        parse_content_range(range)
            .ok_or_else(|| StoreError::Decode(format!("unexpected Content-Range '{}'", range)))
    }

    async fn insert_match(&self, new_match: &NewMatch) -> StoreResult<RawMatchRow> {
        let response = self
            .request(Method::POST, "matches")
            .header("Prefer", "return=representation")
            .json(new_match)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;

        let rows: Vec<RawMatchRow> =
            serde_json::from_str(&body).map_err(|e| StoreError::Decode(format!("inserted row: {}", e)))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn teams(&self) -> StoreResult<Vec<Team>> {
        let params = [
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.get_json("teams", &params).await
    }

    async fn leagues(&self) -> StoreResult<Vec<League>> {
        let params = [
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "name.asc".to_string()),
        ];
        self.get_json("leagues", &params).await
    }

    async fn ping(&self) -> StoreResult<()> {
        let params = [
            ("select".to_string(), "id".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        let _: Vec<serde_json::Value> = self.get_json("matches", &params).await?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "rest"
    }
}
