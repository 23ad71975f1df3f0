//! HTTP client for the spreadsheet-backed remote endpoint.
//!
//! Every call is `{base}?action=<name>` with JSON in and JSON out. A network
//! error, a timeout, a non-2xx status and a body that is not a JSON object of
//! the expected shape all surface as a [`TransmissionError`].

use std::fmt;
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::config::SyncOptions;
use crate::models::{Item, ItemId};
use crate::util::compact_text;

/// Remote operations exposed by the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    BulkUpsert,
    BulkDelete,
    GetItems,
    GetStats,
    TriggerArchive,
}

impl RemoteAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BulkUpsert => "bulkUpsert",
            Self::BulkDelete => "bulkDelete",
            Self::GetItems => "getItems",
            Self::GetStats => "getStats",
            Self::TriggerArchive => "triggerArchive",
        }
    }
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransmissionError {
    #[error("{action} request failed: {source}")]
    Http {
        action: RemoteAction,
        #[source]
        source: reqwest::Error,
    },
    #[error("{action} API error: {message}")]
    Api {
        action: RemoteAction,
        status: u16,
        message: String,
    },
    #[error("{action} returned an invalid payload: {reason}")]
    InvalidPayload {
        action: RemoteAction,
        reason: String,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl TransmissionError {
    /// Whether the request ran past its timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_timeout())
    }

    /// HTTP status of a rejected request
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type TransmissionResult<T> = Result<T, TransmissionError>;

/// Counts reported by `bulkUpsert`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    #[serde(default)]
    pub upserted: Option<u64>,
    #[serde(default)]
    pub updated: Option<u64>,
    #[serde(default)]
    pub inserted: Option<u64>,
}

/// Sheet statistics reported by `getStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStats {
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub archived: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub archive_sheets: u64,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Readable items from one `getItems` page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPage {
    pub items: Vec<Item>,
    /// Rows the remote sent, readable or not
    pub rows: usize,
    /// Rows left out because they were not items
    pub skipped: usize,
}

impl ItemPage {
    fn from_rows(rows: Vec<Value>) -> Self {
        let mut page = Self {
            rows: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match serde_json::from_value::<Item>(row) {
                Ok(item) if !item.id.as_str().trim().is_empty() => page.items.push(item),
                Ok(_) => {
                    tracing::warn!("Skipping remote row without an id");
                    page.skipped += 1;
                }
                Err(error) => {
                    tracing::warn!("Skipping unreadable remote row: {error}");
                    page.skipped += 1;
                }
            }
        }
        page
    }
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct RemoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Build a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TransmissionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TransmissionError::Client)?;
        Ok(Self::with_http_client(base_url, client))
    }

    /// Reuse an existing HTTP client (shares its connection pool and timeout)
    pub fn with_http_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Client for the configured endpoint, or `None` when sync is off
    pub fn from_options(options: &SyncOptions) -> TransmissionResult<Option<Self>> {
        options
            .endpoint()
            .map(|endpoint| Self::new(endpoint, options.request_timeout()))
            .transpose()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send full item payloads for insert-or-update
    pub async fn bulk_upsert(&self, items: &[Value]) -> TransmissionResult<UpsertSummary> {
        let action = RemoteAction::BulkUpsert;
        let request = self.post(action).json(&json!({ "items": items }));
        let body = self.send(action, request).await?;
        parse_object(action, &body)
    }

    /// Delete items by id
    pub async fn bulk_delete(&self, ids: &[ItemId]) -> TransmissionResult<Map<String, Value>> {
        let action = RemoteAction::BulkDelete;
        let request = self.post(action).json(&json!({ "ids": ids }));
        let body = self.send(action, request).await?;
        parse_object(action, &body)
    }

    /// Fetch one page of items.
    ///
    /// Rows that cannot be read as items are logged and left out, so the
    /// result may be shorter than the page the remote sent. Use
    /// [`RemoteClient::get_items_page`] when the raw row count matters.
    pub async fn get_items(&self, limit: usize, offset: usize) -> TransmissionResult<Vec<Item>> {
        Ok(self.get_items_page(limit, offset).await?.items)
    }

    /// Fetch one page, keeping the number of rows the remote returned
    pub async fn get_items_page(&self, limit: usize, offset: usize) -> TransmissionResult<ItemPage> {
        let action = RemoteAction::GetItems;
        let request = self
            .client
            .get(&self.base_url)
            .query(&[("action", action.as_str())])
            .query(&[("limit", limit), ("offset", offset)]);
        let body = self.send(action, request).await?;
        let page: ItemsPage = parse_object(action, &body)?;
        Ok(ItemPage::from_rows(page.items))
    }

    pub async fn get_stats(&self) -> TransmissionResult<RemoteStats> {
        let action = RemoteAction::GetStats;
        let request = self
            .client
            .get(&self.base_url)
            .query(&[("action", action.as_str())]);
        let body = self.send(action, request).await?;
        parse_object(action, &body)
    }

    /// Ask the remote to move old rows to archive sheets
    pub async fn trigger_archive(&self) -> TransmissionResult<String> {
        let action = RemoteAction::TriggerArchive;
        let request = self
            .post(action)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        let body = self.send(action, request).await?;
        let response: ArchiveResponse = parse_object(action, &body)?;
        Ok(response.message.unwrap_or_default())
    }

    fn post(&self, action: RemoteAction) -> RequestBuilder {
        self.client
            .post(&self.base_url)
            .query(&[("action", action.as_str())])
    }

    async fn send(&self, action: RemoteAction, request: RequestBuilder) -> TransmissionResult<String> {
        tracing::debug!("Sending {action} to {}", self.base_url);
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| TransmissionError::Http { action, source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| TransmissionError::Http { action, source })?;

        if !status.is_success() {
            return Err(TransmissionError::Api {
                action,
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }
        Ok(body)
    }
}

/// Parse a response body that must be a JSON object of shape `T`
fn parse_object<T: DeserializeOwned>(action: RemoteAction, body: &str) -> TransmissionResult<T> {
    let value: Value = serde_json::from_str(body).map_err(|_| TransmissionError::InvalidPayload {
        action,
        reason: format!(
            "expected JSON, got: {} (check the web app deployment)",
            compact_text(body)
        ),
    })?;

    if !value.is_object() {
        return Err(TransmissionError::InvalidPayload {
            action,
            reason: format!("expected a JSON object, got: {}", compact_text(body)),
        });
    }

    serde_json::from_value(value).map_err(|error| TransmissionError::InvalidPayload {
        action,
        reason: error.to_string(),
    })
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> RemoteClient {
        RemoteClient::new(format!("{}/exec", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn bulk_upsert_posts_items_and_reads_counts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "bulkUpsert"))
            .and(body_json(json!({ "items": [{ "id": "a" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "upserted": 1,
                "updated": 0,
                "inserted": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server)
            .bulk_upsert(&[json!({ "id": "a" })])
            .await
            .unwrap();
        assert_eq!(summary.upserted, Some(1));
        assert_eq!(summary.inserted, Some(1));
    }

    #[tokio::test]
    async fn bulk_delete_posts_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "bulkDelete"))
            .and(body_json(json!({ "ids": ["1", "2"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "deleted": 2 })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .bulk_delete(&["1".into(), "2".into()])
            .await
            .unwrap();
        assert_eq!(response.get("deleted"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let error = client_for(&server).bulk_upsert(&[]).await.unwrap_err();
        assert_eq!(error.status(), Some(500));
        assert!(error.to_string().contains("boom (500)"));
    }

    #[tokio::test]
    async fn html_body_is_invalid_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Sign in</html>"))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .bulk_delete(&["1".into()])
            .await
            .unwrap_err();
        assert!(matches!(error, TransmissionError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn json_array_is_not_the_expected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;

        let error = client_for(&server).bulk_upsert(&[]).await.unwrap_err();
        assert!(matches!(error, TransmissionError::InvalidPayload { .. }));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total": 1 }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            RemoteClient::new(format!("{}/exec", server.uri()), Duration::from_millis(50)).unwrap();
        let error = client.get_stats().await.unwrap_err();
        assert!(error.is_timeout());
    }

    #[tokio::test]
    async fn get_items_sends_paging_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getItems"))
            .and(query_param("limit", "2"))
            .and(query_param("offset", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "id": "r1", "title": "Remote", "updated_at": "2024-01-01T00:00:00Z" }]
            })))
            .mount(&server)
            .await;

        let items = client_for(&server).get_items(2, 4).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ItemId::from("r1"));
        assert_eq!(items[0].updated_at, Some(1_704_067_200_000));
    }

    #[tokio::test]
    async fn get_items_reads_numeric_cells_and_skips_bad_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getItems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": "r1", "title": 1917, "tags": "war, drama", "updated_at": 5 },
                    { "id": 42, "title": "Numeric id" },
                    { "id": "r3", "title": "Bad stamp", "updated_at": "yesterday" },
                    { "title": "No id" },
                    "not a row"
                ]
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).get_items_page(1000, 0).await.unwrap();
        assert_eq!(page.rows, 5);
        assert_eq!(page.skipped, 3);
        let titles: Vec<&str> = page.items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["1917", "Numeric id"]);
        assert_eq!(page.items[0].tags, vec!["war", "drama"]);
        assert_eq!(page.items[1].id, ItemId::from("42"));
    }

    #[tokio::test]
    async fn stats_and_archive_parse_their_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getStats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "active": 3, "archived": 7, "total": 10, "archiveSheets": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(query_param("action", "triggerArchive"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Archived 7 items" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.get_stats().await.unwrap(),
            RemoteStats {
                active: 3,
                archived: 7,
                total: 10,
                archive_sheets: 2
            }
        );
        assert_eq!(client.trigger_archive().await.unwrap(), "Archived 7 items");
    }

    #[test]
    fn from_options_is_none_without_endpoint() {
        assert!(RemoteClient::from_options(&SyncOptions::default())
            .unwrap()
            .is_none());
    }
}
