//! Stake crash history client.
//!
//! Queries the `crashGameList` GraphQL field. The endpoint sits behind
//! bot protection, so every request replays the browser headers captured
//! into the credential store (cookie, user agent, access token).
//!
//! Endpoint: `POST {base_url}/_api/graphql`

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::HistoryFetcher;
use crate::types::{CrashRecord, GatewayError, HeaderBlob};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://stake.ac";

const OPERATION_NAME: &str = "CrashGameListHistory";

/// Captured browser headers that describe the original connection or body
/// rather than the session. reqwest sets these itself; a copied
/// `accept-encoding` would ask for compressions the client cannot decode.
const SKIPPED_HEADERS: &[&str] = &[
    "accept-encoding",
    "connection",
    "content-length",
    "host",
    "transfer-encoding",
];

const CRASH_HISTORY_QUERY: &str = r#"
  query CrashGameListHistory($limit: Int, $offset: Int) {
    crashGameList(limit: $limit, offset: $offset) {
      id
      startTime
      crashpoint
      hash {
        id
        hash
        __typename
      }
      __typename
    }
  }
"#;

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<CrashListData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrashListData {
    #[serde(default)]
    crash_game_list: Option<Vec<CrashRecord>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stake GraphQL history client.
pub struct StakeClient {
    http: Client,
    base_url: String,
}

impl StakeClient {
    /// Create a client for `base_url` (e.g. `https://stake.ac`).
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/_api/graphql", self.base_url)
    }

    /// Convert the stored header blob into request headers.
    fn header_map(headers: &HeaderBlob) -> Result<HeaderMap, GatewayError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            if SKIPPED_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
                debug!(header = %name, "Skipping captured transport header");
                continue;
            }
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| GatewayError::Malformed(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| GatewayError::Malformed(format!("invalid value for header {name}")))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    /// Decode a successful response body. A body that is not the expected
    /// JSON is the upstream's fault, not the caller's.
    fn decode(status: u16, text: &str) -> Result<Vec<CrashRecord>, GatewayError> {
        let body: GraphQlResponse = serde_json::from_str(text).map_err(|e| {
            warn!(status, error = %e, "Undecodable Stake history response");
            GatewayError::Upstream {
                status,
                message: format!("unparsable history response: {e}"),
            }
        })?;
        Self::parse_body(body)
    }

    /// Extract the record list from a decoded GraphQL body.
    fn parse_body(body: GraphQlResponse) -> Result<Vec<CrashRecord>, GatewayError> {
        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(GatewayError::Upstream {
                status: 200,
                message: format!("GraphQL errors: {message}"),
            });
        }

        Ok(body
            .data
            .and_then(|d| d.crash_game_list)
            .unwrap_or_default())
    }
}

#[async_trait]
impl HistoryFetcher for StakeClient {
    async fn fetch_page(
        &self,
        limit: u32,
        offset: u32,
        headers: &HeaderBlob,
    ) -> Result<Vec<CrashRecord>, GatewayError> {
        let url = self.endpoint();
        let body = json!({
            "query": CRASH_HISTORY_QUERY,
            "variables": { "limit": limit, "offset": offset },
            "operationName": OPERATION_NAME,
        });

        debug!(url = %url, limit, offset, "Requesting crash history");

        let resp = self
            .http
            .post(&url)
            .headers(Self::header_map(headers)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Stake history request rejected");
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: format!("request to {url} failed: {text}"),
            });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| GatewayError::Transport(format!("reading response from {url} failed: {e}")))?;

        let records = Self::decode(status.as_u16(), &text)?;
        debug!(count = records.len(), "Crash history page decoded");
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
