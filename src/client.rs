//! HTTP client for the query endpoint.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::controller::TransportError;
use crate::request::SearchRequest;

pub const SEARCH_PATH: &str = "/api/search";

/// Issues search requests against one upstream endpoint. No retries.
#[derive(Debug, Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
}

impl QueryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Unreachable(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the response body for any HTTP status; the endpoint reports
    /// application errors as a JSON `error` field on 4xx/5xx responses.
    pub async fn search(&self, request: &SearchRequest) -> Result<String, TransportError> {
        let url = format!("{}{SEARCH_PATH}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(classify_error)?;
        let status = response.status();
        let body = response.text().await.map_err(classify_error)?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "Search response received");
        Ok(body)
    }
}

fn classify_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(err.to_string())
    } else {
        TransportError::Unreachable(err.to_string())
    }
}
