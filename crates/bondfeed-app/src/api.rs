//! HTTP client for the bond backend.
//!
//! Read-only access to bond listings, per-bond transactions and aggregate
//! market statistics. The live feed itself comes over the WebSocket.

use bondfeed_core::{Bond, BondFilter, MarketStats, Transaction};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} from {path}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {path}: {reason}")]
    Decode { path: String, reason: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client for the bond REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /bonds/`
    pub async fn get_bonds(&self, filter: &BondFilter) -> ApiResult<Vec<Bond>> {
        self.get_json("/bonds/", Some(filter)).await
    }

    /// `GET /bonds/{isin}/`
    pub async fn get_bond(&self, isin: &str) -> ApiResult<Bond> {
        self.get_json::<_, ()>(&format!("/bonds/{isin}/"), None).await
    }

    /// `GET /transactions/`
    pub async fn get_transactions(&self, filter: &BondFilter) -> ApiResult<Vec<Transaction>> {
        self.get_json("/transactions/", Some(filter)).await
    }

    /// `GET /transactions/{isin}/`
    pub async fn get_transactions_by_isin(&self, isin: &str) -> ApiResult<Vec<Transaction>> {
        self.get_json::<_, ()>(&format!("/transactions/{isin}/"), None).await
    }

    /// `GET /stats/`
    pub async fn get_market_stats(&self) -> ApiResult<MarketStats> {
        self.get_json::<_, ()>("/stats/", None).await
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "API request");

        let mut request = self.client.get(&url);
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%url, error = %e, "API request failed");
            ApiError::HttpClient(format!("HTTP request failed: {e}"))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(%url, "API resource not found");
            return Err(ApiError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, status = status.as_u16(), "API request rejected");
            return Err(ApiError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| {
            warn!(%url, error = %e, "API response decode failed");
            ApiError::Decode {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })
    }
}
