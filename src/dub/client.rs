use crate::config::Settings;
use crate::dub::retry::{with_retry, IsRetryable, RetryConfig};
use crate::dub::sender::{TrackKind, TrackSender};
use crate::normalize::{LeadRecord, SaleRecord};
use reqwest::Client;
use serde::Serialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
use tracing::{debug, error};

#[cfg(not(target_arch = "wasm32"))]
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when calling the Dub tracking API
#[derive(Debug)]
pub enum TrackError {
    Timeout,
    Http { status: u16, endpoint: String },
    Network(String),
    Serialize(String),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::Timeout => write!(f, "request timed out"),
            TrackError::Http { status, endpoint } => {
                write!(f, "HTTP {} from {}", status, endpoint)
            }
            TrackError::Network(msg) => write!(f, "network error: {}", msg),
            TrackError::Serialize(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for TrackError {}

impl IsRetryable for TrackError {
    fn is_retryable(&self) -> bool {
        match self {
            TrackError::Timeout => true,
            TrackError::Http { status, .. } => matches!(status, 429 | 502..=504),
            TrackError::Network(_) => true,
            TrackError::Serialize(_) => false,
        }
    }
}

/// Dub API client for both WASM and native targets
pub struct DubClient {
    client: Client,
    api_url: String,
    token: String,
    retry: RetryConfig,
}

impl DubClient {
    /// Create a new client against `api_url` authenticated with `token`.
    /// Returns an error if the HTTP client fails to build (e.g., TLS configuration issues).
    pub fn new(api_url: &str, token: String) -> Result<Self, String> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        #[cfg(target_arch = "wasm32")]
        let client = Client::builder()
            .build()
            .map_err(|e| format!("failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            retry: RetryConfig::exponential(3, 250, 4_000),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        Self::new(&settings.api_url, settings.api_key.clone())
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self, kind: TrackKind) -> String {
        format!("{}{}", self.api_url, kind.path())
    }

    #[tracing::instrument(
        name = "track_send",
        skip(self, kind, record),
        fields(kind = kind.as_str())
    )]
    async fn send<T: Serialize + ?Sized>(
        &self,
        kind: TrackKind,
        record: &T,
    ) -> Result<(), TrackError> {
        let endpoint = self.endpoint(kind);
        let body = serde_json::to_vec(record).map_err(|e| TrackError::Serialize(e.to_string()))?;
        debug!(endpoint = %endpoint, body_size = body.len(), "sending to Dub");

        with_retry(&self.retry, || async {
            let response = self
                .client
                .post(&endpoint)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.token))
                .body(body.clone())
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        TrackError::Timeout
                    } else {
                        TrackError::Network(e.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                // Dub returns a JSON error object explaining validation failures
                let resp_body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "(failed to read body)".to_string());
                error!(
                    endpoint = %endpoint,
                    status,
                    response_body = %resp_body,
                    "Dub returned error status"
                );
                return Err(TrackError::Http {
                    status,
                    endpoint: endpoint.clone(),
                });
            }

            Ok(())
        })
        .await
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
impl TrackSender for DubClient {
    async fn track_lead(&self, record: &LeadRecord) -> Result<(), TrackError> {
        self.send(TrackKind::Lead, record).await
    }

    async fn track_sale(&self, record: &SaleRecord) -> Result<(), TrackError> {
        self.send(TrackKind::Sale, record).await
    }
}
