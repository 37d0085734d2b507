//! HTTP generation oracle adapter.
//!
//! POSTs the generation context as JSON to a configured endpoint and decodes
//! the YAML response body into a candidate batch. Transient failures are
//! retried under the configured [`RetryPolicy`]; what escapes here has
//! already spent the whole retry budget.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::domain::models::{CandidateTest, OracleConfig};
use crate::domain::ports::{GenerationContext, GenerationOracle, OracleError};
use crate::infrastructure::oracle::decode::decode_batch;
use crate::infrastructure::oracle::retry::RetryPolicy;

/// Environment variable holding the optional bearer token for the oracle.
const TOKEN_ENV: &str = "COVLIFT_ORACLE_TOKEN";

/// Generation oracle backed by an HTTP endpoint.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
    bearer_token: Option<String>,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .build()
            .map_err(|e| OracleError::Backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            retry: RetryPolicy::from(&config.retry),
            bearer_token: std::env::var(TOKEN_ENV).ok(),
        })
    }

    async fn generate_once(
        &self,
        context: &GenerationContext,
        batch_size: u32,
    ) -> Result<Vec<CandidateTest>, OracleError> {
        let body = serde_json::json!({
            "context": context,
            "batch_size": batch_size,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                OracleError::Network(e.to_string())
            } else {
                OracleError::Backend(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| OracleError::Network(format!("failed to read response body: {e}")))?;

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(OracleError::Auth(format!("{status}: {text}")))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(OracleError::Quota(text)),
            s if s.is_server_error() => Err(OracleError::Backend(format!("{status}: {text}"))),
            s if !s.is_success() => Err(OracleError::Backend(format!("{status}: {text}"))),
            _ => {
                debug!(bytes = text.len(), "Oracle responded; decoding batch");
                decode_batch(&text)
            }
        }
    }
}

#[async_trait]
impl GenerationOracle for HttpOracle {
    #[instrument(skip_all)]
    async fn generate(
        &self,
        context: &GenerationContext,
        batch_size: u32,
    ) -> Result<Vec<CandidateTest>, OracleError> {
        self.retry
            .execute(|| self.generate_once(context, batch_size))
            .await
    }
}
