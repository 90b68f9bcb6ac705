//! HTTP transport for the JSON-RPC endpoint

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    Result,
    error::{McpError, TransportFailure},
    request::ToolRequest,
};
use vault_core::AuthMode;

/// Header carrying the API key in [`AuthConfig::Header`] mode (`X-API-Key`)
pub const API_KEY_HEADER: &str = "x-api-key";

/// Argument carrying the API key in [`AuthConfig::Body`] mode
pub const API_KEY_ARGUMENT: &str = "api_key";

/// How the API key is attached to requests. Exactly one place, never both.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// `X-API-Key` request header
    Header(String),
    /// `api_key` field merged into the tool arguments
    Body(String),
}

impl AuthConfig {
    pub fn new(mode: AuthMode, api_key: impl Into<String>) -> Self {
        match mode {
            AuthMode::Header => Self::Header(api_key.into()),
            AuthMode::Body => Self::Body(api_key.into()),
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Header(_) => AuthMode::Header,
            Self::Body(_) => AuthMode::Body,
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header(_) => f.write_str("Header(<redacted>)"),
            Self::Body(_) => f.write_str("Body(<redacted>)"),
        }
    }
}

/// Retry schedule for transport failures: `base_delay * 2^n` after the n-th failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` below 1 is raised to 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the failure with zero-based index `failure`
    pub fn delay_for(&self, failure: u32) -> Duration {
        2u32.checked_pow(failure)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Posts JSON-RPC requests and parses the JSON response
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Build the transport. Header auth is installed as a default header.
    pub fn new(
        endpoint: impl Into<String>,
        auth: &AuthConfig,
        request_timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();

        let mut headers = HeaderMap::new();
        if let AuthConfig::Header(api_key) = auth {
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|cause| McpError::InvalidApiKey { cause })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|cause| McpError::ClientBuild {
                endpoint: endpoint.clone(),
                cause,
            })?;

        Ok(Self {
            http,
            endpoint,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the request, retrying transport failures per the retry policy
    pub async fn send(&self, request: &ToolRequest) -> Result<Value> {
        let mut failures = 0;
        loop {
            match self.post(request).await {
                Ok(response) => return Ok(response),
                Err(cause) => {
                    failures += 1;
                    if failures >= self.retry.max_attempts() {
                        return Err(McpError::RequestFailed {
                            tool_name: request.tool_name().to_string(),
                            attempts: failures,
                            cause,
                        });
                    }

                    let wait = self.retry.delay_for(failures - 1);
                    warn!(
                        tool = request.tool_name(),
                        attempt = failures,
                        "Transport failure, retrying in {:?}: {}",
                        wait,
                        cause
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    async fn post(&self, request: &ToolRequest) -> std::result::Result<Value, TransportFailure> {
        debug!(
            tool = request.tool_name(),
            id = request.id,
            "POST {}",
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }
}
