//! MCP client for `tools/call` over HTTP
//!
//! Each [`McpClient::call_tool`] is one logical invocation: it gets a fresh
//! request id, attaches the API key, lets the transport retry network
//! failures, and unwraps the response envelope into a payload object.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    Result,
    envelope::unwrap_envelope,
    error::McpError,
    request::ToolRequest,
    transport::{API_KEY_ARGUMENT, AuthConfig, HttpTransport, RetryPolicy},
};
use vault_core::{ClientConfig, ToolCaller};

pub struct McpClient {
    transport: HttpTransport,
    auth: AuthConfig,
    next_id: u64,
}

impl McpClient {
    pub fn new(transport: HttpTransport, auth: AuthConfig) -> Self {
        Self {
            transport,
            auth,
            next_id: 1,
        }
    }

    /// Build a client from configuration and an API key
    pub fn from_config(config: &ClientConfig, api_key: impl Into<String>) -> Result<Self> {
        let auth = AuthConfig::new(config.auth_mode, api_key);
        let transport = HttpTransport::new(&config.endpoint, &auth, config.request_timeout())?;
        Ok(Self::new(transport, auth))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.transport = self.transport.with_retry_policy(retry);
        self
    }

    /// Id the next call will use
    pub fn next_request_id(&self) -> u64 {
        self.next_id
    }

    /// Invoke a tool and return its payload object
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let request = self.build_request(name, arguments);
        debug!(tool = name, id = request.id, "Calling tool");

        let envelope = self.transport.send(&request).await?;
        unwrap_envelope(envelope).map_err(|e| McpError::from_envelope(name, e))
    }

    fn build_request(&mut self, name: &str, mut arguments: Map<String, Value>) -> ToolRequest {
        if let AuthConfig::Body(api_key) = &self.auth {
            arguments.insert(API_KEY_ARGUMENT.to_string(), Value::String(api_key.clone()));
        }

        let id = self.next_id;
        self.next_id += 1;
        ToolRequest::new(id, name, arguments)
    }
}

#[async_trait]
impl ToolCaller for McpClient {
    type Error = McpError;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        McpClient::call_tool(self, name, arguments).await
    }
}
