use miette::Diagnostic;
use thiserror::Error;

use crate::envelope::{EnvelopeError, PayloadDecodeError};

#[derive(Error, Diagnostic, Debug)]
pub enum McpError {
    #[error("RPC call failed for {tool_name}: {cause}")]
    #[diagnostic(
        code(vault_mcp::request_failed),
        help("Gave up after {attempts} attempts. Check network connectivity and the endpoint URL")
    )]
    RequestFailed {
        tool_name: String,
        attempts: u32,
        #[source]
        cause: TransportFailure,
    },

    #[error("JSON-RPC error from {tool_name}: {error}")]
    #[diagnostic(
        code(vault_mcp::rpc_error),
        help("The server rejected the call. Check the vault id and API key")
    )]
    RpcError {
        tool_name: String,
        error: serde_json::Value,
    },

    #[error("Missing JSON-RPC result payload for {tool_name}")]
    #[diagnostic(
        code(vault_mcp::missing_result),
        help("Expected the response to carry a `result` object")
    )]
    MissingResult { tool_name: String },

    #[error("Unable to decode {tool_name} payload: {cause}")]
    #[diagnostic(
        code(vault_mcp::payload_decode),
        help("The first content item's `text` should hold a JSON object")
    )]
    PayloadDecode {
        tool_name: String,
        #[source]
        cause: PayloadDecodeError,
        #[source_code]
        text: String,
    },

    #[error("Unexpected tool response format from {tool_name}")]
    #[diagnostic(
        code(vault_mcp::unexpected_format),
        help("Expected a JSON-RPC response object")
    )]
    UnexpectedFormat { tool_name: String },

    #[error("HTTP client initialization failed")]
    #[diagnostic(
        code(vault_mcp::client_build_failed),
        help("Failed to build an HTTP client for {endpoint}")
    )]
    ClientBuild {
        endpoint: String,
        #[source]
        cause: reqwest::Error,
    },

    #[error("Invalid API key")]
    #[diagnostic(
        code(vault_mcp::invalid_api_key),
        help("The API key must be visible ASCII to be sent in the X-API-Key header. Try --api-key-in-body")
    )]
    InvalidApiKey {
        #[source]
        cause: reqwest::header::InvalidHeaderValue,
    },
}

/// Failure to get a parseable response off the wire; these are retried
#[derive(Error, Debug)]
pub enum TransportFailure {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, McpError>;

impl McpError {
    /// Attach the tool name to an envelope failure
    pub fn from_envelope(tool_name: impl Into<String>, error: EnvelopeError) -> Self {
        let tool_name = tool_name.into();
        match error {
            EnvelopeError::Rpc(error) => Self::RpcError { tool_name, error },
            EnvelopeError::MissingResult => Self::MissingResult { tool_name },
            EnvelopeError::PayloadDecode { text, cause } => Self::PayloadDecode {
                tool_name,
                cause,
                text,
            },
            EnvelopeError::UnexpectedFormat => Self::UnexpectedFormat { tool_name },
        }
    }

    /// Protocol errors come from a well-formed but unusable response
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::RpcError { .. }
                | Self::MissingResult { .. }
                | Self::PayloadDecode { .. }
                | Self::UnexpectedFormat { .. }
        )
    }
}
