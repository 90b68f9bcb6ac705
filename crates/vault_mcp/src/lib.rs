//! Vault MCP - JSON-RPC client for The Code Registry
//!
//! This crate talks to the Code Registry MCP router:
//! - Request: `tools/call` bodies with per-client request ids
//! - Transport: HTTP POST with API key auth and retry on network failures
//! - Envelope: extraction of the tool payload from the JSON-RPC response

pub mod client;
pub mod envelope;
pub mod error;
pub mod request;
pub mod transport;

pub use client::McpClient;
pub use envelope::{EnvelopeError, PayloadDecodeError, decode_text_payload, unwrap_envelope};
pub use error::{McpError, Result, TransportFailure};
pub use request::ToolRequest;
pub use transport::{AuthConfig, HttpTransport, RetryPolicy};
