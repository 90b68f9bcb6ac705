use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// JSON-RPC 2.0 `tools/call` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: ToolCallParams,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolRequest {
    pub fn new(id: u64, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: TOOLS_CALL_METHOD.to_string(),
            params: ToolCallParams {
                name: name.into(),
                arguments,
            },
            id,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.params.name
    }
}
