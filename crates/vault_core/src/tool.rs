use async_trait::async_trait;
use serde_json::{Map, Value};

/// Tool returning the vault's analysis summary
pub const SUMMARY_TOOL: &str = "get-code-vault-summary";

/// Tool returning the vault's report listing
pub const REPORTS_TOOL: &str = "get-code-vault-reports";

/// Something that can invoke a remote tool and hand back its payload object.
///
/// Implemented by the MCP client; the poll driver only depends on this trait.
#[async_trait]
pub trait ToolCaller: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Map<String, Value>, Self::Error>;
}

/// Arguments shared by both vault tools
pub fn vault_arguments(vault_id: &str) -> Map<String, Value> {
    let mut arguments = Map::new();
    arguments.insert("vault_id".to_string(), Value::String(vault_id.to_string()));
    arguments
}
