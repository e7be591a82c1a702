//! The four MCP tools exposed over the query engine: `index_codebase`,
//! `search_code`, `find_symbol`, and `get_stats`.

use std::sync::Arc;

use context_protocol::{FindSymbolRequest, GetStatsRequest, IndexCodebaseRequest, SearchCodeRequest};
use context_search::QueryEngine;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router};
use rmcp::{ErrorData as McpError, ServerHandler};

#[derive(Clone)]
pub struct ContextFinderService {
    engine: Arc<QueryEngine>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

#[tool_router]
impl ContextFinderService {
    pub fn new(engine: Arc<QueryEngine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(description = "Index (or re-index) a codebase: scans, chunks, embeds, and stores every changed file under the project root.")]
    async fn index_codebase(
        &self,
        Parameters(request): Parameters<IndexCodebaseRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.engine.index_codebase(&request).await;
        to_call_result(&result)
    }

    #[tool(description = "Hybrid semantic + keyword search over the indexed codebase. Returns ranked code snippets.")]
    async fn search_code(
        &self,
        Parameters(request): Parameters<SearchCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.engine.search_code(&request).await;
        to_call_result(&result)
    }

    #[tool(description = "Find a symbol's definitions and references by name, optionally restricted to the closure of a set of entry-point files.")]
    async fn find_symbol(
        &self,
        Parameters(request): Parameters<FindSymbolRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.engine.find_symbol(&request).await;
        to_call_result(&result)
    }

    #[tool(description = "Summary statistics for the current index: chunk counts by language and type, and the last indexed commit.")]
    async fn get_stats(&self, Parameters(_request): Parameters<GetStatsRequest>) -> Result<CallToolResult, McpError> {
        let result = self.engine.get_stats().await;
        to_call_result(&result)
    }
}

#[tool_handler]
impl ServerHandler for ContextFinderService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Local code-intelligence index: call index_codebase once per project, then search_code / \
                 find_symbol / get_stats to query it."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

fn to_call_result<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let payload = serde_json::to_string(value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize tool result: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(payload)]))
}
