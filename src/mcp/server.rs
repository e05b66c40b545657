//! MCP server implementation using pmcp.
//!
//! Serves the tools of a [`ToolRegistry`] over stdio or streamable HTTP.

use crate::mcp::tools::{ToolError, ToolRegistry};
use crate::orchestrator::UnifiedSearch;
use async_trait::async_trait;
use pmcp::{
    server::streamable_http_server::StreamableHttpServer, Error, RequestHandlerExtra, Server,
    ServerCapabilities, ToolHandler, ToolInfo,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// The MCP server for unified search
#[derive(Debug, Clone)]
pub struct McpServer {
    server: Arc<Mutex<Server>>,
    tool_names: Vec<String>,
}

impl McpServer {
    /// Create a new MCP server whose tools run against `search`
    pub fn new(search: Arc<UnifiedSearch>) -> Result<Self, pmcp::Error> {
        let tools = ToolRegistry::new(search);
        let tool_names = tools.names().into_iter().map(str::to_string).collect();
        let server = Self::build_server_impl(tools)?;
        Ok(Self {
            server: Arc::new(Mutex::new(server)),
            tool_names,
        })
    }

    /// Names of the tools this server exposes
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    fn build_server_impl(tools: ToolRegistry) -> Result<Server, pmcp::Error> {
        let mut builder = Server::builder()
            .name("unified-search")
            .version(env!("CARGO_PKG_VERSION"))
            .capabilities(ServerCapabilities::default());

        for tool in tools.all() {
            let wrapper = ToolWrapper {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: tool.input_schema.clone(),
                handler: tool.handler.clone(),
            };
            builder = builder.tool(wrapper.name.clone(), wrapper);
        }

        builder.build()
    }

    /// Run the server in stdio mode
    pub async fn run(self) -> Result<(), pmcp::Error> {
        tracing::info!(tools = self.tool_names.len(), "Starting MCP server in stdio mode");

        // run_stdio() takes ownership of the Server
        let server = Arc::try_unwrap(self.server)
            .map_err(|_| Error::internal("MCP server is shared with a running transport"))?
            .into_inner();

        server.run_stdio().await
    }

    /// Run the server over streamable HTTP on `addr`
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), pmcp::Error> {
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address '{}': {}", addr, e)))?;

        tracing::info!("Starting MCP server in HTTP mode on {}", socket_addr);
        StreamableHttpServer::new(socket_addr, self.server.clone())
            .start()
            .await
    }
}

/// Wrapper for adapting our Tool to pmcp's ToolHandler
#[derive(Clone)]
struct ToolWrapper {
    name: String,
    description: Option<String>,
    input_schema: Value,
    handler: Arc<dyn crate::mcp::tools::ToolHandler>,
}

#[async_trait]
impl ToolHandler for ToolWrapper {
    async fn handle(&self, args: Value, _extra: RequestHandlerExtra) -> Result<Value, Error> {
        tracing::debug!(tool = %self.name, "Tool call");
        self.handler.execute(args).await.map_err(|e| match e {
            ToolError::InvalidParams(message) => Error::invalid_params(message),
            ToolError::Internal(message) => Error::internal(message),
        })
    }

    fn metadata(&self) -> Option<ToolInfo> {
        Some(ToolInfo::new(
            self.name.clone(),
            self.description.clone(),
            self.input_schema.clone(),
        ))
    }
}
