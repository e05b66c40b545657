//! MCP (Model Context Protocol) server exposing the search tools.

mod handlers;
pub mod server;
mod tools;

pub use server::McpServer;
pub use tools::{Tool, ToolError, ToolHandler, ToolRegistry};
