//! # Unified Search
//!
//! A Model Context Protocol (MCP) server that searches academic papers, the
//! web and videos through one query interface.
//!
//! ## Architecture
//!
//! - [`models`]: requests, per-source results and the merged response
//! - [`sources`]: provider adapters behind the [`Source`] trait
//! - [`orchestrator`]: concurrent fan-out with per-source failure isolation
//! - [`cache`]: TTL cache with in-process and Redis backends
//! - [`monitoring`]: usage quotas, metrics, audit events and service status
//! - [`mcp`]: MCP tools and server
//! - [`utils`]: HTTP client, retry, rate gates and validation
//! - [`config`]: configuration management

pub mod cache;
pub mod config;
pub mod mcp;
pub mod models;
pub mod monitoring;
pub mod orchestrator;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{SearchRequest, SearchResponse, SearchResult, SourceKind};
pub use orchestrator::{UnifiedSearch, UnifiedSearchError};
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
