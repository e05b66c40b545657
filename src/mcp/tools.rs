//! Tool registry for MCP tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::handlers::{
    AuthorInfoHandler, ClearCacheHandler, ServiceStatusHandler, SourceSearchHandler,
    UnifiedSearchHandler, UsageStatsHandler,
};
use crate::models::SourceKind;
use crate::orchestrator::UnifiedSearch;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "unified_search")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Failure of a tool call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// The arguments were missing or malformed
    #[error("{0}")]
    InvalidParams(String),

    /// The call was well-formed but could not be served
    #[error("{0}")]
    Internal(String),
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, ToolError>;
}

/// Registry for all MCP tools, in name order
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

impl ToolRegistry {
    /// Create the registry with every tool backed by `search`
    pub fn new(search: Arc<UnifiedSearch>) -> Self {
        let mut registry = Self::default();
        registry.register_search_tools(&search);
        registry.register_admin_tools(&search);
        registry
    }

    fn register_search_tools(&mut self, search: &Arc<UnifiedSearch>) {
        let configured: Vec<&str> = search.registry().kinds().iter().map(|k| k.id()).collect();

        self.register(Tool {
            name: "unified_search".to_string(),
            description: format!(
                "Search academic papers, web pages and videos in one call. Configured sources: {}",
                if configured.is_empty() {
                    "none".to_string()
                } else {
                    configured.join(", ")
                }
            ),
            input_schema: unified_search_schema(),
            handler: Arc::new(UnifiedSearchHandler {
                search: search.clone(),
            }),
        });

        for kind in SourceKind::ALL {
            let (name, description, schema) = match kind {
                SourceKind::Academic => (
                    "search_academic",
                    "Search Google Scholar for academic papers",
                    academic_search_schema(),
                ),
                SourceKind::Web => (
                    "search_web",
                    "Search the web through Google Custom Search",
                    web_search_schema(),
                ),
                SourceKind::Video => (
                    "search_video",
                    "Search YouTube for videos",
                    video_search_schema(),
                ),
            };
            self.register(Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema: schema,
                handler: Arc::new(SourceSearchHandler {
                    search: search.clone(),
                    kind,
                }),
            });
        }

        self.register(Tool {
            name: "get_author_info".to_string(),
            description: "Look up a Google Scholar author profile: affiliation, interests and citation counts".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "author_name": {
                        "type": "string",
                        "description": "Author name to look up"
                    }
                },
                "required": ["author_name"]
            }),
            handler: Arc::new(AuthorInfoHandler {
                search: search.clone(),
            }),
        });
    }

    fn register_admin_tools(&mut self, search: &Arc<UnifiedSearch>) {
        self.register(Tool {
            name: "clear_cache".to_string(),
            description: "Clear cached results for one source, or everything".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "source": {
                        "type": "string",
                        "enum": ["academic", "web", "video"],
                        "description": "Source whose entries are removed. Omit to clear the whole cache."
                    }
                }
            }),
            handler: Arc::new(ClearCacheHandler {
                search: search.clone(),
            }),
        });

        self.register(Tool {
            name: "get_api_usage_stats".to_string(),
            description: "Per-provider call counts, daily quota state, cache statistics and metrics".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            handler: Arc::new(UsageStatsHandler {
                search: search.clone(),
            }),
        });

        self.register(Tool {
            name: "get_service_status".to_string(),
            description: "Readiness of every source and the cache".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "probe": {
                        "type": "boolean",
                        "description": "Run a minimal live query against each configured source",
                        "default": false
                    }
                }
            }),
            handler: Arc::new(ServiceStatusHandler {
                search: search.clone(),
            }),
        });
    }

    /// Register a new tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Get all registered tools
    pub fn all(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    /// Registered tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::InvalidParams(format!("Tool '{}' not found", name)))?;
        tool.handler.execute(args).await
    }
}

fn query_properties() -> serde_json::Map<String, Value> {
    let properties = json!({
        "query": {
            "type": "string",
            "description": "Search query (1-500 characters)"
        },
        "num_results": {
            "type": "integer",
            "description": "Results per source (1-50)",
            "minimum": 1,
            "maximum": 50,
            "default": 10
        }
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

fn academic_properties() -> Value {
    json!({
        "author": {
            "type": "string",
            "description": "Restrict papers to this author"
        },
        "year_start": {
            "type": "integer",
            "description": "Earliest publication year (1900-2100)"
        },
        "year_end": {
            "type": "integer",
            "description": "Latest publication year (1900-2100)"
        }
    })
}

fn web_properties() -> Value {
    json!({
        "language": {
            "type": "string",
            "description": "Language code for web results",
            "default": "en"
        },
        "safe_search": {
            "type": "string",
            "enum": ["high", "medium", "off"],
            "default": "medium"
        }
    })
}

fn video_properties() -> Value {
    json!({
        "duration": {
            "type": "string",
            "enum": ["short", "medium", "long"],
            "description": "Video length: short (<4 min), medium (4-20 min), long (>20 min)"
        },
        "upload_date": {
            "type": "string",
            "enum": ["hour", "today", "week", "month", "year"]
        },
        "sort": {
            "type": "string",
            "enum": ["relevance", "date", "rating", "view_count"],
            "default": "relevance"
        }
    })
}

fn schema_with(extra: &[Value]) -> Value {
    let mut properties = query_properties();
    for group in extra {
        if let Value::Object(map) = group {
            properties.extend(map.clone());
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["query"]
    })
}

fn unified_search_schema() -> Value {
    let mut schema = schema_with(&[academic_properties(), web_properties(), video_properties()]);
    schema["properties"]["sources"] = json!({
        "type": "array",
        "items": {
            "type": "string",
            "enum": ["academic", "web", "video"]
        },
        "description": "Sources to search. Omit to search every configured source."
    });
    schema
}

fn academic_search_schema() -> Value {
    schema_with(&[academic_properties()])
}

fn web_search_schema() -> Value {
    schema_with(&[web_properties()])
}

fn video_search_schema() -> Value {
    schema_with(&[video_properties()])
}
