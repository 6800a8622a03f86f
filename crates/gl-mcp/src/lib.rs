//! MCP Server for GitLab
//!
//! This crate exposes a GitLab instance (issues, merge requests, repositories,
//! search, users) to agentic clients via the Model Context Protocol.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client (agent) ]
//!        | (JSON-RPC over stdio)
//!        v
//! [ transport ] --> [ GitLabMcpServer ] --> [ Catalog ]
//!                                              |
//!                          +-------------------+------------------+
//!                          |                                      |
//!                    tools (by name)                 resources (by URI template)
//!                          |                                      |
//!                          +--------> ClientAccessor <------------+
//!                                          |
//!                                          v
//!                               [ gl_upstream::GitLab ]
//! ```
//!
//! The catalog is assembled once by [`GitLabMcpServer::new`]. In read-only
//! mode the mutating tools (create, update, comment) are never registered.
//!
//! # Tools
//!
//! - Issues: `get_issue`, `list_issues`, `search_issues`, `get_issue_comments`,
//!   `create_issue`, `add_issue_comment`, `update_issue`
//! - Merge requests: `get_merge_request`, `list_merge_requests`,
//!   `get_merge_request_comments`, `create_merge_request`,
//!   `add_merge_request_comment`, `update_merge_request`
//! - Repositories: `get_repository`, `list_repositories`, `search_repositories`
//! - Search: `search_projects`, `search_merge_requests`, `search_users`
//! - Users: `get_me`
//!
//! # Resources
//!
//! - `repo://{namespace}/{project}/contents{/path*}`
//! - `repo://{namespace}/{project}/refs/heads/{branch}/contents{/path*}`
//! - `repo://{namespace}/{project}/sha/{sha}/contents{/path*}`
//! - `repo://{namespace}/{project}/refs/tags/{tag}/contents{/path*}`
//! - `repo://{namespace}/{project}/merge_requests/{id}`

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod params;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod run;
pub mod server;
pub mod tool;
pub mod tools;
pub mod translations;
pub mod transport;
pub mod uri_template;

pub use config::ServerConfig;
pub use context::{ClientAccessor, Deps, RequestContext, SharedClient};
pub use error::{Error, HandlerError, RegistryError, Result};
pub use registry::{Catalog, CatalogBuilder};
pub use run::run_stdio;
pub use server::{GitLabMcpServer, ServerOptions};
pub use tool::{ErrorPolicy, ToolContent, ToolDescriptor, ToolOutcome, ToolResult};
pub use translations::{Translations, Translator};
pub use transport::{TransportOptions, serve};
