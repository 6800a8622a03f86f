//! MCP Server implementation
//!
//! Answers JSON-RPC requests against a [`Catalog`] assembled once at
//! construction. The server holds no mutable state, so one instance is
//! shared by every request task the transport spawns.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::context::{ClientAccessor, Deps, RequestContext};
use crate::error::{Error, RegistryError, Result};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
    ReadResourceParams, ResourcesCapability, ServerCapabilities, ServerInfo, SetLevelParams,
    ToolCallParams, ToolsCapability, codes,
};
use crate::registry::{Catalog, CatalogBuilder};
use crate::resources::repository_resources;
use crate::tool::ToolOutcome;
use crate::tools::{mutating_tools, read_only_tools};
use crate::translations::Translator;

/// Default server name reported in `initialize`.
pub const DEFAULT_SERVER_NAME: &str = "gitlab-mcp-server";

/// Protocol-level server configuration
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub name: String,
    pub instructions: Option<String>,
    /// Advertise the `logging` capability
    pub logging: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            instructions: None,
            logging: true,
        }
    }
}

/// MCP Server for GitLab
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use gl_mcp::{GitLabMcpServer, ServerOptions, SharedClient, translations};
///
/// let server = GitLabMcpServer::new(
///     Arc::new(SharedClient::new(client)),
///     env!("CARGO_PKG_VERSION"),
///     true,
///     translations::identity(),
///     ServerOptions::default(),
/// )?;
/// let reply = server.handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await?;
/// ```
#[derive(Debug)]
pub struct GitLabMcpServer {
    catalog: Catalog,
    version: String,
    read_only: bool,
    options: ServerOptions,
}

impl GitLabMcpServer {
    /// Build the server and its catalog.
    ///
    /// The five repository resources and the fourteen read-only tools are
    /// always registered; the six mutating tools only when `read_only` is
    /// false.
    pub fn new(
        get_client: Arc<dyn ClientAccessor>,
        version: impl Into<String>,
        read_only: bool,
        t: Translator,
        options: ServerOptions,
    ) -> std::result::Result<Self, RegistryError> {
        let deps = Deps::new(get_client, t);

        let mut builder = CatalogBuilder::new();
        builder.add_resources(repository_resources(&deps)?)?;
        builder.add_tools(read_only_tools(&deps))?;
        if !read_only {
            builder.add_tools(mutating_tools(&deps))?;
        }
        Ok(Self::with_catalog(builder.build(), version, read_only, options))
    }

    /// Wrap an already assembled catalog.
    pub fn with_catalog(
        catalog: Catalog,
        version: impl Into<String>,
        read_only: bool,
        options: ServerOptions,
    ) -> Self {
        tracing::info!(
            name = %options.name,
            read_only,
            tools = catalog.tool_count(),
            resources = catalog.template_count(),
            "MCP server catalog ready"
        );

        Self {
            catalog,
            version: version.into(),
            read_only,
            options,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Handle a single raw MCP message
    ///
    /// Returns the serialized response, or an empty string when the message
    /// needs no reply.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let response = match decode_request(message) {
            Ok(request) => self.handle_request(request, RequestContext::default()).await,
            Err(rejected) => Some(rejected),
        };
        match response {
            Some(response) => serde_json::to_string(&response).map_err(Error::from),
            None => Ok(String::new()),
        }
    }

    /// Dispatch a parsed request.
    ///
    /// Notifications yield `None`.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        ctx: RequestContext,
    ) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") || request.method == "initialized" {
            tracing::debug!(method = %request.method, "Received notification");
            return None;
        }

        let id = request.id.clone();
        let notification = request.is_notification();
        tracing::debug!(method = %request.method, id = ?id, "Dispatching request");

        let ctx = RequestContext::new(id.clone()).with_cancellation(ctx.cancellation().clone());
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "tools/call" => self.handle_tools_call(ctx, request.params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "resources/templates/list" => Ok(self.handle_templates_list()),
            "resources/read" => self.handle_resources_read(ctx, request.params).await,
            "logging/setLevel" => self.handle_set_level(request.params),
            other => Err(Dispatch::MethodNotFound(other.to_string())),
        };

        if notification {
            return None;
        }
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => err.into_response(id),
        })
    }

    fn handle_initialize(&self, params: Value) -> DispatchResult {
        // Clients may send anything here; only log what parses.
        if let Ok(init) = serde_json::from_value::<InitializeParams>(params) {
            tracing::info!(
                client = %init.client_info.name,
                client_version = %init.client_info.version,
                protocol = %init.protocol_version,
                "Client initializing"
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                logging: self.options.logging.then(Map::new),
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                resources: Some(ResourcesCapability {
                    subscribe: Some(true),
                    list_changed: Some(true),
                }),
            },
            server_info: ServerInfo {
                name: self.options.name.clone(),
                version: self.version.clone(),
            },
            instructions: self.options.instructions.clone(),
        };
        Ok(serde_json::to_value(result).map_err(Error::from)?)
    }

    fn handle_tools_list(&self) -> Value {
        let tools: Vec<Value> = self.catalog.tools().map(|d| d.to_list_entry()).collect();
        json!({ "tools": tools })
    }

    fn handle_templates_list(&self) -> Value {
        let templates: Vec<Value> = self
            .catalog
            .templates()
            .map(|t| t.to_list_entry())
            .collect();
        json!({ "resourceTemplates": templates })
    }

    async fn handle_tools_call(&self, ctx: RequestContext, params: Value) -> DispatchResult {
        let params: ToolCallParams = parse_params(params)?;
        let args = params.arguments.unwrap_or_default();

        let outcome = self.catalog.call_tool(ctx, &params.name, args).await?;
        let result = match outcome {
            ToolOutcome::HardError(err) => return Err(Error::Handler(err).into()),
            settled => settled.into_result().map_err(Error::Handler)?,
        };
        Ok(serde_json::to_value(result).map_err(Error::from)?)
    }

    async fn handle_resources_read(&self, ctx: RequestContext, params: Value) -> DispatchResult {
        let params: ReadResourceParams = parse_params(params)?;
        let contents = self.catalog.read_resource(ctx, &params.uri).await?;
        Ok(json!({ "contents": contents }))
    }

    fn handle_set_level(&self, params: Value) -> DispatchResult {
        let params: SetLevelParams = parse_params(params)?;
        tracing::info!(level = %params.level, "Client requested log level");
        Ok(json!({}))
    }
}

/// Why a request produced an error response
#[derive(Debug)]
enum Dispatch {
    MethodNotFound(String),
    Failed(Error),
}

type DispatchResult = std::result::Result<Value, Dispatch>;

impl From<Error> for Dispatch {
    fn from(err: Error) -> Self {
        Self::Failed(err)
    }
}

impl Dispatch {
    fn into_response(self, id: Option<Value>) -> JsonRpcResponse {
        match self {
            Self::MethodNotFound(method) => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            ),
            Self::Failed(err) => {
                let code = error_code(&err);
                JsonRpcResponse::error(id, code, err.to_string())
            }
        }
    }
}

/// JSON-RPC error code for a dispatch failure.
pub fn error_code(err: &Error) -> i32 {
    match err {
        Error::UnknownTool(_) | Error::InvalidParams(_) => codes::INVALID_PARAMS,
        Error::UnknownResource(_) => codes::RESOURCE_NOT_FOUND,
        _ => codes::INTERNAL_ERROR,
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> std::result::Result<T, Error> {
    serde_json::from_value(params).map_err(|e| Error::InvalidParams(e.to_string()))
}

/// Decode one framed message.
///
/// Malformed JSON is rejected with `-32700`; well-formed JSON that is not a
/// request is rejected with `-32600`, echoing its id when one is present.
pub fn decode_request(message: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(message).map_err(|e| {
        JsonRpcResponse::error(None, codes::PARSE_ERROR, format!("Parse error: {e}"))
    })?;
    let id = value.get("id").cloned();
    serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(id, codes::INVALID_REQUEST, format!("Invalid request: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SharedClient;
    use crate::translations;
    use gl_test_utils::{StubGitLab, fixtures, panicking_client};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn server_with(stub: Arc<StubGitLab>, read_only: bool) -> GitLabMcpServer {
        GitLabMcpServer::new(
            Arc::new(SharedClient::new(stub)),
            "1.2.3",
            read_only,
            translations::identity(),
            ServerOptions::default(),
        )
        .unwrap()
    }

    fn offline_server(read_only: bool) -> GitLabMcpServer {
        GitLabMcpServer::new(
            Arc::new(panicking_client),
            "1.2.3",
            read_only,
            translations::identity(),
            ServerOptions::default(),
        )
        .unwrap()
    }

    async fn roundtrip(server: &GitLabMcpServer, message: Value) -> Value {
        let reply = server.handle_message(&message.to_string()).await.unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[rstest]
    #[case::read_only(true, 14)]
    #[case::read_write(false, 20)]
    fn catalog_size_depends_on_mode(#[case] read_only: bool, #[case] expected: usize) {
        let server = offline_server(read_only);
        assert_eq!(server.catalog().tool_count(), expected);
        assert_eq!(server.catalog().template_count(), 5);
    }

    #[tokio::test]
    async fn read_only_hides_mutating_tools() {
        let server = offline_server(true);
        let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        let names: Vec<&str> = reply["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        for mutating in [
            "create_issue",
            "add_issue_comment",
            "update_issue",
            "create_merge_request",
            "add_merge_request_comment",
            "update_merge_request",
        ] {
            assert!(!names.contains(&mutating), "{mutating} should be hidden");
        }
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn read_only_call_to_mutating_tool_is_not_found() {
        let server = offline_server(true);
        let reply = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "create_issue", "arguments": {"namespace": "a", "project": "b", "title": "c"}},
            }),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32602);
        assert_eq!(reply["error"]["message"], "tool 'create_issue' not found");
    }

    #[tokio::test]
    async fn initialize_reports_capabilities() {
        let server = offline_server(false);
        let reply = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": {"name": "test", "version": "1.0"},
                },
            }),
        )
        .await;
        let result = &reply["result"];
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"], json!({"name": "gitlab-mcp-server", "version": "1.2.3"}));
        assert_eq!(result["capabilities"]["logging"], json!({}));
        assert_eq!(
            result["capabilities"]["resources"],
            json!({"subscribe": true, "listChanged": true})
        );
    }

    #[tokio::test]
    async fn hard_failure_is_internal_error() {
        let stub = StubGitLab::new().failing("get_issue", "boom").shared();
        let server = server_with(stub, true);
        let reply = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "get_issue", "arguments": {"namespace": "n", "project": "p", "id": 1}},
            }),
        )
        .await;
        assert_eq!(reply["id"], 3);
        assert_eq!(reply["error"]["code"], -32603);
        assert_eq!(reply["error"]["message"], "failed to get issue: boom");
    }

    #[tokio::test]
    async fn soft_failure_is_error_envelope() {
        let server = offline_server(false);
        let reply = roundtrip(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "tools/call",
                "params": {"name": "update_merge_request", "arguments": {"namespace": "n", "project": "p", "id": "x1"}},
            }),
        )
        .await;
        assert!(reply.get("error").is_none());
        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("invalid merge request ID: "));
    }

    #[tokio::test]
    async fn successful_call_has_text_content() {
        let stub = StubGitLab::new()
            .with_current_user(fixtures::user("me", "Me", "me@example.com"))
            .shared();
        let server = server_with(stub, true);
        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call", "params": {"name": "get_me"}}),
        )
        .await;
        assert_eq!(
            reply["result"],
            json!({"content": [{"type": "text", "text": "Username: me\nName: Me\nEmail: me@example.com"}]})
        );
    }

    #[tokio::test]
    async fn resources_read_and_not_found() {
        let stub = StubGitLab::new()
            .with_merge_request(fixtures::merge_request(1, "T", "D", "opened"))
            .shared();
        let server = server_with(stub, true);

        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 6, "method": "resources/read", "params": {"uri": "repo://n/p/merge_requests/1"}}),
        )
        .await;
        assert_eq!(
            reply["result"]["contents"][0],
            json!({"uri": "repo://n/p/merge_requests/1", "mimeType": "text/plain", "text": "Title: T\nDescription: D\nState: opened"})
        );

        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "resources/read", "params": {"uri": "repo://n/p/wiki"}}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32002);
        assert_eq!(reply["error"]["message"], "resource 'repo://n/p/wiki' not found");
    }

    #[tokio::test]
    async fn templates_list_has_five_entries() {
        let server = offline_server(true);
        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 8, "method": "resources/templates/list"}),
        )
        .await;
        assert_eq!(reply["result"]["resourceTemplates"].as_array().unwrap().len(), 5);

        let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 9, "method": "resources/list"})).await;
        assert_eq!(reply["result"], json!({"resources": []}));
    }

    #[tokio::test]
    async fn unknown_method_and_parse_error() {
        let server = offline_server(true);
        let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 10, "method": "prompts/list"})).await;
        assert_eq!(reply["error"]["code"], -32601);

        let reply = server.handle_message("{not json").await.unwrap();
        let reply: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply["error"]["code"], -32700);

        let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 14, "params": {}})).await;
        assert_eq!(reply["id"], 14);
        assert_eq!(reply["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn notifications_get_no_reply() {
        let server = offline_server(true);
        let reply = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn ping_and_set_level_are_acknowledged() {
        let server = offline_server(true);
        let reply = roundtrip(&server, json!({"jsonrpc": "2.0", "id": 11, "method": "ping"})).await;
        assert_eq!(reply["result"], json!({}));
        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 12, "method": "logging/setLevel", "params": {"level": "debug"}}),
        )
        .await;
        assert_eq!(reply["result"], json!({}));
    }

    #[tokio::test]
    async fn malformed_call_params_are_invalid_params() {
        let server = offline_server(true);
        let reply = roundtrip(
            &server,
            json!({"jsonrpc": "2.0", "id": 13, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32602);
    }
}
