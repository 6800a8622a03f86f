//! Stdio Session Integration Tests
//!
//! Runs complete client sessions through `gl_mcp::serve` over in-memory
//! pipes, with the catalog built the way an embedding binary builds it:
//! configuration, translations, client accessor, server.

use std::collections::HashMap;
use std::sync::Arc;

use figment::Jail;
use gl_mcp::{
    ClientAccessor, GitLabMcpServer, ServerConfig, ServerOptions, SharedClient, Translations,
    TransportOptions, serve,
};
use gl_test_utils::{StubGitLab, fixtures};
use gl_upstream::{GitLab, UpstreamError};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Feed `requests` to a fresh transport and collect every reply line.
async fn session(server: GitLabMcpServer, requests: &[Value]) -> Vec<Value> {
    let (mut client_in, server_in) = duplex(64 * 1024);
    let (server_out, mut client_out) = duplex(64 * 1024);

    let mut raw = String::new();
    for request in requests {
        raw.push_str(&request.to_string());
        raw.push('\n');
    }
    client_in.write_all(raw.as_bytes()).await.unwrap();
    drop(client_in);

    serve(
        Arc::new(server),
        server_in,
        server_out,
        TransportOptions::default(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let mut output = String::new();
    client_out.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn reply(replies: &[Value], id: i64) -> &Value {
    replies
        .iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("no reply with id {id} in {replies:?}"))
}

fn stub_server(stub: &Arc<StubGitLab>, config: &ServerConfig, t: &Arc<Translations>) -> GitLabMcpServer {
    let client: Arc<StubGitLab> = Arc::clone(stub);
    GitLabMcpServer::new(
        Arc::new(SharedClient::new(client)),
        "0.1.0",
        config.read_only,
        t.translator(),
        ServerOptions::default(),
    )
    .unwrap()
}

fn initialize(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "integration", "version": "1.0"},
        },
    })
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_full_read_write_session() {
    let stub = StubGitLab::new()
        .with_issue(fixtures::issue(5, "New bug", "opened", "Jane Doe"))
        .with_merge_request(fixtures::merge_request(3, "Fix", "Fixes the bug", "opened"))
        .shared();
    let config = ServerConfig::default();
    let server = stub_server(&stub, &config, &Arc::new(Translations::defaults()));

    let replies = session(
        server,
        &[
            initialize(1),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {
                    "name": "create_issue",
                    "arguments": {"namespace": "grp", "project": "app", "title": "New bug", "description": "It breaks"},
                },
            }),
            json!({
                "jsonrpc": "2.0",
                "id": 4,
                "method": "resources/read",
                "params": {"uri": "repo://grp/app/merge_requests/3"},
            }),
        ],
    )
    .await;

    assert_eq!(replies.len(), 4, "notification must not be answered");
    assert_eq!(reply(&replies, 1)["result"]["serverInfo"]["name"], "gitlab-mcp-server");
    assert_eq!(reply(&replies, 2)["result"]["tools"].as_array().unwrap().len(), 20);

    let created: Value =
        serde_json::from_str(reply(&replies, 3)["result"]["content"][0]["text"].as_str().unwrap())
            .unwrap();
    assert_eq!(created["title"], "New bug");
    let call = stub.last_call("create_issue").unwrap();
    assert_eq!(call.target.as_deref(), Some("grp/app"));
    assert_eq!(call.options["description"], "It breaks");

    assert_eq!(
        reply(&replies, 4)["result"]["contents"][0]["text"],
        "Title: Fix\nDescription: Fixes the bug\nState: opened"
    );
}

#[tokio::test]
async fn test_read_only_session_rejects_mutations() {
    let stub = StubGitLab::new().shared();
    let config = ServerConfig::from_toml("read_only = true").unwrap();
    let server = stub_server(&stub, &config, &Arc::new(Translations::defaults()));

    let replies = session(
        server,
        &[json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "update_issue", "arguments": {"namespace": "g", "project": "a", "id": 1}},
        })],
    )
    .await;

    assert_eq!(replies[0]["error"]["code"], -32602);
    assert_eq!(replies[0]["error"]["message"], "tool 'update_issue' not found");
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_translation_overrides_reach_tool_descriptions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gitlab-mcp-server-config.json");
    std::fs::write(
        &path,
        r#"{"TOOL_GET_ME_DESCRIPTION": "Who am I on GitLab"}"#,
    )
    .unwrap();

    let translations = Arc::new(Translations::from_file(&path).unwrap().with_env(|_| None));
    let stub = StubGitLab::new().shared();
    let server = stub_server(&stub, &ServerConfig::default(), &translations);

    let replies = session(
        server,
        &[json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})],
    )
    .await;
    let get_me = replies[0]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "get_me")
        .unwrap()
        .clone();
    assert_eq!(get_me["description"], "Who am I on GitLab");

    // Every description resolved while building the catalog is recorded.
    let used: HashMap<String, String> = translations.used().into_iter().collect();
    assert_eq!(used["TOOL_GET_ME_DESCRIPTION"], "Who am I on GitLab");
    assert!(used.contains_key("TOOL_GET_ISSUE_DESCRIPTION"));

    let dump = dir.path().join("dump.json");
    translations.dump(&dump).unwrap();
    let dumped: Value = serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
    assert_eq!(dumped["TOOL_GET_ME_DESCRIPTION"], "Who am I on GitLab");
}

#[tokio::test]
async fn test_unavailable_client_is_reported_per_policy() {
    let accessor = || -> gl_upstream::Result<Arc<dyn GitLab>> {
        Err(UpstreamError::Unavailable("token rejected".to_string()))
    };
    let accessor: Arc<dyn ClientAccessor> = Arc::new(accessor);
    let translations = Arc::new(Translations::defaults());
    let server = GitLabMcpServer::new(
        accessor,
        "0.1.0",
        false,
        translations.translator(),
        ServerOptions::default(),
    )
    .unwrap();

    let replies = session(
        server,
        &[
            // HARD policy: protocol error
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "get_me"}}),
            // SOFT policy: error envelope
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "get_merge_request_comments", "arguments": {"namespace": "g", "project": "a", "id": "1"}},
            }),
        ],
    )
    .await;

    let hard = reply(&replies, 1);
    assert_eq!(hard["error"]["code"], -32603);
    assert_eq!(
        hard["error"]["message"],
        "failed to get GitLab client: client unavailable: token rejected"
    );

    let soft = reply(&replies, 2);
    assert_eq!(soft["result"]["isError"], true);
    assert_eq!(
        soft["result"]["content"][0]["text"],
        "failed to get GitLab client: client unavailable: token rejected"
    );
}

#[test]
fn test_config_resolution_for_embedding_binary() {
    Jail::expect_with(|jail| {
        jail.create_file("gl-mcp.toml", "read_only = true\nenable_command_logging = true\n")?;
        jail.set_env("GL_HOST", "https://gitlab.internal");
        jail.set_env("GITLAB_PERSONAL_ACCESS_TOKEN", "glpat-xyz");
        jail.set_env("APP_READ_ONLY", "false");

        let path = jail.directory().join("gl-mcp.toml");
        let config = ServerConfig::load(Some(&path)).map_err(|e| e.to_string())?;

        assert!(!config.read_only);
        assert!(config.enable_command_logging);
        assert_eq!(config.gitlab_host.as_deref(), Some("https://gitlab.internal"));
        assert_eq!(config.require_token().map_err(|e| e.to_string())?, "glpat-xyz");
        Ok(())
    });
}
