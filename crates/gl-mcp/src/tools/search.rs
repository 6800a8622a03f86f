//! Instance-wide search tools

use super::{bind, json_text};
use crate::context::Deps;
use crate::error::HandlerError;
use crate::params::{Arguments, required_param};
use crate::tool::{Tool, ToolDescriptor, ToolResult};

fn query_tool(deps: &Deps, name: &str, key: &str, default: &str) -> ToolDescriptor {
    ToolDescriptor::new(name, deps.t(key, default))
        .required_string("query", deps.t("PARAM_QUERY_DESCRIPTION", "Search query"))
}

pub fn search_projects(deps: &Deps) -> Tool {
    let descriptor = query_tool(
        deps,
        "search_projects",
        "TOOL_SEARCH_PROJECTS_DESCRIPTION",
        "Search for GitLab projects",
    );
    Tool::new(descriptor, bind(deps, handle_search_projects))
}

async fn handle_search_projects(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let query = required_param::<String>(&args, "query")?;
    let client = deps.client()?;
    let projects = client
        .search()
        .projects(&query)
        .await
        .map_err(HandlerError::upstream("search projects"))?
        .into_value();
    json_text(&projects)
}

pub fn search_merge_requests(deps: &Deps) -> Tool {
    let descriptor = query_tool(
        deps,
        "search_merge_requests",
        "TOOL_SEARCH_MERGE_REQUESTS_DESCRIPTION",
        "Search for GitLab merge requests",
    );
    Tool::new(descriptor, bind(deps, handle_search_merge_requests))
}

async fn handle_search_merge_requests(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let query = required_param::<String>(&args, "query")?;
    let client = deps.client()?;
    let mrs = client
        .search()
        .merge_requests(&query)
        .await
        .map_err(HandlerError::upstream("search merge requests"))?
        .into_value();
    json_text(&mrs)
}

pub fn search_users(deps: &Deps) -> Tool {
    let descriptor = query_tool(
        deps,
        "search_users",
        "TOOL_SEARCH_USERS_DESCRIPTION",
        "Search for GitLab users",
    );
    Tool::new(descriptor, bind(deps, handle_search_users))
}

async fn handle_search_users(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let query = required_param::<String>(&args, "query")?;
    let client = deps.client()?;
    let users = client
        .search()
        .users(&query)
        .await
        .map_err(HandlerError::upstream("search users"))?
        .into_value();
    json_text(&users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{call, deps, hard_error, offline_deps, success_text};
    use gl_test_utils::{StubGitLab, fixtures};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn search_projects_returns_json_list() {
        let stub = StubGitLab::new()
            .with_search_projects(vec![fixtures::project("Test Project", "ns/test-project")])
            .shared();
        let tool = search_projects(&deps(&stub));
        let text = success_text(call(&tool, json!({"query": "test"})).await);
        let projects: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(projects[0]["name"], "Test Project");
        assert_eq!(
            stub.last_call("search_projects").unwrap().target.as_deref(),
            Some("test")
        );
    }

    #[tokio::test]
    async fn search_merge_requests_returns_json_list() {
        let stub = StubGitLab::new()
            .with_search_merge_requests(vec![fixtures::merge_request(1, "Fix", "", "opened")])
            .shared();
        let tool = search_merge_requests(&deps(&stub));
        let text = success_text(call(&tool, json!({"query": "fix"})).await);
        assert!(text.contains("\"title\":\"Fix\""));
    }

    #[tokio::test]
    async fn search_users_upstream_failure_is_hard() {
        let stub = StubGitLab::new().failing("search_users", "timeout").shared();
        let tool = search_users(&deps(&stub));
        let err = hard_error(call(&tool, json!({"query": "ann"})).await);
        assert_eq!(err.to_string(), "failed to search users: timeout");
    }

    #[rstest]
    #[case::projects(search_projects)]
    #[case::merge_requests(search_merge_requests)]
    #[case::users(search_users)]
    #[tokio::test]
    async fn missing_query_never_reaches_client(#[case] build: fn(&Deps) -> Tool) {
        let tool = build(&offline_deps());
        let err = hard_error(call(&tool, json!({})).await);
        assert_eq!(err.to_string(), "missing required parameter: query");
    }
}
