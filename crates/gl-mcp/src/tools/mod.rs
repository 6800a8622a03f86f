//! GitLab tool definitions
//!
//! Each submodule exposes one constructor per tool. A constructor takes the
//! shared [`Deps`] record and returns a [`Tool`] whose handler captures a
//! clone of it.
//!
//! Handlers follow the same shape:
//!
//! 1. extract and validate every argument
//! 2. acquire the client
//! 3. call one upstream operation and check its status where required
//! 4. format a text summary or a JSON dump of the result

use std::future::Future;

use gl_upstream::{Response, project_id};
use serde::Serialize;

use crate::context::{Deps, RequestContext};
use crate::error::HandlerError;
use crate::params::{Arguments, required_param, required_string};
use crate::tool::{Tool, ToolDescriptor, ToolResult};

pub mod issues;
pub mod merge_requests;
pub mod repositories;
pub mod search;
pub mod users;

/// Tools registered in every mode.
pub fn read_only_tools(deps: &Deps) -> Vec<Tool> {
    vec![
        issues::get_issue(deps),
        issues::list_issues(deps),
        issues::search_issues(deps),
        issues::get_issue_comments(deps),
        merge_requests::get_merge_request(deps),
        merge_requests::list_merge_requests(deps),
        merge_requests::get_merge_request_comments(deps),
        repositories::get_repository(deps),
        repositories::list_repositories(deps),
        repositories::search_repositories(deps),
        search::search_projects(deps),
        search::search_merge_requests(deps),
        search::search_users(deps),
        users::get_me(deps),
    ]
}

/// Tools that create or modify upstream state.
pub fn mutating_tools(deps: &Deps) -> Vec<Tool> {
    vec![
        issues::create_issue(deps),
        issues::add_issue_comment(deps),
        issues::update_issue(deps),
        merge_requests::create_merge_request(deps),
        merge_requests::add_merge_request_comment(deps),
        merge_requests::update_merge_request(deps),
    ]
}

/// Adapt an `async fn(Deps, Arguments)` handler to the [`Tool`] signature.
pub(crate) fn bind<F, Fut>(
    deps: &Deps,
    handler: F,
) -> impl Fn(RequestContext, Arguments) -> Fut + Send + Sync + 'static
where
    F: Fn(Deps, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolResult, HandlerError>> + Send + 'static,
{
    let deps = deps.clone();
    move |_ctx, args| handler(deps.clone(), args)
}

/// Add the `namespace` and `project` parameters every project-scoped tool takes.
pub(crate) fn project_params(descriptor: ToolDescriptor, deps: &Deps) -> ToolDescriptor {
    descriptor
        .required_string(
            "namespace",
            deps.t("PARAM_NAMESPACE_DESCRIPTION", "The namespace of the project"),
        )
        .required_string(
            "project",
            deps.t("PARAM_PROJECT_DESCRIPTION", "The name of the project"),
        )
}

/// `"namespace/project"` from the call arguments.
pub(crate) fn project_arg(args: &Arguments) -> Result<String, HandlerError> {
    let namespace = required_param::<String>(args, "namespace")?;
    let project = required_param::<String>(args, "project")?;
    Ok(project_id(&namespace, &project))
}

/// Merge request identifiers arrive as strings and are parsed here.
pub(crate) fn mr_iid(args: &Arguments) -> Result<i64, HandlerError> {
    let raw = required_string(args, "id")?;
    raw.parse::<i64>()
        .map_err(|source| HandlerError::InvalidIdentifier {
            entity: "merge request",
            source,
        })
}

/// Compact JSON dump of an upstream value.
pub(crate) fn json_text<T: Serialize>(value: &T) -> Result<ToolResult, HandlerError> {
    Ok(ToolResult::text(serde_json::to_string(value)?))
}

/// Unwrap a response, failing unless it carries `expected`.
pub(crate) fn expect_status<T>(
    response: Response<T>,
    expected: u16,
    operation: &'static str,
) -> Result<T, HandlerError> {
    if response.status != expected {
        return Err(HandlerError::UnexpectedStatus {
            operation,
            status: response.status,
            body: response.body,
        });
    }
    Ok(response.value)
}
