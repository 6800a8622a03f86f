//! Repository tools

use gl_upstream::{ListProjectsOptions, project_id};

use super::{bind, expect_status, json_text, project_params};
use crate::context::Deps;
use crate::error::HandlerError;
use crate::params::{Arguments, optional_filter, required_param};
use crate::tool::{ErrorPolicy, Tool, ToolDescriptor, ToolResult};

pub fn get_repository(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_repository",
        deps.t("TOOL_GET_REPOSITORY_DESCRIPTION", "Get a specific repository"),
    );
    Tool::new(project_params(descriptor, deps), bind(deps, handle_get_repository))
}

/// Looks the project up through instance search and reports the first hit.
async fn handle_get_repository(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let namespace = required_param::<String>(&args, "namespace")?;
    let project = required_param::<String>(&args, "project")?;
    let query = project_id(&namespace, &project);

    let client = deps.client()?;
    let projects = client
        .search()
        .projects(&query)
        .await
        .map_err(HandlerError::upstream("get repository"))?
        .into_value();

    let project = projects
        .first()
        .ok_or(HandlerError::NotFound("repository"))?;

    Ok(ToolResult::text(format!(
        "Name: {}\nPath: {}\nURL: {}",
        project.name, project.path_with_namespace, project.web_url
    )))
}

pub fn list_repositories(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "list_repositories",
        deps.t("TOOL_LIST_REPOSITORIES_DESCRIPTION", "List repositories"),
    )
    .with_policy(ErrorPolicy::SOFT)
    .optional_string(
        "namespace",
        deps.t(
            "PARAM_NAMESPACE_FILTER_DESCRIPTION",
            "The namespace to list repositories from",
        ),
    )
    .optional_string("search", deps.t("PARAM_SEARCH_DESCRIPTION", "Search query"))
    .optional_string("order_by", deps.t("PARAM_ORDER_BY_DESCRIPTION", "Order by field"))
    .optional_string("sort", deps.t("PARAM_SORT_DESCRIPTION", "Sort order"));
    Tool::new(descriptor, bind(deps, handle_list_repositories))
}

async fn handle_list_repositories(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    const OPERATION: &str = "list repositories";

    // A namespace restricts the listing to projects the caller owns.
    let owned = optional_filter(&args, "namespace")?.map(|_| true);
    let opts = ListProjectsOptions {
        owned,
        search: optional_filter(&args, "search")?,
        order_by: optional_filter(&args, "order_by")?,
        sort: optional_filter(&args, "sort")?,
    };

    let client = deps.client()?;
    let response = client
        .projects()
        .list_projects(&opts)
        .await
        .map_err(HandlerError::upstream(OPERATION))?;
    let projects = expect_status(response, 200, OPERATION)?;

    json_text(&projects)
}

pub fn search_repositories(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "search_repositories",
        deps.t("TOOL_SEARCH_REPOSITORIES_DESCRIPTION", "Search for repositories"),
    )
    .with_policy(ErrorPolicy::SOFT)
    .required_string("query", deps.t("PARAM_QUERY_DESCRIPTION", "Search query"));
    Tool::new(descriptor, bind(deps, handle_search_repositories))
}

async fn handle_search_repositories(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    const OPERATION: &str = "search repositories";

    let query = required_param::<String>(&args, "query")?;
    let opts = ListProjectsOptions {
        search: Some(query),
        ..Default::default()
    };

    let client = deps.client()?;
    let response = client
        .projects()
        .list_projects(&opts)
        .await
        .map_err(HandlerError::upstream(OPERATION))?;
    let projects = expect_status(response, 200, OPERATION)?;

    json_text(&projects)
}
