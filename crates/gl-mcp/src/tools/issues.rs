//! Issue tools

use gl_upstream::{
    CreateIssueOptions, CreateNoteOptions, ListProjectIssuesOptions, UpdateIssueOptions,
};

use super::{bind, json_text, project_arg, project_params};
use crate::context::Deps;
use crate::error::HandlerError;
use crate::params::{Arguments, optional_filter, present_param, required_int, required_param};
use crate::tool::{ErrorPolicy, Tool, ToolDescriptor, ToolResult};

fn issue_id_param(descriptor: ToolDescriptor, deps: &Deps) -> ToolDescriptor {
    descriptor.required_number("id", deps.t("PARAM_ISSUE_ID_DESCRIPTION", "The ID of the issue"))
}

pub fn get_issue(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_issue",
        deps.t("TOOL_GET_ISSUE_DESCRIPTION", "Get a specific issue"),
    );
    let descriptor = issue_id_param(project_params(descriptor, deps), deps);
    Tool::new(descriptor, bind(deps, handle_get_issue))
}

async fn handle_get_issue(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let id = required_int(&args, "id")?;

    let client = deps.client()?;
    let issue = client
        .issues()
        .get_issue(&project, id)
        .await
        .map_err(HandlerError::upstream("get issue"))?
        .into_value();

    Ok(ToolResult::text(format!(
        "Title: {}\nState: {}\nAuthor: {}",
        issue.title, issue.state, issue.author.name
    )))
}

pub fn list_issues(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "list_issues",
        deps.t("TOOL_LIST_ISSUES_DESCRIPTION", "List issues in a project"),
    );
    let descriptor = project_params(descriptor, deps)
        .optional_string(
            "state",
            deps.t("PARAM_ISSUE_STATE_FILTER_DESCRIPTION", "Filter by state (opened/closed/all)"),
        )
        .optional_string("order_by", deps.t("PARAM_ORDER_BY_DESCRIPTION", "Order by field"))
        .optional_string("sort", deps.t("PARAM_SORT_DESCRIPTION", "Sort order"))
        .optional_string("search", deps.t("PARAM_SEARCH_DESCRIPTION", "Search query"));
    Tool::new(descriptor, bind(deps, handle_list_issues))
}

async fn handle_list_issues(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let opts = ListProjectIssuesOptions {
        state: optional_filter(&args, "state")?,
        order_by: optional_filter(&args, "order_by")?,
        sort: optional_filter(&args, "sort")?,
        search: optional_filter(&args, "search")?,
    };

    let client = deps.client()?;
    let issues = client
        .issues()
        .list_project_issues(&project, &opts)
        .await
        .map_err(HandlerError::upstream("list issues"))?
        .into_value();

    json_text(&issues)
}

pub fn search_issues(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "search_issues",
        deps.t("TOOL_SEARCH_ISSUES_DESCRIPTION", "Search for issues in a project"),
    )
    .with_policy(ErrorPolicy::SOFT_ARGUMENTS);
    let descriptor = project_params(descriptor, deps)
        .required_string("query", deps.t("PARAM_SEARCH_QUERY_DESCRIPTION", "The search query"));
    Tool::new(descriptor, bind(deps, handle_search_issues))
}

async fn handle_search_issues(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let query = required_param::<String>(&args, "query")?;
    let opts = ListProjectIssuesOptions {
        search: Some(query),
        ..Default::default()
    };

    let client = deps.client()?;
    let issues = client
        .issues()
        .list_project_issues(&project, &opts)
        .await
        .map_err(HandlerError::upstream("search issues"))?
        .into_value();

    json_text(&issues)
}

pub fn get_issue_comments(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_issue_comments",
        deps.t("TOOL_GET_ISSUE_COMMENTS_DESCRIPTION", "Get comments on an issue"),
    )
    .with_policy(ErrorPolicy::SOFT_ARGUMENTS);
    let descriptor = issue_id_param(project_params(descriptor, deps), deps);
    Tool::new(descriptor, bind(deps, handle_get_issue_comments))
}

async fn handle_get_issue_comments(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let id = required_int(&args, "id")?;

    let client = deps.client()?;
    let notes = client
        .notes()
        .list_issue_notes(&project, id)
        .await
        .map_err(HandlerError::upstream("get issue comments"))?
        .into_value();

    json_text(&notes)
}

pub fn create_issue(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "create_issue",
        deps.t("TOOL_CREATE_ISSUE_DESCRIPTION", "Create a new issue"),
    )
    .with_policy(ErrorPolicy::SOFT_ARGUMENTS);
    let descriptor = project_params(descriptor, deps)
        .required_string(
            "title",
            deps.t("PARAM_ISSUE_TITLE_DESCRIPTION", "The title of the issue"),
        )
        .optional_string(
            "description",
            deps.t(
                "PARAM_ISSUE_DESCRIPTION_DESCRIPTION",
                "The description of the issue",
            ),
        );
    Tool::new(descriptor, bind(deps, handle_create_issue))
}

async fn handle_create_issue(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let title = required_param::<String>(&args, "title")?;
    let opts = CreateIssueOptions {
        title,
        description: present_param(&args, "description"),
    };

    let client = deps.client()?;
    let issue = client
        .issues()
        .create_issue(&project, &opts)
        .await
        .map_err(HandlerError::upstream("create issue"))?
        .into_value();

    json_text(&issue)
}

pub fn add_issue_comment(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "add_issue_comment",
        deps.t("TOOL_ADD_ISSUE_COMMENT_DESCRIPTION", "Add a comment to an issue"),
    )
    .with_policy(ErrorPolicy::SOFT_ARGUMENTS);
    let descriptor = issue_id_param(project_params(descriptor, deps), deps)
        .required_string("body", deps.t("PARAM_COMMENT_BODY_DESCRIPTION", "The comment text"));
    Tool::new(descriptor, bind(deps, handle_add_issue_comment))
}

async fn handle_add_issue_comment(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let id = required_int(&args, "id")?;
    let body = required_param::<String>(&args, "body")?;

    let client = deps.client()?;
    let note = client
        .notes()
        .create_issue_note(&project, id, &CreateNoteOptions { body })
        .await
        .map_err(HandlerError::upstream("add issue comment"))?
        .into_value();

    json_text(&note)
}

pub fn update_issue(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "update_issue",
        deps.t("TOOL_UPDATE_ISSUE_DESCRIPTION", "Update an issue"),
    )
    .with_policy(ErrorPolicy::SOFT_ARGUMENTS);
    let descriptor = issue_id_param(project_params(descriptor, deps), deps)
        .optional_string(
            "title",
            deps.t("PARAM_ISSUE_TITLE_DESCRIPTION", "The new title of the issue"),
        )
        .optional_string(
            "description",
            deps.t(
                "PARAM_ISSUE_DESCRIPTION_DESCRIPTION",
                "The new description of the issue",
            ),
        )
        .optional_string(
            "state_event",
            deps.t(
                "PARAM_ISSUE_STATE_DESCRIPTION",
                "The new state of the issue (close/reopen)",
            ),
        );
    Tool::new(descriptor, bind(deps, handle_update_issue))
}

async fn handle_update_issue(deps: Deps, args: Arguments) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let id = required_int(&args, "id")?;
    let opts = UpdateIssueOptions {
        title: present_param(&args, "title"),
        description: present_param(&args, "description"),
        state_event: present_param(&args, "state_event"),
    };

    let client = deps.client()?;
    let issue = client
        .issues()
        .update_issue(&project, id, &opts)
        .await
        .map_err(HandlerError::upstream("update issue"))?
        .into_value();

    json_text(&issue)
}
