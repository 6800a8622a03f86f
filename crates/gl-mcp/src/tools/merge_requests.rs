//! Merge request tools
//!
//! `get_merge_request` takes a numeric `id` like the issue tools. The
//! comment and update tools take the id as a string and parse it, reporting
//! a malformed value as `InvalidIdentifier`. Those tools also check the
//! response status and report every failure as a soft tool error.

use gl_upstream::{
    CreateMergeRequestOptions, CreateNoteOptions, ListProjectMergeRequestsOptions,
    UpdateMergeRequestOptions,
};

use super::{bind, expect_status, json_text, mr_iid, project_arg, project_params};
use crate::context::Deps;
use crate::error::HandlerError;
use crate::params::{Arguments, optional_filter, present_param, required_int, required_param};
use crate::tool::{ErrorPolicy, Tool, ToolDescriptor, ToolResult};

const MR_ID_KEY: &str = "PARAM_MERGE_REQUEST_ID_DESCRIPTION";
const MR_ID_DEFAULT: &str = "The ID of the merge request";

pub fn get_merge_request(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_merge_request",
        deps.t("TOOL_GET_MERGE_REQUEST_DESCRIPTION", "Get a specific merge request"),
    );
    let descriptor =
        project_params(descriptor, deps).required_number("id", deps.t(MR_ID_KEY, MR_ID_DEFAULT));
    Tool::new(descriptor, bind(deps, handle_get_merge_request))
}

async fn handle_get_merge_request(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let id = required_int(&args, "id")?;

    let client = deps.client()?;
    let mr = client
        .merge_requests()
        .get_merge_request(&project, id)
        .await
        .map_err(HandlerError::upstream("get merge request"))?
        .into_value();

    Ok(ToolResult::text(format!(
        "Title: {}\nDescription: {}\nState: {}\nAuthor: {}",
        mr.title, mr.description, mr.state, mr.author.name
    )))
}

pub fn list_merge_requests(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "list_merge_requests",
        deps.t(
            "TOOL_LIST_MERGE_REQUESTS_DESCRIPTION",
            "List merge requests in a project",
        ),
    );
    let descriptor = project_params(descriptor, deps)
        .optional_string(
            "state",
            deps.t(
                "PARAM_MERGE_REQUEST_STATE_FILTER_DESCRIPTION",
                "Filter by state (opened/closed/merged/all)",
            ),
        )
        .optional_string("order_by", deps.t("PARAM_ORDER_BY_DESCRIPTION", "Order by field"))
        .optional_string("sort", deps.t("PARAM_SORT_DESCRIPTION", "Sort order"))
        .optional_string("search", deps.t("PARAM_SEARCH_DESCRIPTION", "Search query"));
    Tool::new(descriptor, bind(deps, handle_list_merge_requests))
}

async fn handle_list_merge_requests(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let opts = ListProjectMergeRequestsOptions {
        state: optional_filter(&args, "state")?,
        order_by: optional_filter(&args, "order_by")?,
        sort: optional_filter(&args, "sort")?,
        search: optional_filter(&args, "search")?,
    };

    let client = deps.client()?;
    let mrs = client
        .merge_requests()
        .list_project_merge_requests(&project, &opts)
        .await
        .map_err(HandlerError::upstream("list merge requests"))?
        .into_value();

    json_text(&mrs)
}

pub fn get_merge_request_comments(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_merge_request_comments",
        deps.t(
            "TOOL_GET_MERGE_REQUEST_COMMENTS_DESCRIPTION",
            "Get comments for a merge request",
        ),
    )
    .with_policy(ErrorPolicy::SOFT);
    let descriptor =
        project_params(descriptor, deps).required_string("id", deps.t(MR_ID_KEY, MR_ID_DEFAULT));
    Tool::new(descriptor, bind(deps, handle_get_merge_request_comments))
}

async fn handle_get_merge_request_comments(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    const OPERATION: &str = "get merge request comments";

    let project = project_arg(&args)?;
    let iid = mr_iid(&args)?;

    let client = deps.client()?;
    let response = client
        .notes()
        .list_merge_request_notes(&project, iid)
        .await
        .map_err(HandlerError::upstream(OPERATION))?;
    let notes = expect_status(response, 200, OPERATION)?;

    json_text(&notes)
}

pub fn create_merge_request(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "create_merge_request",
        deps.t("TOOL_CREATE_MERGE_REQUEST_DESCRIPTION", "Create a new merge request"),
    )
    .with_policy(ErrorPolicy::SOFT);
    let descriptor = project_params(descriptor, deps)
        .required_string(
            "title",
            deps.t(
                "PARAM_MERGE_REQUEST_TITLE_DESCRIPTION",
                "The title of the merge request",
            ),
        )
        .required_string(
            "description",
            deps.t(
                "PARAM_MERGE_REQUEST_DESCRIPTION_DESCRIPTION",
                "The description of the merge request",
            ),
        )
        .required_string(
            "source_branch",
            deps.t("PARAM_SOURCE_BRANCH_DESCRIPTION", "The source branch"),
        )
        .required_string(
            "target_branch",
            deps.t("PARAM_TARGET_BRANCH_DESCRIPTION", "The target branch"),
        );
    Tool::new(descriptor, bind(deps, handle_create_merge_request))
}

async fn handle_create_merge_request(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    let project = project_arg(&args)?;
    let opts = CreateMergeRequestOptions {
        title: required_param(&args, "title")?,
        description: required_param(&args, "description")?,
        source_branch: required_param(&args, "source_branch")?,
        target_branch: required_param(&args, "target_branch")?,
    };

    let client = deps.client()?;
    let mr = client
        .merge_requests()
        .create_merge_request(&project, &opts)
        .await
        .map_err(HandlerError::upstream("create merge request"))?
        .into_value();

    json_text(&mr)
}

pub fn add_merge_request_comment(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "add_merge_request_comment",
        deps.t(
            "TOOL_ADD_MERGE_REQUEST_COMMENT_DESCRIPTION",
            "Add a comment to a merge request",
        ),
    )
    .with_policy(ErrorPolicy::SOFT);
    let descriptor = project_params(descriptor, deps)
        .required_string("id", deps.t(MR_ID_KEY, MR_ID_DEFAULT))
        .required_string(
            "body",
            deps.t("PARAM_COMMENT_BODY_DESCRIPTION", "The body of the comment"),
        );
    Tool::new(descriptor, bind(deps, handle_add_merge_request_comment))
}

async fn handle_add_merge_request_comment(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    const OPERATION: &str = "add comment";

    let project = project_arg(&args)?;
    let iid = mr_iid(&args)?;
    let body = required_param::<String>(&args, "body")?;

    let client = deps.client()?;
    let response = client
        .notes()
        .create_merge_request_note(&project, iid, &CreateNoteOptions { body })
        .await
        .map_err(HandlerError::upstream(OPERATION))?;
    let note = expect_status(response, 201, OPERATION)?;

    json_text(&note)
}

pub fn update_merge_request(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "update_merge_request",
        deps.t("TOOL_UPDATE_MERGE_REQUEST_DESCRIPTION", "Update a merge request"),
    )
    .with_policy(ErrorPolicy::SOFT);
    let descriptor = project_params(descriptor, deps)
        .required_string("id", deps.t(MR_ID_KEY, MR_ID_DEFAULT))
        .optional_string(
            "title",
            deps.t(
                "PARAM_MERGE_REQUEST_TITLE_DESCRIPTION",
                "The new title of the merge request",
            ),
        )
        .optional_string(
            "description",
            deps.t(
                "PARAM_MERGE_REQUEST_DESCRIPTION_DESCRIPTION",
                "The new description of the merge request",
            ),
        )
        .optional_string(
            "state_event",
            deps.t(
                "PARAM_MERGE_REQUEST_STATE_DESCRIPTION",
                "The new state of the merge request (close/reopen)",
            ),
        );
    Tool::new(descriptor, bind(deps, handle_update_merge_request))
}

async fn handle_update_merge_request(
    deps: Deps,
    args: Arguments,
) -> Result<ToolResult, HandlerError> {
    const OPERATION: &str = "update merge request";

    let project = project_arg(&args)?;
    let iid = mr_iid(&args)?;
    let opts = UpdateMergeRequestOptions {
        title: present_param(&args, "title"),
        description: present_param(&args, "description"),
        state_event: present_param(&args, "state_event"),
    };

    let client = deps.client()?;
    let response = client
        .merge_requests()
        .update_merge_request(&project, iid, &opts)
        .await
        .map_err(HandlerError::upstream(OPERATION))?;
    let mr = expect_status(response, 200, OPERATION)?;

    json_text(&mr)
}
