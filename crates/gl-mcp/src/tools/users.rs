//! User tools

use super::bind;
use crate::context::Deps;
use crate::error::HandlerError;
use crate::params::Arguments;
use crate::tool::{Tool, ToolDescriptor, ToolResult};

/// Details of the authenticated user. Takes no arguments.
pub fn get_me(deps: &Deps) -> Tool {
    let descriptor = ToolDescriptor::new(
        "get_me",
        deps.t(
            "TOOL_GET_ME_DESCRIPTION",
            "Get information about the authenticated user",
        ),
    );
    Tool::new(descriptor, bind(deps, handle_get_me))
}

async fn handle_get_me(deps: Deps, _args: Arguments) -> Result<ToolResult, HandlerError> {
    let client = deps.client()?;
    let user = client
        .users()
        .current_user()
        .await
        .map_err(HandlerError::upstream("get current user"))?
        .into_value();

    Ok(ToolResult::text(format!(
        "Username: {}\nName: {}\nEmail: {}",
        user.username, user.name, user.email
    )))
}
