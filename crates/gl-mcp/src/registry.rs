//! Tool and resource catalog
//!
//! [`CatalogBuilder`] collects tools and resources, rejecting duplicate
//! names and templates. [`Catalog`] is the immutable result: it is shared
//! between request tasks and only ever read.

use std::collections::BTreeMap;

use crate::context::RequestContext;
use crate::error::{Error, HandlerError, RegistryError, Result};
use crate::params::Arguments;
use crate::resources::{Resource, ResourceContent, ResourceTemplate};
use crate::tool::{Tool, ToolDescriptor, ToolOutcome};

/// Mutable catalog under construction
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    tools: BTreeMap<String, Tool>,
    resources: Vec<Resource>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tool(&mut self, tool: Tool) -> std::result::Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn add_tools(
        &mut self,
        tools: impl IntoIterator<Item = Tool>,
    ) -> std::result::Result<(), RegistryError> {
        tools.into_iter().try_for_each(|tool| self.add_tool(tool))
    }

    pub fn add_resource(&mut self, resource: Resource) -> std::result::Result<(), RegistryError> {
        if self
            .resources
            .iter()
            .any(|r| r.uri_template() == resource.uri_template())
        {
            return Err(RegistryError::DuplicateResource(
                resource.uri_template().to_string(),
            ));
        }
        self.resources.push(resource);
        Ok(())
    }

    pub fn add_resources(
        &mut self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> std::result::Result<(), RegistryError> {
        resources
            .into_iter()
            .try_for_each(|resource| self.add_resource(resource))
    }

    pub fn build(self) -> Catalog {
        Catalog {
            tools: self.tools,
            resources: self.resources,
        }
    }
}

/// Immutable set of registered tools and resources
#[derive(Debug)]
pub struct Catalog {
    tools: BTreeMap<String, Tool>,
    resources: Vec<Resource>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Tool descriptors, sorted by name.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|t| &t.descriptor)
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Resource templates, in registration order.
    pub fn templates(&self) -> impl Iterator<Item = &ResourceTemplate> {
        self.resources.iter().map(|r| &r.template)
    }

    pub fn template_count(&self) -> usize {
        self.resources.len()
    }

    /// Invoke a tool by name.
    ///
    /// Only an unknown name is an `Err`; handler failures come back as a
    /// settled [`ToolOutcome`]. The handler is raced against the request's
    /// cancellation token, and an upstream call already in flight is left
    /// to finish on its own.
    pub async fn call_tool(
        &self,
        ctx: RequestContext,
        name: &str,
        args: Arguments,
    ) -> Result<ToolOutcome> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        tracing::debug!(tool = name, "Calling tool");
        let token = ctx.cancellation().clone();
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => ToolOutcome::HardError(HandlerError::Cancelled),
            outcome = tool.call(ctx, args) => outcome,
        };

        match &outcome {
            ToolOutcome::Success(_) => {}
            ToolOutcome::SoftError(message) => {
                tracing::warn!(tool = name, error = %message, "Tool returned an error result");
            }
            ToolOutcome::HardError(err) => {
                tracing::error!(tool = name, kind = err.kind(), error = %err, "Tool call failed");
            }
        }
        Ok(outcome)
    }

    /// Read the resource whose template first matches `uri`.
    pub async fn read_resource(
        &self,
        ctx: RequestContext,
        uri: &str,
    ) -> Result<Vec<ResourceContent>> {
        let (resource, request) = self
            .resources
            .iter()
            .find_map(|r| r.matches(uri).map(|req| (r, req)))
            .ok_or_else(|| Error::UnknownResource(uri.to_string()))?;
        let request = request.map_err(|err| {
            tracing::error!(uri, kind = err.kind(), error = %err, "Resource URI rejected");
            Error::Handler(err)
        })?;

        tracing::debug!(uri, template = resource.uri_template(), "Reading resource");
        let token = ctx.cancellation().clone();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(HandlerError::Cancelled),
            result = resource.read(ctx, request) => result,
        };

        result.map_err(|err| {
            tracing::error!(uri, kind = err.kind(), error = %err, "Resource read failed");
            Error::Handler(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::repository_resources;
    use crate::tool::{ErrorPolicy, ToolResult};
    use crate::tools::testing::{deps, offline_deps};
    use crate::tools::{mutating_tools, read_only_tools};
    use gl_test_utils::{StubGitLab, fixtures};
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    fn echo(name: &str) -> Tool {
        Tool::new(ToolDescriptor::new(name, "echo"), |_ctx, _args| async {
            Ok::<_, HandlerError>(ToolResult::text("echo"))
        })
    }

    fn stalled() -> Tool {
        Tool::new(
            ToolDescriptor::new("stalled", "never finishes").with_policy(ErrorPolicy::SOFT),
            |_ctx, _args| async {
                std::future::pending::<()>().await;
                Ok::<_, HandlerError>(ToolResult::text("late"))
            },
        )
    }

    #[test]
    fn duplicate_tool_is_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add_tool(echo("get_me")).unwrap();
        assert_eq!(
            builder.add_tool(echo("get_me")),
            Err(RegistryError::DuplicateTool("get_me".to_string()))
        );
    }

    #[test]
    fn duplicate_template_is_rejected() {
        let deps = offline_deps();
        let mut builder = CatalogBuilder::new();
        builder.add_resources(repository_resources(&deps).unwrap()).unwrap();
        let again = repository_resources(&deps).unwrap();
        assert!(matches!(
            builder.add_resources(again),
            Err(RegistryError::DuplicateResource(_))
        ));
    }

    #[test]
    fn tools_are_listed_by_name() {
        let mut builder = CatalogBuilder::new();
        builder
            .add_tools([echo("search_users"), echo("get_me"), echo("list_issues")])
            .unwrap();
        let catalog = builder.build();
        let names: Vec<&str> = catalog.tools().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["get_me", "list_issues", "search_users"]);
    }

    #[test]
    fn full_catalog_has_twenty_unique_tools() {
        let deps = offline_deps();
        let mut builder = CatalogBuilder::new();
        builder.add_tools(read_only_tools(&deps)).unwrap();
        builder.add_tools(mutating_tools(&deps)).unwrap();
        assert_eq!(builder.build().tool_count(), 20);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let catalog = CatalogBuilder::new().build();
        let err = catalog
            .call_tool(RequestContext::default(), "nope", Arguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "tool 'nope' not found");
    }

    #[tokio::test]
    async fn unknown_resource_is_an_error() {
        let mut builder = CatalogBuilder::new();
        builder
            .add_resources(repository_resources(&offline_deps()).unwrap())
            .unwrap();
        let err = builder
            .build()
            .read_resource(RequestContext::default(), "repo://ns/p/issues/1")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "resource 'repo://ns/p/issues/1' not found");
    }

    #[tokio::test]
    async fn read_resource_dispatches_to_matching_template() {
        let stub = StubGitLab::new()
            .with_merge_request(fixtures::merge_request(2, "T", "D", "opened"))
            .shared();
        let mut builder = CatalogBuilder::new();
        builder.add_resources(repository_resources(&deps(&stub)).unwrap()).unwrap();
        let contents = builder
            .build()
            .read_resource(RequestContext::default(), "repo://ns/p/merge_requests/2")
            .await
            .unwrap();
        assert_eq!(contents[0].text, "Title: T\nDescription: D\nState: opened");
    }

    #[tokio::test]
    async fn badly_encoded_uri_is_a_handler_error() {
        let mut builder = CatalogBuilder::new();
        builder
            .add_resources(repository_resources(&offline_deps()).unwrap())
            .unwrap();
        let err = builder
            .build()
            .read_resource(RequestContext::default(), "repo://ns/p%zz/merge_requests/2")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Handler(HandlerError::InvalidEncoding { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_call_is_hard_even_for_soft_tools() {
        let mut builder = CatalogBuilder::new();
        builder.add_tool(stalled()).unwrap();
        let catalog = builder.build();

        let token = CancellationToken::new();
        let ctx = RequestContext::new(None).with_cancellation(token.clone());
        token.cancel();

        let outcome = catalog
            .call_tool(ctx, "stalled", Arguments::new())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            ToolOutcome::HardError(HandlerError::Cancelled)
        ));
    }
}
