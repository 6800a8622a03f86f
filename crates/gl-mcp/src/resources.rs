//! Repository resources addressed by URI template
//!
//! Four templates expose file contents at the default ref, a branch, a
//! commit or a tag; they share one handler. A fifth exposes a merge request
//! summary. Every resource failure is a hard error.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gl_upstream::{GetFileOptions, project_id};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::{Deps, RequestContext};
use crate::error::{HandlerError, RegistryError};
use crate::tool::BoxFuture;
use crate::uri_template::{UriTemplate, UriVariables};

/// Ref used when the URI names no branch, commit or tag.
pub const DEFAULT_REF: &str = "HEAD";

const TEXT_PLAIN: &str = "text/plain";

/// Descriptive half of a resource template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    pub uri_template: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
}

impl ResourceTemplate {
    pub fn new(uri_template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: name.into(),
            description: None,
            mime_type: Some(TEXT_PLAIN.to_string()),
        }
    }

    /// Entry for a `resources/templates/list` response
    pub fn to_list_entry(&self) -> Value {
        let mut entry = json!({
            "uriTemplate": self.uri_template,
            "name": self.name,
        });
        if let Some(description) = &self.description {
            entry["description"] = json!(description);
        }
        if let Some(mime_type) = &self.mime_type {
            entry["mimeType"] = json!(mime_type);
        }
        entry
    }
}

/// One block of a `resources/read` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// A URI resolved against a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub uri: String,
    pub variables: UriVariables,
}

impl ResourceRequest {
    /// Value of a template variable, empty when absent.
    pub fn var(&self, name: &str) -> &str {
        self.variables.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// Type-erased resource handler
pub type ResourceHandler = Arc<
    dyn Fn(RequestContext, ResourceRequest) -> BoxFuture<'static, Result<Vec<ResourceContent>, HandlerError>>
        + Send
        + Sync,
>;

/// A registered resource: template, compiled matcher and handler.
#[derive(Clone)]
pub struct Resource {
    pub template: ResourceTemplate,
    matcher: UriTemplate,
    pub handler: ResourceHandler,
}

impl Resource {
    pub fn new<F, Fut>(template: ResourceTemplate, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(RequestContext, ResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<ResourceContent>, HandlerError>> + Send + 'static,
    {
        let matcher = UriTemplate::parse(&template.uri_template)?;
        let handler: ResourceHandler = Arc::new(
            move |ctx: RequestContext,
                  req: ResourceRequest|
                  -> BoxFuture<'static, Result<Vec<ResourceContent>, HandlerError>> {
                Box::pin(handler(ctx, req))
            },
        );
        Ok(Self {
            template,
            matcher,
            handler,
        })
    }

    pub fn uri_template(&self) -> &str {
        &self.template.uri_template
    }

    /// Resolve `uri` against this resource's template.
    pub fn matches(&self, uri: &str) -> Option<Result<ResourceRequest, HandlerError>> {
        let variables = self.matcher.matches(uri)?;
        Some(variables.map(|variables| ResourceRequest {
            uri: uri.to_string(),
            variables,
        }))
    }

    pub async fn read(
        &self,
        ctx: RequestContext,
        request: ResourceRequest,
    ) -> Result<Vec<ResourceContent>, HandlerError> {
        (self.handler)(ctx, request).await
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// The five repository resources, in match order.
pub fn repository_resources(deps: &Deps) -> Result<Vec<Resource>, RegistryError> {
    Ok(vec![
        repository_content(deps)?,
        repository_branch_content(deps)?,
        repository_commit_content(deps)?,
        repository_tag_content(deps)?,
        repository_merge_request(deps)?,
    ])
}

fn contents_resource(
    deps: &Deps,
    uri_template: &str,
    key: &str,
    default: &str,
) -> Result<Resource, RegistryError> {
    let template = ResourceTemplate::new(uri_template, deps.t(key, default));
    let deps = deps.clone();
    Resource::new(template, move |_ctx, req| read_contents(deps.clone(), req))
}

pub fn repository_content(deps: &Deps) -> Result<Resource, RegistryError> {
    contents_resource(
        deps,
        "repo://{namespace}/{project}/contents{/path*}",
        "RESOURCE_REPOSITORY_CONTENT_DESCRIPTION",
        "Repository Content",
    )
}

pub fn repository_branch_content(deps: &Deps) -> Result<Resource, RegistryError> {
    contents_resource(
        deps,
        "repo://{namespace}/{project}/refs/heads/{branch}/contents{/path*}",
        "RESOURCE_REPOSITORY_CONTENT_BRANCH_DESCRIPTION",
        "Repository Content for specific branch",
    )
}

pub fn repository_commit_content(deps: &Deps) -> Result<Resource, RegistryError> {
    contents_resource(
        deps,
        "repo://{namespace}/{project}/sha/{sha}/contents{/path*}",
        "RESOURCE_REPOSITORY_CONTENT_COMMIT_DESCRIPTION",
        "Repository Content for specific commit",
    )
}

pub fn repository_tag_content(deps: &Deps) -> Result<Resource, RegistryError> {
    contents_resource(
        deps,
        "repo://{namespace}/{project}/refs/tags/{tag}/contents{/path*}",
        "RESOURCE_REPOSITORY_CONTENT_TAG_DESCRIPTION",
        "Repository Content for specific tag",
    )
}

pub fn repository_merge_request(deps: &Deps) -> Result<Resource, RegistryError> {
    let template = ResourceTemplate::new(
        "repo://{namespace}/{project}/merge_requests/{id}",
        deps.t("RESOURCE_REPOSITORY_MERGE_REQUEST_DESCRIPTION", "Merge Request"),
    );
    let deps = deps.clone();
    Resource::new(template, move |_ctx, req| read_merge_request(deps.clone(), req))
}

/// The ref a contents URI names: branch, then commit, then tag.
fn resolve_ref(req: &ResourceRequest) -> String {
    ["branch", "sha", "tag"]
        .iter()
        .map(|name| req.var(name))
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_REF)
        .to_string()
}

async fn read_contents(
    deps: Deps,
    req: ResourceRequest,
) -> Result<Vec<ResourceContent>, HandlerError> {
    let project = project_id(req.var("namespace"), req.var("project"));
    let path = req.var("path");
    if path.is_empty() {
        return Err(HandlerError::MissingParameter("path".to_string()));
    }
    let opts = GetFileOptions {
        ref_name: resolve_ref(&req),
    };

    let client = deps.client()?;
    let file = client
        .repository_files()
        .get_file(&project, path, &opts)
        .await
        .map_err(HandlerError::upstream("get file"))?
        .into_value();

    // Encoded content may be wrapped across lines.
    let encoded: String = file.content.split_whitespace().collect();
    let decoded = STANDARD.decode(encoded)?;

    Ok(vec![ResourceContent {
        uri: req.uri.clone(),
        mime_type: TEXT_PLAIN.to_string(),
        text: String::from_utf8_lossy(&decoded).into_owned(),
    }])
}

async fn read_merge_request(
    deps: Deps,
    req: ResourceRequest,
) -> Result<Vec<ResourceContent>, HandlerError> {
    let project = project_id(req.var("namespace"), req.var("project"));
    let iid = req
        .var("id")
        .parse::<i64>()
        .map_err(|source| HandlerError::InvalidIdentifier {
            entity: "merge request",
            source,
        })?;

    let client = deps.client()?;
    let mr = client
        .merge_requests()
        .get_merge_request(&project, iid)
        .await
        .map_err(HandlerError::upstream("get merge request"))?
        .into_value();

    Ok(vec![ResourceContent {
        uri: req.uri.clone(),
        mime_type: TEXT_PLAIN.to_string(),
        text: format!(
            "Title: {}\nDescription: {}\nState: {}",
            mr.title, mr.description, mr.state
        ),
    }])
}
