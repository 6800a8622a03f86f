//! Tool descriptors, results and error policy
//!
//! A [`Tool`] pairs an immutable [`ToolDescriptor`] with a handler closure.
//! Handlers return `Result<ToolResult, HandlerError>`; the descriptor's
//! [`ErrorPolicy`] then decides whether a failure is reported to the agent as
//! a soft tool error or to the protocol layer as a hard failure.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::params::{Arguments, ParamKind};

/// Boxed, sendable future returned by handlers
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased tool handler
pub type ToolHandler = Arc<
    dyn Fn(RequestContext, Arguments) -> BoxFuture<'static, Result<ToolResult, HandlerError>>
        + Send
        + Sync,
>;

/// One declared tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

/// Where a class of failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Protocol-level error, the call fails
    Hard,
    /// Successful envelope with `isError: true`
    Soft,
}

/// Per-tool routing of failures.
///
/// Argument failures are the ones [`HandlerError::is_argument_error`]
/// reports; everything else (client acquisition, the upstream call, status
/// checks, serialisation) goes through the `upstream` channel. Cancellation
/// is always hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub arguments: Channel,
    pub upstream: Channel,
}

impl ErrorPolicy {
    pub const HARD: Self = Self {
        arguments: Channel::Hard,
        upstream: Channel::Hard,
    };

    pub const SOFT_ARGUMENTS: Self = Self {
        arguments: Channel::Soft,
        upstream: Channel::Hard,
    };

    pub const SOFT: Self = Self {
        arguments: Channel::Soft,
        upstream: Channel::Soft,
    };

    pub fn channel_for(&self, err: &HandlerError) -> Channel {
        match err {
            HandlerError::Cancelled => Channel::Hard,
            e if e.is_argument_error() => self.arguments,
            _ => self.upstream,
        }
    }

    /// Turn a handler result into the outcome the caller sees.
    pub fn settle(&self, result: Result<ToolResult, HandlerError>) -> ToolOutcome {
        match result {
            Ok(content) => ToolOutcome::Success(content),
            Err(err) => match self.channel_for(&err) {
                Channel::Soft => ToolOutcome::SoftError(err.to_string()),
                Channel::Hard => ToolOutcome::HardError(err),
            },
        }
    }
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self::HARD
    }
}

/// Settled result of a tool call
#[derive(Debug)]
pub enum ToolOutcome {
    Success(ToolResult),
    /// Failure text delivered inside a successful envelope
    SoftError(String),
    /// Failure reported at the protocol level
    HardError(HandlerError),
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Collapse into the wire envelope, leaving only hard errors as `Err`.
    pub fn into_result(self) -> Result<ToolResult, HandlerError> {
        match self {
            Self::Success(result) => Ok(result),
            Self::SoftError(message) => Ok(ToolResult::error(message)),
            Self::HardError(err) => Err(err),
        }
    }
}

/// Tool call envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content blocks for tool results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    /// Text of the first content block
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// Immutable description of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    pub policy: ErrorPolicy,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            policy: ErrorPolicy::HARD,
        }
    }

    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            required,
            description: description.into(),
        });
        self
    }

    pub fn required_string(self, name: &str, description: impl Into<String>) -> Self {
        self.param(name, ParamKind::String, true, description)
    }

    pub fn optional_string(self, name: &str, description: impl Into<String>) -> Self {
        self.param(name, ParamKind::String, false, description)
    }

    pub fn required_number(self, name: &str, description: impl Into<String>) -> Self {
        self.param(name, ParamKind::Number, true, description)
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// JSON Schema of the tool's arguments
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            properties.insert(
                p.name.clone(),
                json!({
                    "type": p.kind.as_str(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Entry for a `tools/list` response
    pub fn to_list_entry(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }
}

/// A registered tool: descriptor plus handler.
#[derive(Clone)]
pub struct Tool {
    pub descriptor: ToolDescriptor,
    pub handler: ToolHandler,
}

impl Tool {
    pub fn new<F, Fut>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(RequestContext, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResult, HandlerError>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(
            move |ctx: RequestContext, args: Arguments| -> BoxFuture<'static, Result<ToolResult, HandlerError>> {
                Box::pin(handler(ctx, args))
            },
        );
        Self {
            descriptor,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Run the handler and apply the descriptor's error policy.
    pub async fn call(&self, ctx: RequestContext, args: Arguments) -> ToolOutcome {
        let result = (self.handler)(ctx, args).await;
        self.descriptor.policy.settle(result)
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
