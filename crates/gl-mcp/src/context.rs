//! Injected dependencies and per-request context

use std::fmt;
use std::sync::Arc;

use gl_upstream::GitLab;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerError;
use crate::translations::Translator;

/// Produces an upstream client on demand.
///
/// Invoked once per handler call, after argument validation, so a token
/// rotation or a lazily built client is picked up without rebuilding the
/// catalog.
pub trait ClientAccessor: Send + Sync {
    fn client(&self) -> gl_upstream::Result<Arc<dyn GitLab>>;
}

impl<F> ClientAccessor for F
where
    F: Fn() -> gl_upstream::Result<Arc<dyn GitLab>> + Send + Sync,
{
    fn client(&self) -> gl_upstream::Result<Arc<dyn GitLab>> {
        self()
    }
}

/// Accessor that always hands out the same client.
#[derive(Clone)]
pub struct SharedClient(Arc<dyn GitLab>);

impl SharedClient {
    pub fn new(client: Arc<dyn GitLab>) -> Self {
        Self(client)
    }
}

impl ClientAccessor for SharedClient {
    fn client(&self) -> gl_upstream::Result<Arc<dyn GitLab>> {
        Ok(Arc::clone(&self.0))
    }
}

impl fmt::Debug for SharedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClient").finish_non_exhaustive()
    }
}

/// Dependency record captured by every tool and resource handler.
#[derive(Clone)]
pub struct Deps {
    accessor: Arc<dyn ClientAccessor>,
    t: Translator,
}

impl Deps {
    pub fn new(accessor: Arc<dyn ClientAccessor>, t: Translator) -> Self {
        Self { accessor, t }
    }

    /// Resolve a translated string.
    pub fn t(&self, key: &str, default: &str) -> String {
        (self.t)(key, default)
    }

    pub fn translator(&self) -> &Translator {
        &self.t
    }

    /// Acquire the upstream client.
    pub fn client(&self) -> Result<Arc<dyn GitLab>, HandlerError> {
        self.accessor.client().map_err(HandlerError::ClientUnavailable)
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps").finish_non_exhaustive()
    }
}

/// Per-request context handed to handlers
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// JSON-RPC id of the request, `None` for direct calls
    pub id: Option<Value>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(id: Option<Value>) -> Self {
        Self {
            id,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
