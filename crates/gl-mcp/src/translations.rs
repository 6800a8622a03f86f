//! Overridable tool and resource descriptions
//!
//! Every user-facing description is looked up by a stable key such as
//! `TOOL_GET_ISSUE_DESCRIPTION`. Resolution order:
//!
//! 1. environment variable `GITLAB_MCP_<KEY>`
//! 2. the JSON overrides file, if one was loaded
//! 3. the built-in English default
//!
//! Every resolved pair is remembered so the full set can be exported with
//! [`Translations::dump`] and edited into a new overrides file.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::Result;

/// Default file name for [`Translations::dump`].
pub const DEFAULT_DUMP_FILE: &str = "gitlab-mcp-server-config.json";

/// Prefix of the environment variables that override descriptions.
pub const ENV_PREFIX: &str = "GITLAB_MCP_";

/// Resolves a `(key, default)` pair to the text to present.
pub type Translator = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Translation table with usage recording
pub struct Translations {
    overrides: HashMap<String, String>,
    env: EnvLookup,
    used: Mutex<BTreeMap<String, String>>,
}

impl Translations {
    /// Built-in defaults, overridable through the process environment.
    pub fn defaults() -> Self {
        Self::with_overrides(HashMap::new())
    }

    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self {
            overrides,
            env: Arc::new(|name| std::env::var(name).ok()),
            used: Mutex::new(BTreeMap::new()),
        }
    }

    /// Load overrides from a JSON object of `KEY: text` pairs.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let overrides: HashMap<String, String> = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), count = overrides.len(), "Loaded translation overrides");
        Ok(Self::with_overrides(overrides))
    }

    /// Replace the environment lookup, e.g. with a fixed map in tests.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Resolve `key` and record the result.
    pub fn get(&self, key: &str, default: &str) -> String {
        let env_name = format!("{ENV_PREFIX}{}", key.to_uppercase());
        let value = (self.env)(&env_name)
            .or_else(|| self.overrides.get(key).cloned())
            .unwrap_or_else(|| default.to_string());
        if let Ok(mut used) = self.used.lock() {
            used.insert(key.to_string(), value.clone());
        }
        value
    }

    /// Every key resolved so far, with the value it resolved to.
    pub fn used(&self) -> BTreeMap<String, String> {
        self.used.lock().map(|u| u.clone()).unwrap_or_default()
    }

    /// Write the recorded keys as pretty JSON.
    pub fn dump(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.used())?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "Exported translations");
        Ok(())
    }

    /// Shareable lookup function for tool and resource builders.
    pub fn translator(self: &Arc<Self>) -> Translator {
        let this = Arc::clone(self);
        Arc::new(move |key, default| this.get(key, default))
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for Translations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translations")
            .field("overrides", &self.overrides.len())
            .finish_non_exhaustive()
    }
}

/// Translator that always returns the default text.
pub fn identity() -> Translator {
    Arc::new(|_, default| default.to_string())
}
