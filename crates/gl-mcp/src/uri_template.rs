//! Minimal RFC 6570 URI template matching
//!
//! Two expression forms are supported, which is all the resource catalog
//! uses:
//!
//! - `{var}` matches exactly one non-empty path segment
//! - `{/var*}` matches zero or more `/`-prefixed segments; the captured
//!   value drops the leading `/`
//!
//! Templates compile to an anchored regex once, at catalog construction.
//! Captured values are percent-decoded, so `feature%2Fx` yields `feature/x`.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::Regex;

use crate::error::{HandlerError, RegistryError};

/// Variables extracted from a matching URI
pub type UriVariables = HashMap<String, String>;

/// A compiled URI template
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    pattern: Regex,
    variables: Vec<String>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut pattern = String::from("^");
        let mut variables = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            pattern.push_str(&regex::escape(&rest[..open]));
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed expression"))?;
            let expr = &after[..close];

            let (name, capture) = match expr.strip_prefix('/') {
                Some(path) => {
                    let name = path
                        .strip_suffix('*')
                        .ok_or_else(|| invalid("path expressions must be exploded"))?;
                    (name, "((?:/[^/]+)*)")
                }
                None => (expr, "([^/]+)"),
            };

            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(invalid("invalid variable name"));
            }
            if variables.iter().any(|v| v == name) {
                return Err(invalid("repeated variable"));
            }

            variables.push(name.to_string());
            pattern.push_str(capture);
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(invalid("unopened expression"));
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            template: template.to_string(),
            pattern,
            variables,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Extract the template's variables from `uri`, or `None` if it does not match.
    ///
    /// A match whose captures are not valid percent-encoded UTF-8 is an
    /// [`HandlerError::InvalidEncoding`].
    pub fn matches(&self, uri: &str) -> Option<Result<UriVariables, HandlerError>> {
        let caps = self.pattern.captures(uri)?;
        let vars = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let raw = caps.get(i + 1).map(|m| m.as_str()).unwrap_or_default();
                let raw = raw.strip_prefix('/').unwrap_or(raw);
                decode(name, raw).map(|value| (name.clone(), value))
            })
            .collect();
        Some(vars)
    }
}

fn decode(name: &str, raw: &str) -> Result<String, HandlerError> {
    let invalid = || HandlerError::InvalidEncoding {
        name: name.to_string(),
        value: raw.to_string(),
    };

    // urlencoding passes malformed escapes through untouched.
    let bytes = raw.as_bytes();
    let well_formed = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .all(|(i, _)| {
            bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
        });
    if !well_formed {
        return Err(invalid());
    }

    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|_| invalid())
}
