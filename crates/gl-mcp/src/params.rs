//! Typed accessors over the untyped tool argument map
//!
//! Tool arguments arrive as a JSON object whose values may be strings,
//! numbers or booleans. Handlers pull them out through these functions at
//! the very top of the call, so everything downstream is statically typed.
//!
//! Required accessors treat a present zero value (`""`, `0`, `false`)
//! exactly like an absent key: a required field can never legitimately be
//! empty or zero.

use serde_json::{Map, Value};

use crate::error::HandlerError;

/// Arguments of a single tool call
pub type Arguments = Map<String, Value>;

/// Dynamic kind of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// A Rust type a parameter can be extracted as.
///
/// `Default::default()` is the kind's zero value.
pub trait ParamValue: Sized + Default + PartialEq {
    const KIND: ParamKind;

    fn from_value(value: &Value) -> Option<Self>;
}

impl ParamValue for String {
    const KIND: ParamKind = ParamKind::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// JSON numbers are read as floating point, whatever their lexical form.
impl ParamValue for f64 {
    const KIND: ParamKind = ParamKind::Number;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl ParamValue for bool {
    const KIND: ParamKind = ParamKind::Boolean;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn typed<T: ParamValue>(key: &str, value: &Value) -> Result<T, HandlerError> {
    T::from_value(value).ok_or_else(|| HandlerError::TypeMismatch {
        name: key.to_string(),
        expected: T::KIND.as_str(),
        actual: kind_name(value),
    })
}

/// Fetch a required parameter.
///
/// 1. Fails with `MissingParameter` if the key is absent.
/// 2. Fails with `TypeMismatch` if the value is not of kind `T`.
/// 3. Fails with `MissingParameter` if the value is `T`'s zero value.
pub fn required_param<T: ParamValue>(args: &Arguments, key: &str) -> Result<T, HandlerError> {
    let value = args
        .get(key)
        .ok_or_else(|| HandlerError::MissingParameter(key.to_string()))?;
    let value = typed::<T>(key, value)?;
    if value == T::default() {
        return Err(HandlerError::MissingParameter(key.to_string()));
    }
    Ok(value)
}

/// Fetch a required integer parameter.
///
/// The value is extracted as a number and truncated toward zero, so `3.9`
/// becomes `3`.
pub fn required_int(args: &Arguments, key: &str) -> Result<i64, HandlerError> {
    match required_param::<f64>(args, key) {
        Ok(v) => Ok(v as i64),
        Err(HandlerError::TypeMismatch { name, actual, .. }) => Err(HandlerError::TypeMismatch {
            name,
            expected: "integer",
            actual,
        }),
        Err(e) => Err(e),
    }
}

/// Fetch a required, non-empty string parameter.
pub fn required_string(args: &Arguments, key: &str) -> Result<String, HandlerError> {
    required_param::<String>(args, key)
}

/// Fetch an optional parameter.
///
/// Absent keys yield the zero value. A present value of the wrong kind is a
/// `TypeMismatch`; a present zero value is returned unchanged.
pub fn optional_param<T: ParamValue>(args: &Arguments, key: &str) -> Result<T, HandlerError> {
    match args.get(key) {
        None => Ok(T::default()),
        Some(value) => typed::<T>(key, value),
    }
}

/// Speculative extraction for optional update fields.
///
/// `Some` only when [`required_param`] would succeed: absent, empty and
/// wrongly typed values are all skipped without error.
pub fn present_param<T: ParamValue>(args: &Arguments, key: &str) -> Option<T> {
    required_param(args, key).ok()
}

/// Optional string filter, `None` when absent or empty.
pub fn optional_filter(args: &Arguments, key: &str) -> Result<Option<String>, HandlerError> {
    let value = optional_param::<String>(args, key)?;
    Ok((!value.is_empty()).then_some(value))
}
