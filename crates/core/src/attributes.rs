//! Loosely-typed request attributes.
//!
//! Create/update requests arrive either as multipart forms or JSON bodies.
//! Both are normalised into an ordered [`Attributes`] map before validation,
//! so the same rules and the upload manager see one shape regardless of
//! transport.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CoreError;
use crate::uploads::UploadedFile;

/// A single submitted value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Explicit null / empty submission.
    Null,
    Text(String),
    /// Repeated form field (`genres_id[]`) or JSON array of scalars.
    List(Vec<String>),
    File(UploadedFile),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(f) => Some(f),
            _ => None,
        }
    }

    /// `true` for null, empty strings and empty lists.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::File(_) => false,
        }
    }
}

/// Field name to value, in submission order.
pub type Attributes = IndexMap<String, AttributeValue>;

/// Append a value under `name`, turning repeated names into a list.
///
/// Names ending in `[]` always produce a list, matching how HTML forms
/// submit arrays.
pub fn push_text(attributes: &mut Attributes, name: &str, value: String) {
    let (key, force_list) = match name.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (name, false),
    };

    let slot = attributes
        .entry(key.to_string())
        .or_insert(AttributeValue::Null);
    *slot = match std::mem::replace(slot, AttributeValue::Null) {
        AttributeValue::List(mut items) => {
            items.push(value);
            AttributeValue::List(items)
        }
        AttributeValue::Text(first) => AttributeValue::List(vec![first, value]),
        _ if force_list => AttributeValue::List(vec![value]),
        _ => AttributeValue::Text(value),
    };
}

/// Convert a JSON object body into attributes.
///
/// Scalars become text, arrays of scalars become lists, `null` stays null.
/// Nested objects are rejected.
pub fn from_json(body: Value) -> Result<Attributes, CoreError> {
    let Value::Object(map) = body else {
        return Err(CoreError::Validation(
            "Request body must be a JSON object".into(),
        ));
    };

    let mut attributes = Attributes::with_capacity(map.len());
    for (key, value) in map {
        let converted = match value {
            Value::Null => AttributeValue::Null,
            Value::Array(items) => AttributeValue::List(
                items
                    .into_iter()
                    .map(|item| scalar_to_string(&key, item))
                    .collect::<Result<_, _>>()?,
            ),
            other => AttributeValue::Text(scalar_to_string(&key, other)?),
        };
        attributes.insert(key, converted);
    }
    Ok(attributes)
}

fn scalar_to_string(key: &str, value: Value) -> Result<String, CoreError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(CoreError::Validation(format!(
            "Field '{key}' has an unsupported nested value"
        ))),
    }
}
