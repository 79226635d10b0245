use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{Error, Result};

/// Data source body as supplied by the caller
///
/// Always a JSON object with a non-empty string `name`. The name is the
/// lookup key used when the platform reports a conflict and when deleting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Resource {
    body: Map<String, Value>,
}

impl Resource {
    /// Validates and wraps an arbitrary JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(body) = value else {
            return Err(Error::InvalidResource(
                "data source must be a JSON object".into(),
            ));
        };

        match body.get("name") {
            Some(Value::String(name)) if !name.is_empty() => Ok(Self { body }),
            Some(Value::String(_)) => Err(Error::InvalidResource("'name' is empty".into())),
            Some(_) => Err(Error::InvalidResource("'name' must be a string".into())),
            None => Err(Error::InvalidResource("missing required field 'name'".into())),
        }
    }

    /// Name of the data source
    pub fn name(&self) -> &str {
        // checked in from_value
        self.body
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Request body sent on create and update
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Resource::from_value(value).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Value> for Resource {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Resource::from_value(value)
    }
}

/// Result of a single reconcile call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// The platform rejected the request
    pub is_error: bool,
    /// A create, update or delete took effect
    pub changed: bool,
    /// Response body on success, `{status, response}` on rejection
    pub payload: Value,
}

impl Outcome {
    /// Successful create, update or delete
    pub fn changed(payload: Value) -> Self {
        Self {
            is_error: false,
            changed: true,
            payload,
        }
    }

    /// Request rejected by the platform
    pub fn rejected(status: u16, response: Value) -> Self {
        Self {
            is_error: true,
            changed: false,
            payload: json!({
                "status": status,
                "response": response,
            }),
        }
    }

    /// Builds a rejection from a raw response body
    pub fn rejected_from_body(status: u16, body: &Value) -> Self {
        Self::rejected(status, error_message(body))
    }
}

/// Extracts the platform's error message from a response body
///
/// Uses the string `message` property when present and the whole body
/// otherwise.
pub fn error_message(body: &Value) -> Value {
    match body.get("message") {
        Some(Value::String(message)) => Value::String(message.clone()),
        _ => body.clone(),
    }
}
