//! Uniform `{code, message, data}` result envelope
//!
//! Every public operation of the client returns this shape, success or not.
//! `code == "0000"` is success; any other code is a failure with a
//! human-readable `message` and optional diagnostic `data`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Business code for success.
pub const SUCCESS: &str = "0000";

/// Generic business code for failures raised by this client (config,
/// validation, auth, upstream business errors).
pub const FAILURE: &str = "2000";

/// The result envelope. Serializes to exactly the keys `code`, `message`, `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: String,
    pub message: String,
    #[serde(default = "empty_data", deserialize_with = "null_as_empty")]
    pub data: Value,
}

impl Envelope {
    /// Build an envelope. A `null` payload is normalized to `{}`.
    pub fn new(code: impl Into<String>, message: impl Into<String>, data: Value) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: if data.is_null() { empty_data() } else { data },
        }
    }

    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self::new(SUCCESS, message, data)
    }

    /// Failure with the generic `2000` code and no data.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(FAILURE, message, empty_data())
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS
    }
}

/// Empty `data` payload (`{}`).
pub fn empty_data() -> Value {
    Value::Object(Map::new())
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Value, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_null() { empty_data() } else { value })
}

/// Read the `code` field of an upstream response as a string.
///
/// The gateway sends codes as numbers on business endpoints (`200`, `30004`)
/// and as strings on the login endpoints (`"0000"`); both compare by their
/// textual form.
pub fn business_code(response: &Value) -> Option<String> {
    match response.get("code")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
