//! Request and response messages exchanged with the admin socket
//!
//! A request is a single JSON object naming the operation under the
//! `request` key, with its named parameters as sibling keys:
//!
//! ```text
//! {"request": "addPeer", "uri": "tcp://10.0.0.1:1234"}
//! ```
//!
//! A response carries a `status` and either a `response` payload or an
//! `error` message:
//!
//! ```text
//! {"status": "success", "response": {"added": ["tcp://10.0.0.1:1234"]}}
//! {"status": "error", "error": "unknown command"}
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::CodecError;
use crate::{REQUEST_KEY, STATUS_SUCCESS};

const STATUS_KEY: &str = "status";
const RESPONSE_KEY: &str = "response";
const ERROR_KEY: &str = "error";

/// Named parameters of an administrative operation
///
/// Values are serialized when they are inserted, so a value serde cannot
/// represent as JSON is reported against its key immediately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a parameter, replacing any previous value under `key`
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), CodecError> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| CodecError::encoding(key.as_str(), e.to_string()))?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder form of [`Arguments::insert`]
    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self, CodecError> {
        self.insert(key, &value)?;
        Ok(self)
    }

    /// Insert the parameter only when a value is present
    pub fn with_optional<T: Serialize>(
        self,
        key: impl Into<String>,
        value: Option<T>,
    ) -> Result<Self, CodecError> {
        match value {
            Some(value) => self.with(key, value),
            None => Ok(self),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A single administrative request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    operation: String,
    arguments: Arguments,
}

impl Request {
    /// Create a request with no parameters
    pub fn new(operation: impl Into<String>) -> Self {
        Self::with_arguments(operation, Arguments::new())
    }

    pub fn with_arguments(operation: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            operation: operation.into(),
            arguments,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Build the JSON object sent on the wire
    ///
    /// The operation is always the first key, followed by the arguments in
    /// insertion order.
    pub fn to_value(&self) -> Result<Value, CodecError> {
        if self.operation.is_empty() {
            return Err(CodecError::encoding(REQUEST_KEY, "operation name is empty"));
        }
        if self.arguments.get(REQUEST_KEY).is_some() {
            return Err(CodecError::encoding(
                REQUEST_KEY,
                "argument name is reserved for the operation",
            ));
        }

        let mut object = Map::with_capacity(self.arguments.len() + 1);
        object.insert(REQUEST_KEY.to_string(), Value::String(self.operation.clone()));
        for (key, value) in self.arguments.iter() {
            object.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(object))
    }
}

/// Decoded reply from the router
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The operation succeeded; `payload` is the reply's `response` field
    Success { payload: Value },
    /// The router rejected the operation
    Failure { message: String },
}

impl Response {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Classify a parsed reply object
    ///
    /// A non-null `error` field, or a `status` other than `"success"`, makes
    /// the reply a failure. Fields not named here are ignored.
    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(CodecError::NotAnObject {
                    found: json_type_name(&other),
                })
            }
        };

        match object.remove(ERROR_KEY) {
            None | Some(Value::Null) => {}
            Some(error) => return Ok(Self::Failure { message: error_message(error) }),
        }

        match object.get(STATUS_KEY) {
            None => Err(CodecError::MissingField(STATUS_KEY)),
            Some(Value::String(status)) if status == STATUS_SUCCESS => {
                let payload = object
                    .remove(RESPONSE_KEY)
                    .ok_or(CodecError::MissingField(RESPONSE_KEY))?;
                Ok(Self::Success { payload })
            }
            // No error text to report, so the whole reply becomes the message
            Some(_) => Ok(Self::Failure {
                message: Value::Object(object).to_string(),
            }),
        }
    }

    /// Render the reply the way the router would send it
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        match self {
            Self::Success { payload } => {
                object.insert(STATUS_KEY.into(), Value::String(STATUS_SUCCESS.into()));
                object.insert(RESPONSE_KEY.into(), payload.clone());
            }
            Self::Failure { message } => {
                object.insert(STATUS_KEY.into(), Value::String(ERROR_KEY.into()));
                object.insert(ERROR_KEY.into(), Value::String(message.clone()));
            }
        }
        Value::Object(object)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Get the payload, or the router's message if the operation failed
    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Self::Success { payload } => Ok(payload),
            Self::Failure { message } => Err(message),
        }
    }
}

fn error_message(error: Value) -> String {
    match error {
        Value::String(message) => message,
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
