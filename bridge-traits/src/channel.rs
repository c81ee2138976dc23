//! Method channel value types and the outward push trait.
//!
//! Requests arrive as a method name plus a JSON argument record and are
//! answered with a [`MethodResponse`]. Events travel the other way through
//! [`MethodChannel::invoke_method`] and expect no answer.

use crate::{error::Result, platform::PlatformSendSync};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Incoming request from the host framework.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// `"<mediaKind>/<operation>"`.
    pub method: String,
    /// Argument record, `Value::Null` when the caller sent none.
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Call without arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Decode a single argument. A missing key and an explicit `null` both
    /// yield `Ok(None)`.
    pub fn argument<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    pub fn has_argument(&self, key: &str) -> bool {
        !matches!(self.arguments.get(key), None | Some(Value::Null))
    }
}

/// Answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    /// The kind is known but the operation is not.
    NotImplemented,
}

impl MethodResponse {
    /// Success without a payload.
    pub fn ok() -> Self {
        MethodResponse::Success(Value::Null)
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success(_))
    }

    /// Payload of a successful response.
    pub fn value(&self) -> Option<&Value> {
        match self {
            MethodResponse::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Error code of a failed response.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            MethodResponse::Error { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

/// Outward event push into the host framework.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MethodChannel: PlatformSendSync {
    async fn invoke_method(&self, method: &str, arguments: Value) -> Result<()>;
}
