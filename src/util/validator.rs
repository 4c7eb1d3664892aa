// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingress validation
//!
//! Validators inspect the payload of an incoming entity. When the entity is
//! already an event, the receiver passes `event.data()`, not the wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON payload kind, for allowlist validation and type-guarded predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl PayloadKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

/// Decides whether an ingress payload is admitted into the pipeline
pub trait Validator: Send {
    fn is_valid(&self, payload: &Value) -> bool;
}

/// Admits every payload
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllValidator;

impl Validator for AcceptAllValidator {
    fn is_valid(&self, _payload: &Value) -> bool {
        true
    }
}

/// Admits payloads whose JSON kind is in the allowlist
#[derive(Debug, Clone)]
pub struct PayloadTypeValidator {
    allowed: Vec<PayloadKind>,
}

impl PayloadTypeValidator {
    pub fn new(allowed: Vec<PayloadKind>) -> Self {
        Self { allowed }
    }
}

impl Validator for PayloadTypeValidator {
    fn is_valid(&self, payload: &Value) -> bool {
        self.allowed.contains(&PayloadKind::of(payload))
    }
}

/// Admits payloads that survive a JSON round-trip unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValidator;

impl Validator for JsonValidator {
    fn is_valid(&self, payload: &Value) -> bool {
        match serde_json::to_string(payload) {
            Ok(text) => matches!(
                serde_json::from_str::<Value>(&text),
                Ok(back) if back == *payload
            ),
            Err(_) => false,
        }
    }
}
