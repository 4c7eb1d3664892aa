// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable event carriers
//!
//! Three variants flow through the pipeline:
//! - `Simple`: a wrapped primitive ingested by the receiver
//! - `Complex`: synthesized by the producer when a run halts complete
//! - `Action`: the outcome of executing a process action
//!
//! Events serialize as an internally tagged JSON union keyed by
//! `"event_type"`, matching the distribution wire schema.

use crate::error::{CepFlowError, CepFlowResult};
use crate::event::History;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable event value, shared by reference between stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum Event {
    Simple {
        event_id: String,
        timestamp: i64,
        data: Value,
    },
    Complex {
        event_id: String,
        timestamp: i64,
        data: Value,
        process_name: String,
        pattern_name: String,
        history: History,
    },
    Action {
        event_id: String,
        timestamp: i64,
        data: Value,
        process_name: String,
        pattern_name: String,
        action_name: String,
        success: bool,
    },
}

fn require_non_empty(value: &str, parameter: &str) -> CepFlowResult<()> {
    if value.is_empty() {
        return Err(CepFlowError::invalid_parameter_with_name(
            "must be non-empty",
            parameter,
        ));
    }
    Ok(())
}

impl Event {
    /// Create a simple event
    pub fn simple(event_id: impl Into<String>, timestamp: i64, data: Value) -> CepFlowResult<Self> {
        let event_id = event_id.into();
        require_non_empty(&event_id, "event_id")?;
        Ok(Self::Simple {
            event_id,
            timestamp,
            data,
        })
    }

    /// Create a complex event for a completed pattern run
    pub fn complex(
        event_id: impl Into<String>,
        timestamp: i64,
        data: Value,
        process_name: impl Into<String>,
        pattern_name: impl Into<String>,
        history: History,
    ) -> CepFlowResult<Self> {
        let event_id = event_id.into();
        let process_name = process_name.into();
        let pattern_name = pattern_name.into();
        require_non_empty(&event_id, "event_id")?;
        require_non_empty(&process_name, "process_name")?;
        require_non_empty(&pattern_name, "pattern_name")?;
        Ok(Self::Complex {
            event_id,
            timestamp,
            data,
            process_name,
            pattern_name,
            history,
        })
    }

    /// Create an action event for an executed action
    #[allow(clippy::too_many_arguments)]
    pub fn action(
        event_id: impl Into<String>,
        timestamp: i64,
        data: Value,
        process_name: impl Into<String>,
        pattern_name: impl Into<String>,
        action_name: impl Into<String>,
        success: bool,
    ) -> CepFlowResult<Self> {
        let event_id = event_id.into();
        let process_name = process_name.into();
        let pattern_name = pattern_name.into();
        let action_name = action_name.into();
        require_non_empty(&event_id, "event_id")?;
        require_non_empty(&process_name, "process_name")?;
        require_non_empty(&pattern_name, "pattern_name")?;
        require_non_empty(&action_name, "action_name")?;
        Ok(Self::Action {
            event_id,
            timestamp,
            data,
            process_name,
            pattern_name,
            action_name,
            success,
        })
    }

    /// Unique identifier within a process lifetime
    pub fn event_id(&self) -> &str {
        match self {
            Self::Simple { event_id, .. }
            | Self::Complex { event_id, .. }
            | Self::Action { event_id, .. } => event_id,
        }
    }

    /// Milliseconds since the Unix epoch
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Simple { timestamp, .. }
            | Self::Complex { timestamp, .. }
            | Self::Action { timestamp, .. } => *timestamp,
        }
    }

    /// Opaque payload
    pub fn data(&self) -> &Value {
        match self {
            Self::Simple { data, .. }
            | Self::Complex { data, .. }
            | Self::Action { data, .. } => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_event_rejects_empty_id() {
        let result = Event::simple("", 100, Value::Null);
        assert!(matches!(
            result,
            Err(CepFlowError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_complex_event_rejects_empty_names() {
        assert!(Event::complex("e1", 100, Value::Null, "", "pat", History::new()).is_err());
        assert!(Event::complex("e1", 100, Value::Null, "proc", "", History::new()).is_err());
    }

    #[test]
    fn test_action_event_rejects_empty_action_name() {
        let result = Event::action("e1", 100, Value::Null, "proc", "pat", "", true);
        assert!(result.is_err());
    }

    #[test]
    fn test_simple_event_json_round_trip() {
        let event = Event::simple("e1", 1234, json!({"k": 1})).unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"simple\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_complex_event_json_round_trip() {
        let mut history = History::new();
        history.push("a", Event::simple("seed", 1000, json!(1)).unwrap());
        let event =
            Event::complex("c1", 2000, json!("payload"), "proc", "pat", history).unwrap();

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"complex\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn test_action_event_json_round_trip() {
        let event =
            Event::action("a1", 3000, Value::Null, "proc", "pat", "notify", false).unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"action\""));
        assert!(json.contains("\"success\":false"));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
