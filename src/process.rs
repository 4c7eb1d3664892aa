// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process: a named bundle of patterns, an optional action and a payload
//! generator for the complex events it produces

use crate::error::{CepFlowError, CepFlowResult};
use crate::event::{Event, History};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Generates the payload of a complex event from the completed history
pub trait DataGenerator: Send + Sync {
    fn generate(&self, process: &Process, history: &History) -> Value;
}

impl<F> DataGenerator for F
where
    F: Fn(&Process, &History) -> Value + Send + Sync,
{
    fn generate(&self, process: &Process, history: &History) -> Value {
        self(process, history)
    }
}

/// User-supplied side effect executed for each complex event
///
/// Failures are converted by the action handler into an action event with
/// `success = false`; an action never silently loses its event.
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, event: &Event) -> CepFlowResult<Value>;
}

/// Named grouping of patterns plus optional action and data generator
#[derive(Clone)]
pub struct Process {
    name: String,
    patterns: Vec<Arc<crate::pattern::Pattern>>,
    datagen: Option<Arc<dyn DataGenerator>>,
    action: Option<Arc<dyn Action>>,
}

impl Process {
    pub fn new(
        name: impl Into<String>,
        patterns: Vec<Arc<crate::pattern::Pattern>>,
        datagen: Option<Arc<dyn DataGenerator>>,
        action: Option<Arc<dyn Action>>,
    ) -> CepFlowResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty",
                "name",
            ));
        }
        if patterns.is_empty() {
            return Err(CepFlowError::invalid_parameter(
                "a process requires at least one pattern",
            ));
        }
        Ok(Self {
            name,
            patterns,
            datagen,
            action,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn patterns(&self) -> &[Arc<crate::pattern::Pattern>] {
        &self.patterns
    }

    /// Look up one of this process's patterns by name
    pub fn pattern(&self, name: &str) -> Option<&Arc<crate::pattern::Pattern>> {
        self.patterns.iter().find(|p| p.name() == name)
    }

    pub fn action(&self) -> Option<&Arc<dyn Action>> {
        self.action.as_ref()
    }

    /// Generate the complex-event payload; `Null` when no generator is set
    pub fn generate_data(&self, history: &History) -> Value {
        match &self.datagen {
            Some(datagen) => datagen.generate(self, history),
            None => Value::Null,
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field(
                "patterns",
                &self.patterns.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("has_datagen", &self.datagen.is_some())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}
