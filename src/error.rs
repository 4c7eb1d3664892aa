// SPDX-License-Identifier: MIT OR Apache-2.0

//! CepFlow Core Error Types
//!
//! Error handling for engine, action and distribution operations.

use thiserror::Error;

/// Result type for CepFlow operations
pub type CepFlowResult<T> = Result<T, CepFlowError>;

/// CepFlow error types
#[derive(Error, Debug)]
pub enum CepFlowError {
    #[error("Queue full on '{task}' (capacity {capacity})")]
    QueueFull { task: String, capacity: usize },

    #[error("Duplicate process name '{name}' registered with {component}")]
    DuplicateName { name: String, component: String },

    #[error("Unknown process '{name}'")]
    UnknownProcess { name: String },

    #[error("Unknown pattern '{pattern}' for process '{process}'")]
    UnknownPattern { process: String, pattern: String },

    #[error("Run '{run_id}' not found for ({process}, {pattern})")]
    RunNotFound {
        process: String,
        pattern: String,
        run_id: String,
    },

    #[error("Run '{run_id}' already exists for ({process}, {pattern})")]
    RunExists {
        process: String,
        pattern: String,
        run_id: String,
    },

    #[error("Invalid parameter '{parameter:?}': {message}")]
    InvalidParameter {
        message: String,
        parameter: Option<String>,
    },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("System error: {message}")]
    System {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Component '{component}' is closed")]
    Closed { component: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

// Custom error creation helpers
impl CepFlowError {
    /// Create a queue-full error for a named task queue
    pub fn queue_full(task: impl Into<String>, capacity: usize) -> Self {
        Self::QueueFull {
            task: task.into(),
            capacity,
        }
    }

    /// Create a duplicate-name error
    pub fn duplicate_name(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self::DuplicateName {
            name: name.into(),
            component: component.into(),
        }
    }

    /// Create an unknown-process error
    pub fn unknown_process(name: impl Into<String>) -> Self {
        Self::UnknownProcess { name: name.into() }
    }

    /// Create an unknown-pattern error
    pub fn unknown_pattern(process: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::UnknownPattern {
            process: process.into(),
            pattern: pattern.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            parameter: None,
        }
    }

    /// Create an invalid parameter error naming the parameter
    pub fn invalid_parameter_with_name(
        message: impl Into<String>,
        parameter: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a system error
    pub fn system(message: impl Into<String>) -> Self {
        Self::System {
            message: message.into(),
            source: None,
        }
    }

    /// Create a system error with source
    pub fn system_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::System {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a closed-component error
    pub fn closed(component: impl Into<String>) -> Self {
        Self::Closed {
            component: component.into(),
        }
    }
}
