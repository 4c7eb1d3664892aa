// SPDX-License-Identifier: MIT OR Apache-2.0

//! One step of a pattern: a predicate plus mode flags

use crate::error::{CepFlowError, CepFlowResult};
use crate::pattern::Predicate;
use std::fmt;
use std::sync::Arc;

/// A predicate-guarded pattern step
///
/// - `strict`: the very next event must satisfy the block
/// - `negated`: the block succeeds when its predicate is false and
///   contributes no event to the history (it is a guard)
/// - `optional`: the block may be skipped
/// - `looping`: the block collects matching events until one fails
#[derive(Clone)]
pub struct Block {
    group: String,
    predicate: Arc<dyn Predicate>,
    strict: bool,
    negated: bool,
    optional: bool,
    looping: bool,
}

impl Block {
    pub fn new(
        group: impl Into<String>,
        predicate: Arc<dyn Predicate>,
        strict: bool,
        negated: bool,
        optional: bool,
        looping: bool,
    ) -> CepFlowResult<Self> {
        let group = group.into();
        if group.is_empty() {
            return Err(CepFlowError::invalid_parameter_with_name(
                "must be non-empty",
                "group",
            ));
        }
        if optional && looping {
            return Err(CepFlowError::invalid_parameter(
                "a block cannot be both optional and looping",
            ));
        }
        Ok(Self {
            group,
            predicate,
            strict,
            negated,
            optional,
            looping,
        })
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn predicate(&self) -> &Arc<dyn Predicate> {
        &self.predicate
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("group", &self.group)
            .field("strict", &self.strict)
            .field("negated", &self.negated)
            .field("optional", &self.optional)
            .field("looping", &self.looping)
            .finish()
    }
}
