//! Program points
//!
//! A program point is a node in a thread's CFG. Identity is structural:
//! the enclosing function plus the statement position within it. Points
//! are immutable once the graph is built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Program point in a thread's CFG
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramPoint {
    /// Enclosing function (thread entry function for thread-local CFGs)
    pub function: String,

    /// Statement position within the function (0-based, builder-assigned)
    pub index: u32,
}

impl ProgramPoint {
    pub fn new(function: impl Into<String>, index: u32) -> Self {
        Self {
            function: function.into(),
            index,
        }
    }
}

impl fmt::Display for ProgramPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.function, self.index)
    }
}
