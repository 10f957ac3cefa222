//! Port for CFG providers
//!
//! The parser/front end is an external collaborator; anything able to
//! produce a [`Program`] (a C front end, a deserializer, a test harness)
//! plugs in here.

use crate::errors::Result;
use crate::features::flow_graph::domain::cfg::Program;

/// Source of analyzable programs
pub trait ProgramSourcePort {
    /// Produce the thread CFGs and global symbol table
    fn load(&self) -> Result<Program>;

    /// Name for logging/diagnostics
    fn source_name(&self) -> &'static str;
}
