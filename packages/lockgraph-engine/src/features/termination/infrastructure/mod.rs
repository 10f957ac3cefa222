//! Infrastructure layer for the termination oracle

pub mod oracle;

pub use oracle::TerminationOracle;
