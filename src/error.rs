//! Error types for the chart and deviation core.

use thiserror::Error;

/// The transcript could not produce any structured chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No line matched a palace header such as `坎宮(北方)`.
    #[error("no palace header found in chart text ({lines} lines scanned)")]
    NoPalaceHeader { lines: usize },
}

/// Deviation scoring was asked to compare nothing with nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither side supplied a match result (nor a score to derive one from).
    #[error("missing match result: neither predicted nor actual result supplied")]
    MissingResult,
}
