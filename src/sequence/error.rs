use thiserror::Error;

/// Identifier generation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("Sequence storage error: {0}")]
    Storage(String),

    #[error("Malformed identifier: {0}")]
    MalformedId(String),
}
