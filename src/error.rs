//! Error types shared by the graph engine and its collaborators.

use thiserror::Error;

use crate::ai_client::ProviderError;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Unknown node id, or a missing file for document operations.
    #[error("not found: {0}")]
    NotFound(String),

    /// Adding `from -> to` would close a loop in the citation graph.
    #[error("citation {from} -> {to} would introduce a cycle")]
    Cycle { from: String, to: String },

    /// The operation needs prior state that is missing or mismatched.
    #[error("invalid state: {0}")]
    State(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("version control error: {0}")]
    VersionControl(String),
}

impl GraphError {
    pub fn node_not_found(id: &str) -> Self {
        GraphError::NotFound(format!("node {}", id))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
