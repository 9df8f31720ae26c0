//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{DomainError, NodeId};

/// Application errors wrap domain errors and add interpreter-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("invalid number of nodes: {0}")]
    InvalidNodeCount(String),

    #[error("invalid ID: {0}")]
    InvalidDeclaration(String),

    #[error("duplicate ID: {0}")]
    DuplicateId(NodeId),

    #[error("truncated input: {0}")]
    TruncatedInput(String),

    #[error("ID {id} outside of [0, {count})")]
    IdOutOfRange { id: NodeId, count: usize },

    #[error("node {0} has been removed")]
    NodeRemoved(NodeId),

    #[error("the root node cannot be removed")]
    RootRemoval,

    #[error("malformed argument for {command}: {token}")]
    Malformed { command: String, token: String },

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApplicationError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for errors that only skip the current command.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Config { .. })
    }

    /// True for input validation failures raised before any command runs.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::InvalidNodeCount(_)
                | Self::InvalidDeclaration(_)
                | Self::DuplicateId(_)
                | Self::TruncatedInput(_)
        )
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
