//! CLI-level errors (wraps application errors)

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot open input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::Application(e.into())
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Application(e) if e.is_startup() => crate::exitcode::DATAERR,
            CliError::Application(e) => match e {
                ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                ApplicationError::Io { .. } => crate::exitcode::IOERR,
                _ => crate::exitcode::SOFTWARE,
            },
            CliError::Input { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                crate::exitcode::NOINPUT
            }
            CliError::Input { .. } | CliError::Io { .. } => crate::exitcode::IOERR,
        }
    }
}
