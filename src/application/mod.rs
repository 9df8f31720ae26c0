//! Application layer: the batch command interpreter
//!
//! This layer reads the command protocol and orchestrates the tree store.

pub mod command;
pub mod error;
pub mod interpreter;
pub mod registry;
pub mod tokens;

pub use command::{Command, Keyword};
pub use error::{ApplicationError, ApplicationResult};
pub use interpreter::{Interpreter, Options, RunSummary, DEFAULT_MAX_NODES, ROOT_ID};
pub use registry::NodeRegistry;
pub use tokens::Tokens;
