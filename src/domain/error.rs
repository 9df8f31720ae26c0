//! Domain-level errors (no external dependencies)

use generational_arena::Index;
use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors are structural rejections raised by the tree store.
///
/// Every operation returning one of these has left the tree untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node handle is no longer alive: {0:?}")]
    DeadHandle(Index),

    #[error("node not found: {0}")]
    UnknownNode(NodeId),

    #[error("cycle detected: cannot add node {child} as child of {parent}")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("node {child} is already linked into a tree")]
    AlreadyLinked { child: NodeId },

    #[error("root node {0} cannot be attached below another node")]
    RootNotAttachable(NodeId),

    #[error("parent and child are the same node: {0}")]
    SameNode(NodeId),

    #[error("no root node given")]
    NoRoot,

    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("cannot move node {child} below its own descendant {parent}")]
    MoveIntoOwnSubtree { parent: NodeId, child: NodeId },

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type for tree store operations.
pub type DomainResult<T> = Result<T, DomainError>;
