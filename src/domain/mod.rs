//! Domain layer: the tree store and its rendering
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod error;
pub mod render;

pub use arena::{CycleCheck, NodeData, NodeId, RemovePolicy, SortKey, TreeArena, TreeNode};
pub use error::{DomainError, DomainResult};
pub use render::{render_children, render_tree, DEFAULT_INDENT};
