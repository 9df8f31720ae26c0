//! sibtree: an ordered, rooted tree in first-child/next-sibling encoding,
//! stored in a generational arena and driven by a batch command protocol.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod tree_traits;
pub mod util;
