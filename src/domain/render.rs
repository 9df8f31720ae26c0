//! Structured printing of a tree store.

use std::fmt::Write;

use generational_arena::Index;
use itertools::Itertools;

use crate::domain::arena::TreeArena;

/// Default indentation marker per depth level.
pub const DEFAULT_INDENT: &str = "  ";

/// Renders `node` and all its descendants, pre-order, one line per node:
/// `indent` repeated `depth` times, then `ID: <id>, Name: <name>`.
///
/// A dead handle renders as an empty string.
pub fn render_tree(arena: &TreeArena, node: Index, depth: usize, indent: &str) -> String {
    let mut out = String::new();
    let mut stack = vec![(node, depth)];
    while let Some((idx, level)) = stack.pop() {
        let Some(current) = arena.get_node(idx) else {
            continue;
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{}ID: {}, Name: {}",
            indent.repeat(level),
            current.data.id,
            current.data.name
        );
        let children: Vec<Index> = arena.children(idx).map(|(child, _)| child).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
    }
    out
}

/// Names of the direct children of `node`, comma-separated.
///
/// `None` when the node has no children (or is gone): nothing is printed then.
pub fn render_children(arena: &TreeArena, node: Index) -> Option<String> {
    let mut names = arena.children(node).map(|(_, child)| child.data.name.as_str()).peekable();
    names.peek()?;
    Some(names.join(","))
}
