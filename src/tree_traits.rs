/*
Orphan rule workaround: termtree::Tree is foreign, so the conversion lives in a
local trait implemented for the local arena type.
 */
use generational_arena::Index;
use termtree::Tree;
use tracing::instrument;

use crate::domain::TreeArena;

pub trait TreeNodeConvert {
    /// Display tree of the subtree below `node`, labelled `<id> <name>`.
    ///
    /// Building and printing both recurse per level; deep trees go through
    /// [`crate::domain::render_tree`] instead.
    fn to_tree_string(&self, node: Index) -> Tree<String>;
}

impl TreeNodeConvert for TreeArena {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self, node: Index) -> Tree<String> {
        let Some(top) = self.get_node(node) else {
            return Tree::new("Empty tree".to_string());
        };
        let mut tree = Tree::new(format!("{} {}", top.data.id, top.data.name));

        fn build_tree(arena: &TreeArena, node_idx: Index, parent_tree: &mut Tree<String>) {
            for (child_idx, child) in arena.children(node_idx) {
                let mut child_tree = Tree::new(format!("{} {}", child.data.id, child.data.name));
                build_tree(arena, child_idx, &mut child_tree);
                parent_tree.push(child_tree);
            }
        }

        build_tree(self, node, &mut tree);
        tree
    }
}
