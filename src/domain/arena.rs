use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use generational_arena::{Arena, Index};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::domain::error::{DomainError, DomainResult};

/// Integer node identifier. Uniqueness is the caller's business.
pub type NodeId = i64;

/// Data payload for tree nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    pub name: String,
}

impl NodeData {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.name)
    }
}

/// Tree node in first-child/next-sibling encoding.
///
/// Links are only mutated through [`TreeArena`], which keeps `linked` true
/// exactly while one `first_child`/`next_sibling` slot refers to the node.
#[derive(Debug)]
pub struct TreeNode {
    pub data: NodeData,
    first_child: Option<Index>,
    next_sibling: Option<Index>,
    linked: bool,
}

impl TreeNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            first_child: None,
            next_sibling: None,
            linked: false,
        }
    }

    pub fn first_child(&self) -> Option<Index> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<Index> {
        self.next_sibling
    }

    /// True while some parent or sibling holds a link to this node.
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

/// How thoroughly [`TreeArena::add_child`] looks for cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleCheck {
    /// Only the sibling chain starting at the parent is scanned.
    ///
    /// Making an ancestor the child of one of its descendants slips through.
    #[default]
    SiblingChain,
    /// Sibling chain scan plus a check that the parent is not inside the
    /// child's subtree.
    Ancestry,
}

/// What happens to the children of a removed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovePolicy {
    /// Release the whole subtree.
    Drop,
    /// Re-attach the children to the root the removal started from.
    #[default]
    Promote,
}

impl FromStr for RemovePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "promote" => Ok(Self::Promote),
            other => Err(format!("unknown remove policy: {other} (expected drop|promote)")),
        }
    }
}

impl fmt::Display for RemovePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop => f.write_str("drop"),
            Self::Promote => f.write_str("promote"),
        }
    }
}

/// Key for [`TreeArena::sort_children`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
}

impl SortKey {
    fn out_of_order(self, a: &NodeData, b: &NodeData) -> bool {
        match self {
            Self::Id => a.id > b.id,
            Self::Name => a.name > b.name,
        }
    }
}

/// A link slot that can own a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    FirstChildOf(Index),
    NextSiblingOf(Index),
}

/// Arena-based first-child/next-sibling tree store.
///
/// Nodes live in a generational arena, so a handle to a removed node goes
/// stale instead of dangling. The root is an externally held handle that
/// can never be linked below another node.
#[derive(Debug)]
pub struct TreeArena {
    arena: Arena<TreeNode>,
    root: Option<Index>,
    cycle_check: CycleCheck,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            cycle_check: CycleCheck::default(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            root: None,
            cycle_check: CycleCheck::default(),
        }
    }

    pub fn with_cycle_check(mut self, cycle_check: CycleCheck) -> Self {
        self.cycle_check = cycle_check;
        self
    }

    pub fn cycle_check(&self) -> CycleCheck {
        self.cycle_check
    }

    /// Number of live nodes, linked or not.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.arena.contains(idx)
    }

    /// Allocates an unlinked node without children.
    #[instrument(level = "trace", skip(self, name))]
    pub fn create(&mut self, id: NodeId, name: impl Into<String>) -> Index {
        self.arena.insert(TreeNode::new(NodeData::new(id, name)))
    }

    /// Designates the externally held root. It must be alive and unlinked.
    #[instrument(level = "trace", skip(self))]
    pub fn set_root(&mut self, idx: Index) -> DomainResult<()> {
        let node = self.node(idx)?;
        if node.linked {
            return Err(DomainError::AlreadyLinked {
                child: node.data.id,
            });
        }
        self.root = Some(idx);
        Ok(())
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn data(&self, idx: Index) -> DomainResult<&NodeData> {
        self.node(idx).map(|node| &node.data)
    }

    pub fn rename(&mut self, idx: Index, name: impl Into<String>) -> DomainResult<()> {
        self.node_mut(idx)?.data.name = name.into();
        Ok(())
    }

    /// Direct children of `parent`, in sibling order.
    pub fn children(&self, parent: Index) -> Siblings<'_> {
        let next = self.arena.get(parent).and_then(|node| node.first_child);
        Siblings { arena: self, next }
    }

    /// `start` followed by every node on its sibling chain.
    pub fn sibling_chain(&self, start: Index) -> Siblings<'_> {
        Siblings {
            arena: self,
            next: Some(start),
        }
    }

    /// Pre-order walk of `root`, its descendants and then its right siblings
    /// (with their subtrees). This is the order [`find`](Self::find) uses.
    pub fn preorder(&self, root: Index) -> Preorder<'_> {
        Preorder {
            arena: self,
            stack: vec![root],
            boundary: None,
        }
    }

    /// Pre-order walk of `node` and its descendants only.
    pub fn descendants(&self, node: Index) -> Preorder<'_> {
        Preorder {
            arena: self,
            stack: vec![node],
            boundary: Some(node),
        }
    }

    /// Depth-first search for `id`, first match in [`preorder`](Self::preorder).
    #[instrument(level = "trace", skip(self))]
    pub fn find(&self, root: Index, id: NodeId) -> Option<Index> {
        self.preorder(root)
            .find(|(_, node)| node.data.id == id)
            .map(|(idx, _)| idx)
    }

    /// True if `node` is `ancestor` itself or lies below it.
    pub fn is_in_subtree(&self, ancestor: Index, node: Index) -> bool {
        self.descendants(ancestor).any(|(idx, _)| idx == node)
    }

    /// Appends `child` and its subtree as the last child of `parent`.
    ///
    /// The cycle guard scans the sibling chain starting at `parent`; with
    /// [`CycleCheck::Ancestry`] it also refuses a `parent` inside `child`'s
    /// subtree. A child that is the root or already owned by another slot is
    /// refused as well. Rejections leave the tree untouched.
    #[instrument(level = "trace", skip(self))]
    pub fn add_child(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        let parent_id = self.node(parent)?.data.id;
        let child_node = self.node(child)?;
        let child_id = child_node.data.id;
        let child_linked = child_node.linked;

        if self.sibling_chain(parent).any(|(idx, _)| idx == child) {
            warn!(
                parent = parent_id,
                child = child_id,
                "ADD rejected: cycle detected on the parent's sibling chain"
            );
            return Err(DomainError::CycleDetected {
                parent: parent_id,
                child: child_id,
            });
        }
        match self.cycle_check {
            CycleCheck::SiblingChain => {
                trace!(
                    parent = parent_id,
                    child = child_id,
                    "ancestry not verified, sibling chain check only"
                );
            }
            CycleCheck::Ancestry => {
                if self.is_in_subtree(child, parent) {
                    warn!(
                        parent = parent_id,
                        child = child_id,
                        "ADD rejected: cycle detected, parent lies below child"
                    );
                    return Err(DomainError::CycleDetected {
                        parent: parent_id,
                        child: child_id,
                    });
                }
            }
        }
        if self.root == Some(child) {
            warn!(parent = parent_id, child = child_id, "ADD rejected: child is the root");
            return Err(DomainError::RootNotAttachable(child_id));
        }
        if child_linked {
            warn!(
                parent = parent_id,
                child = child_id,
                "ADD rejected: child is already linked"
            );
            return Err(DomainError::AlreadyLinked { child: child_id });
        }

        self.append(parent, child)?;
        info!(parent = parent_id, child = child_id, "ADD: child attached");
        Ok(())
    }

    /// Removes the node `id` found below `root`.
    ///
    /// Scans the direct child list of `root`, then each child's list in turn,
    /// depth-first. `root` itself is never removed. Promoted children are
    /// appended to `root`, not to the removed node's parent. Returns the
    /// payload of the removed node, or `None` if `id` was not found.
    #[instrument(level = "trace", skip(self))]
    pub fn remove(
        &mut self,
        root: Index,
        id: NodeId,
        policy: RemovePolicy,
    ) -> DomainResult<Option<NodeData>> {
        self.node(root)?;

        let mut search_roots = vec![root];
        let found = loop {
            let Some(current) = search_roots.pop() else {
                break None;
            };
            if let Some(hit) = self.find_in_children(current, |node| node.data.id == id) {
                break Some(hit);
            }
            let children: Vec<Index> = self.children(current).map(|(idx, _)| idx).collect();
            search_roots.extend(children.into_iter().rev());
        };

        let Some((slot, target)) = found else {
            debug!(id, "REMOVE: node not found, nothing to do");
            return Ok(None);
        };

        self.unlink(slot, target)?;
        let name = self.node(target)?.data.name.clone();
        info!(id, %name, %policy, "REMOVE: removing node");

        match policy {
            RemovePolicy::Drop => {
                let doomed: Vec<Index> = self
                    .descendants(target)
                    .skip(1)
                    .map(|(idx, _)| idx)
                    .collect();
                debug!(id, released = doomed.len(), "REMOVE: releasing subtree");
                for idx in doomed {
                    self.arena.remove(idx);
                }
            }
            RemovePolicy::Promote => {
                let mut next = self.node_mut(target)?.first_child.take();
                while let Some(child) = next {
                    let node = self.node_mut(child)?;
                    next = node.next_sibling.take();
                    node.linked = false;
                    info!(id = node.data.id, name = %node.data.name, "REMOVE: promoting child to root");
                    self.add_child(root, child)?;
                }
            }
        }

        let removed = self
            .arena
            .remove(target)
            .ok_or(DomainError::DeadHandle(target))?;
        Ok(Some(removed.data))
    }

    /// Relocates node `child_id` with its subtree to be the last child of
    /// `parent_id`, both searched from `root`.
    ///
    /// The moved node is detached from wherever it sits below `root`. If the
    /// re-attach is refused the node goes back to its former slot.
    #[instrument(level = "trace", skip(self))]
    pub fn move_node(
        &mut self,
        root: Option<Index>,
        parent_id: NodeId,
        child_id: NodeId,
    ) -> DomainResult<()> {
        let Some(root) = root else {
            warn!(parent = parent_id, child = child_id, "MOVE rejected: no root");
            return Err(DomainError::NoRoot);
        };
        if parent_id == child_id {
            warn!(parent = parent_id, child = child_id, "MOVE rejected: identical ids");
            return Err(DomainError::SameNode(parent_id));
        }
        let Some(parent) = self.find(root, parent_id) else {
            warn!(parent = parent_id, "MOVE rejected: parent not found");
            return Err(DomainError::UnknownNode(parent_id));
        };
        let Some(child) = self.find(root, child_id) else {
            warn!(child = child_id, "MOVE rejected: child not found");
            return Err(DomainError::UnknownNode(child_id));
        };
        if child == root || self.root == Some(child) {
            warn!(child = child_id, "MOVE rejected: cannot move the root");
            return Err(DomainError::RootNotAttachable(child_id));
        }
        if self.is_in_subtree(child, parent) {
            warn!(
                parent = parent_id,
                child = child_id,
                "MOVE rejected: destination lies inside the moved subtree"
            );
            return Err(DomainError::MoveIntoOwnSubtree {
                parent: parent_id,
                child: child_id,
            });
        }
        let slot = self.incoming_slot(root, child).ok_or_else(|| {
            DomainError::InvariantViolation(format!("node {child_id} is reachable but has no owner"))
        })?;

        info!(
            parent = parent_id,
            child = child_id,
            "MOVE: moving node and its children"
        );
        self.unlink(slot, child)?;
        if let Err(e) = self.add_child(parent, child) {
            self.relink(slot, child)?;
            return Err(e);
        }
        Ok(())
    }

    /// Moves `child` from `source_parent`'s child list to the end of
    /// `dest_parent`'s, matching it by id. Handles are trusted: there is no
    /// cycle check.
    #[instrument(level = "trace", skip(self))]
    pub fn move_child(
        &mut self,
        source_parent: Index,
        dest_parent: Index,
        child: Index,
    ) -> DomainResult<()> {
        let child_id = self.node(child)?.data.id;
        let source_id = self.node(source_parent)?.data.id;
        let dest_id = self.node(dest_parent)?.data.id;

        let Some((slot, found)) = self.find_in_children(source_parent, |node| node.data.id == child_id)
        else {
            warn!(parent = source_id, child = child_id, "move rejected: not a child");
            return Err(DomainError::NotAChild {
                parent: source_id,
                child: child_id,
            });
        };

        self.unlink(slot, found)?;
        self.append(dest_parent, found)?;
        info!(from = source_id, to = dest_id, child = child_id, "child moved");
        Ok(())
    }

    /// Sorts the children of `parent` ascending by `key` with a pairwise
    /// exchange sort. Payloads move between sibling slots, links stay put,
    /// so every slot keeps its subtree.
    ///
    /// Returns the child slots in order.
    #[instrument(level = "trace", skip(self))]
    pub fn sort_children(&mut self, parent: Index, key: SortKey) -> DomainResult<Vec<Index>> {
        let parent_id = self.node(parent)?.data.id;
        let slots: Vec<Index> = self.children(parent).map(|(idx, _)| idx).collect();

        for (pos, &i) in slots.iter().enumerate() {
            for &j in &slots[pos + 1..] {
                let (Some(a), Some(b)) = self.arena.get2_mut(i, j) else {
                    continue;
                };
                if key.out_of_order(&a.data, &b.data) {
                    std::mem::swap(&mut a.data, &mut b.data);
                }
            }
        }

        debug!(parent = parent_id, ?key, children = slots.len(), "children sorted");
        Ok(slots)
    }

    /// Verifies the structural invariants for everything reachable from
    /// `root` and returns the number of reachable nodes.
    pub fn check_invariants(&self, root: Index) -> DomainResult<usize> {
        let root_node = self.node(root)?;
        if root_node.linked {
            return Err(DomainError::InvariantViolation(format!(
                "root {} is linked",
                root_node.data.id
            )));
        }
        if root_node.next_sibling.is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "root {} has a sibling",
                root_node.data.id
            )));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = self.node(idx)?;
            if !seen.insert(idx) {
                return Err(DomainError::InvariantViolation(format!(
                    "node {} is reachable twice",
                    node.data.id
                )));
            }
            if idx != root && !node.linked {
                return Err(DomainError::InvariantViolation(format!(
                    "node {} is reachable but not marked linked",
                    node.data.id
                )));
            }
            stack.extend(node.next_sibling);
            stack.extend(node.first_child);
        }
        Ok(seen.len())
    }

    fn node(&self, idx: Index) -> DomainResult<&TreeNode> {
        self.arena.get(idx).ok_or(DomainError::DeadHandle(idx))
    }

    fn node_mut(&mut self, idx: Index) -> DomainResult<&mut TreeNode> {
        self.arena.get_mut(idx).ok_or(DomainError::DeadHandle(idx))
    }

    fn slot_mut(&mut self, slot: Slot) -> DomainResult<&mut Option<Index>> {
        match slot {
            Slot::FirstChildOf(parent) => Ok(&mut self.node_mut(parent)?.first_child),
            Slot::NextSiblingOf(prev) => Ok(&mut self.node_mut(prev)?.next_sibling),
        }
    }

    fn append(&mut self, parent: Index, child: Index) -> DomainResult<()> {
        debug_assert!(
            self.arena.get(child).map_or(true, |n| n.next_sibling.is_none()),
            "[precondition] an unlinked node has no sibling"
        );
        let slot = match self.children(parent).last() {
            None => Slot::FirstChildOf(parent),
            Some((last, _)) => Slot::NextSiblingOf(last),
        };
        self.relink(slot, child)
    }

    /// Takes `node` out of `slot`, handing its right siblings to the slot.
    fn unlink(&mut self, slot: Slot, node: Index) -> DomainResult<()> {
        let next = self.node(node)?.next_sibling;
        *self.slot_mut(slot)? = next;
        let node = self.node_mut(node)?;
        node.next_sibling = None;
        node.linked = false;
        Ok(())
    }

    /// Puts `node` into `slot`, in front of whatever the slot held.
    fn relink(&mut self, slot: Slot, node: Index) -> DomainResult<()> {
        let next = self.slot_mut(slot)?.replace(node);
        let node = self.node_mut(node)?;
        node.next_sibling = next;
        node.linked = true;
        Ok(())
    }

    fn find_in_children(
        &self,
        parent: Index,
        pred: impl Fn(&TreeNode) -> bool,
    ) -> Option<(Slot, Index)> {
        let mut slot = Slot::FirstChildOf(parent);
        for (idx, node) in self.children(parent) {
            if pred(node) {
                return Some((slot, idx));
            }
            slot = Slot::NextSiblingOf(idx);
        }
        None
    }

    /// The slot holding the single incoming link of `target`.
    fn incoming_slot(&self, root: Index, target: Index) -> Option<Slot> {
        self.preorder(root).find_map(|(idx, node)| {
            if node.first_child == Some(target) {
                Some(Slot::FirstChildOf(idx))
            } else if node.next_sibling == Some(target) {
                Some(Slot::NextSiblingOf(idx))
            } else {
                None
            }
        })
    }
}

/// Iterator over a sibling chain.
pub struct Siblings<'a> {
    arena: &'a TreeArena,
    next: Option<Index>,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.arena.arena.get(idx)?;
        self.next = node.next_sibling;
        Some((idx, node))
    }
}

/// Pre-order iterator with an explicit stack, so long sibling chains do not
/// grow the call stack.
pub struct Preorder<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
    /// Node whose right siblings are not visited.
    boundary: Option<Index>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.stack.pop() {
            let Some(node) = self.arena.arena.get(idx) else {
                continue;
            };
            // Siblings go below children so the whole subtree comes first.
            if self.boundary != Some(idx) {
                self.stack.extend(node.next_sibling);
            }
            self.stack.extend(node.first_child);
            return Some((idx, node));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(arena: &TreeArena, parent: Index) -> Vec<NodeId> {
        arena.children(parent).map(|(_, n)| n.data.id).collect()
    }

    #[test]
    fn given_unlinked_node_when_relinked_then_slot_is_restored() {
        let mut arena = TreeArena::new();
        let root = arena.create(0, "root");
        let a = arena.create(1, "a");
        let b = arena.create(2, "b");
        let c = arena.create(3, "c");
        for child in [a, b, c] {
            arena.add_child(root, child).unwrap();
        }

        let (slot, found) = arena.find_in_children(root, |n| n.data.id == 2).unwrap();
        assert_eq!(found, b);
        assert_eq!(slot, Slot::NextSiblingOf(a));

        arena.unlink(slot, b).unwrap();
        assert_eq!(chain(&arena, root), vec![1, 3]);
        assert!(!arena.get_node(b).unwrap().is_linked());

        arena.relink(slot, b).unwrap();
        assert_eq!(chain(&arena, root), vec![1, 2, 3]);
        assert!(arena.get_node(b).unwrap().is_linked());
    }

    #[test]
    fn given_first_child_when_locating_owner_then_returns_parent_slot() {
        let mut arena = TreeArena::new();
        let root = arena.create(0, "root");
        let a = arena.create(1, "a");
        let b = arena.create(2, "b");
        arena.add_child(root, a).unwrap();
        arena.add_child(a, b).unwrap();

        assert_eq!(arena.incoming_slot(root, a), Some(Slot::FirstChildOf(root)));
        assert_eq!(arena.incoming_slot(root, b), Some(Slot::FirstChildOf(a)));
        assert_eq!(arena.incoming_slot(root, root), None);
    }

    #[test]
    fn test_remove_policy_from_str() {
        assert_eq!("drop".parse::<RemovePolicy>().unwrap(), RemovePolicy::Drop);
        assert_eq!("Promote".parse::<RemovePolicy>().unwrap(), RemovePolicy::Promote);
        assert!("keep".parse::<RemovePolicy>().is_err());
    }
}
