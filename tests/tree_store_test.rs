//! Tests for the arena tree store: insertion, lookup, removal, relocation, sorting.

use generational_arena::Index;
use rstest::{fixture, rstest};

use sibtree::domain::{
    render_tree, CycleCheck, DomainError, NodeId, RemovePolicy, SortKey, TreeArena, DEFAULT_INDENT,
};
use sibtree::util::testing;

/// Store with a root (id 0) and unlinked nodes 1..=6 named a..f.
struct Store {
    arena: TreeArena,
    nodes: Vec<Index>,
}

impl Store {
    fn root(&self) -> Index {
        self.nodes[0]
    }

    fn add(&mut self, parent: usize, child: usize) {
        self.arena
            .add_child(self.nodes[parent], self.nodes[child])
            .expect("add child");
    }

    fn child_ids(&self, parent: usize) -> Vec<NodeId> {
        self.arena
            .children(self.nodes[parent])
            .map(|(_, node)| node.data.id)
            .collect()
    }

    fn render(&self) -> String {
        render_tree(&self.arena, self.root(), 0, DEFAULT_INDENT)
    }
}

fn build(cycle_check: CycleCheck) -> Store {
    testing::init_test_setup();
    let mut arena = TreeArena::new().with_cycle_check(cycle_check);
    let nodes: Vec<Index> = ["root", "a", "b", "c", "d", "e", "f"]
        .iter()
        .enumerate()
        .map(|(id, name)| arena.create(id as NodeId, *name))
        .collect();
    arena.set_root(nodes[0]).expect("set root");
    Store { arena, nodes }
}

#[fixture]
fn store() -> Store {
    build(CycleCheck::SiblingChain)
}

#[fixture]
fn strict_store() -> Store {
    build(CycleCheck::Ancestry)
}

// ============================================================
// add_child
// ============================================================

#[rstest]
fn given_children_when_adding_then_appended_in_order(mut store: Store) {
    store.add(0, 2);
    store.add(0, 1);
    store.add(0, 3);

    assert_eq!(store.child_ids(0), vec![2, 1, 3]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 4);
}

#[rstest]
fn given_child_with_subtree_when_adding_then_subtree_comes_along(mut store: Store) {
    store.add(1, 2);
    store.add(2, 3);
    store.add(0, 1);

    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 4);
    assert_eq!(store.arena.find(store.root(), 3), Some(store.nodes[3]));
}

#[rstest]
fn given_self_reference_when_adding_then_cycle_rejected(mut store: Store) {
    store.add(0, 1);
    let before = store.render();

    let err = store
        .arena
        .add_child(store.nodes[1], store.nodes[1])
        .unwrap_err();

    assert_eq!(err, DomainError::CycleDetected { parent: 1, child: 1 });
    assert_eq!(store.render(), before);
}

#[rstest]
fn given_child_on_parent_sibling_chain_when_adding_then_cycle_rejected(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(0, 3);
    let before = store.render();

    let err = store
        .arena
        .add_child(store.nodes[1], store.nodes[3])
        .unwrap_err();

    assert_eq!(err, DomainError::CycleDetected { parent: 1, child: 3 });
    assert_eq!(store.render(), before);
}

#[rstest]
fn given_linked_child_when_adding_elsewhere_then_rejected(mut store: Store) {
    store.add(0, 1);
    store.add(1, 2);

    let err = store
        .arena
        .add_child(store.root(), store.nodes[2])
        .unwrap_err();

    assert_eq!(err, DomainError::AlreadyLinked { child: 2 });
    assert_eq!(store.child_ids(0), vec![1]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 3);
}

#[rstest]
fn given_root_as_child_when_adding_then_rejected(mut store: Store) {
    let err = store
        .arena
        .add_child(store.nodes[1], store.root())
        .unwrap_err();

    assert_eq!(err, DomainError::RootNotAttachable(0));
    assert!(!store.arena.get_node(store.root()).unwrap().is_linked());
}

#[rstest]
fn given_sibling_chain_check_when_ancestor_added_below_descendant_then_not_detected(
    mut store: Store,
) {
    // Known limitation of the default check: only the parent's sibling chain is scanned.
    store.add(1, 2);

    store
        .arena
        .add_child(store.nodes[2], store.nodes[1])
        .expect("sibling chain check lets this through");

    assert!(store.arena.get_node(store.nodes[1]).unwrap().is_linked());
    // The cycle is not reachable from the root.
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 1);
}

#[rstest]
fn given_ancestry_check_when_ancestor_added_below_descendant_then_rejected(
    mut strict_store: Store,
) {
    strict_store.add(1, 2);
    strict_store.add(2, 3);

    let err = strict_store
        .arena
        .add_child(strict_store.nodes[3], strict_store.nodes[1])
        .unwrap_err();

    assert_eq!(err, DomainError::CycleDetected { parent: 3, child: 1 });
    assert!(!strict_store.arena.get_node(strict_store.nodes[1]).unwrap().is_linked());
}

// ============================================================
// find
// ============================================================

#[rstest]
fn given_nested_tree_when_finding_then_returns_node_at_any_depth(mut store: Store) {
    store.add(0, 1);
    store.add(1, 2);
    store.add(2, 3);
    store.add(0, 4);

    assert_eq!(store.arena.find(store.root(), 0), Some(store.root()));
    assert_eq!(store.arena.find(store.root(), 3), Some(store.nodes[3]));
    assert_eq!(store.arena.find(store.root(), 4), Some(store.nodes[4]));
    assert_eq!(store.arena.find(store.root(), 5), None);
}

#[rstest]
fn given_duplicate_ids_when_finding_then_first_in_preorder_wins(mut store: Store) {
    let twin = store.arena.create(3, "twin");
    store.add(0, 1);
    store.add(1, 3);
    store.arena.add_child(store.root(), twin).unwrap();

    assert_eq!(store.arena.find(store.root(), 3), Some(store.nodes[3]));
}

#[test]
fn given_deep_chain_when_walking_then_does_not_overflow_stack() {
    let mut arena = TreeArena::new();
    let root = arena.create(0, "root");
    arena.set_root(root).unwrap();
    let mut parent = root;
    for id in 1..=100_000 {
        let node = arena.create(id, "n");
        arena.add_child(parent, node).unwrap();
        parent = node;
    }

    assert_eq!(arena.find(root, 100_000), Some(parent));
    assert_eq!(arena.check_invariants(root).unwrap(), 100_001);
    let rendered = sibtree::domain::render_children(&arena, root);
    assert_eq!(rendered.as_deref(), Some("n"));

    arena.remove(root, 1, RemovePolicy::Drop).unwrap();
    assert_eq!(arena.len(), 1);
}

// ============================================================
// remove
// ============================================================

#[rstest]
fn given_node_with_children_when_removing_with_promote_then_children_move_to_root(
    mut store: Store,
) {
    // root -> A -> {B, C}
    store.add(0, 1);
    store.add(1, 2);
    store.add(1, 3);

    let removed = store
        .arena
        .remove(store.root(), 1, RemovePolicy::Promote)
        .unwrap()
        .expect("node 1 removed");

    assert_eq!(removed.id, 1);
    assert_eq!(store.child_ids(0), vec![2, 3]);
    assert_eq!(store.arena.find(store.root(), 1), None);
    assert!(!store.arena.contains(store.nodes[1]));
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 3);
}

#[rstest]
fn given_nested_node_when_removing_with_promote_then_children_go_to_top_level_root(
    mut store: Store,
) {
    // root -> {A -> B -> {C, D}, E}
    store.add(0, 1);
    store.add(1, 2);
    store.add(2, 3);
    store.add(2, 4);
    store.add(0, 5);

    store
        .arena
        .remove(store.root(), 2, RemovePolicy::Promote)
        .unwrap();

    assert_eq!(store.child_ids(0), vec![1, 5, 3, 4]);
    assert!(store.child_ids(1).is_empty());
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 5);
}

#[rstest]
fn given_subtree_when_removing_with_drop_then_every_node_released(mut store: Store) {
    store.add(0, 1);
    store.add(1, 2);
    store.add(2, 3);
    store.add(1, 4);
    store.add(0, 5);
    let before = store.arena.len();

    store
        .arena
        .remove(store.root(), 1, RemovePolicy::Drop)
        .unwrap();

    assert_eq!(store.arena.len(), before - 4);
    for gone in [1, 2, 3, 4] {
        assert!(!store.arena.contains(store.nodes[gone]));
    }
    assert_eq!(store.child_ids(0), vec![5]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 2);
}

#[rstest]
fn given_middle_sibling_when_removing_then_chain_is_rejoined(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(0, 3);

    store
        .arena
        .remove(store.root(), 2, RemovePolicy::Promote)
        .unwrap();

    assert_eq!(store.child_ids(0), vec![1, 3]);
}

#[rstest]
#[case::absent(9)]
#[case::detached(6)]
#[case::root(0)]
fn given_id_not_below_root_when_removing_then_noop(mut store: Store, #[case] id: NodeId) {
    store.add(0, 1);
    let before = store.render();

    let removed = store
        .arena
        .remove(store.root(), id, RemovePolicy::Promote)
        .unwrap();

    assert_eq!(removed, None);
    assert_eq!(store.render(), before);
    assert!(store.arena.contains(store.root()));
}

// ============================================================
// move_node
// ============================================================

#[rstest]
fn given_nested_child_when_moving_twice_then_only_under_last_parent(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(1, 3);

    store
        .arena
        .move_node(Some(store.root()), 2, 3)
        .expect("move to P2");

    assert!(store.child_ids(1).is_empty());
    assert_eq!(store.child_ids(2), vec![3]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 4);

    store
        .arena
        .move_node(Some(store.root()), 1, 3)
        .expect("move back to P1");

    assert_eq!(store.child_ids(1), vec![3]);
    assert!(store.child_ids(2).is_empty());
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 4);
}

#[rstest]
fn given_node_with_subtree_when_moving_then_subtree_follows(mut store: Store) {
    store.add(0, 1);
    store.add(1, 2);
    store.add(2, 3);
    store.add(0, 4);

    store.arena.move_node(Some(store.root()), 4, 2).unwrap();

    assert_eq!(store.child_ids(4), vec![2]);
    assert_eq!(store.child_ids(2), vec![3]);
    assert!(store.child_ids(1).is_empty());
}

#[rstest]
fn given_right_sibling_when_moving_below_left_sibling_then_succeeds(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(0, 3);

    store.arena.move_node(Some(store.root()), 1, 2).unwrap();

    assert_eq!(store.child_ids(0), vec![1, 3]);
    assert_eq!(store.child_ids(1), vec![2]);
}

#[rstest]
#[case::same_ids(2, 2, DomainError::SameNode(2))]
#[case::unknown_parent(9, 2, DomainError::UnknownNode(9))]
#[case::unknown_child(1, 9, DomainError::UnknownNode(9))]
#[case::detached_child(1, 6, DomainError::UnknownNode(6))]
#[case::root_child(1, 0, DomainError::RootNotAttachable(0))]
#[case::into_own_subtree(3, 1, DomainError::MoveIntoOwnSubtree { parent: 3, child: 1 })]
fn given_invalid_move_when_moving_then_rejected_and_tree_unchanged(
    mut store: Store,
    #[case] parent: NodeId,
    #[case] child: NodeId,
    #[case] expected: DomainError,
) {
    // root -> {1 -> 2 -> 3, 4}
    store.add(0, 1);
    store.add(1, 2);
    store.add(2, 3);
    store.add(0, 4);
    let before = store.render();

    let err = store
        .arena
        .move_node(Some(store.root()), parent, child)
        .unwrap_err();

    assert_eq!(err, expected);
    assert_eq!(store.render(), before);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 5);
}

#[rstest]
fn given_no_root_when_moving_then_rejected(mut store: Store) {
    assert_eq!(
        store.arena.move_node(None, 1, 2).unwrap_err(),
        DomainError::NoRoot
    );
}

// ============================================================
// move_child
// ============================================================

#[rstest]
fn given_child_handle_when_moving_between_parents_then_relinked(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(1, 3);
    store.add(1, 4);

    store
        .arena
        .move_child(store.nodes[1], store.nodes[2], store.nodes[3])
        .unwrap();

    assert_eq!(store.child_ids(1), vec![4]);
    assert_eq!(store.child_ids(2), vec![3]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 5);
}

#[rstest]
fn given_wrong_source_parent_when_moving_child_then_not_a_child(mut store: Store) {
    store.add(0, 1);
    store.add(0, 2);
    store.add(1, 3);

    let err = store
        .arena
        .move_child(store.nodes[2], store.nodes[1], store.nodes[3])
        .unwrap_err();

    assert_eq!(err, DomainError::NotAChild { parent: 2, child: 3 });
    assert_eq!(store.child_ids(1), vec![3]);
}

// ============================================================
// sort_children
// ============================================================

fn names(store: &Store, parent: usize) -> Vec<String> {
    store
        .arena
        .children(store.nodes[parent])
        .map(|(_, node)| node.data.name.clone())
        .collect()
}

#[rstest]
fn given_unsorted_children_when_sorting_by_id_then_ascending_and_idempotent(mut store: Store) {
    for child in [3, 1, 5, 2, 4] {
        store.add(0, child);
    }

    store.arena.sort_children(store.root(), SortKey::Id).unwrap();
    let once = store.child_ids(0);
    store.arena.sort_children(store.root(), SortKey::Id).unwrap();

    assert_eq!(once, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.child_ids(0), once);
    assert_eq!(names(&store, 0), vec!["a", "b", "c", "d", "e"]);
}

#[rstest]
fn given_unsorted_names_when_sorting_by_name_then_lexicographic(mut store: Store) {
    store.arena.rename(store.nodes[1], "beta").unwrap();
    store.arena.rename(store.nodes[2], "Alpha").unwrap();
    store.arena.rename(store.nodes[3], "alpha").unwrap();
    for child in [1, 2, 3] {
        store.add(0, child);
    }

    store.arena.sort_children(store.root(), SortKey::Name).unwrap();

    // Byte order: upper case sorts before lower case.
    assert_eq!(names(&store, 0), vec!["Alpha", "alpha", "beta"]);
    assert_eq!(store.child_ids(0), vec![2, 3, 1]);
}

#[rstest]
fn given_children_with_subtrees_when_sorting_then_subtrees_stay_with_slots(mut store: Store) {
    store.add(0, 3);
    store.add(0, 1);
    store.add(3, 5);

    let slots = store.arena.sort_children(store.root(), SortKey::Id).unwrap();

    assert_eq!(slots, vec![store.nodes[3], store.nodes[1]]);
    // The first slot now carries id 1 and still owns node 5.
    let first = store.arena.find(store.root(), 1).unwrap();
    assert_eq!(first, store.nodes[3]);
    assert_eq!(store.arena.data(first).unwrap().name, "a");
    assert_eq!(store.child_ids(3), vec![5]);
    assert_eq!(store.arena.check_invariants(store.root()).unwrap(), 4);
}

#[rstest]
fn given_leaf_when_sorting_then_noop(mut store: Store) {
    assert!(store
        .arena
        .sort_children(store.nodes[4], SortKey::Name)
        .unwrap()
        .is_empty());
}

// ============================================================
// lifecycle
// ============================================================

#[rstest]
fn given_removed_node_when_using_handle_then_dead_handle(mut store: Store) {
    store.add(0, 1);
    store
        .arena
        .remove(store.root(), 1, RemovePolicy::Drop)
        .unwrap();

    let err = store
        .arena
        .add_child(store.root(), store.nodes[1])
        .unwrap_err();

    assert_eq!(err, DomainError::DeadHandle(store.nodes[1]));
}
