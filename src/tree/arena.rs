use std::cell::Cell;

use crate::{ConstraintError, PixelCoord};
use super::{Node, NodeId, NodeKind};

/// Storage of all nodes of a tree. Deleted nodes leave a tombstone so that
/// their ids never resolve again.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Option<Node>>,
    alive: usize,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(node));
        self.alive += 1;
        id
    }

    fn remove(&mut self, id: NodeId) -> Node {
        match self.nodes.get_mut(id.index()).and_then(Option::take) {
            Some(node) => {
                self.alive -= 1;
                node
            }
            None => panic!("node {} is not alive", id),
        }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Node `id`, which must be alive.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        match self.get(id) {
            Some(node) => node,
            None => panic!("node {} is not alive", id),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            Some(node) => node,
            None => panic!("node {} is not alive", id),
        }
    }

    /// Number of slots ever handed out, tombstones included.
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.alive
    }

    pub(crate) fn into_nodes(self) -> Vec<(NodeId, Node)> {
        self.nodes
            .into_iter()
            .enumerate()
            .filter_map(|(i, node)| node.map(|n| (NodeId(i as u32), n)))
            .collect()
    }

    /// Subtree of `id`, children before their parent.
    pub(crate) fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if expanded {
                order.push(cur);
                continue;
            }
            stack.push((cur, true));
            for &child in self.node(cur).children.iter().rev() {
                stack.push((child, false));
            }
        }
        order
    }

    /// Subtree of `id`, parents before their children, children in order.
    pub(crate) fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            order.push(cur);
            stack.extend(self.node(cur).children.iter().rev());
        }
        order
    }

    pub(crate) fn element_count(&self, id: NodeId) -> usize {
        self.memoized(id, |n| &n.size, |n| n.own.len())
    }

    pub(crate) fn node_count(&self, id: NodeId) -> usize {
        self.memoized(id, |n| &n.ncount, |_| 1)
    }

    /// Sums `local` over the subtree of `id`, filling only the memos that are unknown.
    fn memoized(
        &self,
        id: NodeId,
        memo: fn(&Node) -> &Cell<Option<usize>>,
        local: fn(&Node) -> usize,
    ) -> usize {
        if let Some(known) = memo(self.node(id)).get() {
            return known;
        }
        let mut stack = vec![(id, false)];
        while let Some((cur, expanded)) = stack.pop() {
            let node = self.node(cur);
            if memo(node).get().is_some() {
                continue;
            }
            if expanded {
                let total = local(node)
                    + node
                        .children
                        .iter()
                        .map(|&c| memo(self.node(c)).get().unwrap_or(0))
                        .sum::<usize>();
                memo(node).set(Some(total));
            } else {
                stack.push((cur, true));
                for &child in &node.children {
                    if memo(self.node(child)).get().is_none() {
                        stack.push((child, false));
                    }
                }
            }
        }
        memo(self.node(id)).get().unwrap_or(0)
    }

    /// Clears a memo from `id` upwards. Stops at the first node that is already unknown,
    /// as everything above it is unknown too.
    fn invalidate_upward(&self, id: NodeId, memo: fn(&Node) -> &Cell<Option<usize>>) {
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.node(c);
            if memo(node).get().is_none() {
                break;
            }
            memo(node).set(None);
            cur = node.parent;
        }
    }

    /// Appends `child` to `parent` if `parent` stays legal with one more child.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ConstraintError> {
        debug_assert!(self.node(child).parent.is_none(), "child is attached elsewhere");
        let p = self.node(parent);
        p.kind.check_shape(parent, p.sentinel, p.own.len(), p.children.len() + 1)?;
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
        self.invalidate_upward(parent, |n| &n.size);
        self.invalidate_upward(parent, |n| &n.ncount);
        Ok(())
    }

    /// Gives `px` to `id` if `id` stays legal with one more element.
    pub(crate) fn add_element(&mut self, id: NodeId, px: PixelCoord) -> Result<(), ConstraintError> {
        let n = self.node(id);
        n.kind.check_shape(id, n.sentinel, n.own.len() + 1, n.children.len())?;
        self.node_mut(id).own.push(px);
        self.invalidate_upward(id, |n| &n.size);
        Ok(())
    }

    /// Child `index` of `parent`, after checking that `parent` stays legal once the child
    /// is folded into it. `collapsed` folds the whole subtree of the child.
    pub(crate) fn deletable_child(
        &self,
        parent: NodeId,
        index: usize,
        collapsed: bool,
    ) -> Result<Option<NodeId>, ConstraintError> {
        let p = self.node(parent);
        let child = match p.children.get(index) {
            Some(&child) => child,
            None => return Ok(None),
        };
        let c = self.node(child);
        let (elements, children) = if collapsed {
            (p.own.len() + self.element_count(child), p.children.len() - 1)
        } else {
            (p.own.len() + c.own.len(), p.children.len() - 1 + c.children.len())
        };
        p.kind.check_shape(parent, p.sentinel, elements, children)?;
        Ok(Some(child))
    }

    /// Folds child `index` into `parent`. The own elements of the child go to `parent`;
    /// a childless child is swap-removed, otherwise its first child takes its slot and
    /// the rest are appended. Returns the id of the destroyed node.
    pub(crate) fn fold_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self.node(parent).children[index];
        let Node { own, children: grandchildren, .. } = self.remove(child);
        for &g in &grandchildren {
            self.node_mut(g).parent = Some(parent);
        }

        let p = self.node_mut(parent);
        let mut grandchildren = grandchildren.into_iter();
        match grandchildren.next() {
            Some(first) => {
                p.children[index] = first;
                p.children.extend(grandchildren);
            }
            None => {
                p.children.swap_remove(index);
            }
        }
        p.own.extend(own);

        self.invalidate_upward(parent, |n| &n.ncount);
        child
    }

    /// Checked version of `fold_child`. `Ok(None)` if `index` is out of range.
    pub(crate) fn delete_child(
        &mut self,
        parent: NodeId,
        index: usize,
    ) -> Result<Option<NodeId>, ConstraintError> {
        Ok(self
            .deletable_child(parent, index, false)?
            .map(|_| self.fold_child(parent, index)))
    }

    /// Folds every descendant of `id` into it, last child first.
    pub(crate) fn collapse_subtree(&mut self, id: NodeId) -> Result<Vec<NodeId>, ConstraintError> {
        let mut removed = Vec::new();
        while let Some(last) = self.node(id).children.len().checked_sub(1) {
            removed.push(self.fold_child(id, last));
        }
        self.node(id).check(id)?;
        Ok(removed)
    }

    /// Node without parent or children; used by construction.
    pub(crate) fn new_inclusion(&mut self, px: PixelCoord, level: f64) -> NodeId {
        self.insert(Node::new(NodeKind::Inclusion, vec![px], Vec::new(), level))
    }

    /// Inclusion node owning `own`, which must not be empty.
    pub(crate) fn new_inclusion_with(&mut self, own: Vec<PixelCoord>, level: f64) -> Result<NodeId, ConstraintError> {
        let next = NodeId(self.nodes.len() as u32);
        NodeKind::Inclusion.check_shape(next, false, own.len(), 0)?;
        Ok(self.insert(Node::new(NodeKind::Inclusion, own, Vec::new(), level)))
    }

    /// Partitioning node over `own` or `children`. The children must be alive and detached.
    pub(crate) fn new_partitioning(
        &mut self,
        own: Vec<PixelCoord>,
        children: Vec<NodeId>,
        level: f64,
    ) -> Result<NodeId, ConstraintError> {
        let next = NodeId(self.nodes.len() as u32);
        NodeKind::Partitioning.check_shape(next, false, own.len(), children.len())?;
        for (i, &child) in children.iter().enumerate() {
            let free = self.get(child).map_or(false, |c| c.parent.is_none());
            if !free || children[..i].contains(&child) {
                return Err(ConstraintError::UnavailableChild { node: next, child });
            }
        }
        let id = self.insert(Node::new(NodeKind::Partitioning, own, children.clone(), level));
        for child in children {
            self.node_mut(child).parent = Some(id);
        }
        Ok(id)
    }

    pub(crate) fn new_sentinel(&mut self, level: f64) -> NodeId {
        let mut node = Node::new(NodeKind::Inclusion, Vec::new(), Vec::new(), level);
        node.sentinel = true;
        self.insert(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x: i32) -> PixelCoord {
        PixelCoord::new(x, 0)
    }

    /// root(0) -> a(1) -> [c(3), d(4)], root -> b(2)
    fn sample() -> (NodeArena, [NodeId; 5]) {
        let mut arena = NodeArena::new();
        let root = arena.new_inclusion(px(0), 1.0);
        let a = arena.new_inclusion(px(1), 2.0);
        let b = arena.new_inclusion(px(2), 2.0);
        let c = arena.new_inclusion(px(3), 3.0);
        let d = arena.new_inclusion(px(4), 3.0);
        arena.add_child(a, c).unwrap();
        arena.add_child(a, d).unwrap();
        arena.add_child(root, a).unwrap();
        arena.add_child(root, b).unwrap();
        (arena, [root, a, b, c, d])
    }

    #[test]
    fn counts() {
        let (arena, [root, a, ..]) = sample();
        assert_eq!(arena.element_count(root), 5);
        assert_eq!(arena.node_count(root), 5);
        assert_eq!(arena.node_count(a), 3);
        assert_eq!(arena.post_order(root).len(), 5);
        assert_eq!(arena.pre_order(root)[0], root);
    }

    #[test]
    fn add_element_invalidates_ancestors() {
        let (mut arena, [root, a, _, c, _]) = sample();
        assert_eq!(arena.element_count(root), 5);
        arena.add_element(c, px(5)).unwrap();
        assert_eq!(arena.node(a).size.get(), None);
        assert_eq!(arena.element_count(root), 6);
        assert_eq!(arena.element_count(a), 4);
    }

    #[test]
    fn delete_leaf_swaps_last() {
        let (mut arena, [root, a, b, c, d]) = sample();
        assert_eq!(arena.node_count(root), 5);
        assert_eq!(arena.delete_child(a, 0).unwrap(), Some(c));
        assert_eq!(arena.node(a).children, [d]);
        assert!(!arena.contains(c));
        assert_eq!(arena.node(a).own, [px(1), px(3)]);
        assert_eq!(arena.node_count(root), 4);
        assert_eq!(arena.element_count(root), 5);
        assert_eq!(arena.node(root).children, [a, b]);
    }

    #[test]
    fn delete_inner_promotes_first_grandchild() {
        let (mut arena, [root, a, b, c, d]) = sample();
        assert_eq!(arena.delete_child(root, 0).unwrap(), Some(a));
        assert_eq!(arena.node(root).children, [c, b, d]);
        assert_eq!(arena.node(c).parent, Some(root));
        assert_eq!(arena.node(d).parent, Some(root));
        assert_eq!(arena.node_count(root), 4);
        assert_eq!(arena.len(), 4);
    }

    #[test]
    fn delete_out_of_range() {
        let (mut arena, [root, ..]) = sample();
        assert_eq!(arena.delete_child(root, 2).unwrap(), None);
        assert_eq!(arena.node_count(root), 5);
    }

    #[test]
    fn collapse() {
        let (mut arena, [root, ..]) = sample();
        let removed = arena.collapse_subtree(root).unwrap();
        assert_eq!(removed.len(), 4);
        assert!(arena.node(root).children.is_empty());
        assert_eq!(arena.node(root).own.len(), 5);
        assert_eq!(arena.node_count(root), 1);
        assert!(arena.collapse_subtree(root).unwrap().is_empty());
    }

    #[test]
    fn partitioning_refuses_mixed_state() {
        let mut arena = NodeArena::new();
        let a = arena.new_inclusion(px(0), 0.0);
        let b = arena.new_inclusion(px(1), 0.0);
        let c = arena.new_inclusion(px(2), 0.0);
        assert!(arena.new_partitioning(vec![], vec![a], 0.0).is_err());
        let p = arena.new_partitioning(vec![], vec![b, c], 0.0).unwrap();
        assert!(matches!(
            arena.delete_child(p, 0),
            Err(ConstraintError::MixedPartitioning { .. })
        ));
        // nothing changed
        assert_eq!(arena.node(p).children, [b, c]);
        assert_eq!(arena.collapse_subtree(p).unwrap().len(), 2);
        assert_eq!(arena.element_count(p), 2);
    }

    #[test]
    fn refused_additions_leave_the_node_alone() {
        let mut arena = NodeArena::new();
        let q = arena.new_partitioning(vec![px(0)], vec![], 0.0).unwrap();
        let c = arena.new_inclusion(px(1), 1.0);
        assert_eq!(arena.element_count(q), 1);
        assert_eq!(
            arena.add_child(q, c),
            Err(ConstraintError::MixedPartitioning { node: q, elements: 1, children: 1 })
        );
        assert_eq!(arena.node(c).parent, None);
        assert!(arena.node(q).children.is_empty());
        assert_eq!(arena.node(q).size.get(), Some(1));

        let a = arena.new_inclusion(px(2), 0.0);
        let b = arena.new_inclusion(px(3), 0.0);
        let p = arena.new_partitioning(vec![], vec![a, b], 0.0).unwrap();
        assert_eq!(arena.node_count(p), 3);
        assert!(matches!(
            arena.add_element(p, px(4)),
            Err(ConstraintError::MixedPartitioning { .. })
        ));
        assert!(arena.node(p).own.is_empty());
        assert_eq!(arena.node(p).size.get(), None);
        assert_eq!(arena.element_count(p), 2);
        // a third child keeps the node legal
        arena.add_child(p, c).unwrap();
        assert_eq!(arena.element_count(p), 3);
    }

    #[test]
    fn partitioning_needs_free_children() {
        let mut arena = NodeArena::new();
        let a = arena.new_inclusion(px(0), 0.0);
        let b = arena.new_inclusion(px(1), 0.0);
        assert!(matches!(
            arena.new_partitioning(vec![], vec![a, a], 0.0),
            Err(ConstraintError::UnavailableChild { child, .. }) if child == a
        ));
        let p = arena.new_partitioning(vec![], vec![a, b], 0.0).unwrap();
        let c = arena.new_inclusion(px(2), 0.0);
        assert!(matches!(
            arena.new_partitioning(vec![], vec![c, b], 0.0),
            Err(ConstraintError::UnavailableChild { child, .. }) if child == b
        ));
        assert_eq!(arena.node(b).parent, Some(p));
        assert!(arena.new_inclusion_with(vec![], 0.0).is_err());
    }

    #[test]
    fn sentinel_may_be_empty() {
        let mut arena = NodeArena::new();
        let s = arena.new_sentinel(7.0);
        assert!(arena.node(s).check(s).is_ok());
        assert_eq!(arena.element_count(s), 0);
    }
}
