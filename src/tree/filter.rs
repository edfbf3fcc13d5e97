use log::{debug, trace, warn};

use crate::attribute::Attribute;
use crate::predicate::{DifferentThanParent, Predicate};
use crate::ConstraintError;
use super::{ImageTree, NodeId};

/// How a filtered node is taken out of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRule {
    /// Fold the node into its parent; its children move up.
    Direct,
    /// Like `Direct`, and the children inherit the contrast between the node and its parent.
    Subtractive,
    /// Fold the whole subtree of the node into its parent.
    Collapse,
    SoftDirect,
    SoftSubtractive,
    SoftCollapse,
}

impl FilterRule {
    pub const ALL: [FilterRule; 6] = [
        FilterRule::Direct,
        FilterRule::Subtractive,
        FilterRule::Collapse,
        FilterRule::SoftDirect,
        FilterRule::SoftSubtractive,
        FilterRule::SoftCollapse,
    ];

    /// Soft rules never fail. Where the structure does not allow the removal
    /// they only record the contrast on the node.
    pub fn is_soft(self) -> bool {
        matches!(
            self,
            FilterRule::SoftDirect | FilterRule::SoftSubtractive | FilterRule::SoftCollapse
        )
    }

    /// The rule with the soft fallback removed.
    pub fn hard(self) -> FilterRule {
        match self {
            FilterRule::SoftDirect => FilterRule::Direct,
            FilterRule::SoftSubtractive => FilterRule::Subtractive,
            FilterRule::SoftCollapse => FilterRule::Collapse,
            rule => rule,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterRule::Direct => "direct",
            FilterRule::Subtractive => "subtractive",
            FilterRule::Collapse => "collapse",
            FilterRule::SoftDirect => "soft-direct",
            FilterRule::SoftSubtractive => "soft-subtractive",
            FilterRule::SoftCollapse => "soft-collapse",
        }
    }

    pub fn from_name(name: &str) -> Option<FilterRule> {
        FilterRule::ALL.into_iter().find(|rule| rule.name() == name)
    }
}

impl ImageTree {
    /// Removes child `index` of `parent` following `rule`.
    ///
    /// Hard rules return `Ok(false)` for an index out of range and fail without
    /// touching the tree if `parent` would break its constraints. Soft rules
    /// return `Ok(true)` whenever `parent` exists. Every rule returns `Ok(false)`
    /// for a deleted `parent`.
    pub fn delete_child_with_rule(
        &mut self,
        parent: NodeId,
        index: usize,
        rule: FilterRule,
    ) -> Result<bool, ConstraintError> {
        if !self.contains(parent) {
            warn!("{} is gone, nothing to filter", parent);
            return Ok(false);
        }
        if !rule.is_soft() {
            return self.delete_child_hard(parent, index, rule);
        }
        let child = match self.arena.node(parent).children.get(index) {
            Some(&child) => child,
            None => {
                warn!("{} has no child {}, nothing to filter", parent, index);
                return Ok(true);
            }
        };
        match self.delete_child_hard(parent, index, rule.hard()) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                trace!("{} kept by {}, recording its contrast", child, rule.name());
                let (gray, hyper) = self.contrast_to_parent(parent, child);
                let node = self.arena.node_mut(child);
                node.propagating_contrast = gray;
                add_channels(&mut node.propagating_hyper_contrast, &hyper);
            }
        }
        Ok(true)
    }

    fn delete_child_hard(
        &mut self,
        parent: NodeId,
        index: usize,
        rule: FilterRule,
    ) -> Result<bool, ConstraintError> {
        let collapsed = rule == FilterRule::Collapse;
        let child = match self.arena.deletable_child(parent, index, collapsed)? {
            Some(child) => child,
            None => return Ok(false),
        };

        if rule == FilterRule::Subtractive {
            let (gray, hyper) = self.contrast_to_parent(parent, child);
            let grandchildren = self.arena.node(child).children.clone();
            for g in grandchildren {
                let node = self.arena.node_mut(g);
                node.propagating_contrast += gray;
                add_channels(&mut node.propagating_hyper_contrast, &hyper);
            }
        }

        if collapsed {
            while let Some(last) = self.arena.node(child).children.len().checked_sub(1) {
                let removed = self.arena.fold_child(child, last);
                self.attributes.forget(removed);
            }
        }
        let removed = self.arena.fold_child(parent, index);
        self.attributes.forget(removed);
        Ok(true)
    }

    /// Gray level of `parent` minus that of `child`, overall and per channel.
    fn contrast_to_parent(&self, parent: NodeId, child: NodeId) -> (i32, Vec<i32>) {
        let p = self.arena.node(parent);
        let c = self.arena.node(child);
        let hyper = p
            .hyper_gray
            .iter()
            .enumerate()
            .map(|(i, &g)| g - c.hyper_gray.get(i).copied().unwrap_or(0))
            .collect();
        (p.gray - c.gray, hyper)
    }

    /// Removes, children first, every node under the root whose level fails `pred`.
    pub fn filter_by_level_predicate(
        &mut self,
        pred: &impl Predicate,
        rule: FilterRule,
    ) -> Result<(), ConstraintError> {
        let removed = self.filter_nodes(rule, |tree, node, parent| {
            let keep = pred.keep(tree.arena.node(node).level, tree.arena.node(parent).level);
            Some(keep)
        })?;
        debug!("level filtering removed {} nodes", removed);
        Ok(())
    }

    /// Removes, children first, every node whose value of `A` fails `pred`.
    /// Returns false if `A` is not attached. Values are not refreshed while filtering.
    pub fn filter_by_attribute_predicate<A: Attribute>(
        &mut self,
        pred: &impl Predicate,
        rule: FilterRule,
    ) -> Result<bool, ConstraintError> {
        if !self.is_attribute_in_tree::<A>() {
            warn!("cannot filter by {}, it is not attached", A::NAME);
            return Ok(false);
        }
        let removed = self.filter_nodes(rule, |tree, node, parent| {
            let value = tree.attribute_scalar::<A>(node)?;
            let parent_value = tree.attribute_scalar::<A>(parent)?;
            Some(pred.keep(value, parent_value))
        })?;
        debug!("filtering by {} removed {} nodes", A::NAME, removed);
        Ok(true)
    }

    /// Of every chain of nodes sharing a value of `A`, keeps the one closest to the root.
    pub fn filter_by_attribute<A: Attribute>(&mut self, rule: FilterRule) -> Result<bool, ConstraintError> {
        self.filter_by_attribute_predicate::<A>(&DifferentThanParent, rule)
    }

    /// Sets the level of every node to its value of `A`. Returns false if `A` is not attached.
    pub fn assign_attribute_as_level<A: Attribute>(&mut self) -> bool {
        if !self.is_attribute_in_tree::<A>() {
            return false;
        }
        for id in self.arena.pre_order(self.root()) {
            if let Some(value) = self.attribute_scalar::<A>(id) {
                self.arena.node_mut(id).level = value;
            }
        }
        true
    }

    /// Visits the nodes under the root in post-order and removes those for
    /// which `keep` answers false. Nodes `keep` cannot judge stay.
    fn filter_nodes<F>(&mut self, rule: FilterRule, keep: F) -> Result<usize, ConstraintError>
    where
        F: Fn(&ImageTree, NodeId, NodeId) -> Option<bool>,
    {
        let root = self.root();
        let mut removed = 0;
        for id in self.arena.post_order(root) {
            if id == root || !self.contains(id) {
                continue;
            }
            let parent = match self.arena.node(id).parent {
                Some(parent) => parent,
                None => continue,
            };
            if keep(self, id, parent) != Some(false) {
                continue;
            }
            let index = self
                .arena
                .node(parent)
                .children
                .iter()
                .position(|&c| c == id);
            if let Some(index) = index {
                self.delete_child_with_rule(parent, index, rule)?;
                if !self.contains(id) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn add_channels(target: &mut Vec<i32>, values: &[i32]) {
    if target.len() < values.len() {
        target.resize(values.len(), 0);
    }
    for (t, v) in target.iter_mut().zip(values) {
        *t += v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Area, AreaSettings};
    use crate::predicate::GreaterThan;
    use crate::{create_tree, PixelCoord, Raster, TreeType};

    /// 1x3 raster 5,5,9
    fn scenario() -> ImageTree {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        create_tree(TreeType::MaxTree, &raster).unwrap()
    }

    /// 1 -> {4 -> 9, 2}
    fn branching() -> ImageTree {
        let raster = Raster::from_vec(5, 1, vec![2u8, 1, 4, 9, 4]).unwrap();
        create_tree(TreeType::MaxTree, &raster).unwrap()
    }

    #[test]
    fn rule_names() {
        for rule in FilterRule::ALL {
            assert_eq!(FilterRule::from_name(rule.name()), Some(rule));
            assert!(!rule.hard().is_soft());
        }
        assert_eq!(FilterRule::from_name("sideways"), None);
    }

    #[test]
    fn removing_the_only_child() {
        for rule in [FilterRule::Direct, FilterRule::Subtractive, FilterRule::Collapse] {
            let mut tree = scenario();
            let root = tree.root();
            assert_eq!(tree.delete_child_with_rule(root, 0, rule), Ok(true));
            assert_eq!(tree.element_count(root), 3);
            assert_eq!(tree.node_count(root), 1);
            assert!(tree.check_partition().is_ok());
            assert_eq!(tree.delete_child_with_rule(root, 0, rule), Ok(false));
        }
    }

    #[test]
    fn subtractive_passes_contrast_down() {
        let mut tree = branching();
        tree.assign_gray_levels(&crate::LevelAsGray);
        let four = tree.lowest_node_of(PixelCoord::new(2, 0)).unwrap();
        let nine = tree.lowest_node_of(PixelCoord::new(3, 0)).unwrap();
        let root = tree.root();
        let index = tree.node(root).unwrap().children().iter().position(|&c| c == four).unwrap();
        assert_eq!(tree.delete_child_with_rule(root, index, FilterRule::Subtractive), Ok(true));
        assert_eq!(tree.node(nine).unwrap().parent(), Some(root));
        assert_eq!(tree.node(nine).unwrap().propagating_contrast(), 1 - 4);
        assert!(tree.check_partition().is_ok());
    }

    #[test]
    fn collapse_takes_the_subtree() {
        let mut tree = branching();
        let four = tree.lowest_node_of(PixelCoord::new(2, 0)).unwrap();
        let nine = tree.lowest_node_of(PixelCoord::new(3, 0)).unwrap();
        let root = tree.root();
        let index = tree.node(root).unwrap().children().iter().position(|&c| c == four).unwrap();
        assert_eq!(tree.delete_child_with_rule(root, index, FilterRule::Collapse), Ok(true));
        assert!(!tree.contains(four));
        assert!(!tree.contains(nine));
        assert_eq!(tree.node_count(root), 2);
        assert_eq!(tree.node(root).unwrap().own_elements().len(), 4);
        assert!(tree.check_partition().is_ok());
    }

    #[test]
    fn soft_rules_record_contrast() {
        let mut tree = scenario();
        let root = tree.root();
        assert_eq!(tree.delete_child_with_rule(root, 3, FilterRule::SoftDirect), Ok(true));
        assert_eq!(tree.node_count(root), 2);
        assert_eq!(tree.delete_child_with_rule(root, 0, FilterRule::SoftDirect), Ok(true));
        assert_eq!(tree.node_count(root), 1);
    }

    #[test]
    fn soft_rule_on_a_refusing_parent() {
        let mut arena = super::super::NodeArena::new();
        let a = arena.new_inclusion(PixelCoord::new(0, 0), 3.0);
        let b = arena.new_inclusion(PixelCoord::new(1, 0), 5.0);
        let p = arena.new_partitioning(Vec::new(), vec![a, b], 1.0).unwrap();
        let mut tree = ImageTree::new(arena, p, 2, 1);
        tree.assign_gray_levels(&crate::LevelAsGray);

        assert!(tree.delete_child_with_rule(p, 0, FilterRule::Direct).is_err());
        assert_eq!(tree.delete_child_with_rule(p, 0, FilterRule::SoftDirect), Ok(true));
        assert_eq!(tree.node(p).unwrap().children(), [a, b]);
        assert_eq!(tree.node(a).unwrap().propagating_contrast(), 1 - 3);
    }

    #[test]
    fn level_filtering() {
        let mut tree = branching();
        tree.filter_by_level_predicate(&GreaterThan(3.0), FilterRule::Direct).unwrap();
        // the level 2 leaf folds into the root
        assert_eq!(tree.count_nodes(), 3);
        assert!(tree.check_partition().is_ok());
        for id in tree.nodes() {
            if id != tree.root() {
                assert!(tree.node(id).unwrap().level() > 3.0);
            }
        }
    }

    #[test]
    fn level_filtering_is_idempotent() {
        let mut tree = branching();
        let pred = |v: f64, p: f64| v - p > 2.0;
        tree.filter_by_level_predicate(&pred, FilterRule::Subtractive).unwrap();
        let count = tree.count_nodes();
        tree.filter_by_level_predicate(&pred, FilterRule::Subtractive).unwrap();
        assert_eq!(tree.count_nodes(), count);
    }

    #[test]
    fn attribute_filtering() {
        let mut tree = branching();
        assert_eq!(tree.filter_by_attribute::<Area>(FilterRule::Direct), Ok(false));
        tree.add_attribute::<Area>(AreaSettings).unwrap();
        assert_eq!(
            tree.filter_by_attribute_predicate::<Area>(&GreaterThan(1.0), FilterRule::Direct),
            Ok(true)
        );
        // single pixel leaves are gone
        assert_eq!(tree.count_nodes(), 2);
        assert!(tree.check_partition().is_ok());
        assert!(tree.assign_attribute_as_level::<Area>());
        assert_eq!(tree.node(tree.root()).unwrap().level(), 5.0);
    }

    #[test]
    fn same_value_chains_keep_the_top() {
        let mut tree = branching();
        let root = tree.root();
        // every pixel lies on row 0, so the y moment is 0 everywhere
        let settings = crate::MomentsSettings {
            kind: crate::MomentKind::Raw,
            p: 0,
            q: 1,
            order: 3,
        };
        tree.add_attribute::<crate::Moments>(settings).unwrap();
        assert_eq!(tree.filter_by_attribute::<crate::Moments>(FilterRule::Direct), Ok(true));
        assert_eq!(tree.count_nodes(), 1);
        assert_eq!(tree.element_count(root), 5);
    }
}
