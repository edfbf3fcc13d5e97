use std::any::TypeId;
use std::collections::HashSet;
use std::io;

use log::{debug, trace};

use super::store::Slot;
use super::{Attribute, AttributeContext, Dependencies, Dependency};
use crate::{AttributeError, ImageTree, NodeId, TreeIoError};

fn expand(dep: &Dependency) -> Dependencies {
    let mut nested = Dependencies::default();
    (dep.declare)(&*dep.settings, &mut nested);
    nested
}

/// Walks the declared dependencies of `root` and fails if one leads back to it.
fn check_cycles(root: TypeId, name: &'static str, deps: &[Dependency]) -> Result<(), AttributeError> {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    for dep in deps {
        if dep.type_id == root {
            return Err(AttributeError::DependencyCycle { name });
        }
        if seen.insert(dep.type_id) {
            pending.push(expand(dep));
        }
    }
    while let Some(nested) = pending.pop() {
        for dep in &nested.list {
            if dep.type_id == root {
                return Err(AttributeError::DependencyCycle { name });
            }
            if seen.insert(dep.type_id) {
                pending.push(expand(dep));
            }
        }
    }
    Ok(())
}

impl ImageTree {
    /// Attaches `A` to every node, computing it bottom-up.
    ///
    /// If `A` is attached already only its reference count grows; the settings
    /// in place are kept. Declared dependencies are attached once, when `A` is
    /// first attached.
    pub fn add_attribute<A: Attribute>(&mut self, settings: A::Settings) -> Result<(), AttributeError> {
        if let Some(slot) = self.attributes.slot_mut::<A>() {
            slot.refs += 1;
            trace!("{} now has {} references", A::NAME, slot.refs);
            return Ok(());
        }

        let mut deps = Dependencies::default();
        A::dependencies(&settings, &mut deps);
        check_cycles(TypeId::of::<A>(), A::NAME, &deps.list)?;
        for (i, dep) in deps.list.iter().enumerate() {
            if let Err(err) = (dep.attach)(self, &*dep.settings) {
                for attached in deps.list[..i].iter().rev() {
                    (attached.detach)(self);
                }
                return Err(err);
            }
        }

        self.attributes.put(Slot::<A>::new(settings, deps.list));
        self.compute_attribute::<A>();
        debug!("attached {} to {} nodes", A::NAME, self.count_nodes());
        Ok(())
    }

    /// Drops one reference to `A`. The last one frees the values and detaches
    /// the dependencies. Returns false if `A` is not attached.
    pub fn delete_attribute<A: Attribute>(&mut self) -> bool {
        let refs = match self.attributes.slot_mut::<A>() {
            Some(slot) => {
                slot.refs -= 1;
                slot.refs
            }
            None => return false,
        };
        if refs == 0 {
            if let Some(slot) = self.attributes.take::<A>() {
                for dep in slot.deps.iter().rev() {
                    (dep.detach)(self);
                }
            }
            debug!("detached {}", A::NAME);
        }
        true
    }

    pub fn is_attribute_in_tree<A: Attribute>(&self) -> bool {
        self.attributes.contains::<A>()
    }

    /// Names of all attached kinds, sorted.
    pub fn attribute_names(&self) -> Vec<&'static str> {
        self.attributes.names()
    }

    pub fn attribute_settings<A: Attribute>(&self) -> Option<&A::Settings> {
        self.attributes.slot::<A>().map(|slot| &slot.settings)
    }

    /// Value of `A` at `node`. `None` if `A` is not attached or the node is gone.
    pub fn attribute<A: Attribute>(&self, node: NodeId) -> Option<&A::Value> {
        if !self.contains(node) {
            return None;
        }
        self.attributes.slot::<A>().and_then(|slot| slot.value(node))
    }

    /// `A` at `node` reduced to a number.
    pub fn attribute_scalar<A: Attribute>(&self, node: NodeId) -> Option<f64> {
        let slot = self.attributes.slot::<A>()?;
        if !self.contains(node) {
            return None;
        }
        slot.value(node).map(|v| A::scalar(v, &slot.settings))
    }

    /// Replaces the settings of `A`. Returns whether the values were recomputed:
    /// equal settings are a no-op and changes `A` deems presentational keep the values.
    pub fn change_attribute_settings<A: Attribute>(&mut self, settings: A::Settings) -> bool {
        let stale = match self.attributes.slot_mut::<A>() {
            Some(slot) => {
                if slot.settings == settings {
                    return false;
                }
                let stale = match &slot.computed_with {
                    Some(computed) => A::requires_recompute(computed, &settings),
                    None => true,
                };
                slot.settings = settings;
                stale
            }
            None => return false,
        };
        if stale {
            self.compute_attribute::<A>();
        }
        stale
    }

    /// Recomputes `A` everywhere, regardless of its settings. Returns false if not attached.
    pub fn recompute_attribute<A: Attribute>(&mut self) -> bool {
        if !self.attributes.contains::<A>() {
            return false;
        }
        self.compute_attribute::<A>();
        true
    }

    /// Switches `A` to its default settings until the matching `revert_settings_changes`.
    /// The dependencies of `A` are held at their declared settings meanwhile.
    pub fn ensure_default_settings<A: Attribute>(&mut self) {
        if !self.attributes.contains::<A>() {
            return;
        }
        self.pin_settings::<A>(A::Settings::default());
        let pins: Vec<_> = match self.attributes.slot::<A>() {
            Some(slot) => slot
                .deps
                .iter()
                .map(|d| (d.pin, (d.clone_settings)(&*d.settings)))
                .collect(),
            None => Vec::new(),
        };
        for (pin, settings) in pins {
            pin(self, &*settings);
        }
    }

    /// Undoes the innermost `ensure_default_settings` of `A`. No-op without one.
    pub fn revert_settings_changes<A: Attribute>(&mut self) {
        let unpins: Vec<_> = match self.attributes.slot::<A>() {
            Some(slot) if !slot.saved.is_empty() => slot.deps.iter().map(|d| d.unpin).collect(),
            _ => return,
        };
        for unpin in unpins.into_iter().rev() {
            unpin(self);
        }
        self.unpin_settings::<A>();
    }

    /// Saves the settings of `A` and switches to `settings`.
    pub(crate) fn pin_settings<A: Attribute>(&mut self, settings: A::Settings) {
        match self.attributes.slot_mut::<A>() {
            Some(slot) => slot.saved.push(slot.settings.clone()),
            None => return,
        }
        self.change_attribute_settings::<A>(settings);
    }

    /// Restores the settings saved by the innermost `pin_settings` of `A`.
    pub(crate) fn unpin_settings<A: Attribute>(&mut self) {
        let saved = match self.attributes.slot_mut::<A>() {
            Some(slot) => slot.saved.pop(),
            None => None,
        };
        if let Some(settings) = saved {
            self.change_attribute_settings::<A>(settings);
        }
    }

    /// Computes `A` at every node under the root, children first, with the
    /// dependencies of `A` pinned to their declared settings.
    fn compute_attribute<A: Attribute>(&mut self) {
        let mut slot = match self.attributes.take::<A>() {
            Some(slot) => slot,
            None => return,
        };

        for dep in &slot.deps {
            (dep.pin)(self, &*dep.settings);
        }

        let mut values: Vec<Option<A::Value>> = (0..self.arena.capacity()).map(|_| None).collect();
        for id in self.arena.post_order(self.root()) {
            let value = {
                let ctx = AttributeContext::<A> {
                    tree: self,
                    node: id,
                    values: &values,
                    settings: &slot.settings,
                };
                A::compute(&ctx)
            };
            values[id.index()] = Some(value);
        }
        slot.values = values;
        slot.computed_with = Some(slot.settings.clone());
        trace!("computed {}", A::NAME);

        for dep in slot.deps.iter().rev() {
            (dep.unpin)(self);
        }
        self.attributes.put(slot);
    }

    /// Smallest and largest scalar value of `A` under the root.
    pub fn min_max_attribute<A: Attribute>(&self) -> Option<(f64, f64)> {
        let slot = self.attributes.slot::<A>()?;
        self.arena
            .pre_order(self.root())
            .into_iter()
            .filter_map(|id| slot.value(id))
            .map(|v| A::scalar(v, &slot.settings))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }

    /// Writes the scalar value of `A` for each of `nodes`, one per line, in order.
    pub fn write_attributes_to_file<A: Attribute>(
        &self,
        nodes: &[NodeId],
        mut out: impl io::Write,
    ) -> Result<(), TreeIoError> {
        for &node in nodes {
            let value = self
                .attribute_scalar::<A>(node)
                .ok_or(TreeIoError::MissingAttribute { name: A::NAME, node })?;
            writeln!(out, "{}", value)?;
        }
        Ok(())
    }

    /// Like `print_tree`, with the level and the value of `A` on each line.
    pub fn print_tree_with_attribute<A: Attribute>(&self, out: &mut impl io::Write) -> io::Result<()> {
        let mut stack = vec![(self.root(), 0)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.arena.node(id);
            for _ in 0..depth {
                write!(out, "\t")?;
            }
            match self.attribute::<A>(id) {
                Some(value) => writeln!(out, "{} {:?}", node.level(), value)?,
                None => writeln!(out, "{} -", node.level())?,
            }
            for &child in node.children().iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    /// Level and scalar value of `A` for `node` and each of its ancestors, up to the root.
    pub fn analyse_branch<A: Attribute>(&self, node: NodeId) -> Vec<(f64, f64)> {
        let mut branch = Vec::new();
        let mut cur = self.node(node).map(|_| node);
        while let Some(id) = cur {
            let n = self.arena.node(id);
            if let Some(value) = self.attribute_scalar::<A>(id) {
                branch.push((n.level(), value));
            }
            cur = n.parent();
        }
        branch
    }
}
