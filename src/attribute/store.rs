use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::{Attribute, Dependency};
use crate::NodeId;

/// Everything a tree keeps about one attached attribute kind
pub(crate) struct Slot<A: Attribute> {
    pub(crate) settings: A::Settings,
    /// settings the current values were computed with
    pub(crate) computed_with: Option<A::Settings>,
    pub(crate) refs: usize,
    /// settings saved by `pin_settings`, innermost last
    pub(crate) saved: Vec<A::Settings>,
    pub(crate) values: Vec<Option<A::Value>>,
    pub(crate) deps: Vec<Dependency>,
}

impl<A: Attribute> Slot<A> {
    pub(crate) fn new(settings: A::Settings, deps: Vec<Dependency>) -> Self {
        Self {
            settings,
            computed_with: None,
            refs: 1,
            saved: Vec::new(),
            values: Vec::new(),
            deps,
        }
    }

    pub(crate) fn value(&self, node: NodeId) -> Option<&A::Value> {
        self.values.get(node.index()).and_then(Option::as_ref)
    }
}

pub(crate) trait ErasedSlot {
    fn name(&self) -> &'static str;
    fn forget(&mut self, node: NodeId);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<A: Attribute> ErasedSlot for Slot<A> {
    fn name(&self) -> &'static str {
        A::NAME
    }

    fn forget(&mut self, node: NodeId) {
        if let Some(value) = self.values.get_mut(node.index()) {
            *value = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Attached attribute kinds of a tree, indexed by type
#[derive(Default)]
pub(crate) struct AttributeStore {
    slots: HashMap<TypeId, Box<dyn ErasedSlot>>,
}

impl AttributeStore {
    pub(crate) fn contains<A: Attribute>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<A>())
    }

    pub(crate) fn slot<A: Attribute>(&self) -> Option<&Slot<A>> {
        self.slots
            .get(&TypeId::of::<A>())
            .and_then(|s| s.as_any().downcast_ref())
    }

    pub(crate) fn slot_mut<A: Attribute>(&mut self) -> Option<&mut Slot<A>> {
        self.slots
            .get_mut(&TypeId::of::<A>())
            .and_then(|s| s.as_any_mut().downcast_mut())
    }

    /// Removes the slot of `A`, to compute it while reading the rest of the tree.
    pub(crate) fn take<A: Attribute>(&mut self) -> Option<Slot<A>> {
        self.slots
            .remove(&TypeId::of::<A>())
            .and_then(|s| s.into_any().downcast().ok())
            .map(|s| *s)
    }

    pub(crate) fn put<A: Attribute>(&mut self, slot: Slot<A>) {
        self.slots.insert(TypeId::of::<A>(), Box::new(slot));
    }

    /// Drops the values of a deleted node.
    pub(crate) fn forget(&mut self, node: NodeId) {
        for slot in self.slots.values_mut() {
            slot.forget(node);
        }
    }

    pub(crate) fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.values().map(|s| s.name()).collect();
        names.sort_unstable();
        names
    }
}
