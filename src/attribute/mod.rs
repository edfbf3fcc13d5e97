//! Memoized per-node values attached to a whole tree.
//!
//! An attribute kind is a type implementing [`Attribute`]. Attaching it to an
//! `ImageTree` computes one value per node, children before parents, so a node
//! can build on the values of its children. Attachments are reference counted
//! per tree: every `add_attribute` needs a matching `delete_attribute`.
//!
//! A kind may declare other kinds it reads while computing. Those are attached
//! along with it, detached with its last reference, and forced to the declared
//! settings for the duration of its computation.

mod area;
mod mean;
mod moments;
mod non_compactness;
mod range;
mod region_dynamics;
mod scheduler;
mod store;

pub use area::*;
pub use mean::*;
pub use moments::*;
pub use non_compactness::*;
pub use range::*;
pub use region_dynamics::*;
pub(crate) use store::AttributeStore;

use std::any::{Any, TypeId};
use std::fmt::Debug;

use log::error;

use crate::{AttributeError, ImageTree, LevelRaster, Node, NodeId, PixelCoord};

/// A kind of value computed for every node of a tree
pub trait Attribute: Sized + 'static {
    type Settings: Clone + PartialEq + Debug + Default + 'static;
    type Value: Clone + Debug + 'static;

    const NAME: &'static str;

    /// Declares the attributes read by `compute`.
    fn dependencies(_settings: &Self::Settings, _deps: &mut Dependencies) {}

    /// Value of `ctx.node()`. The values of its children are already known.
    fn compute(ctx: &AttributeContext<'_, Self>) -> Self::Value;

    /// Whether values computed under `computed` are stale under `requested`.
    fn requires_recompute(computed: &Self::Settings, requested: &Self::Settings) -> bool {
        computed != requested
    }

    /// The value as one number, used by filtering and reporting.
    fn scalar(value: &Self::Value, settings: &Self::Settings) -> f64;
}

/// What `Attribute::compute` gets to see
pub struct AttributeContext<'a, A: Attribute> {
    tree: &'a ImageTree,
    node: NodeId,
    values: &'a [Option<A::Value>],
    settings: &'a A::Settings,
}

impl<'a, A: Attribute> AttributeContext<'a, A> {
    pub fn tree(&self) -> &'a ImageTree {
        self.tree
    }

    pub fn id(&self) -> NodeId {
        self.node
    }

    pub fn node(&self) -> &'a Node {
        self.tree.arena.node(self.node)
    }

    pub fn settings(&self) -> &'a A::Settings {
        self.settings
    }

    pub fn own_elements(&self) -> &'a [PixelCoord] {
        self.node().own_elements()
    }

    /// Values of this attribute at the children, in child order.
    pub fn children_values(&self) -> impl Iterator<Item = &'a A::Value> + 'a {
        let values = self.values;
        self.node()
            .children()
            .iter()
            .filter_map(move |c| values.get(c.index()).and_then(Option::as_ref))
    }

    /// Pairs of child node and its value.
    pub fn children_with_values(&self) -> impl Iterator<Item = (&'a Node, &'a A::Value)> + 'a {
        let values = self.values;
        let tree = self.tree;
        self.node().children().iter().filter_map(move |&c| {
            values
                .get(c.index())
                .and_then(Option::as_ref)
                .map(|v| (tree.arena.node(c), v))
        })
    }

    /// Value of a declared dependency at this node.
    pub fn dependency<D: Attribute>(&self) -> Option<&'a D::Value> {
        self.tree.attribute::<D>(self.node)
    }

    /// The raster of the tree. Without one the computation cannot proceed and
    /// the process exits.
    pub fn image(&self) -> &'a LevelRaster {
        match self.tree.image() {
            Some(image) => image,
            None => {
                error!("{} reads pixels but the tree has no image", A::NAME);
                eprintln!("Image not set for the ImageTree, giving up.");
                std::process::exit(2)
            }
        }
    }
}

/// A declared dependency, with the operations the scheduler needs on it
/// erased of its type.
pub(crate) struct Dependency {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) settings: Box<dyn Any>,
    pub(crate) attach: fn(&mut ImageTree, &dyn Any) -> Result<(), AttributeError>,
    pub(crate) detach: fn(&mut ImageTree),
    pub(crate) pin: fn(&mut ImageTree, &dyn Any),
    pub(crate) unpin: fn(&mut ImageTree),
    pub(crate) declare: fn(&dyn Any, &mut Dependencies),
    pub(crate) clone_settings: fn(&dyn Any) -> Box<dyn Any>,
}

fn settings_of<D: Attribute>(settings: &dyn Any) -> D::Settings {
    settings
        .downcast_ref::<D::Settings>()
        .cloned()
        .unwrap_or_default()
}

/// Collects the dependencies an attribute declares
#[derive(Default)]
pub struct Dependencies {
    pub(crate) list: Vec<Dependency>,
}

impl Dependencies {
    /// Requires `D` with `settings` while computing.
    pub fn require<D: Attribute>(&mut self, settings: D::Settings) {
        self.list.push(Dependency {
            type_id: TypeId::of::<D>(),
            name: D::NAME,
            settings: Box::new(settings),
            attach: |tree, s| tree.add_attribute::<D>(settings_of::<D>(s)),
            detach: |tree| {
                tree.delete_attribute::<D>();
            },
            pin: |tree, s| tree.pin_settings::<D>(settings_of::<D>(s)),
            unpin: |tree| tree.unpin_settings::<D>(),
            declare: |s, deps| D::dependencies(&settings_of::<D>(s), deps),
            clone_settings: |s| Box::new(settings_of::<D>(s)),
        });
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Names of the required attributes, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.list.iter().map(|d| d.name).collect()
    }
}
