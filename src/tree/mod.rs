//! The materialized component tree.
//!
//! An `ImageTree` owns every `Node` in an arena and hands out `NodeId`s.
//! All structural edits go through the tree, which keeps the memoized
//! counts and the attached attributes consistent.
//!
//! Edits only ever fold nodes into one of their ancestors, so the own
//! elements of all nodes under the root keep partitioning the image.

mod arena;
mod filter;
mod gray_level;
mod identity;
mod node;

pub(crate) use arena::NodeArena;
pub use filter::*;
pub use gray_level::*;
pub use node::*;

use std::cell::OnceCell;
use std::collections::HashMap;
use std::io;

use bit_vec::BitVec;
use log::{debug, warn};
use rand::Rng;

use crate::attribute::AttributeStore;
use crate::{ConstraintError, LevelRaster, PixelCoord};

/// A tree of nodes covering a `width` by `height` image
pub struct ImageTree {
    pub(crate) arena: NodeArena,
    root: NodeId,
    width: usize,
    height: usize,
    image: Option<LevelRaster>,
    images: Option<Vec<LevelRaster>>,
    sample: OnceCell<Vec<NodeId>>,
    sentinels: HashMap<u64, NodeId>,
    pub(crate) attributes: AttributeStore,
}

impl ImageTree {
    pub(crate) fn new(arena: NodeArena, root: NodeId, width: usize, height: usize) -> Self {
        Self {
            arena,
            root,
            width,
            height,
            image: None,
            images: None,
            sample: OnceCell::new(),
            sentinels: HashMap::new(),
            attributes: AttributeStore::default(),
        }
    }

    /// An empty tree over a `width` by `height` image, rooted at the level 0
    /// sentinel. Nodes are added with `new_inclusion`, `new_partitioning` and
    /// `add_child`, and the top one made the root with `set_root`.
    pub fn with_size(width: usize, height: usize) -> Self {
        let mut tree = Self::new(NodeArena::new(), NodeId(0), width, height);
        tree.root = tree.sentinel(0.0);
        tree
    }

    /// A new detached inclusion node owning `own`.
    pub fn new_inclusion(&mut self, own: Vec<PixelCoord>, level: f64) -> Result<NodeId, ConstraintError> {
        self.arena.new_inclusion_with(own, level)
    }

    /// A new detached partitioning node. It either owns `own` or is split into
    /// at least two `children`, which must be detached nodes of this tree other
    /// than the root.
    pub fn new_partitioning(
        &mut self,
        own: Vec<PixelCoord>,
        children: Vec<NodeId>,
        level: f64,
    ) -> Result<NodeId, ConstraintError> {
        if let Some(&child) = children.iter().find(|&&c| c == self.root) {
            let node = NodeId(self.arena.capacity() as u32);
            return Err(ConstraintError::UnavailableChild { node, child });
        }
        self.arena.new_partitioning(own, children, level)
    }

    /// Makes the detached node `id` the root. Attached attributes keep their
    /// values until recomputed. Returns false if `id` is gone or has a parent.
    pub fn set_root(&mut self, id: NodeId) -> bool {
        match self.arena.get(id) {
            Some(node) if node.parent.is_none() => {
                self.root = id;
                true
            }
            _ => {
                warn!("{} cannot become the root", id);
                false
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// The node behind `id`, or `None` if it has been deleted.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    /// Number of live nodes, sentinels included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    /// Number of pixels in the subtree of `id`. Zero once `id` is deleted.
    pub fn element_count(&self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.arena.element_count(id)
    }

    /// Number of nodes in the subtree of `id`, itself included. Zero once `id` is deleted.
    pub fn node_count(&self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.arena.node_count(id)
    }

    /// Number of nodes under the root.
    pub fn count_nodes(&self) -> usize {
        self.node_count(self.root)
    }

    fn fits(&self, image: &LevelRaster) -> bool {
        image.width() == self.width && image.height() == self.height
    }

    /// Associates the raster read by attributes and gray levels.
    /// Returns false, keeping the current image, if it is not the size of the tree.
    pub fn set_image(&mut self, image: LevelRaster) -> bool {
        if !self.fits(&image) {
            warn!(
                "image of {}x{} does not fit a tree of {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            );
            return false;
        }
        self.image = Some(image);
        true
    }

    pub fn unset_image(&mut self) -> Option<LevelRaster> {
        self.image.take()
    }

    pub fn image_set(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&LevelRaster> {
        self.image.as_ref()
    }

    /// Associates one raster per channel, used by the hyper gray levels.
    /// Returns false, keeping the current channels, if any is not the size of the tree.
    pub fn set_images(&mut self, images: Vec<LevelRaster>) -> bool {
        if !images.iter().all(|image| self.fits(image)) {
            warn!("channels do not fit a tree of {}x{}", self.width, self.height);
            return false;
        }
        self.images = Some(images);
        true
    }

    pub fn unset_images(&mut self) -> Option<Vec<LevelRaster>> {
        self.images.take()
    }

    pub fn images_set(&self) -> bool {
        self.images.is_some()
    }

    pub fn images(&self) -> Option<&[LevelRaster]> {
        self.images.as_deref()
    }

    /// Subtree of `id` with children before their parents, `id` last.
    /// Empty once `id` is deleted.
    pub fn all_descendants(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.arena.post_order(id)
    }

    /// All nodes under the root, parents first.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.arena.pre_order(self.root)
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.arena
            .pre_order(self.root)
            .into_iter()
            .filter(|&id| self.arena.node(id).is_leaf())
            .collect()
    }

    /// Every pixel of the subtree of `id`.
    pub fn elements(&self, id: NodeId) -> Vec<PixelCoord> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut elements = Vec::with_capacity(self.element_count(id));
        for n in self.arena.pre_order(id) {
            elements.extend_from_slice(&self.arena.node(n).own);
        }
        elements
    }

    pub fn has_own_element(&self, id: NodeId, px: PixelCoord) -> bool {
        self.arena.get(id).map_or(false, |n| n.has_own_element(px))
    }

    pub fn has_element(&self, id: NodeId, px: PixelCoord) -> bool {
        self.all_descendants(id)
            .into_iter()
            .any(|n| self.arena.node(n).has_own_element(px))
    }

    /// The node owning `px` directly.
    pub fn lowest_node_of(&self, px: PixelCoord) -> Option<NodeId> {
        self.arena
            .pre_order(self.root)
            .into_iter()
            .find(|&n| self.arena.node(n).has_own_element(px))
    }

    /// The ancestor `depth` steps above `id`. `None` when climbing past the root
    /// or if `id` is deleted.
    pub fn parent_at(&self, id: NodeId, depth: usize) -> Option<NodeId> {
        let mut cur = self.arena.get(id).map(|_| id)?;
        for _ in 0..depth {
            cur = self.arena.node(cur).parent?;
        }
        Some(cur)
    }

    /// Climbs from `id` while the parent is at most `perc` times the size of `id`.
    /// If not a single step was taken, a parent smaller than `1.6 * perc` times
    /// the size is still accepted.
    pub fn parent_by_size(&self, id: NodeId, perc: f64) -> NodeId {
        if !self.contains(id) {
            return id;
        }
        let original = self.element_count(id) as f64;
        let mut cur = id;
        let mut jumps = 0;
        loop {
            let parent = match self.arena.node(cur).parent {
                Some(parent) => parent,
                None => return cur,
            };
            let ratio = self.element_count(parent) as f64 / original;
            if ratio > perc {
                if jumps == 0 && ratio < 1.6 * perc {
                    return parent;
                }
                return cur;
            }
            cur = parent;
            jumps += 1;
        }
    }

    /// Smallest and largest level in the subtree of `id`; `(inf, -inf)` once deleted.
    pub fn min_max_level(&self, id: NodeId) -> (f64, f64) {
        self.all_descendants(id)
            .into_iter()
            .map(|n| self.arena.node(n).level)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| (lo.min(l), hi.max(l)))
    }

    /// A node picked uniformly from the tree as it was on the first call.
    /// Later edits are not reflected, so the result may have been deleted since;
    /// check it with `contains`.
    pub fn random_node(&self) -> Option<NodeId> {
        let sample = self
            .sample
            .get_or_init(|| self.arena.post_order(self.root));
        if sample.is_empty() {
            return None;
        }
        let i = rand::rng().random_range(0..sample.len());
        Some(sample[i])
    }

    /// The placeholder inclusion node of `level`, created on first request.
    /// Sentinels may own no pixels and are not part of the tree until attached.
    pub fn sentinel(&mut self, level: f64) -> NodeId {
        if let Some(&id) = self.sentinels.get(&level.to_bits()) {
            if self.arena.contains(id) {
                return id;
            }
        }
        let id = self.arena.new_sentinel(level);
        self.sentinels.insert(level.to_bits(), id);
        id
    }

    /// Appends a detached node (a sentinel, typically) as the last child of `parent`.
    /// Returns `Ok(false)` if either node is gone, or `child` already has a parent
    /// or is the root. Fails without touching the tree if `parent` cannot take
    /// another child.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, ConstraintError> {
        if !self.contains(parent) || !self.contains(child) {
            warn!("cannot attach {} under {}: node is gone", child, parent);
            return Ok(false);
        }
        let mut up = Some(parent);
        while let Some(cur) = up {
            if cur == child {
                warn!("attaching {} under {} would close a cycle", child, parent);
                return Ok(false);
            }
            up = self.arena.node(cur).parent;
        }
        if child == self.root || self.arena.node(child).parent.is_some() {
            warn!("refusing to attach {} under {}", child, parent);
            return Ok(false);
        }
        self.arena.add_child(parent, child)?;
        Ok(true)
    }

    /// Gives `px` to `id`. `Ok(false)` if `id` is gone; fails without touching
    /// the tree if `id` cannot own elements.
    pub fn add_element(&mut self, id: NodeId, px: PixelCoord) -> Result<bool, ConstraintError> {
        if !self.contains(id) {
            return Ok(false);
        }
        self.arena.add_element(id, px)?;
        Ok(true)
    }

    /// Folds child `index` of `parent` into `parent`.
    ///
    /// `Ok(false)` if there is no such child or `parent` is gone. Fails without
    /// touching the tree if `parent` would break its structural constraints.
    pub fn delete_child(&mut self, parent: NodeId, index: usize) -> Result<bool, ConstraintError> {
        if !self.contains(parent) {
            return Ok(false);
        }
        match self.arena.delete_child(parent, index)? {
            Some(removed) => {
                self.attributes.forget(removed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Folds every descendant of `id` into it. `Ok(false)` if `id` is gone.
    pub fn collapse_subtree(&mut self, id: NodeId) -> Result<bool, ConstraintError> {
        if !self.contains(id) {
            return Ok(false);
        }
        let removed = self.arena.collapse_subtree(id)?;
        for node in removed {
            self.attributes.forget(node);
        }
        Ok(true)
    }

    /// Checks that the own elements under the root cover every pixel exactly once.
    pub fn check_partition(&self) -> Result<(), ConstraintError> {
        let mut covered = BitVec::from_elem(self.width * self.height, false);
        for n in self.arena.pre_order(self.root) {
            for &pixel in &self.arena.node(n).own {
                if !pixel.in_bounds(self.width, self.height) {
                    return Err(ConstraintError::PixelOutOfBounds {
                        pixel,
                        width: self.width,
                        height: self.height,
                    });
                }
                let i = pixel.to_index(self.width);
                if covered.get(i).unwrap_or(false) {
                    return Err(ConstraintError::DuplicatePixel { pixel });
                }
                covered.set(i, true);
            }
        }
        match covered.iter().position(|c| !c) {
            Some(i) => Err(ConstraintError::MissingPixel {
                pixel: PixelCoord::from_index(i, self.width),
            }),
            None => Ok(()),
        }
    }

    /// Writes one line per node, indented by depth with tabs:
    /// the number of own elements (or `empty`), then level and gray level.
    pub fn print_tree(&self, out: &mut impl io::Write) -> io::Result<()> {
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.arena.node(id);
            for _ in 0..depth {
                write!(out, "\t")?;
            }
            if node.own.is_empty() {
                write!(out, "empty ")?;
            } else {
                write!(out, "{} ", node.own.len())?;
            }
            writeln!(out, " -> {} {}", node.level, node.gray)?;
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena.node_mut(id)
    }

    /// Releases the nodes from the tree. Attached attributes are dropped.
    pub fn into_nodes(self) -> Vec<(NodeId, Node)> {
        debug!("releasing {} nodes", self.arena.len());
        self.arena.into_nodes()
    }
}
