use log::{trace, warn};

use super::same_level;
use crate::tree::NodeArena;
use crate::{ConstraintError, Field, ImageTree, LevelRaster, NodeId, PixelCoord};

/// Raster-order materialization of a canonical parent forest into nodes
pub(super) struct Assembly {
    arena: NodeArena,
    nodes: Field<Option<NodeId>>,
    root: Option<NodeId>,
    next: usize,
}

impl Assembly {
    pub(super) fn new(width: usize, height: usize) -> Self {
        Self {
            arena: NodeArena::new(),
            nodes: Field::with_default(width, height),
            root: None,
            next: 0,
        }
    }

    /// Pixels already scanned.
    pub(super) fn scanned(&self) -> usize {
        self.next
    }

    fn node_of(&mut self, p: PixelCoord, levels: &LevelRaster) -> NodeId {
        let i = self.nodes.index_at(p);
        match self.nodes.get(i).flatten() {
            Some(id) => id,
            None => {
                let id = self.arena.new_inclusion(p, levels.get_pixel_at(p));
                self.nodes.replace(i, Some(id));
                id
            }
        }
    }

    /// Scans up to `count` more pixels. Returns true once every pixel is placed.
    pub(super) fn step(
        &mut self,
        parents: &Field<PixelCoord>,
        levels: &LevelRaster,
        count: usize,
    ) -> Result<bool, ConstraintError> {
        let end = (self.next + count).min(parents.len());
        for i in self.next..end {
            let p = parents.locate(i);
            let q = parents.at(p);
            let parent_node = self.node_of(q, levels);
            if same_level(levels.get_pixel_at(q), levels.get_pixel_at(p)) {
                if p == q {
                    if let Some(previous) = self.root {
                        warn!("{} is a second root after {}; the raster is not connected", p, previous);
                    }
                    self.root = Some(parent_node);
                } else {
                    self.arena.add_element(parent_node, p)?;
                }
            } else {
                // p is the pivot of its own flat zone
                let pivot = self.node_of(p, levels);
                self.arena.add_child(parent_node, pivot)?;
            }
        }
        self.next = end;
        Ok(self.next == parents.len())
    }

    pub(super) fn finish(mut self, width: usize, height: usize) -> ImageTree {
        let root = match self.root {
            Some(root) => root,
            None => self.arena.new_sentinel(0.0),
        };
        trace!("assembled {} nodes", self.arena.len());
        ImageTree::new(self.arena, root, width, height)
    }
}
