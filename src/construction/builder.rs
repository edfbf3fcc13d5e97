use std::cmp::Ordering;

use log::{debug, trace};
use num_traits::ToPrimitive;

use crate::{
    Connectivity, ConstraintError, DirectedCursor, Field, ImageTree, LevelRaster, PixelCoord,
    Raster, UnionFindForest,
};
use super::assembly::Assembly;
use super::same_level;

#[derive(Clone)]
pub struct BuilderConfig {
    pub(crate) connectivity: Connectivity,
    pub(crate) batch_size: u32,
    pub(crate) keep_image: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::default(),
            batch_size: 10000,
            keep_image: true,
        }
    }
}

type Order = Box<dyn Fn(f64, f64) -> Ordering>;

/// Builds an `ImageTree` from a raster.
///
/// Pixels are stably sorted in raster order by `order`; the first pixel of the
/// sorted sequence becomes the root. Ascending order (the default) yields a
/// max-tree, descending order a min-tree.
///
/// ```
/// use componenttree::{Builder, Raster};
/// let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
/// let tree = Builder::new().from(&raster).run().unwrap();
/// assert_eq!(tree.element_count(tree.root()), 3);
/// assert_eq!(tree.count_nodes(), 2);
/// ```
#[derive(Default)]
pub struct Builder {
    pub(crate) conf: BuilderConfig,
    pub(crate) order: Option<Order>,
    pub(crate) raster: Option<LevelRaster>,
}

pub struct IncrementalBuilder {
    builder_impl: Box<BuilderImpl>,
}

macro_rules! config_setter {
    ($name:ident, $t:ty) => {
        pub fn $name(mut self, $name: $t) -> Self {
            self.conf.$name = $name;
            self
        }
    };
}

macro_rules! closure_setter {
    ($name:ident, $t:path) => {
        pub fn $name(mut self, $name: impl $t + 'static) -> Self {
            self.$name = Some(Box::new($name));
            self
        }
    };
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from<T>(mut self, raster: &Raster<T>) -> Self
    where
        T: Copy + ToPrimitive,
    {
        self.raster = Some(raster.to_levels());
        self
    }

    pub fn run(self) -> Result<ImageTree, ConstraintError> {
        let mut bimpl = BuilderImpl::from(self);
        while !bimpl.tick()? {}
        Ok(bimpl.result())
    }

    pub fn start(self) -> IncrementalBuilder {
        IncrementalBuilder::new(BuilderImpl::from(self))
    }

    config_setter!(connectivity, Connectivity);
    config_setter!(batch_size, u32);
    config_setter!(keep_image, bool);

    closure_setter!(order, Fn(f64, f64) -> Ordering);
}

impl IncrementalBuilder {
    fn new(builder_impl: BuilderImpl) -> Self {
        Self {
            builder_impl: Box::new(builder_impl),
        }
    }

    /// Advances by one batch. Returns true when construction is complete.
    pub fn tick(&mut self) -> Result<bool, ConstraintError> {
        self.builder_impl.tick()
    }

    /// Percentage of work done, 0 to 100.
    pub fn progress(&self) -> u32 {
        self.builder_impl.progress()
    }

    /// Finishes any remaining work and returns the tree.
    pub fn result(mut self) -> Result<ImageTree, ConstraintError> {
        while !self.builder_impl.tick()? {}
        Ok(self.builder_impl.result())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Sort,
    Flood,
    Canonicalize,
    Assemble,
    Done,
}

struct BuilderImpl {
    connectivity: Connectivity,
    batch_size: usize,
    keep_image: bool,
    order: Order,
    levels: LevelRaster,
    sorted: Vec<PixelCoord>,
    forest: UnionFindForest,
    assembly: Assembly,
    parents: Option<Field<PixelCoord>>,
    stage: Stage,
    /// pixels of `sorted` still to flood, or already canonicalized
    iteration: usize,
}

impl From<Builder> for BuilderImpl {
    fn from(b: Builder) -> Self {
        let levels = b.raster.unwrap_or_default();
        let (width, height) = (levels.width(), levels.height());

        Self {
            connectivity: b.conf.connectivity,
            batch_size: (b.conf.batch_size as usize).max(1),
            keep_image: b.conf.keep_image,
            order: b.order.unwrap_or_else(|| Box::new(|a: f64, b: f64| a.total_cmp(&b))),
            levels,
            sorted: Vec::new(),
            forest: UnionFindForest::new(width, height),
            assembly: Assembly::new(width, height),
            parents: None,
            stage: Stage::Sort,
            iteration: 0,
        }
    }
}

impl BuilderImpl {
    fn tick(&mut self) -> Result<bool, ConstraintError> {
        match self.stage {
            Stage::Sort => {
                let width = self.levels.width();
                let mut sorted: Vec<_> = (0..self.levels.len())
                    .map(|i| PixelCoord::from_index(i, width))
                    .collect();
                let levels = &self.levels;
                let order = &self.order;
                // stable, so ties keep raster order
                sorted.sort_by(|&a, &b| order(levels.get_pixel_at(a), levels.get_pixel_at(b)));
                self.sorted = sorted;
                self.iteration = self.sorted.len();
                self.stage = Stage::Flood;
                debug!("sorted {} pixels", self.sorted.len());
            }
            Stage::Flood => {
                let stop = self.iteration.saturating_sub(self.batch_size);
                for i in (stop..self.iteration).rev() {
                    self.flood(self.sorted[i]);
                }
                self.iteration = stop;
                if self.iteration == 0 {
                    self.stage = Stage::Canonicalize;
                    trace!("flooding done");
                }
            }
            Stage::Canonicalize => {
                let stop = (self.iteration + self.batch_size).min(self.sorted.len());
                for i in self.iteration..stop {
                    self.canonicalize(self.sorted[i]);
                }
                self.iteration = stop;
                if self.iteration == self.sorted.len() {
                    let forest = std::mem::replace(&mut self.forest, UnionFindForest::new(0, 0));
                    self.parents = Some(forest.into_parents());
                    self.stage = Stage::Assemble;
                    trace!("canonicalization done");
                }
            }
            Stage::Assemble => {
                let done = match &self.parents {
                    Some(parents) => self.assembly.step(parents, &self.levels, self.batch_size)?,
                    None => true,
                };
                if done {
                    self.stage = Stage::Done;
                }
            }
            Stage::Done => {}
        }
        Ok(self.stage == Stage::Done)
    }

    fn flood(&mut self, p: PixelCoord) {
        self.forest.make_set(p);
        for n in DirectedCursor::new(p, self.connectivity) {
            if self.forest.is_visited(n) {
                let root = self.forest.find_root(n);
                if root != p {
                    self.forest.link(root, p);
                }
            }
        }
    }

    fn canonicalize(&mut self, p: PixelCoord) {
        let q = self.forest.parent(p);
        let above = self.forest.parent(q);
        if same_level(self.levels.get_pixel_at(above), self.levels.get_pixel_at(q)) {
            self.forest.set_parent(p, above);
        }
    }

    fn progress(&self) -> u32 {
        let len = self.sorted.len().max(1) as f64;
        let fraction = match self.stage {
            Stage::Sort => 0.0,
            Stage::Flood => 0.1 + 0.4 * (1.0 - self.iteration as f64 / len),
            Stage::Canonicalize => 0.5 + 0.2 * (self.iteration as f64 / len),
            Stage::Assemble => 0.7 + 0.3 * (self.assembly.scanned() as f64 / len),
            Stage::Done => 1.0,
        };
        (fraction * 100.0).round() as u32
    }

    fn result(self) -> ImageTree {
        let (width, height) = (self.levels.width(), self.levels.height());
        let mut tree = self.assembly.finish(width, height);
        debug!("built tree of {} nodes over {}x{} pixels", tree.len(), width, height);
        if self.keep_image {
            tree.set_image(self.levels);
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, TreeType};

    fn px(x: i32, y: i32) -> PixelCoord {
        PixelCoord::new(x, y)
    }

    fn children(tree: &ImageTree, id: NodeId) -> Vec<NodeId> {
        tree.node(id).unwrap().children().to_vec()
    }

    #[test]
    fn max_tree_of_a_row() {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        let tree = Builder::new().from(&raster).run().unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.level(), 5.0);
        assert_eq!(root.own_elements(), [px(0, 0), px(1, 0)]);
        let child = children(&tree, tree.root())[0];
        assert_eq!(tree.node(child).unwrap().own_elements(), [px(2, 0)]);
        assert_eq!(tree.node_count(tree.root()), 2);
        assert!(tree.image_set());
    }

    #[test]
    fn two_peaks() {
        // 3 1 3
        // 1 1 1
        let raster = Raster::from_vec(3, 2, vec![3u8, 1, 3, 1, 1, 1]).unwrap();
        let tree = Builder::new().from(&raster).run().unwrap();
        assert!(tree.check_partition().is_ok());
        assert_eq!(tree.node(tree.root()).unwrap().level(), 1.0);
        assert_eq!(tree.node(tree.root()).unwrap().own_elements().len(), 4);
        let peaks = children(&tree, tree.root());
        assert_eq!(peaks.len(), 2);
        for peak in peaks {
            assert_eq!(tree.node(peak).unwrap().level(), 3.0);
            assert_eq!(tree.element_count(peak), 1);
        }
    }

    #[test]
    fn min_tree_order() {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        let tree = Builder::new()
            .from(&raster)
            .order(|a: f64, b: f64| b.total_cmp(&a))
            .run()
            .unwrap();
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.level(), 9.0);
        assert_eq!(root.own_elements(), [px(2, 0)]);
        let child = children(&tree, tree.root())[0];
        assert_eq!(tree.node(child).unwrap().own_elements(), [px(0, 0), px(1, 0)]);
    }

    #[test]
    fn nested_plateaus() {
        // 1 2 3 2 1
        let raster = Raster::from_vec(5, 1, vec![1u8, 2, 3, 2, 1]).unwrap();
        let tree = Builder::new().from(&raster).run().unwrap();
        assert!(tree.check_partition().is_ok());
        assert_eq!(tree.count_nodes(), 3);
        let two = children(&tree, tree.root());
        assert_eq!(two.len(), 1);
        assert_eq!(tree.node(two[0]).unwrap().own_elements(), [px(1, 0), px(3, 0)]);
        let three = children(&tree, two[0]);
        assert_eq!(tree.node(three[0]).unwrap().level(), 3.0);
        assert_eq!(tree.min_max_level(tree.root()), (1.0, 3.0));
    }

    #[test]
    fn incremental_matches_one_shot() {
        let pixels: Vec<u8> = (0..64u32).map(|i| ((i * 37) % 11) as u8).collect();
        let raster = Raster::from_vec(8, 8, pixels).unwrap();
        let one_shot = Builder::new().from(&raster).run().unwrap();

        let mut builder = Builder::new().from(&raster).batch_size(5).start();
        let mut last = 0;
        while !builder.tick().unwrap() {
            let progress = builder.progress();
            assert!(progress >= last);
            last = progress;
        }
        assert_eq!(builder.progress(), 100);
        let incremental = builder.result().unwrap();

        assert!(incremental.check_partition().is_ok());
        assert_eq!(incremental.count_nodes(), one_shot.count_nodes());
        let mut a = Vec::new();
        let mut b = Vec::new();
        one_shot.print_tree(&mut a).unwrap();
        incremental.print_tree(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_pixel_own_flat_zone_is_connected() {
        let pixels: Vec<u8> = (0..30u32).map(|i| ((i * 7) % 5) as u8).collect();
        let raster = Raster::from_vec(6, 5, pixels).unwrap();
        let tree = Builder::new().from(&raster).run().unwrap();
        assert!(tree.check_partition().is_ok());
        for id in tree.nodes() {
            let node = tree.node(id).unwrap();
            for &p in node.own_elements() {
                assert_eq!(raster.level_at(p), node.level());
            }
            if let Some(parent) = node.parent() {
                assert!(tree.node(parent).unwrap().level() < node.level());
            }
        }
    }

    #[test]
    fn without_image() {
        let raster = Raster::from_vec(2, 1, vec![1u16, 2]).unwrap();
        let tree = Builder::new().from(&raster).keep_image(false).run().unwrap();
        assert!(!tree.image_set());
    }

    #[test]
    fn nan_is_a_level_of_its_own() {
        let raster = Raster::from_vec(3, 1, vec![f64::NAN, 1.0, f64::NAN]).unwrap();
        let mut counts = Vec::new();
        for order in [TreeType::MaxTree.order(), TreeType::MinTree.order()] {
            let tree = Builder::new().from(&raster).order(order).run().unwrap();
            assert!(tree.check_partition().is_ok());
            counts.push(tree.count_nodes());
            for id in tree.nodes() {
                let node = tree.node(id).unwrap();
                assert_ne!(node.parent(), Some(id));
                assert!(!node.children().contains(&id));
                assert!(node.level().is_nan() || node.level() == 1.0);
            }
        }
        // sorted first, NaN is the root flat zone holding both ends;
        // sorted last, it splits into two peaks
        counts.sort();
        assert_eq!(counts, [2, 3]);
    }

    #[test]
    fn dual_connectivity_links_edges() {
        // doubled grid, P pixel-node, V/H edge-nodes, C corner
        // P:0 V:2 P:0
        // H:3 C:0 H:1
        let raster = Raster::from_vec(3, 2, vec![0u8, 2, 0, 3, 0, 1]).unwrap();
        let tree = Builder::new()
            .from(&raster)
            .connectivity(Connectivity::Dual)
            .run()
            .unwrap();
        // pixel-nodes and the corner stay roots of their own; the last root in
        // raster order, the lowest edge, wins
        let root = tree.node(tree.root()).unwrap();
        assert_eq!(root.own_elements(), [px(2, 1)]);
        assert_eq!(root.level(), 1.0);
        let vertical = children(&tree, tree.root());
        assert_eq!(vertical.len(), 1);
        assert_eq!(tree.node(vertical[0]).unwrap().own_elements(), [px(1, 0)]);
        let horizontal = children(&tree, vertical[0]);
        assert_eq!(horizontal.len(), 1);
        assert_eq!(tree.node(horizontal[0]).unwrap().own_elements(), [px(0, 1)]);
        assert_eq!(tree.node(horizontal[0]).unwrap().level(), 3.0);
        assert_eq!(tree.count_nodes(), 3);
        assert_eq!(tree.len(), 6);
        assert_eq!(
            tree.check_partition(),
            Err(ConstraintError::MissingPixel { pixel: px(0, 0) })
        );
    }

    #[test]
    fn dual_connectivity_on_regular_grid_differs() {
        let raster = Raster::from_vec(3, 2, vec![0u8, 2, 0, 3, 0, 1]).unwrap();
        let tree = Builder::new().from(&raster).run().unwrap();
        assert!(tree.check_partition().is_ok());
        assert_eq!(tree.node(tree.root()).unwrap().own_elements().len(), 3);
    }

    #[test]
    fn empty_raster() {
        let tree = Builder::new().run().unwrap();
        assert_eq!(tree.count_nodes(), 1);
        assert_eq!(tree.element_count(tree.root()), 0);
        assert!(tree.check_partition().is_ok());
    }
}
