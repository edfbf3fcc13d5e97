use std::cmp::Ordering;

use num_traits::ToPrimitive;

use crate::{Connectivity, ConstraintError, ImageTree, LevelRaster, Raster};
use super::Builder;

/// The component trees that come with a preset ordering
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    /// Nodes are upper level sets; the root holds the darkest pixels.
    #[default]
    MaxTree,
    /// Nodes are lower level sets; the root holds the brightest pixels.
    MinTree,
}

impl TreeType {
    pub fn order(self) -> fn(f64, f64) -> Ordering {
        match self {
            TreeType::MaxTree => ascending,
            TreeType::MinTree => descending,
        }
    }
}

fn ascending(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

pub struct Runner {
    config: RunnerConfig,
    raster: LevelRaster,
}

pub struct RunnerConfig {
    pub tree_type: TreeType,
    pub connectivity: Connectivity,
    pub batch_size: u32,
    pub keep_image: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tree_type: TreeType::MaxTree,
            connectivity: Connectivity::Regular,
            batch_size: 25600,
            keep_image: true,
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            config: RunnerConfig::default(),
            raster: LevelRaster::default(),
        }
    }
}

impl Runner {
    pub fn new(config: RunnerConfig, raster: LevelRaster) -> Self {
        Self { config, raster }
    }

    pub fn init(&mut self, raster: LevelRaster) {
        self.raster = raster;
    }

    pub fn builder(self) -> Builder {
        let RunnerConfig {
            tree_type,
            connectivity,
            batch_size,
            keep_image,
        } = self.config;

        Builder::new()
            .from(&self.raster)
            .connectivity(connectivity)
            .batch_size(batch_size)
            .keep_image(keep_image)
            .order(tree_type.order())
    }

    pub fn run(self) -> Result<ImageTree, ConstraintError> {
        self.builder().run()
    }
}

/// Builds the tree of `tree_type` over `raster`.
pub fn create_tree<T>(tree_type: TreeType, raster: &Raster<T>) -> Result<ImageTree, ConstraintError>
where
    T: Copy + ToPrimitive,
{
    Runner::new(
        RunnerConfig {
            tree_type,
            ..Default::default()
        },
        raster.to_levels(),
    )
    .run()
}

/// Builds a tree over `raster` ordering pixels by `order` and flooding with `connectivity`.
pub fn build_tree<T, F>(
    raster: &Raster<T>,
    order: F,
    connectivity: Connectivity,
) -> Result<ImageTree, ConstraintError>
where
    T: Copy + ToPrimitive,
    F: Fn(f64, f64) -> Ordering + 'static,
{
    Builder::new()
        .from(raster)
        .order(order)
        .connectivity(connectivity)
        .run()
}
