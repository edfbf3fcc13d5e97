//! Gray levels of nodes, and rendering a tree back into rasters.
//!
//! A gray level is assigned bottom-up by a functor that sees the node and the
//! gray levels already assigned to its children. The hyper variants do the
//! same with one gray level per channel of a multi-channel image.

use crate::{LevelRaster, PixelCoord, Raster};
use super::{ImageTree, NodeId};

/// What a gray level functor sees of a node
pub struct GrayLevelInput<'a> {
    pub level: f64,
    pub own_elements: &'a [PixelCoord],
    pub children_gray_levels: &'a [i32],
    pub children_sizes: &'a [usize],
    /// The image of the tree, if set.
    pub image: Option<&'a LevelRaster>,
}

impl GrayLevelInput<'_> {
    /// Image value at the first own element, or the level without image or elements.
    pub fn leaf_value(&self) -> i32 {
        match (self.image, self.own_elements.first()) {
            (Some(image), Some(&p)) if image.contains(p) => image.get_pixel_at(p) as i32,
            _ => self.level as i32,
        }
    }
}

pub trait GrayLevel {
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32;
}

impl<F> GrayLevel for F
where
    F: Fn(&GrayLevelInput<'_>) -> i32,
{
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32 {
        self(input)
    }
}

/// What a hyper gray level functor sees of a node
pub struct HyperGrayLevelInput<'a> {
    pub level: f64,
    pub own_elements: &'a [PixelCoord],
    pub children_gray_levels: &'a [Vec<i32>],
    pub children_sizes: &'a [usize],
    /// One raster per channel, empty if none are set.
    pub images: &'a [LevelRaster],
}

impl HyperGrayLevelInput<'_> {
    /// Per channel image values at the first own element. Without images or
    /// elements, the level as a single channel.
    pub fn leaf_values(&self) -> Vec<i32> {
        match self.own_elements.first() {
            Some(&p) if !self.images.is_empty() => self
                .images
                .iter()
                .map(|image| image.get_pixel_safe(p).unwrap_or(self.level) as i32)
                .collect(),
            _ => vec![self.level as i32],
        }
    }
}

pub trait HyperGrayLevel {
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32>;
}

impl<F> HyperGrayLevel for F
where
    F: Fn(&HyperGrayLevelInput<'_>) -> Vec<i32>,
{
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32> {
        self(input)
    }
}

/// The level of the node, truncated. Fits max-trees and min-trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct LevelAsGray;

impl GrayLevel for LevelAsGray {
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32 {
        input.level as i32
    }
}

impl HyperGrayLevel for LevelAsGray {
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32> {
        vec![input.level as i32; input.images.len().max(1)]
    }
}

/// Leaves take their image value; other nodes the mean of their children
/// weighted by size. Fits alpha-trees, whose inner nodes own no pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct WeightedMeanGray;

impl GrayLevel for WeightedMeanGray {
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32 {
        if input.children_gray_levels.is_empty() {
            return input.leaf_value();
        }
        let mut total = 0i64;
        let mut area = 0i64;
        for (&g, &s) in input.children_gray_levels.iter().zip(input.children_sizes) {
            total += g as i64 * s as i64;
            area += s as i64;
        }
        if area == 0 {
            return input.leaf_value();
        }
        (total / area) as i32
    }
}

impl HyperGrayLevel for WeightedMeanGray {
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32> {
        let first = match input.children_gray_levels.first() {
            Some(first) => first,
            None => return input.leaf_values(),
        };
        let mut total = vec![0i64; first.len()];
        let mut area = 0i64;
        for (gray, &s) in input.children_gray_levels.iter().zip(input.children_sizes) {
            for (t, &g) in total.iter_mut().zip(gray) {
                *t += g as i64 * s as i64;
            }
            area += s as i64;
        }
        if area == 0 {
            return input.leaf_values();
        }
        total.into_iter().map(|t| (t / area) as i32).collect()
    }
}

/// Leaves take their image value; other nodes the darkest gray of their children.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinChildGray;

/// Leaves take their image value; other nodes the brightest gray of their children.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxChildGray;

impl GrayLevel for MinChildGray {
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32 {
        match input.children_gray_levels.iter().min() {
            Some(&g) => g,
            None => input.leaf_value(),
        }
    }
}

impl GrayLevel for MaxChildGray {
    fn gray_level(&self, input: &GrayLevelInput<'_>) -> i32 {
        match input.children_gray_levels.iter().max() {
            Some(&g) => g,
            None => input.leaf_value(),
        }
    }
}

fn per_channel(children: &[Vec<i32>], pick: fn(i32, i32) -> i32) -> Option<Vec<i32>> {
    let (first, rest) = children.split_first()?;
    let mut out = first.clone();
    for gray in rest {
        for (o, &g) in out.iter_mut().zip(gray) {
            *o = pick(*o, g);
        }
    }
    Some(out)
}

impl HyperGrayLevel for MinChildGray {
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32> {
        per_channel(input.children_gray_levels, i32::min).unwrap_or_else(|| input.leaf_values())
    }
}

impl HyperGrayLevel for MaxChildGray {
    fn hyper_gray_level(&self, input: &HyperGrayLevelInput<'_>) -> Vec<i32> {
        per_channel(input.children_gray_levels, i32::max).unwrap_or_else(|| input.leaf_values())
    }
}

impl ImageTree {
    /// Assigns a gray level to every node under the root, children first.
    pub fn assign_gray_levels(&mut self, f: &impl GrayLevel) {
        for id in self.arena.post_order(self.root()) {
            let gray = {
                let node = self.arena.node(id);
                let grays: Vec<i32> = node.children.iter().map(|&c| self.arena.node(c).gray).collect();
                let sizes: Vec<usize> = node.children.iter().map(|&c| self.element_count(c)).collect();
                f.gray_level(&GrayLevelInput {
                    level: node.level,
                    own_elements: &node.own,
                    children_gray_levels: &grays,
                    children_sizes: &sizes,
                    image: self.image(),
                })
            };
            self.arena.node_mut(id).gray = gray;
        }
    }

    /// Assigns a gray level per channel to every node under the root, children first.
    pub fn assign_hyper_gray_levels(&mut self, f: &impl HyperGrayLevel) {
        for id in self.arena.post_order(self.root()) {
            let gray = {
                let node = self.arena.node(id);
                let grays: Vec<Vec<i32>> = node
                    .children
                    .iter()
                    .map(|&c| self.arena.node(c).hyper_gray.clone())
                    .collect();
                let sizes: Vec<usize> = node.children.iter().map(|&c| self.element_count(c)).collect();
                f.hyper_gray_level(&HyperGrayLevelInput {
                    level: node.level,
                    own_elements: &node.own,
                    children_gray_levels: &grays,
                    children_sizes: &sizes,
                    images: self.images().unwrap_or(&[]),
                })
            };
            self.arena.node_mut(id).hyper_gray = gray;
        }
    }

    /// The image as the tree sees it: every pixel painted with the gray level of its node.
    pub fn reconstruct(&self) -> Raster<i32> {
        let mut raster = Raster::new_w_h(self.width(), self.height());
        for id in self.arena.pre_order(self.root()) {
            let node = self.arena.node(id);
            for &p in &node.own {
                if raster.contains(p) {
                    raster.set_pixel_at(p, node.gray);
                }
            }
        }
        raster
    }

    /// One raster per channel of the hyper gray levels.
    pub fn reconstruct_channels(&self) -> Vec<Raster<i32>> {
        let nodes = self.arena.pre_order(self.root());
        let channels = nodes
            .iter()
            .map(|&id| self.arena.node(id).hyper_gray.len())
            .max()
            .unwrap_or(0);
        let mut rasters: Vec<Raster<i32>> = (0..channels)
            .map(|_| Raster::new_w_h(self.width(), self.height()))
            .collect();
        for id in nodes {
            let node = self.arena.node(id);
            for &p in &node.own {
                for (raster, &g) in rasters.iter_mut().zip(&node.hyper_gray) {
                    if raster.contains(p) {
                        raster.set_pixel_at(p, g);
                    }
                }
            }
        }
        rasters
    }

    /// Paints every pixel of the subtrees of `nodes` with `value`.
    pub fn mark_nodes<T: Copy>(&self, raster: &mut Raster<T>, nodes: &[NodeId], value: T) {
        for &id in nodes {
            if !self.contains(id) {
                continue;
            }
            for p in self.elements(id) {
                if raster.contains(p) {
                    raster.set_pixel_at(p, value);
                }
            }
        }
    }

    /// Labels every pixel with the 1-based pre-order position of the node owning it.
    /// Pixels no node owns stay 0.
    pub fn mark_all_patches(&self) -> Raster<u32> {
        let mut raster = Raster::new_w_h(self.width(), self.height());
        for (i, id) in self.arena.pre_order(self.root()).into_iter().enumerate() {
            for &p in &self.arena.node(id).own {
                if raster.contains(p) {
                    raster.set_pixel_at(p, i as u32 + 1);
                }
            }
        }
        raster
    }
}
