//! Algorithm to build a component tree from a raster (Berger et al.)
//!
//! Pixels are ordered by a comparator, flooded from the last to the first
//! with a union-find forest, canonicalized so that every pixel points at the
//! representative of its flat zone, and finally materialized into nodes.
//!
//! To support interactivity, the builder follows a state-machine model:
//!
//! + new(): creation of placeholder object
//! + start(): resource allocation
//! + tick() -> bool: computation. returning false to continue, returning true when finish
//! + result() -> T: cleanup & collect results

mod assembly;
mod builder;
mod runner;

pub use builder::*;
pub use runner::*;

use std::cmp::Ordering;

/// Levels of one flat zone. Uses the same total order as sorting, so NaN equals NaN.
pub(crate) fn same_level(a: f64, b: f64) -> bool {
    a.total_cmp(&b) == Ordering::Equal
}
