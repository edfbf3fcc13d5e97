#![allow(dead_code)]

pub mod attribute;
pub mod construction;
pub mod disjoint_sets;
pub mod error;
pub mod field;
pub mod pixel;
pub mod predicate;
pub mod raster;
pub mod tree;

pub use attribute::*;
pub use construction::*;
pub use disjoint_sets::UnionFindForest;
pub use error::*;
pub use field::*;
pub use pixel::*;
pub use predicate::*;
pub use raster::*;
pub use tree::*;
