//! Error types of the crate.
//!
//! Structural violations are reported as [`ConstraintError`]. Misuse that can
//! be recovered from (an out-of-range child index) is reported as `false` or
//! `None` by the operation itself.

use std::io;

use thiserror::Error;

use crate::{NodeId, PixelCoord};

/// A node or a tree broke one of its structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("inclusion node {node} has no own elements")]
    EmptyInclusion { node: NodeId },
    #[error("partitioning node {node} has neither elements nor children")]
    EmptyPartitioning { node: NodeId },
    #[error("partitioning node {node} has {elements} own elements and {children} children")]
    MixedPartitioning {
        node: NodeId,
        elements: usize,
        children: usize,
    },
    #[error("partitioning node {node} without elements has only {children} children")]
    TooFewChildren { node: NodeId, children: usize },
    #[error("node {child} is not free to become a child of {node}")]
    UnavailableChild { node: NodeId, child: NodeId },
    #[error("pixel {pixel} is owned by more than one node")]
    DuplicatePixel { pixel: PixelCoord },
    #[error("pixel {pixel} is not owned by any node")]
    MissingPixel { pixel: PixelCoord },
    #[error("pixel {pixel} lies outside the {width}x{height} image")]
    PixelOutOfBounds {
        pixel: PixelCoord,
        width: usize,
        height: usize,
    },
}

/// Attribute declarations that cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    #[error("attribute {name} depends on itself")]
    DependencyCycle { name: &'static str },
}

/// Failures while reading or writing node selections and attribute values.
#[derive(Debug, Error)]
pub enum TreeIoError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("line {line}: malformed node id {text:?}")]
    MalformedId { line: usize, text: String },
    #[error("attribute {name} is not attached to node {node}")]
    MissingAttribute { name: &'static str, node: NodeId },
}
