use std::cell::Cell;
use std::fmt;

use crate::{ConstraintError, PixelCoord};

/// Index of a node in the arena of an `ImageTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Structural flavour of a node, deciding which shapes are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Nested regions: a node owns pixels and contains its children.
    Inclusion,
    /// Disjoint regions: a node either owns pixels or is split into children.
    Partitioning,
}

impl NodeKind {
    /// Checks the shape a node of this kind would have with `elements` own
    /// pixels and `children` children.
    pub(crate) fn check_shape(
        self,
        node: NodeId,
        sentinel: bool,
        elements: usize,
        children: usize,
    ) -> Result<(), ConstraintError> {
        match self {
            NodeKind::Inclusion => {
                if !sentinel && elements == 0 {
                    return Err(ConstraintError::EmptyInclusion { node });
                }
            }
            NodeKind::Partitioning => {
                if elements == 0 && children == 0 {
                    return Err(ConstraintError::EmptyPartitioning { node });
                }
                if elements != 0 && children != 0 {
                    return Err(ConstraintError::MixedPartitioning { node, elements, children });
                }
                if elements == 0 && children < 2 {
                    return Err(ConstraintError::TooFewChildren { node, children });
                }
            }
        }
        Ok(())
    }
}

/// A region of the image.
///
/// Nodes are owned by an `ImageTree` and edited through it; this type only
/// exposes what a node holds.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) sentinel: bool,
    pub(crate) own: Vec<PixelCoord>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) level: f64,
    pub(crate) gray: i32,
    pub(crate) hyper_gray: Vec<i32>,
    pub(crate) propagating_contrast: i32,
    pub(crate) propagating_hyper_contrast: Vec<i32>,
    pub(crate) size: Cell<Option<usize>>,
    pub(crate) ncount: Cell<Option<usize>>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, own: Vec<PixelCoord>, children: Vec<NodeId>, level: f64) -> Self {
        Self {
            kind,
            sentinel: false,
            own,
            children,
            parent: None,
            level,
            gray: 0,
            hyper_gray: Vec::new(),
            propagating_contrast: 0,
            propagating_hyper_contrast: Vec::new(),
            size: Cell::new(None),
            ncount: Cell::new(None),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Sentinels are placeholder inclusion nodes allowed to own nothing.
    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    pub fn own_elements(&self) -> &[PixelCoord] {
        &self.own
    }

    pub fn has_own_element(&self, px: PixelCoord) -> bool {
        self.own.contains(&px)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn gray_level(&self) -> i32 {
        self.gray
    }

    pub fn hyper_gray_levels(&self) -> &[i32] {
        &self.hyper_gray
    }

    /// Contrast pushed down onto this node by subtractive or soft filtering.
    pub fn propagating_contrast(&self) -> i32 {
        self.propagating_contrast
    }

    pub fn propagating_hyper_contrast(&self) -> &[i32] {
        &self.propagating_hyper_contrast
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<(), ConstraintError> {
        self.kind
            .check_shape(id, self.sentinel, self.own.len(), self.children.len())
    }
}
