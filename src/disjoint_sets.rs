//! Union-find over the pixels of a raster.
//!
//! The symbols in this module are part of the public API, but are generally
//! only useful to the tree builders.
use bit_vec::BitVec;

use crate::{Field, PixelCoord};

/// Two same-shaped forests over the pixels of a raster.
///
/// `parent` is the tree being built; `zpar` is the compressed forest used to
/// find the current root of a pixel. Both point at the pixel itself for roots.
/// A pixel takes part only after `make_set` has been called on it.
pub struct UnionFindForest {
    parent: Field<PixelCoord>,
    zpar: Field<PixelCoord>,
    visited: BitVec,
}

impl UnionFindForest {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            parent: Field::with_default(width, height),
            zpar: Field::with_default(width, height),
            visited: BitVec::from_elem(width * height, false),
        }
    }

    pub fn width(&self) -> usize {
        self.parent.width()
    }

    pub fn height(&self) -> usize {
        self.parent.height()
    }

    /// Makes `p` a singleton set and marks it visited.
    pub fn make_set(&mut self, p: PixelCoord) {
        self.parent.put(p, p);
        self.zpar.put(p, p);
        self.visited.set(self.parent.index_at(p), true);
    }

    /// Whether `p` is in bounds and has been made a set.
    pub fn is_visited(&self, p: PixelCoord) -> bool {
        self.parent.contains(p) && self.visited.get(self.parent.index_at(p)).unwrap_or(false)
    }

    /// Finds the root of `p`, compressing the path along the traversal towards root as a side effect.
    pub fn find_root(&mut self, p: PixelCoord) -> PixelCoord {
        let mut path_visited = vec![];
        let mut cur = p;

        loop {
            let up = self.zpar.at(cur);
            if up == cur {
                break;
            }
            path_visited.push(cur);
            cur = up;
        }

        for visited in path_visited {
            self.zpar.put(visited, cur);
        }

        cur
    }

    /// Hangs the set rooted at `root` under `p`.
    pub fn link(&mut self, root: PixelCoord, p: PixelCoord) {
        self.parent.put(root, p);
        self.zpar.put(root, p);
    }

    pub fn parent(&self, p: PixelCoord) -> PixelCoord {
        self.parent.at(p)
    }

    pub fn set_parent(&mut self, p: PixelCoord, q: PixelCoord) {
        self.parent.put(p, q);
    }

    /// Gives up the union structure and keeps only the parent forest.
    pub fn into_parents(self) -> Field<PixelCoord> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> PixelCoord {
        PixelCoord::new(x, y)
    }

    #[test]
    fn union_find() {
        let mut forest = UnionFindForest::new(4, 1);
        for x in 0..4 {
            forest.make_set(p(x, 0));
        }
        forest.link(p(3, 0), p(2, 0));
        forest.link(p(2, 0), p(1, 0));

        assert_eq!(forest.find_root(p(3, 0)), p(1, 0));
        assert_eq!(forest.find_root(p(0, 0)), p(0, 0));
        // parent is not compressed, only zpar is
        assert_eq!(forest.parent(p(3, 0)), p(2, 0));
        assert_eq!(forest.find_root(p(3, 0)), p(1, 0));
    }

    #[test]
    fn visited() {
        let mut forest = UnionFindForest::new(2, 2);
        assert!(!forest.is_visited(p(1, 1)));
        forest.make_set(p(1, 1));
        assert!(forest.is_visited(p(1, 1)));
        assert!(!forest.is_visited(p(2, 1)));
        assert!(!forest.is_visited(p(0, -1)));
    }
}
