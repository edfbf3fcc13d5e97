use std::fmt;

/// Coordinates of a pixel (or of a vertex of the dual grid).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelCoord {
    pub x: i32,
    pub y: i32,
}

/// How neighbours of a pixel are enumerated during flooding
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// 4-connected image graph
    #[default]
    Regular,
    /// Inverted edges and nodes of the image graph, on a doubled grid.
    /// Odd/even parity of `x` and `y` tells edge-nodes from pixel-nodes.
    Dual,
}

impl Connectivity {
    /// Number of steps a `DirectedCursor` walks for this connectivity.
    pub fn steps(self) -> usize {
        match self {
            Connectivity::Regular => 4,
            Connectivity::Dual => 6,
        }
    }
}

impl PixelCoord {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Checks if the coordinates exist within an image of `width` by `height`.
    #[inline]
    pub fn in_bounds(self, width: usize, height: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < width && (self.y as usize) < height
    }

    /// Coordinate of the `index`-th pixel of an image of `width` in raster order.
    #[inline]
    pub fn from_index(index: usize, width: usize) -> Self {
        Self::new((index % width) as i32, (index / width) as i32)
    }

    /// Inverse of `from_index`. The coordinate must be in bounds.
    #[inline]
    pub fn to_index(self, width: usize) -> usize {
        self.y as usize * width + self.x as usize
    }

    /// True for vertical edge-nodes (odd, even) of the dual grid.
    pub fn is_vertical_edge(self) -> bool {
        self.x.rem_euclid(2) == 1 && self.y.rem_euclid(2) == 0
    }

    /// True for horizontal edge-nodes (even, odd) of the dual grid.
    pub fn is_horizontal_edge(self) -> bool {
        self.x.rem_euclid(2) == 0 && self.y.rem_euclid(2) == 1
    }
}

impl fmt::Display for PixelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

impl From<(i32, i32)> for PixelCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

const REGULAR_STEPS: [(i32, i32); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
const VERTICAL_STEPS: [(i32, i32); 6] = [(-2, 0), (-1, 1), (1, 1), (2, 0), (1, -1), (-1, -1)];
const HORIZONTAL_STEPS: [(i32, i32); 6] = [(-1, 1), (0, 2), (1, 1), (1, -1), (0, -2), (-1, -1)];

/// A pixel together with the direction of the next neighbour to visit.
///
/// The order of the steps is fixed, which keeps tie-breaking during
/// flooding reproducible. Neighbours are not bounds-checked.
///
/// ```
/// use componenttree::{Connectivity, DirectedCursor, PixelCoord};
/// let around: Vec<_> = DirectedCursor::new(PixelCoord::new(1, 1), Connectivity::Regular).collect();
/// assert_eq!(around, [
///     PixelCoord::new(0, 1), PixelCoord::new(1, 2),
///     PixelCoord::new(2, 1), PixelCoord::new(1, 0),
/// ]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DirectedCursor {
    coord: PixelCoord,
    step: usize,
    mode: Connectivity,
}

impl DirectedCursor {
    pub fn new(coord: PixelCoord, mode: Connectivity) -> Self {
        Self { coord, step: 0, mode }
    }

    pub fn coord(&self) -> PixelCoord {
        self.coord
    }

    /// Index of the step the next call to `next()` produces.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Checks if there is a next neighbour to visit.
    pub fn has_next(&self) -> bool {
        self.step < self.mode.steps()
    }

    fn delta(&self) -> (i32, i32) {
        match self.mode {
            Connectivity::Regular => REGULAR_STEPS[self.step],
            Connectivity::Dual => {
                if self.coord.is_vertical_edge() {
                    VERTICAL_STEPS[self.step]
                } else if self.coord.is_horizontal_edge() {
                    HORIZONTAL_STEPS[self.step]
                } else {
                    // pixel-nodes and corners have no dual neighbours
                    (0, 0)
                }
            }
        }
    }
}

impl Iterator for DirectedCursor {
    type Item = PixelCoord;

    fn next(&mut self) -> Option<PixelCoord> {
        if !self.has_next() {
            return None;
        }
        let (dx, dy) = self.delta();
        self.step += 1;
        Some(self.coord.offset(dx, dy))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.mode.steps() - self.step;
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_order() {
        let cursor = DirectedCursor::new(PixelCoord::new(5, 5), Connectivity::Regular);
        let n: Vec<_> = cursor.collect();
        assert_eq!(n, [
            PixelCoord::new(4, 5),
            PixelCoord::new(5, 6),
            PixelCoord::new(6, 5),
            PixelCoord::new(5, 4),
        ]);
    }

    #[test]
    fn dual_vertical_edge() {
        let n: Vec<_> = DirectedCursor::new(PixelCoord::new(3, 2), Connectivity::Dual).collect();
        assert_eq!(n, [
            PixelCoord::new(1, 2),
            PixelCoord::new(2, 3),
            PixelCoord::new(4, 3),
            PixelCoord::new(5, 2),
            PixelCoord::new(4, 1),
            PixelCoord::new(2, 1),
        ]);
    }

    #[test]
    fn dual_horizontal_edge() {
        let n: Vec<_> = DirectedCursor::new(PixelCoord::new(2, 3), Connectivity::Dual).collect();
        assert_eq!(n, [
            PixelCoord::new(1, 4),
            PixelCoord::new(2, 5),
            PixelCoord::new(3, 4),
            PixelCoord::new(3, 2),
            PixelCoord::new(2, 1),
            PixelCoord::new(1, 2),
        ]);
    }

    #[test]
    fn dual_pixel_node_stays() {
        let p = PixelCoord::new(2, 2);
        let cursor = DirectedCursor::new(p, Connectivity::Dual);
        assert_eq!(cursor.size_hint(), (6, Some(6)));
        assert!(cursor.into_iter().all(|n| n == p));
    }

    #[test]
    fn bounds_and_index() {
        let p = PixelCoord::from_index(7, 3);
        assert_eq!(p, PixelCoord::new(1, 2));
        assert_eq!(p.to_index(3), 7);
        assert!(p.in_bounds(3, 3));
        assert!(!p.in_bounds(3, 2));
        assert!(!PixelCoord::new(-1, 0).in_bounds(3, 3));
        assert_eq!(p.to_string(), "(1,2)");
    }
}
