use std::fmt;

use num_traits::ToPrimitive;

use crate::{Field, PixelCoord};

/// 2D array of scalar pixels of any item type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Raster<T> {
    field: Field<T>,
}

/// Raster of levels, the form in which trees keep their images
pub type LevelRaster = Raster<f64>;

impl<T> Raster<T> {
    /// Wraps `pixels` given in raster order. Returns `None` if the size does not match.
    pub fn from_vec(width: usize, height: usize, pixels: Vec<T>) -> Option<Self> {
        Field::with_vec(width, height, pixels).map(|field| Self { field })
    }

    pub fn width(&self) -> usize {
        self.field.width()
    }

    pub fn height(&self) -> usize {
        self.field.height()
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    pub fn contains(&self, p: PixelCoord) -> bool {
        self.field.contains(p)
    }

    pub fn field(&self) -> &Field<T> {
        &self.field
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.field.iter()
    }
}

impl<T> Raster<T>
where
    T: Default,
{
    pub fn new_w_h(width: usize, height: usize) -> Self {
        Self {
            field: Field::with_default(width, height),
        }
    }
}

impl<T> Raster<T>
where
    T: Copy,
{
    /// Pixel at `p`. `p` must be in bounds.
    pub fn get_pixel_at(&self, p: PixelCoord) -> T {
        self.field.at(p)
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> T {
        self.get_pixel_at(PixelCoord::new(x as i32, y as i32))
    }

    pub fn get_pixel_safe(&self, p: PixelCoord) -> Option<T> {
        self.field.peek_at(p).copied()
    }

    pub fn set_pixel_at(&mut self, p: PixelCoord, v: T) {
        self.field.put(p, v);
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, v: T) {
        self.set_pixel_at(PixelCoord::new(x as i32, y as i32), v);
    }
}

impl<T> Raster<T>
where
    T: Copy + ToPrimitive,
{
    /// Value of the pixel at `p` as a level. Unrepresentable values become `NaN`.
    pub fn level_at(&self, p: PixelCoord) -> f64 {
        self.get_pixel_at(p).to_f64().unwrap_or(f64::NAN)
    }

    /// Converts every pixel into a level.
    pub fn to_levels(&self) -> LevelRaster {
        Raster {
            field: self.field.map(|v| v.to_f64().unwrap_or(f64::NAN)),
        }
    }
}

impl<T> fmt::Display for Raster<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.width();
        for (i, v) in self.field.iter().enumerate() {
            if i % width != 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", v)?;
            if i % width == width - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_of_bytes() {
        let raster = Raster::from_vec(2, 1, vec![3u8, 250]).unwrap();
        let levels = raster.to_levels();
        assert_eq!(levels.get_pixel(1, 0), 250.0);
        assert_eq!(raster.level_at(PixelCoord::new(0, 0)), 3.0);
    }

    #[test]
    fn safe_access() {
        let mut raster = Raster::<u16>::new_w_h(2, 2);
        raster.set_pixel(1, 1, 7);
        assert_eq!(raster.get_pixel_safe(PixelCoord::new(1, 1)), Some(7));
        assert_eq!(raster.get_pixel_safe(PixelCoord::new(2, 1)), None);
        assert_eq!(raster.get_pixel_safe(PixelCoord::new(-1, 0)), None);
    }

    #[test]
    fn display() {
        let raster = Raster::from_vec(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(raster.to_string(), "1 2 3\n4 5 6\n");
    }
}
