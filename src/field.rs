use crate::PixelCoord;

/// `Vec<T>` that represents a 2D field, stored in raster order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

/// The base implementation of `Field`
impl<T> Field<T> {
    /// Constructs a `height` by `width` field with `data`.
    /// Returns `None` if the size of `data` does not equal to `height * width`.
    pub fn with_vec(width: usize, height: usize, data: Vec<T>) -> Option<Self> {
        if data.len() == width * height {
            Some(Self {
                data,
                width,
                height,
            })
        } else {
            None
        }
    }

    /// Returns the width of the field.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the field.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of slots in the field.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks if `p` addresses a slot of this field.
    pub fn contains(&self, p: PixelCoord) -> bool {
        p.in_bounds(self.width, self.height)
    }

    /// Returns a reference to an element.
    pub fn peek(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    /// Returns a mutable reference to an element.
    pub fn peek_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    /// Returns a reference to the element at `p`, or `None` when out of bounds.
    pub fn peek_at(&self, p: PixelCoord) -> Option<&T> {
        if self.contains(p) {
            self.data.get(p.to_index(self.width))
        } else {
            None
        }
    }

    /// Replaces an element with `value` and returns the element.
    pub fn replace(&mut self, index: usize, value: T) -> Option<T> {
        self.data
            .get_mut(index)
            .map(|elem| std::mem::replace(elem, value))
    }

    /// Returns the xy-coordinates representation of an index in the field.
    pub fn locate(&self, index: usize) -> PixelCoord {
        PixelCoord::from_index(index, self.width)
    }

    /// Returns the index of a xy-coordinates representation in the field.
    pub fn index_at(&self, p: PixelCoord) -> usize {
        p.to_index(self.width)
    }

    /// All coordinates of the field in raster order.
    pub fn coords(&self) -> impl Iterator<Item = PixelCoord> {
        let width = self.width;
        (0..self.data.len()).map(move |i| PixelCoord::from_index(i, width))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Applies `f` on every element, keeping the shape.
    pub fn map<U, F>(&self, f: F) -> Field<U>
    where
        F: FnMut(&T) -> U,
    {
        Field {
            data: self.data.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T> Field<T>
where
    T: Default,
{
    /// Constructs a `height` by `width` field, with each slot filled with the default value of its element type.
    pub fn with_default(width: usize, height: usize) -> Self {
        let size = width * height;
        let mut data = Vec::with_capacity(size);
        data.resize_with(size, T::default);
        Self {
            data,
            width,
            height,
        }
    }
}

impl<T> Field<T>
where
    T: Clone,
{
    /// Constructs a `height` by `width` field, with each slot filled with `value`.
    pub fn with_initial(width: usize, height: usize, value: T) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Returns a copy of an element.
    pub fn get(&self, index: usize) -> Option<T> {
        self.peek(index).cloned()
    }

    /// Assigns a copy of a value to a slot.
    pub fn set(&mut self, index: usize, value: &T) {
        if let Some(elem) = self.data.get_mut(index) {
            *elem = value.clone();
        }
    }
}

impl<T> Field<T>
where
    T: Copy,
{
    /// Returns the element at `p`. `p` must be in bounds.
    #[inline]
    pub fn at(&self, p: PixelCoord) -> T {
        self.data[p.to_index(self.width)]
    }

    /// Writes the element at `p`. `p` must be in bounds.
    #[inline]
    pub fn put(&mut self, p: PixelCoord, value: T) {
        let i = p.to_index(self.width);
        self.data[i] = value;
    }
}

impl<T> IntoIterator for Field<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}
