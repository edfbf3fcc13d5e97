use super::{Attribute, AttributeContext};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MeanSettings;

/// Running sum of the pixel values of a subtree
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MeanValue {
    pub sum: f64,
    pub count: usize,
}

impl MeanValue {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Mean pixel value over the subtree of a node. Reads the image of the tree.
pub struct Mean;

impl Attribute for Mean {
    type Settings = MeanSettings;
    type Value = MeanValue;

    const NAME: &'static str = "mean";

    fn compute(ctx: &AttributeContext<'_, Self>) -> MeanValue {
        let own = ctx.own_elements();
        let mut value = MeanValue::default();
        if !own.is_empty() {
            let image = ctx.image();
            for v in own.iter().filter_map(|&p| image.get_pixel_safe(p)) {
                value.sum += v;
                value.count += 1;
            }
        }
        for child in ctx.children_values() {
            value.sum += child.sum;
            value.count += child.count;
        }
        value
    }

    fn scalar(value: &MeanValue, _: &MeanSettings) -> f64 {
        value.mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_tree, ImageTree, PixelCoord, Raster, TreeType};

    #[test]
    fn mean_of_subtrees() {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        let mut tree = create_tree(TreeType::MaxTree, &raster).unwrap();
        let child = tree.node(tree.root()).unwrap().children()[0];
        tree.add_attribute::<Mean>(MeanSettings).unwrap();
        assert_eq!(tree.attribute_scalar::<Mean>(child), Some(9.0));
        let root = tree.attribute::<Mean>(tree.root()).unwrap();
        assert_eq!(root.count, 3);
        assert!((root.mean() - 19.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn pixels_outside_the_image_are_skipped() {
        let mut tree = ImageTree::with_size(2, 1);
        let n = tree
            .new_inclusion(vec![PixelCoord::new(0, 0), PixelCoord::new(5, 0)], 1.0)
            .unwrap();
        assert!(tree.set_root(n));
        assert!(!tree.set_image(Raster::from_vec(1, 1, vec![9.0]).unwrap()));
        assert!(tree.set_image(Raster::from_vec(2, 1, vec![4.0, 7.0]).unwrap()));
        tree.add_attribute::<Mean>(MeanSettings).unwrap();
        let value = tree.attribute::<Mean>(n).unwrap();
        assert_eq!(value.count, 1);
        assert_eq!(value.mean(), 4.0);
    }

    #[test]
    fn empty_value() {
        assert_eq!(MeanValue::default().mean(), 0.0);
    }
}
