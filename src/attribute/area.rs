use super::{Attribute, AttributeContext};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AreaSettings;

/// Number of pixels in the subtree of a node
pub struct Area;

impl Attribute for Area {
    type Settings = AreaSettings;
    type Value = usize;

    const NAME: &'static str = "area";

    fn compute(ctx: &AttributeContext<'_, Self>) -> usize {
        ctx.own_elements().len() + ctx.children_values().sum::<usize>()
    }

    fn scalar(value: &usize, _: &AreaSettings) -> f64 {
        *value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_tree, Raster, TreeType};

    #[test]
    fn area_matches_element_count() {
        let raster = Raster::from_vec(3, 2, vec![1u8, 4, 4, 2, 4, 0]).unwrap();
        let mut tree = create_tree(TreeType::MaxTree, &raster).unwrap();
        tree.add_attribute::<Area>(AreaSettings).unwrap();
        for id in tree.nodes() {
            assert_eq!(tree.attribute::<Area>(id), Some(&tree.element_count(id)));
        }
        assert_eq!(tree.attribute::<Area>(tree.root()), Some(&6));
        assert_eq!(tree.min_max_attribute::<Area>(), Some((3.0, 6.0)));
    }

    #[test]
    fn attach_twice_detach_twice() {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        let mut tree = create_tree(TreeType::MaxTree, &raster).unwrap();
        let child = tree.node(tree.root()).unwrap().children()[0];

        tree.add_attribute::<Area>(AreaSettings).unwrap();
        tree.add_attribute::<Area>(AreaSettings).unwrap();
        assert!(tree.delete_attribute::<Area>());
        assert!(tree.is_attribute_in_tree::<Area>());
        assert_eq!(tree.attribute::<Area>(tree.root()), Some(&3));
        assert_eq!(tree.attribute::<Area>(child), Some(&1));

        assert!(tree.delete_attribute::<Area>());
        assert!(!tree.is_attribute_in_tree::<Area>());
        assert_eq!(tree.attribute::<Area>(tree.root()), None);
        assert!(!tree.delete_attribute::<Area>());
    }

    #[test]
    fn values_of_deleted_nodes_are_gone() {
        let raster = Raster::from_vec(3, 1, vec![5u8, 5, 9]).unwrap();
        let mut tree = create_tree(TreeType::MaxTree, &raster).unwrap();
        let root = tree.root();
        let child = tree.node(root).unwrap().children()[0];
        tree.add_attribute::<Area>(AreaSettings).unwrap();
        assert_eq!(tree.delete_child(root, 0), Ok(true));
        assert_eq!(tree.attribute::<Area>(child), None);
        // the values are not refreshed by edits
        assert_eq!(tree.attribute::<Area>(root), Some(&3));
        assert!(tree.recompute_attribute::<Area>());
        assert_eq!(tree.attribute::<Area>(root), Some(&3));
    }
}
