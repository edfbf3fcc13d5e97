use super::{Attribute, AttributeContext};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RangeSettings;

/// Smallest and largest pixel value of a subtree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeValue {
    pub min: f64,
    pub max: f64,
}

impl Default for RangeValue {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RangeValue {
    fn add(&mut self, v: f64) {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn merge(&mut self, other: &RangeValue) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// `max - min`, zero when empty.
    pub fn extent(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max - self.min
        }
    }
}

/// Spread of pixel values over the subtree of a node. Reads the image of the tree.
pub struct Range;

impl Attribute for Range {
    type Settings = RangeSettings;
    type Value = RangeValue;

    const NAME: &'static str = "range";

    fn compute(ctx: &AttributeContext<'_, Self>) -> RangeValue {
        let mut value = RangeValue::default();
        let own = ctx.own_elements();
        if !own.is_empty() {
            let image = ctx.image();
            for v in own.iter().filter_map(|&p| image.get_pixel_safe(p)) {
                value.add(v);
            }
        }
        for child in ctx.children_values() {
            value.merge(child);
        }
        value
    }

    fn scalar(value: &RangeValue, _: &RangeSettings) -> f64 {
        value.extent()
    }
}
