use super::{Attribute, AttributeContext};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionDynamicsSettings;

/// Largest level difference met on a descent from a node to one of its leaves
pub struct RegionDynamics;

impl Attribute for RegionDynamics {
    type Settings = RegionDynamicsSettings;
    type Value = f64;

    const NAME: &'static str = "regiondynamics";

    fn compute(ctx: &AttributeContext<'_, Self>) -> f64 {
        let level = ctx.node().level();
        ctx.children_with_values()
            .map(|(child, value)| value + (level - child.level()).abs())
            .fold(0.0, f64::max)
    }

    fn scalar(value: &f64, _: &RegionDynamicsSettings) -> f64 {
        *value
    }
}
