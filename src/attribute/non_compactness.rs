use std::f64::consts::PI;

use super::{Area, AreaSettings, Attribute, AttributeContext, Dependencies, MomentKind, Moments, MomentsSettings};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NonCompactnessSettings;

/// How far the shape of a subtree is from a disc, from the first Hu invariant
/// corrected for pixel discretization. A disc scores close to 1.
pub struct NonCompactness;

impl NonCompactness {
    pub fn moments_settings() -> MomentsSettings {
        MomentsSettings {
            order: 5,
            kind: MomentKind::Hu,
            p: 1,
            q: 0,
        }
    }
}

impl Attribute for NonCompactness {
    type Settings = NonCompactnessSettings;
    type Value = f64;

    const NAME: &'static str = "non-compactness";

    fn dependencies(_: &NonCompactnessSettings, deps: &mut Dependencies) {
        deps.require::<Area>(AreaSettings);
        deps.require::<Moments>(Self::moments_settings());
    }

    fn compute(ctx: &AttributeContext<'_, Self>) -> f64 {
        let area = ctx
            .dependency::<Area>()
            .map(|&a| a as f64)
            .unwrap_or(f64::NAN);
        let hu = ctx
            .dependency::<Moments>()
            .and_then(|m| m.hu(1))
            .unwrap_or(f64::NAN);
        (hu + 1.0 / (6.0 * area)) * 2.0 * PI
    }

    fn scalar(value: &f64, _: &NonCompactnessSettings) -> f64 {
        *value
    }
}
