use super::{Attribute, AttributeContext};

/// Which moment `Moments` reports as its scalar value
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MomentKind {
    Raw,
    Central,
    Normalized,
    /// Hu invariant number `p`, 1 to 7
    #[default]
    Hu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MomentsSettings {
    /// Moments `m_pq` with `p + q < order` are kept.
    pub order: usize,
    pub kind: MomentKind,
    pub p: usize,
    pub q: usize,
}

impl Default for MomentsSettings {
    fn default() -> Self {
        Self {
            order: 3,
            kind: MomentKind::Hu,
            p: 1,
            q: 0,
        }
    }
}

/// Raw moments of the binary shape of a subtree
#[derive(Debug, Clone, PartialEq)]
pub struct MomentsValue {
    order: usize,
    raw: Vec<i64>,
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

impl MomentsValue {
    fn zero(order: usize) -> Self {
        Self {
            order,
            raw: vec![0; order * order],
        }
    }

    fn index(&self, p: usize, q: usize) -> Option<usize> {
        if p + q < self.order {
            Some(q * self.order + p)
        } else {
            None
        }
    }

    fn add_pixel(&mut self, x: i64, y: i64) {
        let mut yq = 1;
        for q in 0..self.order {
            let mut xp = 1;
            for p in 0..self.order - q {
                self.raw[q * self.order + p] += xp * yq;
                xp *= x;
            }
            yq *= y;
        }
    }

    fn merge(&mut self, other: &MomentsValue) {
        for q in 0..self.order {
            for p in 0..self.order - q {
                if let Some(i) = other.index(p, q) {
                    self.raw[q * self.order + p] += other.raw[i];
                }
            }
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn raw(&self, p: usize, q: usize) -> Option<i64> {
        self.index(p, q).map(|i| self.raw[i])
    }

    /// Moment about the centroid.
    pub fn central(&self, p: usize, q: usize) -> Option<f64> {
        self.index(p, q)?;
        let m00 = self.raw[0] as f64;
        if m00 == 0.0 {
            return Some(0.0);
        }
        if p + q == 1 {
            return Some(0.0);
        }
        let mx = -(self.raw(1, 0).unwrap_or(0) as f64) / m00;
        let my = -(self.raw(0, 1).unwrap_or(0) as f64) / m00;
        let mut mu = 0.0;
        for l in 0..=q {
            for k in 0..=p {
                mu += binomial(p, k)
                    * binomial(q, l)
                    * mx.powi((p - k) as i32)
                    * my.powi((q - l) as i32)
                    * self.raw[l * self.order + k] as f64;
            }
        }
        Some(mu)
    }

    /// Scale invariant central moment.
    pub fn normalized(&self, p: usize, q: usize) -> Option<f64> {
        let mu = self.central(p, q)?;
        let m00 = self.raw[0] as f64;
        if m00 == 0.0 {
            return Some(0.0);
        }
        Some(mu / m00.powf(1.0 + (p + q) as f64 / 2.0))
    }

    /// Hu invariant `n`. The first two need order 3, the rest order 4.
    pub fn hu(&self, n: usize) -> Option<f64> {
        let e = |p, q| self.normalized(p, q);
        match n {
            1 => Some(e(2, 0)? + e(0, 2)?),
            2 => {
                let (n20, n02, n11) = (e(2, 0)?, e(0, 2)?, e(1, 1)?);
                Some((n20 - n02).powi(2) + 4.0 * n11 * n11)
            }
            3..=7 => {
                let (n30, n03, n21, n12) = (e(3, 0)?, e(0, 3)?, e(2, 1)?, e(1, 2)?);
                let (n20, n02, n11) = (e(2, 0)?, e(0, 2)?, e(1, 1)?);
                let a = n30 + n12;
                let b = n21 + n03;
                Some(match n {
                    3 => (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2),
                    4 => a * a + b * b,
                    5 => {
                        (n30 - 3.0 * n12) * a * (a * a - 3.0 * b * b)
                            + (3.0 * n21 - n03) * b * (3.0 * a * a - b * b)
                    }
                    6 => (n20 - n02) * (a * a - b * b) + 4.0 * n11 * a * b,
                    _ => {
                        (3.0 * n21 - n03) * a * (a * a - 3.0 * b * b)
                            - (n30 - 3.0 * n12) * b * (3.0 * a * a - b * b)
                    }
                })
            }
            _ => None,
        }
    }
}

/// Geometric moments of the pixels of a subtree.
///
/// Only `order` affects the values; `kind`, `p` and `q` choose what is
/// reported, so changing them keeps the values. Lowering `order` keeps them too.
pub struct Moments;

impl Attribute for Moments {
    type Settings = MomentsSettings;
    type Value = MomentsValue;

    const NAME: &'static str = "moments";

    fn compute(ctx: &AttributeContext<'_, Self>) -> MomentsValue {
        let mut value = MomentsValue::zero(ctx.settings().order);
        for px in ctx.own_elements() {
            value.add_pixel(px.x as i64, px.y as i64);
        }
        for child in ctx.children_values() {
            value.merge(child);
        }
        value
    }

    fn requires_recompute(computed: &MomentsSettings, requested: &MomentsSettings) -> bool {
        requested.order > computed.order
    }

    fn scalar(value: &MomentsValue, settings: &MomentsSettings) -> f64 {
        let MomentsSettings { kind, p, q, .. } = *settings;
        let scalar = match kind {
            MomentKind::Raw => value.raw(p, q).map(|m| m as f64),
            MomentKind::Central => value.central(p, q),
            MomentKind::Normalized => value.normalized(p, q),
            MomentKind::Hu => value.hu(p),
        };
        scalar.unwrap_or(f64::NAN)
    }
}
