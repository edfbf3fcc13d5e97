//! Node predicates used by filtering.
//!
//! A predicate sees the value of a node and the value of its parent (levels or
//! attribute values) and returns true if the node should be kept.

/// Decides whether a node survives filtering
pub trait Predicate {
    fn keep(&self, value: f64, parent_value: f64) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(f64, f64) -> bool,
{
    fn keep(&self, value: f64, parent_value: f64) -> bool {
        self(value, parent_value)
    }
}

macro_rules! threshold_predicate {
    ($(#[$meta:meta])* $name:ident, |$v:ident, $p:ident, $x:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name(pub f64);

        impl Predicate for $name {
            #[allow(unused_variables)]
            fn keep(&self, $v: f64, $p: f64) -> bool {
                let $x = self.0;
                $body
            }
        }
    };
}

threshold_predicate!(GreaterThan, |v, p, x| v > x);
threshold_predicate!(LessThan, |v, p, x| v < x);
threshold_predicate!(GreaterEqual, |v, p, x| v >= x);
threshold_predicate!(LessEqual, |v, p, x| v <= x);
threshold_predicate!(ParentGreaterThan, |v, p, x| p > x);
threshold_predicate!(ParentLessThan, |v, p, x| p < x);
threshold_predicate!(ParentGreaterEqual, |v, p, x| p >= x);
threshold_predicate!(ParentLessEqual, |v, p, x| p <= x);
threshold_predicate!(
    /// Keeps nodes whose value differs from the parent's by more than `x`.
    IncreaseGreaterThan,
    |v, p, x| (p - v).abs() > x
);

/// Keeps nodes of an alpha-tree whose parent lies above the given alpha.
pub type AlphaPredicate = ParentGreaterThan;

/// Keeps nodes whose value differs from the parent's.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DifferentThanParent;

impl Predicate for DifferentThanParent {
    fn keep(&self, value: f64, parent_value: f64) -> bool {
        value != parent_value
    }
}

/// Keeps nodes whose value differs from the parent's by more than a fraction of their own value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeIncreaseGreaterThan(f64);

impl RelativeIncreaseGreaterThan {
    /// A negative fraction falls back to one half.
    pub fn new(fraction: f64) -> Self {
        if fraction < 0.0 {
            Self(0.5)
        } else {
            Self(fraction)
        }
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }
}

impl Predicate for RelativeIncreaseGreaterThan {
    fn keep(&self, value: f64, parent_value: f64) -> bool {
        (parent_value - value).abs() > self.0 * value.abs()
    }
}
