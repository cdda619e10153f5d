use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Key;

/// Type tag carried by every filter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    Point,
    Ranged,
    TwoDimensional,
    RangedTwoDimensional,
}

/// A filter value applied to a chart's dimension.
///
/// Filters are pure value objects: two filters built from the same inputs
/// compare equal, which is what the toggle semantics of the filter pipeline
/// rely on. "No constraint" is represented by `Option::<Filter>::None` at
/// call sites, never by a filter variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Exact-match filter on a single key.
    Point(Key),
    /// Half-open range `low <= v < high`, produced by x-axis brushing.
    Ranged { low: Key, high: Key },
    /// Exact-match filter on a two-dimensional key (heat-map cells).
    TwoDimensional(Key, Key),
    /// Axis-aligned rectangle, lower-inclusive/upper-exclusive on both axes,
    /// produced by rectangular brushing on scatter plots.
    RangedTwoDimensional { min: (f64, f64), max: (f64, f64) },
}

impl Filter {
    #[must_use]
    pub fn point(key: impl Into<Key>) -> Self {
        Self::Point(key.into())
    }

    /// Builds a ranged filter, normalizing so `low <= high`.
    #[must_use]
    pub fn ranged(low: impl Into<Key>, high: impl Into<Key>) -> Self {
        let low = low.into();
        let high = high.into();
        if high < low {
            Self::Ranged { low: high, high: low }
        } else {
            Self::Ranged { low, high }
        }
    }

    #[must_use]
    pub fn two_dimensional(x: impl Into<Key>, y: impl Into<Key>) -> Self {
        Self::TwoDimensional(x.into(), y.into())
    }

    /// Builds a rectangular filter from two corners given in any order.
    #[must_use]
    pub fn ranged_two_dimensional(corner1: (f64, f64), corner2: (f64, f64)) -> Self {
        Self::RangedTwoDimensional {
            min: (corner1.0.min(corner2.0), corner1.1.min(corner2.1)),
            max: (corner1.0.max(corner2.0), corner1.1.max(corner2.1)),
        }
    }

    /// Scalar form of the rectangular filter: an x-only range with y
    /// unbounded.
    #[must_use]
    pub fn ranged_two_dimensional_x(x1: f64, x2: f64) -> Self {
        Self::RangedTwoDimensional {
            min: (x1.min(x2), f64::NEG_INFINITY),
            max: (x1.max(x2), f64::INFINITY),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Point(_) => FilterKind::Point,
            Self::Ranged { .. } => FilterKind::Ranged,
            Self::TwoDimensional(..) => FilterKind::TwoDimensional,
            Self::RangedTwoDimensional { .. } => FilterKind::RangedTwoDimensional,
        }
    }

    /// The endpoints of a ranged filter, or `None` for other shapes.
    #[must_use]
    pub fn as_ranged(&self) -> Option<(&Key, &Key)> {
        match self {
            Self::Ranged { low, high } => Some((low, high)),
            _ => None,
        }
    }

    /// Whether the probe key falls inside this filter.
    ///
    /// Ranges are lower-inclusive and upper-exclusive. A scalar probe against
    /// a rectangular filter compares x only; the filter's own lower y bound
    /// stands in for the probe's y, so the y check is trivially satisfied.
    /// Probes of the wrong shape are rejected rather than raised.
    #[must_use]
    pub fn is_filtered(&self, probe: &Key) -> bool {
        match self {
            Self::Point(key) => probe == key,
            Self::Ranged { low, high } => low <= probe && probe < high,
            Self::TwoDimensional(x, y) => match probe.as_pair() {
                Some((px, py)) => px == x && py == y,
                None => false,
            },
            Self::RangedTwoDimensional { min, max } => {
                let (x, y) = match probe.as_pair() {
                    Some((px, py)) => match (px.as_f64(), py.as_f64()) {
                        (Some(x), Some(y)) => (x, y),
                        _ => return false,
                    },
                    None => match probe.as_f64() {
                        Some(x) => (x, min.1),
                        None => return false,
                    },
                };
                x >= min.0 && x < max.0 && y >= min.1 && y < max.1
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(key) => write!(f, "{key}"),
            Self::Ranged { low, high } => write!(f, "[{low} -> {high}]"),
            Self::TwoDimensional(x, y) => write!(f, "[{x},{y}]"),
            Self::RangedTwoDimensional { min, max } => {
                write!(f, "[[{},{}] -> [{},{}]]", min.0, min.1, max.0, max.1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Filter, FilterKind};
    use crate::core::Key;

    #[test]
    fn ranged_filter_normalizes_bounds() {
        let filter = Filter::ranged(9.0, 3.0);
        assert_eq!(filter, Filter::ranged(3.0, 9.0));
        assert_eq!(filter.kind(), FilterKind::Ranged);
    }

    #[test]
    fn ranged_filter_is_half_open() {
        let filter = Filter::ranged(3.0, 9.0);
        assert!(filter.is_filtered(&Key::number(3.0)));
        assert!(filter.is_filtered(&Key::number(8.999)));
        assert!(!filter.is_filtered(&Key::number(9.0)));
        assert!(!filter.is_filtered(&Key::number(2.999)));
    }

    #[test]
    fn two_dimensional_filter_matches_componentwise() {
        let filter = Filter::two_dimensional(1.0, 2.0);
        assert!(filter.is_filtered(&Key::pair(Key::number(1.0), Key::number(2.0))));
        assert!(!filter.is_filtered(&Key::pair(Key::number(1.0), Key::number(3.0))));
        assert!(!filter.is_filtered(&Key::number(1.0)));
    }

    #[test]
    fn rectangular_filter_normalizes_corners() {
        let filter = Filter::ranged_two_dimensional((5.0, 6.0), (1.0, 2.0));
        assert_eq!(filter, Filter::ranged_two_dimensional((1.0, 2.0), (5.0, 6.0)));
        assert!(filter.is_filtered(&Key::pair(Key::number(1.0), Key::number(2.0))));
        assert!(!filter.is_filtered(&Key::pair(Key::number(5.0), Key::number(3.0))));
    }

    #[test]
    fn scalar_probe_against_rectangle_checks_x_only() {
        let filter = Filter::ranged_two_dimensional_x(1.0, 5.0);
        assert!(filter.is_filtered(&Key::number(1.0)));
        assert!(filter.is_filtered(&Key::number(4.999)));
        assert!(!filter.is_filtered(&Key::number(5.0)));

        // A bounded rectangle still accepts scalar probes on its x range.
        let bounded = Filter::ranged_two_dimensional((1.0, 2.0), (5.0, 6.0));
        assert!(bounded.is_filtered(&Key::number(3.0)));
    }

    #[test]
    fn filters_print_in_human_readable_form() {
        assert_eq!(Filter::point("east").to_string(), "east");
        assert_eq!(Filter::ranged(3.0, 9.0).to_string(), "[3 -> 9]");
    }
}
