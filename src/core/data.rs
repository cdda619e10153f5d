use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::core::Key;

/// One aggregated data row as produced by a data-store group.
///
/// `absorbed` is empty on ordinary rows; the synthetic "others" row emitted
/// by capping carries the keys it folded away so a click can filter by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: Key,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absorbed: Vec<Key>,
}

impl Row {
    #[must_use]
    pub fn new(key: impl Into<Key>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
            absorbed: Vec::new(),
        }
    }

    #[must_use]
    pub fn others(key: impl Into<Key>, value: f64, absorbed: Vec<Key>) -> Self {
        Self {
            key: key.into(),
            value,
            absorbed,
        }
    }

    #[must_use]
    pub fn is_others(&self) -> bool {
        !self.absorbed.is_empty()
    }
}

/// External data-store dimension handle.
///
/// The filter pipeline chooses which of these calls to make based on the
/// shape of the chart's filter list; the store itself is an opaque
/// collaborator.
pub trait Dimension {
    fn clear_filter(&mut self);
    fn filter_exact(&mut self, key: &Key);
    fn filter_range(&mut self, low: &Key, high: &Key);
    fn filter_predicate(&mut self, predicate: Box<dyn Fn(&Key) -> bool>);
}

/// External data-store aggregation handle feeding a chart's rows.
///
/// `top` returns rows in the store's native order; the core re-sorts them
/// with the chart's ordering accessor.
pub trait DataGroup {
    fn all(&self) -> Vec<Row>;
    fn top(&self, n: usize) -> Vec<Row>;
}

pub type SharedGroup = Rc<dyn DataGroup>;

/// The constraint most recently pushed to a dimension.
#[derive(Default)]
pub enum AppliedConstraint {
    #[default]
    Unfiltered,
    Exact(Key),
    Range(Key, Key),
    Predicate(Box<dyn Fn(&Key) -> bool>),
}

impl fmt::Debug for AppliedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfiltered => write!(f, "Unfiltered"),
            Self::Exact(key) => write!(f, "Exact({key})"),
            Self::Range(low, high) => write!(f, "Range({low}, {high})"),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// In-memory dimension for hosts without a crossfilter-style engine.
///
/// Stores the applied constraint and can evaluate it against a probe key,
/// which is also exactly what the pipeline tests need to observe.
#[derive(Debug, Default)]
pub struct MemoryDimension {
    applied: AppliedConstraint,
}

impl MemoryDimension {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn applied(&self) -> &AppliedConstraint {
        &self.applied
    }

    /// Evaluates the current constraint against a key.
    #[must_use]
    pub fn accepts(&self, key: &Key) -> bool {
        match &self.applied {
            AppliedConstraint::Unfiltered => true,
            AppliedConstraint::Exact(expected) => key == expected,
            AppliedConstraint::Range(low, high) => low <= key && key < high,
            AppliedConstraint::Predicate(predicate) => predicate(key),
        }
    }
}

impl Dimension for MemoryDimension {
    fn clear_filter(&mut self) {
        self.applied = AppliedConstraint::Unfiltered;
    }

    fn filter_exact(&mut self, key: &Key) {
        self.applied = AppliedConstraint::Exact(key.clone());
    }

    fn filter_range(&mut self, low: &Key, high: &Key) {
        self.applied = AppliedConstraint::Range(low.clone(), high.clone());
    }

    fn filter_predicate(&mut self, predicate: Box<dyn Fn(&Key) -> bool>) {
        self.applied = AppliedConstraint::Predicate(predicate);
    }
}

/// Fixed-row group; `top` follows the crossfilter convention of descending
/// value order.
#[derive(Debug, Clone, Default)]
pub struct StaticGroup {
    rows: Vec<Row>,
}

impl StaticGroup {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn shared(rows: Vec<Row>) -> SharedGroup {
        Rc::new(Self::new(rows))
    }
}

impl DataGroup for StaticGroup {
    fn all(&self) -> Vec<Row> {
        self.rows.clone()
    }

    fn top(&self, n: usize) -> Vec<Row> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.value.total_cmp(&a.value));
        rows.truncate(n);
        rows
    }
}

/// Rendering surface contract.
///
/// The coordination core only needs bounding dimensions for default size
/// inference and a hook to toggle reset/active-filter affordances. Surfaces
/// are shared handles, so mutation goes through interior mutability.
pub trait RenderSurface {
    fn bounding_width(&self) -> Option<f64> {
        None
    }

    fn bounding_height(&self) -> Option<f64> {
        None
    }

    fn set_controls_visible(&self, _visible: bool) {}
}

/// Surface with no backing element; sizes fall back to the chart minimums.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl RenderSurface for NullSurface {}

#[cfg(test)]
mod tests {
    use super::{AppliedConstraint, DataGroup, Dimension, MemoryDimension, Row, StaticGroup};
    use crate::core::Key;

    #[test]
    fn memory_dimension_evaluates_applied_constraint() {
        let mut dimension = MemoryDimension::new();
        assert!(dimension.accepts(&Key::number(7.0)));

        dimension.filter_exact(&Key::text("east"));
        assert!(dimension.accepts(&Key::text("east")));
        assert!(!dimension.accepts(&Key::text("west")));

        dimension.filter_range(&Key::number(2.0), &Key::number(5.0));
        assert!(matches!(dimension.applied(), AppliedConstraint::Range(..)));
        assert!(dimension.accepts(&Key::number(2.0)));
        assert!(!dimension.accepts(&Key::number(5.0)));

        dimension.clear_filter();
        assert!(dimension.accepts(&Key::number(99.0)));
    }

    #[test]
    fn static_group_top_orders_by_descending_value() {
        let group = StaticGroup::new(vec![
            Row::new("a", 1.0),
            Row::new("b", 9.0),
            Row::new("c", 4.0),
        ]);
        let top = group.top(2);
        assert_eq!(top[0].key, Key::text("b"));
        assert_eq!(top[1].key, Key::text("c"));
    }
}
