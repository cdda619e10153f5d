use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::{AxisPadding, Key, Row, SharedGroup};

pub type ValueAccessor = Rc<dyn Fn(&Row) -> f64>;
pub type KeyAccessor = Rc<dyn Fn(&Row) -> Key>;

/// One stacked data layer. All layers on a chart share the chart's key
/// accessor; the value accessor may be overridden per layer.
pub struct StackLayer {
    pub name: String,
    pub group: SharedGroup,
    pub accessor: Option<ValueAccessor>,
    pub hidden: bool,
}

impl StackLayer {
    #[must_use]
    pub fn new(name: impl Into<String>, group: SharedGroup) -> Self {
        Self {
            name: name.into(),
            group,
            accessor: None,
            hidden: false,
        }
    }

    #[must_use]
    pub fn with_accessor(mut self, accessor: ValueAccessor) -> Self {
        self.accessor = Some(accessor);
        self
    }
}

/// One shaped point: a layer row positioned on the shared coordinate space
/// with its stacking baseline assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct StackPoint {
    pub x: Key,
    pub y: Option<f64>,
    pub y0: f64,
    pub row: Row,
    pub layer: String,
    pub hidden: bool,
}

/// Shaped output of one visible layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedLayer {
    pub name: String,
    pub points: Vec<StackPoint>,
}

/// Transforms the visible layers' raw rows into stacked points.
///
/// Baselines are assigned in layer-declaration order with sign-separated
/// running sums: positive values stack upward from the positive baseline,
/// negative values downward from the negative one. `domain_filter`, when
/// present, drops points outside the visible x-domain before stacking
/// (elastic and ordinal axes pass `None`).
#[must_use]
pub fn shape_layers(
    layers: &[StackLayer],
    key_accessor: &KeyAccessor,
    default_accessor: &ValueAccessor,
    domain_filter: Option<&dyn Fn(&Key) -> bool>,
) -> Vec<ShapedLayer> {
    let mut positive: IndexMap<Key, f64> = IndexMap::new();
    let mut negative: IndexMap<Key, f64> = IndexMap::new();
    let mut shaped = Vec::new();

    for layer in layers.iter().filter(|layer| !layer.hidden) {
        let accessor = layer.accessor.as_ref().unwrap_or(default_accessor);
        let mut points = Vec::new();

        for row in layer.group.all() {
            let x = key_accessor(&row);
            if domain_filter.is_some_and(|filter| !filter(&x)) {
                continue;
            }

            let y = accessor(&row);
            let y0 = if y < 0.0 {
                let baseline = negative.entry(x.clone()).or_insert(0.0);
                let y0 = *baseline;
                *baseline += y;
                y0
            } else {
                let baseline = positive.entry(x.clone()).or_insert(0.0);
                let y0 = *baseline;
                *baseline += y;
                y0
            };

            points.push(StackPoint {
                x,
                y: Some(y),
                y0,
                row,
                layer: layer.name.clone(),
                hidden: false,
            });
        }

        shaped.push(ShapedLayer {
            name: layer.name.clone(),
            points,
        });
    }

    shaped
}

fn flattened(layers: &[ShapedLayer]) -> impl Iterator<Item = &StackPoint> {
    layers.iter().flat_map(|layer| layer.points.iter())
}

/// Minimum and maximum x key across all shaped layers, padded outward.
#[must_use]
pub fn x_extent(layers: &[ShapedLayer], padding: AxisPadding) -> Option<(Key, Key)> {
    let mut min: Option<&Key> = None;
    let mut max: Option<&Key> = None;
    for point in flattened(layers) {
        if min.is_none_or(|current| point.x < *current) {
            min = Some(&point.x);
        }
        if max.is_none_or(|current| point.x > *current) {
            max = Some(&point.x);
        }
    }
    Some((min?.pad_lower(padding), max?.pad_upper(padding)))
}

/// Sign-aware y extent: maxima come from the top of upward stacks
/// (`y0 + y` for positive values), minima from the bottom of downward ones.
#[must_use]
pub fn y_extent(layers: &[ShapedLayer], padding: AxisPadding) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;

    for point in flattened(layers) {
        let Some(y) = point.y else { continue };
        seen = true;
        let low = if y < 0.0 { y + point.y0 } else { point.y0 };
        let high = if y > 0.0 { y + point.y0 } else { point.y0 };
        min = min.min(low);
        max = max.max(high);
    }

    if !seen {
        return None;
    }

    let min_key = Key::number(min).pad_lower(padding);
    let max_key = Key::number(max).pad_upper(padding);
    Some((min_key.as_f64()?, max_key.as_f64()?))
}

/// Ordered distinct x keys across all shaped layers, in first-seen order.
#[must_use]
pub fn ordinal_x_domain(layers: &[ShapedLayer]) -> Vec<Key> {
    let mut seen: IndexMap<Key, ()> = IndexMap::new();
    for point in flattened(layers) {
        seen.entry(point.x.clone()).or_insert(());
    }
    seen.into_keys().collect()
}
