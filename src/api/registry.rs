use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::api::ChartLifecycle;

/// Group name used when a chart is registered without one.
pub const DEFAULT_CHART_GROUP: &str = "__default_chart_group__";

pub type SharedChart = Rc<RefCell<dyn ChartLifecycle>>;

/// Charts bucketed by group name, in registration order. Broadcast
/// operations on [`crate::api::ChartContext`] walk one bucket at a time.
#[derive(Default)]
pub struct ChartRegistry {
    groups: IndexMap<String, Vec<SharedChart>>,
}

impl ChartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(group: Option<&str>) -> &str {
        match group {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_CHART_GROUP,
        }
    }

    /// Adds `chart` to `group`. A chart already registered under the same
    /// anchor name replaces the old entry in place, keeping its slot in the
    /// broadcast order.
    pub fn register(&mut self, chart: SharedChart, group: Option<&str>) {
        let anchor = chart.borrow().anchor_name().to_string();
        let bucket = self
            .groups
            .entry(Self::normalize(group).to_string())
            .or_default();
        if let Some(existing) = bucket.iter_mut().find(|entry| {
            entry
                .try_borrow()
                .is_ok_and(|entry| entry.anchor_name() == anchor)
        }) {
            *existing = chart;
        } else {
            bucket.push(chart);
        }
    }

    /// Removes the first chart in `group` whose anchor name matches.
    pub fn deregister(&mut self, anchor: &str, group: Option<&str>) {
        if let Some(bucket) = self.groups.get_mut(Self::normalize(group)) {
            if let Some(index) = bucket.iter().position(|entry| {
                entry
                    .try_borrow()
                    .is_ok_and(|entry| entry.anchor_name() == anchor)
            }) {
                bucket.remove(index);
            }
        }
    }

    pub fn deregister_all(&mut self, group: Option<&str>) {
        match group {
            Some(name) if !name.is_empty() => {
                self.groups.shift_remove(name);
            }
            _ => self.groups.clear(),
        }
    }

    /// Identity membership test.
    #[must_use]
    pub fn has(&self, chart: &SharedChart) -> bool {
        self.groups
            .values()
            .flatten()
            .any(|entry| Rc::ptr_eq(entry, chart))
    }

    /// Snapshot of a group's charts in registration order. Cloning out of
    /// the registry lets callers drop the registry borrow before touching
    /// any chart.
    #[must_use]
    pub fn list(&self, group: Option<&str>) -> Vec<SharedChart> {
        self.groups
            .get(Self::normalize(group))
            .cloned()
            .unwrap_or_default()
    }

    /// Lookup by anchor name. Charts currently borrowed elsewhere are
    /// skipped rather than panicking on a reentrant borrow.
    #[must_use]
    pub fn find(&self, anchor: &str, group: Option<&str>) -> Option<SharedChart> {
        self.groups
            .get(Self::normalize(group))?
            .iter()
            .find(|entry| {
                entry
                    .try_borrow()
                    .is_ok_and(|entry| entry.anchor_name() == anchor)
            })
            .cloned()
    }
}
