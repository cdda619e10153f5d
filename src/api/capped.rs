use std::rc::Rc;

use indexmap::IndexSet;

use crate::api::base::BaseChart;
use crate::api::{ChartContext, ChartLifecycle, CommitMode};
use crate::core::{CapPolicy, Filter, Key, Row};
use crate::error::ChartResult;

/// Chart that shows only the top rows of its group, folding the remainder
/// into a synthetic "others" row.
pub struct CappedChart {
    base: BaseChart,
    policy: CapPolicy,
}

impl CappedChart {
    #[must_use]
    pub fn new(anchor: impl Into<String>, group: impl Into<String>) -> Self {
        let mut base = BaseChart::new(anchor, group);
        // Capped charts rank by descending value unless the caller overrides.
        base.set_ordering(Rc::new(|row: &Row| Key::number(-row.value)));
        Self {
            base,
            policy: CapPolicy::default(),
        }
    }

    #[must_use]
    pub fn base(&self) -> &BaseChart {
        &self.base
    }

    #[must_use]
    pub fn base_mut(&mut self) -> &mut BaseChart {
        &mut self.base
    }

    pub fn set_cap_policy(&mut self, policy: CapPolicy) {
        self.policy = policy;
    }

    #[must_use]
    pub fn cap_policy(&self) -> &CapPolicy {
        &self.policy
    }

    /// The group's native top-N rows reordered by the base chart's ordering
    /// accessor, with every other row folded into the others row. The kept
    /// set always comes from [`crate::core::DataGroup::top`], whatever the
    /// display ordering says.
    #[must_use]
    pub fn data(&self) -> Vec<Row> {
        let Some(group) = self.base.group() else {
            return Vec::new();
        };
        let Some(cap) = self.policy.cap else {
            return self.base.ordered_rows();
        };
        let mut kept = group.top(cap);
        self.base.order_rows(&mut kept);
        let kept_keys: IndexSet<Key> = kept.iter().map(|row| row.key.clone()).collect();
        let rest: Vec<Row> = group
            .all()
            .into_iter()
            .filter(|row| !kept_keys.contains(&row.key))
            .collect();
        self.policy.fold(kept, rest)
    }

    /// Clicking an ordinary row toggles its point filter. Clicking the
    /// others row toggles one point filter per absorbed key, so the
    /// selection matches the real keys behind the synthetic label.
    pub fn on_click(&mut self, ctx: &ChartContext, row: &Row) {
        if row.is_others() {
            let filters = row
                .absorbed
                .iter()
                .cloned()
                .map(Filter::point)
                .collect::<Vec<_>>();
            self.base.toggle_filters(ctx, filters);
            self.base.defer_group_redraw(ctx);
        } else {
            self.base.on_click(ctx, row);
        }
    }
}

impl ChartLifecycle for CappedChart {
    fn anchor_name(&self) -> &str {
        self.base.anchor_name()
    }

    fn chart_group(&self) -> &str {
        self.base.chart_group()
    }

    fn render(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        ChartLifecycle::render(&mut self.base, ctx)
    }

    fn redraw(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        ChartLifecycle::redraw(&mut self.base, ctx)
    }

    fn reset_all_filters(&mut self) {
        self.base.reset_all_filters();
    }

    fn replace_filter(&mut self, ctx: &ChartContext, filter: Option<Filter>) {
        ChartLifecycle::replace_filter(&mut self.base, ctx, filter);
    }

    fn commit(&mut self, mode: CommitMode) -> ChartResult<()> {
        self.base.run_commit_handler(mode)
    }
}
