use std::cell::RefCell;
use std::time::Duration;

use tracing::{error, warn};

use crate::api::registry::{ChartRegistry, SharedChart};
use crate::core::Filter;
use crate::error::ChartResult;
use crate::interaction::{EVENT_DELAY, EventToken, EventTrigger};

/// Which lifecycle pass a commit handler is asked to prepare for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    Render,
    Redraw,
}

/// Minimal contract a chart exposes to group broadcasts. Concrete charts
/// keep their richer typed APIs; the context only needs identity, the two
/// lifecycle passes, and filter reset.
pub trait ChartLifecycle {
    fn anchor_name(&self) -> &str;
    fn chart_group(&self) -> &str;
    fn render(&mut self, ctx: &ChartContext) -> ChartResult<()>;
    fn redraw(&mut self, ctx: &ChartContext) -> ChartResult<()>;
    fn reset_all_filters(&mut self);
    fn commit(&mut self, mode: CommitMode) -> ChartResult<()>;

    /// Replace the chart's filter list with `filter`, or clear it for
    /// `None`. Charts without a filter pipeline ignore this.
    fn replace_filter(&mut self, _ctx: &ChartContext, _filter: Option<Filter>) {}

    /// Drop any zoom focus. Charts without focus semantics ignore this.
    fn defocus(&mut self) {}
}

/// Action deferred through the context's event trigger. Deferred closures
/// receive the context and look charts up by name, so they stay valid even
/// if the originating chart was deregistered in the meantime.
pub type DeferredAction = Box<dyn FnOnce(&ChartContext)>;

/// Shared coordination surface for a set of linked charts: the registry of
/// chart groups plus the single-slot trigger that throttles interaction
/// bursts. One context per UI; charts never reach for process globals.
#[derive(Default)]
pub struct ChartContext {
    registry: RefCell<ChartRegistry>,
    trigger: EventTrigger<DeferredAction>,
}

impl ChartContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, chart: SharedChart, group: Option<&str>) {
        self.registry.borrow_mut().register(chart, group);
    }

    pub fn deregister(&self, anchor: &str, group: Option<&str>) {
        self.registry.borrow_mut().deregister(anchor, group);
    }

    pub fn deregister_all(&self, group: Option<&str>) {
        self.registry.borrow_mut().deregister_all(group);
    }

    #[must_use]
    pub fn has_chart(&self, chart: &SharedChart) -> bool {
        self.registry.borrow().has(chart)
    }

    #[must_use]
    pub fn charts(&self, group: Option<&str>) -> Vec<SharedChart> {
        self.registry.borrow().list(group)
    }

    #[must_use]
    pub fn find_chart(&self, anchor: &str, group: Option<&str>) -> Option<SharedChart> {
        self.registry.borrow().find(anchor, group)
    }

    /// Renders every chart in `group` in registration order. A chart that
    /// is already mutably borrowed (a reentrant broadcast from inside its
    /// own lifecycle) is skipped with a warning rather than poisoning the
    /// whole pass.
    pub fn render_all(&self, group: Option<&str>) -> ChartResult<()> {
        for chart in self.charts(group) {
            let Ok(mut chart) = chart.try_borrow_mut() else {
                warn!(target: "linked_charts::context", "skipping reentrant render");
                continue;
            };
            chart.render(self)?;
        }
        Ok(())
    }

    /// Redraws every chart in `group` in registration order.
    pub fn redraw_all(&self, group: Option<&str>) -> ChartResult<()> {
        for chart in self.charts(group) {
            let Ok(mut chart) = chart.try_borrow_mut() else {
                warn!(target: "linked_charts::context", "skipping reentrant redraw");
                continue;
            };
            chart.redraw(self)?;
        }
        Ok(())
    }

    /// Clears every chart's filters in `group`. Does not redraw; callers
    /// follow up with [`ChartContext::redraw_all`] when they want the
    /// visuals to catch up.
    pub fn filter_all(&self, group: Option<&str>) {
        for chart in self.charts(group) {
            if let Ok(mut chart) = chart.try_borrow_mut() {
                chart.reset_all_filters();
            }
        }
    }

    /// Drops zoom focus on every chart in `group`.
    pub fn refocus_all(&self, group: Option<&str>) {
        for chart in self.charts(group) {
            if let Ok(mut chart) = chart.try_borrow_mut() {
                chart.defocus();
            }
        }
    }

    /// Runs `chart`'s commit handler for a render pass, then renders the
    /// whole group. A failing commit is logged and the broadcast skipped.
    pub fn render_group_for(&self, chart: &SharedChart) -> ChartResult<()> {
        self.commit_then(chart, CommitMode::Render, |ctx, group| {
            ctx.render_all(group)
        })
    }

    /// Runs `chart`'s commit handler for a redraw pass, then redraws the
    /// whole group. A failing commit is logged and the broadcast skipped.
    pub fn redraw_group_for(&self, chart: &SharedChart) -> ChartResult<()> {
        self.commit_then(chart, CommitMode::Redraw, |ctx, group| {
            ctx.redraw_all(group)
        })
    }

    fn commit_then(
        &self,
        chart: &SharedChart,
        mode: CommitMode,
        broadcast: impl FnOnce(&Self, Option<&str>) -> ChartResult<()>,
    ) -> ChartResult<()> {
        let group = {
            let mut chart = chart.borrow_mut();
            if let Err(err) = chart.commit(mode) {
                error!(
                    target: "linked_charts::context",
                    chart = chart.anchor_name(),
                    %err,
                    "commit handler failed, group refresh skipped"
                );
                return Err(err);
            }
            chart.chart_group().to_string()
        };
        broadcast(self, Some(&group))
    }

    /// Schedules `action` with the default interaction settle delay.
    pub fn defer(&self, action: DeferredAction) -> Option<EventToken> {
        self.defer_after(EVENT_DELAY, action)
    }

    /// Schedules `action`, superseding any pending one. A zero delay runs
    /// the action synchronously and returns no token.
    pub fn defer_after(&self, delay: Duration, action: DeferredAction) -> Option<EventToken> {
        if delay.is_zero() {
            action(self);
            None
        } else {
            Some(self.trigger.schedule(delay, action))
        }
    }

    pub fn cancel_deferred(&self, token: EventToken) -> bool {
        self.trigger.cancel(token)
    }

    #[must_use]
    pub fn has_deferred(&self) -> bool {
        self.trigger.is_pending()
    }

    /// Advances the interaction clock. The pending action, if now due, runs
    /// here, outside any chart or registry borrow.
    pub fn pump(&self, elapsed: Duration) {
        if let Some(action) = self.trigger.pump(elapsed) {
            action(self);
        }
    }
}
