use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::api::events::{EventKind, EventListeners, EventPayload, Listener};
use crate::api::{ChartContext, ChartLifecycle, CommitMode};
use crate::core::{Dimension, Filter, Key, NullSurface, RenderSurface, Row, SharedGroup};
use crate::error::{ChartError, ChartResult};

pub const MIN_WIDTH: f64 = 200.0;
pub const MIN_HEIGHT: f64 = 200.0;

const DEFAULT_TRANSITION: Duration = Duration::ZERO;

pub type SharedDimension = Rc<RefCell<dyn Dimension>>;
pub type CommitHandler = Box<dyn FnMut(CommitMode) -> ChartResult<()>>;
pub type LabelAccessor = Rc<dyn Fn(&Row) -> String>;
pub type OrderingAccessor = Rc<dyn Fn(&Row) -> Key>;
type FilterDispatch = Rc<dyn Fn(&mut dyn Dimension, &[Filter])>;

/// Replaceable hooks over the chart's filter list. Each takes the current
/// list and returns the next one; swapping a hook changes the semantics of
/// the corresponding pipeline step without touching the rest.
#[derive(Clone)]
pub struct FilterHandlers {
    pub has: Rc<dyn Fn(&[Filter], &Filter) -> bool>,
    pub add: Rc<dyn Fn(Vec<Filter>, Filter) -> Vec<Filter>>,
    pub remove: Rc<dyn Fn(Vec<Filter>, &Filter) -> Vec<Filter>>,
    pub reset: Rc<dyn Fn(Vec<Filter>) -> Vec<Filter>>,
}

impl Default for FilterHandlers {
    fn default() -> Self {
        Self {
            has: Rc::new(|filters, filter| filters.contains(filter)),
            add: Rc::new(|mut filters, filter| {
                filters.push(filter);
                filters
            }),
            remove: Rc::new(|mut filters, filter| {
                filters.retain(|entry| entry != filter);
                filters
            }),
            reset: Rc::new(|_| Vec::new()),
        }
    }
}

impl std::fmt::Debug for FilterHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FilterHandlers")
    }
}

/// Chart bookkeeping shared by every concrete chart: identity, data
/// bindings, sizing, the filter pipeline, listeners and the deferred
/// commit/transition machinery. Concrete charts embed one and forward the
/// lifecycle contract to it.
pub struct BaseChart {
    anchor: String,
    group: String,
    dimension: Option<SharedDimension>,
    data_group: Option<SharedGroup>,
    surface: Rc<dyn RenderSurface>,
    width: Option<f64>,
    height: Option<f64>,
    min_width: f64,
    min_height: f64,
    label: LabelAccessor,
    title: LabelAccessor,
    ordering: OrderingAccessor,
    filters: Vec<Filter>,
    handlers: FilterHandlers,
    dispatch: FilterDispatch,
    commit_handler: Option<CommitHandler>,
    transition_duration: Duration,
    listeners: EventListeners,
    pending_transition: Option<EventKind>,
    rendered: bool,
}

fn default_dispatch(dimension: &mut dyn Dimension, filters: &[Filter]) {
    match filters {
        [] => dimension.clear_filter(),
        [Filter::Point(key)] => dimension.filter_exact(key),
        [Filter::Ranged { low, high }] => dimension.filter_range(low, high),
        _ => {
            let filters = filters.to_vec();
            dimension.filter_predicate(Box::new(move |key| {
                filters.iter().any(|filter| filter.is_filtered(key))
            }));
        }
    }
}

impl BaseChart {
    #[must_use]
    pub fn new(anchor: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            group: group.into(),
            dimension: None,
            data_group: None,
            surface: Rc::new(NullSurface),
            width: None,
            height: None,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
            label: Rc::new(|row: &Row| row.key.to_string()),
            title: Rc::new(|row: &Row| format!("{}: {}", row.key, row.value)),
            ordering: Rc::new(|row: &Row| row.key.clone()),
            filters: Vec::new(),
            handlers: FilterHandlers::default(),
            dispatch: Rc::new(default_dispatch),
            commit_handler: None,
            transition_duration: DEFAULT_TRANSITION,
            listeners: EventListeners::default(),
            pending_transition: None,
            rendered: false,
        }
    }

    #[must_use]
    pub fn anchor_name(&self) -> &str {
        &self.anchor
    }

    #[must_use]
    pub fn chart_group(&self) -> &str {
        &self.group
    }

    pub fn set_dimension(&mut self, dimension: SharedDimension) {
        self.dimension = Some(dimension);
    }

    pub fn set_group(&mut self, group: SharedGroup) {
        self.data_group = Some(group);
    }

    #[must_use]
    pub fn group(&self) -> Option<&SharedGroup> {
        self.data_group.as_ref()
    }

    pub fn set_surface(&mut self, surface: Rc<dyn RenderSurface>) {
        self.surface = surface;
    }

    pub fn set_width(&mut self, width: Option<f64>) {
        self.width = width;
    }

    pub fn set_height(&mut self, height: Option<f64>) {
        self.height = height;
    }

    pub fn set_min_width(&mut self, min_width: f64) {
        self.min_width = min_width;
    }

    pub fn set_min_height(&mut self, min_height: f64) {
        self.min_height = min_height;
    }

    /// Effective width: the explicit setting, else the surface's bounding
    /// width, floored at the minimum width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
            .or_else(|| self.surface.bounding_width())
            .map_or(self.min_width, |width| width.max(self.min_width))
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
            .or_else(|| self.surface.bounding_height())
            .map_or(self.min_height, |height| height.max(self.min_height))
    }

    pub fn set_label_accessor(&mut self, label: LabelAccessor) {
        self.label = label;
    }

    pub fn set_title_accessor(&mut self, title: LabelAccessor) {
        self.title = title;
    }

    #[must_use]
    pub fn label(&self, row: &Row) -> String {
        (self.label)(row)
    }

    #[must_use]
    pub fn title(&self, row: &Row) -> String {
        (self.title)(row)
    }

    pub fn set_ordering(&mut self, ordering: OrderingAccessor) {
        self.ordering = ordering;
    }

    /// Sorts rows in place by the ordering accessor's key, ascending.
    pub fn order_rows(&self, rows: &mut [Row]) {
        rows.sort_by_cached_key(|row| (self.ordering)(row));
    }

    /// Group rows sorted by the ordering accessor's key, ascending.
    #[must_use]
    pub fn ordered_rows(&self) -> Vec<Row> {
        let mut rows = self.data();
        self.order_rows(&mut rows);
        rows
    }

    pub fn set_transition_duration(&mut self, duration: Duration) {
        self.transition_duration = duration;
    }

    pub fn set_filter_handlers(&mut self, handlers: FilterHandlers) {
        self.handlers = handlers;
    }

    pub fn set_filter_dispatch(&mut self, dispatch: FilterDispatch) {
        self.dispatch = dispatch;
    }

    pub fn set_commit_handler(&mut self, handler: CommitHandler) {
        self.commit_handler = Some(handler);
    }

    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.listeners.on(kind, listener);
    }

    #[must_use]
    pub fn has_rendered(&self) -> bool {
        self.rendered
    }

    /// All rows of the bound data group, unshaped.
    #[must_use]
    pub fn data(&self) -> Vec<Row> {
        self.data_group
            .as_ref()
            .map(|group| group.all())
            .unwrap_or_default()
    }

    // --- filter pipeline ---

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    #[must_use]
    pub fn has_filter(&self, filter: &Filter) -> bool {
        (self.handlers.has)(&self.filters, filter)
    }

    /// The chart's primary filter, the first in the list.
    #[must_use]
    pub fn current_filter(&self) -> Option<&Filter> {
        self.filters.first()
    }

    /// Adds `filter` if absent, removes it if present, then pushes the new
    /// filter list to the dimension and notifies `Filtered` listeners with
    /// the toggled value.
    pub fn toggle_filter(&mut self, ctx: &ChartContext, filter: Filter) {
        let filters = std::mem::take(&mut self.filters);
        self.filters = if (self.handlers.has)(&filters, &filter) {
            (self.handlers.remove)(filters, &filter)
        } else {
            (self.handlers.add)(filters, filter.clone())
        };
        self.filters_changed(ctx, Some(filter));
    }

    pub fn toggle_filters(&mut self, ctx: &ChartContext, filters: impl IntoIterator<Item = Filter>) {
        let mut current = std::mem::take(&mut self.filters);
        let mut last = None;
        for filter in filters {
            current = if (self.handlers.has)(&current, &filter) {
                (self.handlers.remove)(current, &filter)
            } else {
                (self.handlers.add)(current, filter.clone())
            };
            last = Some(filter);
        }
        self.filters = current;
        self.filters_changed(ctx, last);
    }

    /// Clears the filter list and installs `filter` as the only entry.
    pub fn replace_filter(&mut self, ctx: &ChartContext, filter: Filter) {
        let filters = (self.handlers.reset)(std::mem::take(&mut self.filters));
        self.filters = (self.handlers.add)(filters, filter.clone());
        self.filters_changed(ctx, Some(filter));
    }

    pub fn reset_filters(&mut self, ctx: &ChartContext) {
        self.filters = (self.handlers.reset)(std::mem::take(&mut self.filters));
        self.filters_changed(ctx, None);
    }

    fn filters_changed(&mut self, ctx: &ChartContext, changed: Option<Filter>) {
        self.apply_filters();
        self.surface.set_controls_visible(self.has_filters());
        self.emit_filtered(ctx, changed);
    }

    /// `Filtered` carries the filter value the change was made with, not the
    /// chart's primary filter; a reset carries `None`.
    fn emit_filtered(&self, ctx: &ChartContext, changed: Option<Filter>) {
        if self.listeners.is_empty() {
            return;
        }
        let payload = EventPayload {
            chart: self.anchor.clone(),
            group: self.group.clone(),
            kind: EventKind::Filtered,
            filter: changed,
        };
        self.listeners.emit(ctx, &payload);
    }

    /// Pushes the current filter list to the dimension: no filters clears
    /// it, a lone point filter becomes an exact constraint, a lone ranged
    /// filter a range constraint, anything else an any-of predicate.
    pub fn apply_filters(&self) {
        if let Some(dimension) = &self.dimension {
            (self.dispatch)(&mut *dimension.borrow_mut(), &self.filters);
        }
    }

    // --- lifecycle ---

    fn check_mandatory(&self) -> ChartResult<()> {
        if self.dimension.is_none() {
            return Err(ChartError::invalid_state(&self.anchor, "dimension"));
        }
        if self.data_group.is_none() {
            return Err(ChartError::invalid_state(&self.anchor, "group"));
        }
        Ok(())
    }

    pub fn begin_render(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        self.check_mandatory()?;
        self.emit(ctx, EventKind::PreRender);
        Ok(())
    }

    pub fn finish_render(&mut self, ctx: &ChartContext) {
        self.rendered = true;
        self.activate_renderlets(ctx, EventKind::PostRender);
    }

    pub fn begin_redraw(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        self.check_mandatory()?;
        self.emit(ctx, EventKind::PreRedraw);
        Ok(())
    }

    pub fn finish_redraw(&mut self, ctx: &ChartContext) {
        self.activate_renderlets(ctx, EventKind::PostRedraw);
    }

    /// `Pretransition` fires at once. With no transition configured, the
    /// renderlets and the post event follow immediately; otherwise they wait
    /// for [`BaseChart::complete_transition`], which the host calls when the
    /// animation settles.
    fn activate_renderlets(&mut self, ctx: &ChartContext, post: EventKind) {
        self.emit(ctx, EventKind::Pretransition);
        if self.transition_duration.is_zero() {
            self.emit(ctx, EventKind::Renderlet);
            self.emit(ctx, post);
        } else {
            self.pending_transition = Some(post);
        }
    }

    pub fn complete_transition(&mut self, ctx: &ChartContext) {
        if let Some(post) = self.pending_transition.take() {
            self.emit(ctx, EventKind::Renderlet);
            self.emit(ctx, post);
        }
    }

    #[must_use]
    pub fn has_pending_transition(&self) -> bool {
        self.pending_transition.is_some()
    }

    pub fn run_commit_handler(&mut self, mode: CommitMode) -> ChartResult<()> {
        match &mut self.commit_handler {
            Some(handler) => handler(mode),
            None => Ok(()),
        }
    }

    /// Default click reaction: toggle a point filter on the row's key and
    /// settle the group with a deferred redraw.
    pub fn on_click(&mut self, ctx: &ChartContext, row: &Row) {
        self.toggle_filter(ctx, Filter::point(row.key.clone()));
        self.defer_group_redraw(ctx);
    }

    /// Queues a commit-then-redraw of this chart's group behind the
    /// interaction settle delay. The closure re-resolves the chart by name
    /// when it fires, so a chart deregistered in the meantime is a no-op.
    pub fn defer_group_redraw(&self, ctx: &ChartContext) {
        let anchor = self.anchor.clone();
        let group = self.group.clone();
        ctx.defer(Box::new(move |ctx| {
            if let Some(chart) = ctx.find_chart(&anchor, Some(&group)) {
                let _ = ctx.redraw_group_for(&chart);
            }
        }));
    }

    pub fn emit(&self, ctx: &ChartContext, kind: EventKind) {
        if self.listeners.is_empty() {
            return;
        }
        let payload = EventPayload {
            chart: self.anchor.clone(),
            group: self.group.clone(),
            kind,
            filter: self.filters.first().cloned(),
        };
        self.listeners.emit(ctx, &payload);
    }
}

impl ChartLifecycle for BaseChart {
    fn anchor_name(&self) -> &str {
        &self.anchor
    }

    fn chart_group(&self) -> &str {
        &self.group
    }

    fn render(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        self.begin_render(ctx)?;
        self.apply_filters();
        self.finish_render(ctx);
        Ok(())
    }

    fn redraw(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        if !self.rendered {
            return self.render(ctx);
        }
        self.begin_redraw(ctx)?;
        self.finish_redraw(ctx);
        Ok(())
    }

    fn reset_all_filters(&mut self) {
        self.filters = (self.handlers.reset)(std::mem::take(&mut self.filters));
        self.apply_filters();
        self.surface.set_controls_visible(false);
    }

    fn replace_filter(&mut self, ctx: &ChartContext, filter: Option<Filter>) {
        match filter {
            Some(filter) => BaseChart::replace_filter(self, ctx, filter),
            None => self.reset_filters(ctx),
        }
    }

    fn commit(&mut self, mode: CommitMode) -> ChartResult<()> {
        self.run_commit_handler(mode)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{BaseChart, MIN_WIDTH};
    use crate::api::ChartContext;
    use crate::core::{Filter, Key, MemoryDimension, Row, StaticGroup};

    fn chart_with_data() -> (BaseChart, Rc<RefCell<MemoryDimension>>) {
        let mut chart = BaseChart::new("spend", "dash");
        let dimension = Rc::new(RefCell::new(MemoryDimension::new()));
        chart.set_dimension(dimension.clone());
        chart.set_group(StaticGroup::shared(vec![Row::new("a", 1.0)]));
        (chart, dimension)
    }

    #[test]
    fn toggling_the_same_filter_twice_clears_it() {
        let ctx = ChartContext::new();
        let (mut chart, _) = chart_with_data();
        let filter = Filter::point(Key::text("a"));

        chart.toggle_filter(&ctx, filter.clone());
        assert!(chart.has_filter(&filter));

        chart.toggle_filter(&ctx, filter.clone());
        assert!(!chart.has_filters());
    }

    #[test]
    fn replace_filter_leaves_exactly_one() {
        let ctx = ChartContext::new();
        let (mut chart, _) = chart_with_data();

        chart.toggle_filter(&ctx, Filter::point(Key::text("a")));
        chart.replace_filter(&ctx, Filter::point(Key::text("b")));

        assert_eq!(chart.filters().len(), 1);
        assert_eq!(chart.current_filter(), Some(&Filter::point(Key::text("b"))));
    }

    #[test]
    fn render_requires_dimension_and_group() {
        let ctx = ChartContext::new();
        let mut chart = BaseChart::new("orphan", "dash");
        let err = chart.begin_render(&ctx).unwrap_err();
        assert!(err.to_string().contains("dimension"));
    }

    #[test]
    fn width_falls_back_to_the_minimum() {
        let (chart, _) = chart_with_data();
        assert_eq!(chart.width(), MIN_WIDTH);
    }
}
