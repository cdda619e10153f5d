use std::cell::RefCell;
use std::rc::{Rc, Weak};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::base::BaseChart;
use crate::api::events::EventKind;
use crate::api::{ChartContext, ChartLifecycle, CommitMode};
use crate::core::{
    AxisPadding, BandScale, Filter, Key, KeyAccessor, LinearScale, Row, ShapedLayer, SharedGroup,
    StackLayer, ValueAccessor, constrain_range, ordinal_x_domain, ranges_equal, shape_layers,
    x_extent, y_extent,
};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{BrushState, ZoomBehavior};

/// Space reserved around the plot area, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 50.0,
            bottom: 30.0,
            left: 30.0,
        }
    }
}

/// The x coordinate space: continuous over keys, or one band per key.
#[derive(Debug, Clone, PartialEq)]
pub enum XScale {
    Quantitative { domain: (Key, Key) },
    Ordinal { domain: Vec<Key> },
}

impl XScale {
    #[must_use]
    pub fn quantitative(low: impl Into<Key>, high: impl Into<Key>) -> Self {
        Self::Quantitative {
            domain: (low.into(), high.into()),
        }
    }

    #[must_use]
    pub fn ordinal(domain: Vec<Key>) -> Self {
        Self::Ordinal { domain }
    }

    #[must_use]
    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Ordinal { .. })
    }

    #[must_use]
    pub fn quantitative_domain(&self) -> Option<&(Key, Key)> {
        match self {
            Self::Quantitative { domain } => Some(domain),
            Self::Ordinal { .. } => None,
        }
    }
}

/// Rebuilds a key of `sample`'s kind at a numeric position.
fn key_at(sample: &Key, value: f64) -> Option<Key> {
    match sample {
        Key::Number(_) => Some(Key::number(value)),
        Key::Date(_) => Utc.timestamp_opt(value as i64, 0).single().map(Key::date),
        Key::Text(_) | Key::Pair(_) => None,
    }
}

type RoundFn = Rc<dyn Fn(&Key) -> Key>;
type PlotHook = Box<dyn FnMut(&ChartContext, &PlotFrame)>;
pub type SharedGridChart = Rc<RefCell<GridChart>>;

/// Everything a drawing backend needs for one render or redraw pass.
#[derive(Debug, Clone)]
pub struct PlotFrame {
    pub plot_width: f64,
    pub plot_height: f64,
    pub x: XScale,
    pub y_domain: (f64, f64),
    pub layers: Vec<ShapedLayer>,
    /// Set when the x domain changed since the previous pass, so the
    /// backend rebuilds axes instead of transitioning marks in place.
    pub resizing: bool,
}

/// Chart on a cartesian grid: stacked layers over a shared x scale, with
/// brush-to-filter and zoom-to-focus interaction and an optional linked
/// range chart driving the focus.
pub struct GridChart {
    base: BaseChart,
    margins: Margins,
    x: Option<XScale>,
    y_domain: Option<(f64, f64)>,
    elastic_x: bool,
    elastic_y: bool,
    x_padding: AxisPadding,
    y_padding: AxisPadding,
    round: Option<RoundFn>,
    brush: BrushState,
    brush_on: bool,
    zoom: ZoomBehavior,
    original_x_domain: Option<(Key, Key)>,
    last_x_domain: Option<XScale>,
    resizing: bool,
    refocused: bool,
    range_chart: Option<Weak<RefCell<GridChart>>>,
    layers: Vec<StackLayer>,
    key_accessor: KeyAccessor,
    value_accessor: ValueAccessor,
    plot_hook: Option<PlotHook>,
}

impl GridChart {
    #[must_use]
    pub fn new(anchor: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            base: BaseChart::new(anchor, group),
            margins: Margins::default(),
            x: None,
            y_domain: None,
            elastic_x: false,
            elastic_y: false,
            x_padding: AxisPadding::None,
            y_padding: AxisPadding::None,
            round: None,
            brush: BrushState::default(),
            brush_on: true,
            zoom: ZoomBehavior::default(),
            original_x_domain: None,
            last_x_domain: None,
            resizing: false,
            refocused: false,
            range_chart: None,
            layers: Vec::new(),
            key_accessor: Rc::new(|row: &Row| row.key.clone()),
            value_accessor: Rc::new(|row: &Row| row.value),
            plot_hook: None,
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

    pub fn set_margins(&mut self, margins: Margins) {
        self.margins = margins;
    }

    #[must_use]
    pub fn margins(&self) -> Margins {
        self.margins
    }

    #[must_use]
    pub fn plot_width(&self) -> f64 {
        (self.base.width() - self.margins.left - self.margins.right).max(0.0)
    }

    #[must_use]
    pub fn plot_height(&self) -> f64 {
        (self.base.height() - self.margins.top - self.margins.bottom).max(0.0)
    }

    pub fn set_x(&mut self, x: XScale) {
        self.original_x_domain = x.quantitative_domain().cloned();
        self.x = Some(x);
        self.rescale();
    }

    #[must_use]
    pub fn x(&self) -> Option<&XScale> {
        self.x.as_ref()
    }

    #[must_use]
    pub fn x_original_domain(&self) -> Option<&(Key, Key)> {
        self.original_x_domain.as_ref()
    }

    pub fn set_y_domain(&mut self, domain: (f64, f64)) {
        self.y_domain = Some(domain);
        self.rescale();
    }

    pub fn set_elastic_x(&mut self, elastic: bool) {
        self.elastic_x = elastic;
    }

    pub fn set_elastic_y(&mut self, elastic: bool) {
        self.elastic_y = elastic;
    }

    pub fn set_x_padding(&mut self, padding: AxisPadding) {
        self.x_padding = padding;
    }

    pub fn set_y_padding(&mut self, padding: AxisPadding) {
        self.y_padding = padding;
    }

    pub fn set_round(&mut self, round: RoundFn) {
        self.round = Some(round);
    }

    pub fn set_brush_on(&mut self, on: bool) {
        self.brush_on = on;
    }

    #[must_use]
    pub fn brush(&self) -> &BrushState {
        &self.brush
    }

    pub fn set_zoom(&mut self, zoom: ZoomBehavior) {
        self.zoom = zoom;
    }

    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.resizing
    }

    #[must_use]
    pub fn is_refocused(&self) -> bool {
        self.refocused
    }

    /// Forces scale-dependent state to rebuild on the next pass.
    pub fn rescale(&mut self) {
        self.resizing = true;
    }

    pub fn set_plot_hook(&mut self, hook: PlotHook) {
        self.plot_hook = Some(hook);
    }

    pub fn set_key_accessor(&mut self, accessor: KeyAccessor) {
        self.key_accessor = accessor;
    }

    pub fn set_value_accessor(&mut self, accessor: ValueAccessor) {
        self.value_accessor = accessor;
    }

    // --- stacked layers ---

    /// Binds the base data group and resets the stack to that single layer.
    pub fn set_group(&mut self, group: SharedGroup, name: impl Into<String>) {
        self.base.set_group(group.clone());
        self.layers = vec![StackLayer::new(name, group)];
    }

    /// Appends a layer on top of the existing stack.
    pub fn stack(&mut self, name: impl Into<String>, group: SharedGroup) {
        self.layers.push(StackLayer::new(name, group));
    }

    pub fn stack_with_accessor(
        &mut self,
        name: impl Into<String>,
        group: SharedGroup,
        accessor: ValueAccessor,
    ) {
        self.layers
            .push(StackLayer::new(name, group).with_accessor(accessor));
    }

    /// Hidden layers stay registered but drop out of shaping and extents.
    pub fn hide_stack(&mut self, name: &str) {
        self.set_stack_hidden(name, true);
    }

    pub fn show_stack(&mut self, name: &str) {
        self.set_stack_hidden(name, false);
    }

    fn set_stack_hidden(&mut self, name: &str, hidden: bool) {
        for layer in &mut self.layers {
            if layer.name == name {
                layer.hidden = hidden;
            }
        }
    }

    #[must_use]
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name.as_str()).collect()
    }

    /// Stacks the visible layers. Points outside a fixed quantitative
    /// domain are clipped out; ordinal and elastic axes keep everything.
    #[must_use]
    pub fn shaped_layers(&self) -> Vec<ShapedLayer> {
        let domain_filter: Option<Filter> = match &self.x {
            Some(XScale::Quantitative { domain }) if !self.elastic_x => {
                Some(Filter::ranged(domain.0.clone(), domain.1.clone()))
            }
            _ => None,
        };
        let predicate = domain_filter.map(|filter| move |key: &Key| filter.is_filtered(key));
        shape_layers(
            &self.layers,
            &self.key_accessor,
            &self.value_accessor,
            predicate
                .as_ref()
                .map(|predicate| predicate as &dyn Fn(&Key) -> bool),
        )
    }

    // --- domain preparation ---

    fn prepare_x(&mut self, shaped: &[ShapedLayer], render_pass: bool) -> ChartResult<XScale> {
        let mut x = self
            .x
            .clone()
            .ok_or_else(|| ChartError::invalid_state(self.base.anchor_name(), "x"))?;

        match &mut x {
            XScale::Ordinal { domain } => {
                if self.elastic_x || domain.is_empty() {
                    *domain = ordinal_x_domain(shaped);
                }
            }
            XScale::Quantitative { domain } => {
                if self.elastic_x {
                    if let Some(extent) = x_extent(shaped, self.x_padding) {
                        *domain = extent;
                    }
                }
            }
        }

        if render_pass || self.last_x_domain.as_ref() != Some(&x) {
            self.rescale();
        }
        self.last_x_domain = Some(x.clone());
        self.x = Some(x.clone());
        Ok(x)
    }

    fn prepare_y(&mut self, shaped: &[ShapedLayer]) -> (f64, f64) {
        if self.elastic_y || self.y_domain.is_none() {
            let domain = y_extent(shaped, self.y_padding).unwrap_or((0.0, 1.0));
            self.y_domain = Some(domain);
        }
        self.y_domain.unwrap_or((0.0, 1.0))
    }

    fn run_pass(&mut self, ctx: &ChartContext, render_pass: bool) -> ChartResult<()> {
        let shaped = self.shaped_layers();
        let x = self.prepare_x(&shaped, render_pass)?;
        if self.original_x_domain.is_none() {
            self.original_x_domain = x.quantitative_domain().cloned();
        }
        let y_domain = self.prepare_y(&shaped);

        let frame = PlotFrame {
            plot_width: self.plot_width(),
            plot_height: self.plot_height(),
            x,
            y_domain,
            layers: shaped,
            resizing: self.resizing,
        };
        if let Some(hook) = &mut self.plot_hook {
            hook(ctx, &frame);
        }
        self.resizing = false;
        Ok(())
    }

    /// Pixel scale over the current x domain and plot width.
    #[must_use]
    pub fn x_linear_scale(&self) -> Option<LinearScale> {
        let domain = self.x.as_ref()?.quantitative_domain()?;
        Some(LinearScale::new(
            (domain.0.as_f64()?, domain.1.as_f64()?),
            (0.0, self.plot_width()),
        ))
    }

    /// Band scale over the current ordinal domain and plot width.
    #[must_use]
    pub fn x_band_scale(&self) -> Option<BandScale> {
        match self.x.as_ref()? {
            XScale::Ordinal { domain } => Some(BandScale::new(
                domain.clone(),
                (0.0, self.plot_width()),
                0.0,
                0.5,
            )),
            XScale::Quantitative { .. } => None,
        }
    }

    // --- brushing ---

    /// Moves the brush. A degenerate or absent extent clears the chart's
    /// filter; anything else replaces it with the rounded range. The brush
    /// extent updates at once, but the filter replacement and the group
    /// redraw both wait out the settle delay, so a drag burst refilters the
    /// dimension once. The deferred closure re-resolves the chart by name,
    /// like the click path.
    pub fn brush_to(&mut self, ctx: &ChartContext, extent: Option<(Key, Key)>) {
        if !self.brush_on {
            return;
        }
        let extent = extent.map(|(low, high)| match &self.round {
            Some(round) => (round(&low), round(&high)),
            None => (low, high),
        });
        self.brush.extent = extent;

        let filter = (!self.brush.is_empty())
            .then(|| self.brush.extent.clone())
            .flatten()
            .map(|(low, high)| Filter::ranged(low, high));
        let anchor = self.base.anchor_name().to_string();
        let group = self.base.chart_group().to_string();
        ctx.defer(Box::new(move |ctx| {
            if let Some(chart) = ctx.find_chart(&anchor, Some(&group)) {
                chart.borrow_mut().replace_filter(ctx, filter);
                let _ = ctx.redraw_group_for(&chart);
            }
        }));
    }

    /// Replaces or clears this chart's filter, keeping the brush extent in
    /// step so an externally applied ranged filter shows up as a brush.
    pub fn replace_filter(&mut self, ctx: &ChartContext, filter: Option<Filter>) {
        self.brush.extent = filter
            .as_ref()
            .and_then(Filter::as_ranged)
            .map(|(low, high)| (low.clone(), high.clone()));
        match filter {
            Some(filter) => self.base.replace_filter(ctx, filter),
            None => self.base.reset_filters(ctx),
        }
    }

    pub fn begin_brush(&mut self) {
        if self.brush_on {
            self.brush.dragging = true;
        }
    }

    pub fn end_brush(&mut self) {
        self.brush.dragging = false;
    }

    // --- focus and zoom ---

    /// Restricts the visible x domain to `range`, or restores the original
    /// domain when `None`. The chart's own filter follows the new visible
    /// domain, so its dimension narrows too, and a linked range chart's
    /// brush and filter follow unless they already match.
    pub fn focus(&mut self, ctx: &ChartContext, range: Option<(Key, Key)>) {
        let Some(original) = self.original_x_domain.clone() else {
            return;
        };
        let target = match range {
            Some(range) if self.zoom.zoom_out_restrict => constrain_range(range, &original),
            Some(range) => range,
            None => original,
        };
        self.refocused = !ranges_equal(Some(&target), self.original_x_domain.as_ref());
        self.x = Some(XScale::Quantitative {
            domain: target.clone(),
        });
        self.rescale();
        if self.refocused {
            self.base
                .replace_filter(ctx, Filter::ranged(target.0.clone(), target.1.clone()));
            self.sync_range_chart(ctx, Some(target));
        } else {
            self.base.reset_filters(ctx);
            self.sync_range_chart(ctx, None);
        }
        self.base.emit(ctx, EventKind::Zoomed);
    }

    /// Zoom gesture entry point: adopt the gestured domain, mirror it into
    /// this chart's own ranged filter, sync the linked range chart and
    /// settle the group with one deferred redraw.
    pub fn zoom_to(&mut self, ctx: &ChartContext, domain: (Key, Key)) {
        if !self.zoom.mouse_zoomable {
            return;
        }
        let domain = self.clamp_zoom_span(domain);
        // A linked range chart bounds the zoom tighter than the original
        // domain: the focus can never show more than the range chart does.
        let bound = if self.zoom.zoom_out_restrict {
            self.range_chart_domain()
                .or_else(|| self.original_x_domain.clone())
        } else {
            None
        };
        let domain = match bound {
            Some(bound) => constrain_range(domain, &bound),
            None => domain,
        };
        self.refocused = !ranges_equal(Some(&domain), self.original_x_domain.as_ref());
        self.x = Some(XScale::Quantitative {
            domain: domain.clone(),
        });
        self.rescale();

        if self.refocused {
            self.base
                .replace_filter(ctx, Filter::ranged(domain.0.clone(), domain.1.clone()));
            self.sync_range_chart(ctx, Some(domain));
        } else {
            self.base.reset_filters(ctx);
            self.sync_range_chart(ctx, None);
        }
        self.base.emit(ctx, EventKind::Zoomed);
        self.base.defer_group_redraw(ctx);
    }

    /// Clamps the gestured span to the zoom scale extent, measured against
    /// the original domain's span, keeping the gesture centre fixed.
    /// Domains without a numeric projection pass through unclamped.
    fn clamp_zoom_span(&self, domain: (Key, Key)) -> (Key, Key) {
        let Some(original_span) = self
            .original_x_domain
            .as_ref()
            .and_then(|(low, high)| Some(high.as_f64()? - low.as_f64()?))
        else {
            return domain;
        };
        let (Some(low), Some(high)) = (domain.0.as_f64(), domain.1.as_f64()) else {
            return domain;
        };
        if original_span <= 0.0 {
            return domain;
        }
        let (min_scale, max_scale) = self.zoom.scale_extent;
        let min_span = if max_scale.is_finite() && max_scale > 0.0 {
            original_span / max_scale
        } else {
            0.0
        };
        let max_span = if min_scale > 0.0 {
            original_span / min_scale
        } else {
            f64::INFINITY
        };
        let span = high - low;
        let clamped = span.clamp(min_span, max_span.max(min_span));
        if clamped == span {
            return domain;
        }
        let center = (low + high) / 2.0;
        match (
            key_at(&domain.0, center - clamped / 2.0),
            key_at(&domain.1, center + clamped / 2.0),
        ) {
            (Some(low), Some(high)) => (low, high),
            _ => domain,
        }
    }

    fn range_chart_domain(&self) -> Option<(Key, Key)> {
        let range_chart = self.range_chart.as_ref()?.upgrade()?;
        let range_chart = range_chart.try_borrow().ok()?;
        range_chart.x.as_ref()?.quantitative_domain().cloned()
    }

    fn sync_range_chart(&self, ctx: &ChartContext, range: Option<(Key, Key)>) {
        let Some(weak) = &self.range_chart else {
            return;
        };
        let Some(range_chart) = weak.upgrade() else {
            return;
        };
        let Ok(mut range_chart) = range_chart.try_borrow_mut() else {
            warn!(target: "linked_charts::grid", "range chart busy, focus sync skipped");
            return;
        };
        let current = range_chart
            .base
            .current_filter()
            .and_then(Filter::as_ranged)
            .map(|(low, high)| (low.clone(), high.clone()));
        if ranges_equal(current.as_ref(), range.as_ref()) {
            return;
        }
        range_chart.replace_filter(ctx, range.map(|(low, high)| Filter::ranged(low, high)));
    }

    /// Whether the backend must rebuild axes this pass instead of
    /// transitioning marks in place.
    #[must_use]
    pub fn needs_axis_redraw(&self, render_pass: bool) -> bool {
        render_pass || self.elastic_x || self.elastic_y || self.resizing
    }
}

/// Ties a focus chart to the range chart that drives it: brushing the range
/// chart refocuses the focus chart once the gesture settles, and zooming
/// the focus chart moves the range chart's brush.
///
/// A chart cannot drive itself.
pub fn link_range_chart(focus: &SharedGridChart, range: &SharedGridChart) -> ChartResult<()> {
    if Rc::ptr_eq(focus, range) {
        return Err(ChartError::BadArgument(
            "a chart cannot be its own range chart".into(),
        ));
    }
    focus.borrow_mut().range_chart = Some(Rc::downgrade(range));

    let focus_weak = Rc::downgrade(focus);
    range
        .borrow_mut()
        .base_mut()
        .on(
            EventKind::Filtered,
            Rc::new(move |ctx: &ChartContext, payload| {
                let range = payload
                    .filter
                    .as_ref()
                    .and_then(Filter::as_ranged)
                    .map(|(low, high)| (low.clone(), high.clone()));
                let focus_weak = focus_weak.clone();
                // Runs at once: a zero delay executes synchronously, so the
                // refocus cannot be displaced by the gesture's own deferred
                // group redraw.
                ctx.defer_after(std::time::Duration::ZERO, Box::new(move |ctx| {
                    let Some(focus) = focus_weak.upgrade() else {
                        return;
                    };
                    let Ok(mut focus) = focus.try_borrow_mut() else {
                        warn!(target: "linked_charts::grid", "focus chart busy, refocus skipped");
                        return;
                    };
                    focus.focus(ctx, range);
                    let _ = ChartLifecycle::redraw(&mut *focus, ctx);
                }));
            }),
        );
    Ok(())
}

impl ChartLifecycle for GridChart {
    fn anchor_name(&self) -> &str {
        self.base.anchor_name()
    }

    fn chart_group(&self) -> &str {
        self.base.chart_group()
    }

    fn render(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        self.base.begin_render(ctx)?;
        self.base.apply_filters();
        self.run_pass(ctx, true)?;
        self.base.finish_render(ctx);
        Ok(())
    }

    fn redraw(&mut self, ctx: &ChartContext) -> ChartResult<()> {
        if !self.base.has_rendered() {
            return self.render(ctx);
        }
        self.base.begin_redraw(ctx)?;
        self.run_pass(ctx, false)?;
        self.base.finish_redraw(ctx);
        Ok(())
    }

    fn reset_all_filters(&mut self) {
        self.brush.extent = None;
        self.brush.dragging = false;
        self.base.reset_all_filters();
    }

    fn replace_filter(&mut self, ctx: &ChartContext, filter: Option<Filter>) {
        GridChart::replace_filter(self, ctx, filter);
    }

    fn commit(&mut self, mode: CommitMode) -> ChartResult<()> {
        self.base.run_commit_handler(mode)
    }

    fn defocus(&mut self) {
        if let Some(original) = self.original_x_domain.clone() {
            self.x = Some(XScale::Quantitative { domain: original });
            self.refocused = false;
            self.rescale();
        }
    }
}
