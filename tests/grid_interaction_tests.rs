use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use linked_charts::api::{
    ChartContext, ChartLifecycle, CommitMode, EventKind, GridChart, SharedGridChart, XScale,
    link_range_chart,
};
use linked_charts::core::{Filter, Key, MemoryDimension, Row, StaticGroup};
use linked_charts::error::ChartResult;
use linked_charts::interaction::{EVENT_DELAY, ZoomBehavior};

fn grid(anchor: &str) -> GridChart {
    let mut chart = GridChart::new(anchor, "dash");
    chart
        .base_mut()
        .set_dimension(Rc::new(RefCell::new(MemoryDimension::new())));
    chart.set_group(
        StaticGroup::shared(vec![Row::new(10.0, 2.0), Row::new(50.0, 3.0)]),
        "total",
    );
    chart.set_x(XScale::quantitative(0.0, 100.0));
    chart
}

fn shared_grid(anchor: &str) -> SharedGridChart {
    Rc::new(RefCell::new(grid(anchor)))
}

struct CountingChart {
    anchor: String,
    redraws: Rc<RefCell<usize>>,
}

impl ChartLifecycle for CountingChart {
    fn anchor_name(&self) -> &str {
        &self.anchor
    }

    fn chart_group(&self) -> &str {
        "dash"
    }

    fn render(&mut self, _ctx: &ChartContext) -> ChartResult<()> {
        Ok(())
    }

    fn redraw(&mut self, _ctx: &ChartContext) -> ChartResult<()> {
        *self.redraws.borrow_mut() += 1;
        Ok(())
    }

    fn reset_all_filters(&mut self) {}

    fn commit(&mut self, _mode: CommitMode) -> ChartResult<()> {
        Ok(())
    }
}

#[test]
fn brushing_replaces_the_filter_with_the_extent() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    ctx.register(chart.clone(), Some("dash"));

    chart
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));
    ctx.pump(EVENT_DELAY);

    assert_eq!(
        chart.borrow().base().current_filter(),
        Some(&Filter::ranged(20.0, 60.0))
    );
}

#[test]
fn a_degenerate_brush_clears_the_filter() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    ctx.register(chart.clone(), Some("dash"));

    chart
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));
    ctx.pump(EVENT_DELAY);
    assert!(chart.borrow().base().has_filters());

    chart
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(30.0), Key::number(30.0))));
    ctx.pump(EVENT_DELAY);

    assert!(!chart.borrow().base().has_filters());
    assert!(chart.borrow().brush().is_empty());
}

#[test]
fn brush_rounding_snaps_the_extent() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    ctx.register(chart.clone(), Some("dash"));
    chart.borrow_mut().set_round(Rc::new(|key: &Key| {
        Key::number(key.as_f64().map_or(0.0, f64::round))
    }));

    chart
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(19.6), Key::number(60.2))));
    ctx.pump(EVENT_DELAY);

    assert_eq!(
        chart.borrow().base().current_filter(),
        Some(&Filter::ranged(20.0, 60.0))
    );
}

#[test]
fn a_brush_drag_refilters_once_per_settle_window() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    let filtered = Rc::new(Cell::new(0));
    let sink = filtered.clone();
    chart.borrow_mut().base_mut().on(
        EventKind::Filtered,
        Rc::new(move |_ctx, _payload| sink.set(sink.get() + 1)),
    );
    ctx.register(chart.clone(), Some("dash"));

    for high in [30.0, 40.0, 50.0] {
        chart
            .borrow_mut()
            .brush_to(&ctx, Some((Key::number(20.0), Key::number(high))));
    }
    assert_eq!(filtered.get(), 0);

    ctx.pump(EVENT_DELAY);

    assert_eq!(filtered.get(), 1);
    assert_eq!(
        chart.borrow().base().current_filter(),
        Some(&Filter::ranged(20.0, 50.0))
    );
}

#[test]
fn brushing_is_ignored_when_brushing_is_off() {
    let ctx = ChartContext::new();
    let mut chart = grid("trend");
    chart.set_brush_on(false);

    chart.brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));

    assert!(!chart.base().has_filters());
    assert!(!ctx.has_deferred());
}

#[test]
fn a_brush_burst_settles_into_one_group_redraw() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    let redraws = Rc::new(RefCell::new(0));
    let peer = Rc::new(RefCell::new(CountingChart {
        anchor: "peer".to_string(),
        redraws: redraws.clone(),
    }));
    ctx.register(chart.clone(), Some("dash"));
    ctx.register(peer, Some("dash"));

    for high in [30.0, 40.0, 50.0] {
        chart
            .borrow_mut()
            .brush_to(&ctx, Some((Key::number(20.0), Key::number(high))));
    }
    assert_eq!(*redraws.borrow(), 0);

    ctx.pump(EVENT_DELAY);

    assert_eq!(*redraws.borrow(), 1);
    assert_eq!(
        chart.borrow().base().current_filter(),
        Some(&Filter::ranged(20.0, 50.0))
    );
}

#[test]
fn zooming_is_constrained_to_the_original_domain() {
    let ctx = ChartContext::new();
    let mut chart = grid("trend");
    chart.set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        ..ZoomBehavior::default()
    });

    chart.zoom_to(&ctx, (Key::number(-10.0), Key::number(50.0)));

    assert!(chart.is_refocused());
    assert_eq!(
        chart.x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(0.0), Key::number(50.0)))
    );
    assert_eq!(
        chart.base().current_filter(),
        Some(&Filter::ranged(0.0, 50.0))
    );
}

#[test]
fn zooming_back_out_to_the_original_domain_clears_the_filter() {
    let ctx = ChartContext::new();
    let mut chart = grid("trend");
    chart.set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        ..ZoomBehavior::default()
    });

    chart.zoom_to(&ctx, (Key::number(20.0), Key::number(60.0)));
    chart.zoom_to(&ctx, (Key::number(0.0), Key::number(100.0)));

    assert!(!chart.is_refocused());
    assert!(!chart.base().has_filters());
}

#[test]
fn zoom_is_ignored_without_mouse_zoom() {
    let ctx = ChartContext::new();
    let mut chart = grid("trend");

    chart.zoom_to(&ctx, (Key::number(20.0), Key::number(60.0)));

    assert!(!chart.is_refocused());
    assert!(!chart.base().has_filters());
}

#[test]
fn brushing_the_range_chart_refocuses_the_focus_chart() {
    let ctx = ChartContext::new();
    let focus = shared_grid("focus");
    let range = shared_grid("range");
    ctx.register(focus.clone(), Some("dash"));
    ctx.register(range.clone(), Some("dash"));
    link_range_chart(&focus, &range).expect("link");

    range
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));
    ctx.pump(EVENT_DELAY);

    assert_eq!(
        focus.borrow().x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(20.0), Key::number(60.0)))
    );
    assert!(focus.borrow().is_refocused());
}

#[test]
fn the_focus_chart_filters_by_the_focused_domain() {
    let ctx = ChartContext::new();
    let focus = shared_grid("focus");
    let range = shared_grid("range");
    ctx.register(focus.clone(), Some("dash"));
    ctx.register(range.clone(), Some("dash"));
    link_range_chart(&focus, &range).expect("link");

    range
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));
    ctx.pump(EVENT_DELAY);

    // The focus chart's own dimension narrows to the visible domain.
    assert_eq!(
        focus.borrow().base().current_filter(),
        Some(&Filter::ranged(20.0, 60.0))
    );

    range.borrow_mut().brush_to(&ctx, None);
    ctx.pump(EVENT_DELAY);

    assert!(!focus.borrow().base().has_filters());
}

#[test]
fn clearing_the_range_brush_restores_the_focus_domain() {
    let ctx = ChartContext::new();
    let focus = shared_grid("focus");
    let range = shared_grid("range");
    ctx.register(focus.clone(), Some("dash"));
    ctx.register(range.clone(), Some("dash"));
    link_range_chart(&focus, &range).expect("link");

    range
        .borrow_mut()
        .brush_to(&ctx, Some((Key::number(20.0), Key::number(60.0))));
    ctx.pump(EVENT_DELAY);
    range.borrow_mut().brush_to(&ctx, None);
    ctx.pump(EVENT_DELAY);

    assert_eq!(
        focus.borrow().x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(0.0), Key::number(100.0)))
    );
    assert!(!focus.borrow().is_refocused());
}

#[test]
fn zooming_the_focus_chart_moves_the_range_brush() {
    let ctx = ChartContext::new();
    let focus = shared_grid("focus");
    let range = shared_grid("range");
    ctx.register(focus.clone(), Some("dash"));
    ctx.register(range.clone(), Some("dash"));
    link_range_chart(&focus, &range).expect("link");
    focus.borrow_mut().set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        ..ZoomBehavior::default()
    });

    focus
        .borrow_mut()
        .zoom_to(&ctx, (Key::number(30.0), Key::number(70.0)));

    let range = range.borrow();
    assert_eq!(
        range.base().current_filter(),
        Some(&Filter::ranged(30.0, 70.0))
    );
    assert_eq!(
        range.brush().extent,
        Some((Key::number(30.0), Key::number(70.0)))
    );
}

#[test]
fn zoom_span_is_clamped_by_the_scale_extent() {
    let ctx = ChartContext::new();
    let mut chart = grid("trend");
    chart.set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        scale_extent: (1.0, 4.0),
        ..ZoomBehavior::default()
    });

    // 4x magnification floor over a 100-wide domain: spans below 25 widen
    // around the gesture centre.
    chart.zoom_to(&ctx, (Key::number(40.0), Key::number(50.0)));

    assert_eq!(
        chart.x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(32.5), Key::number(57.5)))
    );
    assert_eq!(
        chart.base().current_filter(),
        Some(&Filter::ranged(32.5, 57.5))
    );
}

#[test]
fn zoom_cannot_escape_the_range_chart_domain() {
    let ctx = ChartContext::new();
    let focus = shared_grid("focus");
    let range = shared_grid("range");
    range.borrow_mut().set_x(XScale::quantitative(10.0, 90.0));
    ctx.register(focus.clone(), Some("dash"));
    ctx.register(range.clone(), Some("dash"));
    link_range_chart(&focus, &range).expect("link");
    focus.borrow_mut().set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        ..ZoomBehavior::default()
    });

    focus
        .borrow_mut()
        .zoom_to(&ctx, (Key::number(0.0), Key::number(100.0)));

    assert_eq!(
        focus.borrow().x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(10.0), Key::number(90.0)))
    );
}

#[test]
fn a_chart_cannot_be_its_own_range_chart() {
    let chart = shared_grid("trend");

    let err = link_range_chart(&chart, &chart).expect_err("self link");

    assert!(err.to_string().contains("range chart"));
}

#[test]
fn refocus_all_restores_every_original_domain() {
    let ctx = ChartContext::new();
    let chart = shared_grid("trend");
    ctx.register(chart.clone(), Some("dash"));
    chart.borrow_mut().set_zoom(ZoomBehavior {
        mouse_zoomable: true,
        ..ZoomBehavior::default()
    });
    chart
        .borrow_mut()
        .zoom_to(&ctx, (Key::number(20.0), Key::number(60.0)));

    ctx.refocus_all(Some("dash"));

    assert_eq!(
        chart.borrow().x().and_then(XScale::quantitative_domain),
        Some(&(Key::number(0.0), Key::number(100.0)))
    );
    assert!(!chart.borrow().is_refocused());
}

#[test]
fn zero_delay_defers_run_synchronously() {
    let ctx = ChartContext::new();
    let fired = Rc::new(RefCell::new(false));
    let sink = fired.clone();

    ctx.defer_after(Duration::ZERO, Box::new(move |_ctx| *sink.borrow_mut() = true));

    assert!(*fired.borrow());
    assert!(!ctx.has_deferred());
}
