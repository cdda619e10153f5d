use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::api::ChartContext;
use crate::core::Filter;

/// Lifecycle and interaction notifications a chart emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    PreRender,
    PostRender,
    PreRedraw,
    PostRedraw,
    Filtered,
    Zoomed,
    /// Fires as soon as a pass's data and domains are final, before any
    /// transition completes.
    Pretransition,
    Renderlet,
}

/// What a listener learns about the emitting chart. The chart itself is
/// mutably borrowed while listeners run, so listeners reach other charts
/// through the context, never back into the emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub chart: String,
    pub group: String,
    pub kind: EventKind,
    /// For `Filtered`, the filter value the change was made with (`None` on
    /// a reset); for other events, the chart's primary filter.
    pub filter: Option<Filter>,
}

pub type Listener = Rc<dyn Fn(&ChartContext, &EventPayload)>;

/// Per-chart listener table keyed by event kind. Charts rarely carry more
/// than a handful of listeners, so they live inline.
#[derive(Default, Clone)]
pub struct EventListeners {
    entries: SmallVec<[(EventKind, Listener); 4]>,
}

impl EventListeners {
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.entries.push((kind, listener));
    }

    pub fn emit(&self, ctx: &ChartContext, payload: &EventPayload) {
        for (kind, listener) in &self.entries {
            if *kind == payload.kind {
                listener(ctx, payload);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.entries.len())
            .finish()
    }
}
