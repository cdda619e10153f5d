pub mod base;
pub mod capped;
pub mod context;
pub mod events;
pub mod grid;
pub mod registry;

pub use base::{
    BaseChart, CommitHandler, FilterHandlers, LabelAccessor, MIN_HEIGHT, MIN_WIDTH,
    OrderingAccessor, SharedDimension,
};
pub use capped::CappedChart;
pub use context::{ChartContext, ChartLifecycle, CommitMode, DeferredAction};
pub use events::{EventKind, EventListeners, EventPayload, Listener};
pub use grid::{GridChart, Margins, PlotFrame, SharedGridChart, XScale, link_range_chart};
pub use registry::{ChartRegistry, DEFAULT_CHART_GROUP, SharedChart};
