//! linked-charts: cross-filtering coordination core for linked chart groups.
//!
//! This crate provides the rendering-agnostic half of a dimensional-charting
//! stack: filter shapes and their predicate semantics, a chart registry with
//! group-wide render/redraw broadcasts, a deterministic interaction throttle,
//! and the domain/brush/zoom state machine of coordinate-grid charts. Drawing
//! backends plug in through [`core::RenderSurface`] and the grid chart's plot
//! hook.

pub mod api;
pub mod core;
pub mod error;
pub mod interaction;
pub mod telemetry;

pub use api::{BaseChart, CappedChart, ChartContext, ChartLifecycle, GridChart};
pub use core::{Filter, Key, Row};
pub use error::{ChartError, ChartResult};
