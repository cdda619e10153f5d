pub mod cap;
pub mod data;
pub mod filter;
pub mod key;
pub mod scale;
pub mod stack;

pub use cap::{CapPolicy, DEFAULT_OTHERS_LABEL, OthersGrouper};
pub use data::{
    AppliedConstraint, DataGroup, Dimension, MemoryDimension, NullSurface, RenderSurface, Row,
    SharedGroup, StaticGroup,
};
pub use filter::{Filter, FilterKind};
pub use key::{AxisPadding, Key};
pub use scale::{BandScale, LinearScale, constrain_range, ranges_equal};
pub use stack::{
    KeyAccessor, ShapedLayer, StackLayer, StackPoint, ValueAccessor, ordinal_x_domain,
    shape_layers, x_extent, y_extent,
};
