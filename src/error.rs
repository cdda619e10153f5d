use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    /// A mandatory binding was missing when a render or redraw was requested.
    #[error("mandatory attribute `{attribute}` is missing on chart [#{chart}]")]
    InvalidState { chart: String, attribute: String },

    /// Configuration-time misuse, fatal at the call site.
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Failure reported by an application commit handler before a group
    /// render/redraw. Recovered locally: logged, broadcast skipped.
    #[error("commit handler failed: {0}")]
    Commit(String),
}

impl ChartError {
    pub(crate) fn invalid_state(chart: &str, attribute: &str) -> Self {
        Self::InvalidState {
            chart: chart.to_owned(),
            attribute: attribute.to_owned(),
        }
    }
}
