use serde::{Deserialize, Serialize};

use crate::core::Key;

/// Linear mapping between a numeric domain and a pixel range.
///
/// Degenerate or non-finite domains collapse to the range start instead of
/// raising; scale math is presentation logic and fails soft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    #[must_use]
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        self.domain
    }

    #[must_use]
    pub fn range(self) -> (f64, f64) {
        self.range
    }

    fn is_degenerate(self) -> bool {
        !self.domain.0.is_finite() || !self.domain.1.is_finite() || self.domain.0 == self.domain.1
    }

    #[must_use]
    pub fn scale(self, value: f64) -> f64 {
        if self.is_degenerate() || !value.is_finite() {
            return self.range.0;
        }
        let normalized = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + normalized * (self.range.1 - self.range.0)
    }

    #[must_use]
    pub fn invert(self, pixel: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if self.is_degenerate() || span == 0.0 || !pixel.is_finite() {
            return self.domain.0;
        }
        let normalized = (pixel - self.range.0) / span;
        self.domain.0 + normalized * (self.domain.1 - self.domain.0)
    }
}

/// Ordinal band layout with inner padding between bands and outer padding at
/// the range edges, both expressed as a fraction of the band step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandScale {
    domain: Vec<Key>,
    range: (f64, f64),
    inner_padding: f64,
    outer_padding: f64,
}

impl BandScale {
    #[must_use]
    pub fn new(domain: Vec<Key>, range: (f64, f64), inner_padding: f64, outer_padding: f64) -> Self {
        Self {
            domain,
            range,
            inner_padding: inner_padding.clamp(0.0, 1.0),
            outer_padding: outer_padding.max(0.0),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &[Key] {
        &self.domain
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        let count = self.domain.len() as f64;
        if self.domain.is_empty() {
            return 0.0;
        }
        let divisor = count - self.inner_padding + 2.0 * self.outer_padding;
        if divisor <= 0.0 {
            return 0.0;
        }
        (self.range.1 - self.range.0) / divisor
    }

    #[must_use]
    pub fn band_width(&self) -> f64 {
        self.step() * (1.0 - self.inner_padding)
    }

    /// Left edge of the band for a key, or `None` for keys outside the
    /// domain.
    #[must_use]
    pub fn position(&self, key: &Key) -> Option<f64> {
        let index = self.domain.iter().position(|candidate| candidate == key)?;
        let step = self.step();
        Some(self.range.0 + step * self.outer_padding + step * index as f64)
    }
}

/// Value-based range equality: both absent, or endpoints equal by value
/// (dates compare by timestamp through `Key` equality).
#[must_use]
pub fn ranges_equal(range1: Option<&(Key, Key)>, range2: Option<&(Key, Key)>) -> bool {
    match (range1, range2) {
        (None, None) => true,
        (Some(a), Some(b)) => a.0 == b.0 && a.1 == b.1,
        _ => false,
    }
}

/// Intersects a range with a constraint, endpoint by endpoint.
#[must_use]
pub fn constrain_range(range: (Key, Key), constraint: &(Key, Key)) -> (Key, Key) {
    let low = if range.0 < constraint.0 { constraint.0.clone() } else { range.0 };
    let high = if range.1 > constraint.1 { constraint.1.clone() } else { range.1 };
    (low, high)
}
