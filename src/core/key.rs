use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Dimension key value.
///
/// Keys are compared, hashed, and ordered by value; dates compare by
/// timestamp. `Pair` carries the two-dimensional keys used by rectangular
/// brushing and cell-level filtering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Number(OrderedFloat<f64>),
    Text(String),
    Date(DateTime<Utc>),
    Pair(Box<(Key, Key)>),
}

impl Key {
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(OrderedFloat(value))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn date(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }

    #[must_use]
    pub fn pair(x: Key, y: Key) -> Self {
        Self::Pair(Box::new((x, y)))
    }

    /// Numeric projection used by scales: numbers pass through, dates map to
    /// unix seconds. Text and pair keys have no quantitative position.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value.into_inner()),
            Self::Date(value) => Some(value.timestamp() as f64),
            Self::Text(_) | Self::Pair(_) => None,
        }
    }

    #[must_use]
    pub fn as_pair(&self) -> Option<(&Key, &Key)> {
        match self {
            Self::Pair(pair) => Some((&pair.0, &pair.1)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self.as_f64() {
            Some(value) => value.is_finite(),
            None => true,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Self::Pair(pair) => write!(f, "[{},{}]", pair.0, pair.1),
        }
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key::number(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::text(value)
    }
}

impl From<DateTime<Utc>> for Key {
    fn from(value: DateTime<Utc>) -> Self {
        Key::date(value)
    }
}

/// Padding applied to an elastic axis bound.
///
/// Percent padding scales a numeric bound multiplicatively, raising upper
/// bounds and lowering lower ones; on a date bound both forms are
/// interpreted as a whole-day offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum AxisPadding {
    #[default]
    None,
    Absolute(f64),
    Percent(f64),
}

impl AxisPadding {
    fn day_count(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Absolute(days) | Self::Percent(days) => days as i64,
        }
    }
}

impl Key {
    /// Widens an upper bound by the padding amount.
    #[must_use]
    pub fn pad_upper(&self, padding: AxisPadding) -> Key {
        match (self, padding) {
            (_, AxisPadding::None) => self.clone(),
            (Self::Number(value), AxisPadding::Absolute(amount)) => {
                Key::number(value.into_inner() + amount)
            }
            (Self::Number(value), AxisPadding::Percent(percent)) => {
                let value = value.into_inner();
                let fraction = percent / 100.0;
                if value > 0.0 {
                    Key::number(value * (1.0 + fraction))
                } else {
                    Key::number(value * (1.0 - fraction))
                }
            }
            (Self::Date(value), _) => Key::date(*value + ChronoDuration::days(padding.day_count())),
            (Self::Text(_) | Self::Pair(_), _) => self.clone(),
        }
    }

    /// Widens a lower bound by the padding amount.
    #[must_use]
    pub fn pad_lower(&self, padding: AxisPadding) -> Key {
        match (self, padding) {
            (_, AxisPadding::None) => self.clone(),
            (Self::Number(value), AxisPadding::Absolute(amount)) => {
                Key::number(value.into_inner() - amount)
            }
            (Self::Number(value), AxisPadding::Percent(percent)) => {
                let value = value.into_inner();
                let fraction = percent / 100.0;
                if value > 0.0 {
                    Key::number(value * (1.0 - fraction))
                } else {
                    Key::number(value * (1.0 + fraction))
                }
            }
            (Self::Date(value), _) => Key::date(*value - ChronoDuration::days(padding.day_count())),
            (Self::Text(_) | Self::Pair(_), _) => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AxisPadding, Key};
    use chrono::{TimeZone, Utc};

    #[test]
    fn keys_compare_by_value() {
        assert_eq!(Key::number(3.0), Key::number(3.0));
        assert!(Key::number(2.0) < Key::number(5.0));
        assert_eq!(Key::pair(Key::number(1.0), Key::text("a")), Key::pair(Key::number(1.0), Key::text("a")));
    }

    #[test]
    fn percent_padding_widens_each_bound_outward() {
        assert_eq!(Key::number(100.0).pad_upper(AxisPadding::Percent(10.0)), Key::number(110.0));
        assert_eq!(Key::number(-100.0).pad_upper(AxisPadding::Percent(10.0)), Key::number(-90.0));
        assert_eq!(Key::number(-100.0).pad_lower(AxisPadding::Percent(10.0)), Key::number(-110.0));
        assert_eq!(Key::number(100.0).pad_lower(AxisPadding::Percent(10.0)), Key::number(90.0));
    }

    #[test]
    fn date_padding_is_a_day_count() {
        let day = Utc.with_ymd_and_hms(2016, 3, 10, 0, 0, 0).unwrap();
        let padded = Key::date(day).pad_upper(AxisPadding::Absolute(2.0));
        assert_eq!(padded, Key::date(Utc.with_ymd_and_hms(2016, 3, 12, 0, 0, 0).unwrap()));

        let padded = Key::date(day).pad_lower(AxisPadding::Percent(3.0));
        assert_eq!(padded, Key::date(Utc.with_ymd_and_hms(2016, 3, 7, 0, 0, 0).unwrap()));
    }
}
