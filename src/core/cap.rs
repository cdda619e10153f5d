use std::rc::Rc;

use crate::core::{Key, Row};

pub const DEFAULT_OTHERS_LABEL: &str = "Others";

/// How rows beyond the cap are folded into the synthetic "others" row.
#[derive(Clone)]
pub enum OthersGrouper {
    /// Sum the remainder's values into one row labelled with the others
    /// label, recording the absorbed keys on it.
    Sum,
    /// Drop the remainder entirely.
    Disabled,
    /// Caller-supplied fold over the kept rows and the remainder.
    Custom(Rc<dyn Fn(Vec<Row>, Vec<Row>) -> Vec<Row>>),
}

impl std::fmt::Debug for OthersGrouper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sum => f.write_str("Sum"),
            Self::Disabled => f.write_str("Disabled"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Top-N capping applied on top of a group's ranked rows.
#[derive(Debug, Clone)]
pub struct CapPolicy {
    pub cap: Option<usize>,
    pub others_label: String,
    pub grouper: OthersGrouper,
}

impl Default for CapPolicy {
    fn default() -> Self {
        Self {
            cap: None,
            others_label: DEFAULT_OTHERS_LABEL.to_string(),
            grouper: OthersGrouper::Sum,
        }
    }
}

impl CapPolicy {
    #[must_use]
    pub fn capped(cap: usize) -> Self {
        Self {
            cap: Some(cap),
            ..Self::default()
        }
    }

    /// Applies the cap to rows already ranked highest-first. With no cap,
    /// or when the remainder is empty, the rows pass through unchanged.
    #[must_use]
    pub fn shape(&self, ranked: Vec<Row>) -> Vec<Row> {
        let Some(cap) = self.cap else {
            return ranked;
        };
        if ranked.len() <= cap {
            return ranked;
        }

        let mut kept = ranked;
        let rest = kept.split_off(cap);
        self.fold(kept, rest)
    }

    /// Folds the remainder into the kept rows per the grouper. A remainder
    /// that sums to zero produces no others row.
    #[must_use]
    pub fn fold(&self, mut kept: Vec<Row>, rest: Vec<Row>) -> Vec<Row> {
        if rest.is_empty() {
            return kept;
        }
        match &self.grouper {
            OthersGrouper::Disabled => kept,
            OthersGrouper::Custom(fold) => fold(kept, rest),
            OthersGrouper::Sum => {
                let total: f64 = rest.iter().map(|row| row.value).sum();
                if total == 0.0 {
                    return kept;
                }
                let absorbed: Vec<Key> = rest.into_iter().map(|row| row.key).collect();
                kept.push(Row::others(self.others_label.as_str(), total, absorbed));
                kept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CapPolicy, OthersGrouper};
    use crate::core::{Key, Row};

    fn ranked() -> Vec<Row> {
        vec![
            Row::new("a", 10.0),
            Row::new("b", 5.0),
            Row::new("c", 1.0),
        ]
    }

    #[test]
    fn remainder_folds_into_others_row() {
        let shaped = CapPolicy::capped(2).shape(ranked());

        assert_eq!(shaped.len(), 3);
        let others = &shaped[2];
        assert!(others.is_others());
        assert_eq!(others.key, Key::text("Others"));
        assert_eq!(others.value, 1.0);
        assert_eq!(others.absorbed, vec![Key::text("c")]);
    }

    #[test]
    fn no_synthetic_row_when_everything_fits() {
        let shaped = CapPolicy::capped(3).shape(ranked());
        assert_eq!(shaped.len(), 3);
        assert!(shaped.iter().all(|row| !row.is_others()));
    }

    #[test]
    fn zero_sum_remainder_produces_no_others_row() {
        let shaped = CapPolicy::capped(2).shape(vec![
            Row::new("a", 10.0),
            Row::new("b", 5.0),
            Row::new("c", 0.0),
        ]);

        assert_eq!(shaped.len(), 2);
        assert!(shaped.iter().all(|row| !row.is_others()));
    }

    #[test]
    fn disabled_grouper_drops_the_remainder() {
        let mut policy = CapPolicy::capped(1);
        policy.grouper = OthersGrouper::Disabled;
        let shaped = policy.shape(ranked());

        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].key, Key::text("a"));
    }

    #[test]
    fn uncapped_policy_passes_rows_through() {
        let shaped = CapPolicy::default().shape(ranked());
        assert_eq!(shaped, ranked());
    }
}
