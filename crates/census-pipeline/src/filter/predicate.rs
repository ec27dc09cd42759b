//! Row predicates.
//!
//! A predicate sees the required fields of one row through [`Row`]. A null
//! field never satisfies a comparison.

use crate::config::FilterConfig;
use crate::dataset::Row;

/// A boolean condition over one row.
pub trait RowPredicate {
    fn matches(&self, row: &Row<'_>) -> bool;

    /// Both `self` and `other` must hold.
    fn and<P: RowPredicate>(self, other: P) -> And<Self, P>
    where
        Self: Sized,
    {
        And(self, other)
    }
}

/// `age > threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeAbove(pub i64);

impl RowPredicate for AgeAbove {
    fn matches(&self, row: &Row<'_>) -> bool {
        row.age.is_some_and(|age| age > self.0)
    }
}

/// `state == name`, compared exactly (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEquals(pub String);

impl StateEquals {
    pub fn new(state: impl Into<String>) -> Self {
        Self(state.into())
    }
}

impl RowPredicate for StateEquals {
    fn matches(&self, row: &Row<'_>) -> bool {
        row.state == Some(self.0.as_str())
    }
}

/// Conjunction of two predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct And<A, B>(pub A, pub B);

impl<A: RowPredicate, B: RowPredicate> RowPredicate for And<A, B> {
    fn matches(&self, row: &Row<'_>) -> bool {
        self.0.matches(row) && self.1.matches(row)
    }
}

/// Wraps a closure as a predicate.
pub struct FnPredicate<F>(pub F);

impl<F> RowPredicate for FnPredicate<F>
where
    F: Fn(&Row<'_>) -> bool,
{
    fn matches(&self, row: &Row<'_>) -> bool {
        (self.0)(row)
    }
}

impl<P: RowPredicate + ?Sized> RowPredicate for &P {
    fn matches(&self, row: &Row<'_>) -> bool {
        (**self).matches(row)
    }
}

/// The census predicate: `age > min_age AND state == state`.
pub fn census_predicate(config: &FilterConfig) -> And<AgeAbove, StateEquals> {
    AgeAbove(config.min_age).and(StateEquals::new(config.state.clone()))
}
