//! Row filtering.
//!
//! [`filter`] keeps the rows a [`RowPredicate`] accepts, in their original
//! order, with every column.

mod predicate;

pub use predicate::{AgeAbove, And, FnPredicate, RowPredicate, StateEquals, census_predicate};

use crate::dataset::Dataset;
use crate::error::Result;
use polars::prelude::*;
use tracing::debug;

/// Keep exactly the rows for which `predicate` holds.
pub fn filter<P: RowPredicate + ?Sized>(dataset: &Dataset, predicate: &P) -> Result<Dataset> {
    let mask: BooleanChunked = dataset
        .rows()?
        .map(|row| predicate.matches(&row))
        .collect();

    let frame = dataset.frame().filter(&mask)?;
    debug!("Filter kept {} of {} rows", frame.height(), dataset.height());
    Ok(Dataset::from_derived_frame(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use pretty_assertions::assert_eq;

    fn census() -> Dataset {
        let frame = df![
            "name" => ["a", "b", "c", "d", "e"],
            "state" => ["Iowa", "Ohio", "Iowa", "Iowa", "Iowa"],
            "age" => [31i64, 45, 30, 52, 12],
            "weight" => [70.0, 80.0, 65.0, 90.0, 40.0],
        ]
        .unwrap();
        Dataset::new(frame).unwrap()
    }

    #[test]
    fn test_filter_keeps_matches_in_order() {
        let ds = census();
        let out = filter(&ds, &census_predicate(&FilterConfig::default())).unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(out.column_names(), ds.column_names());

        let names: Vec<Option<&str>> = out
            .frame()
            .column("name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(names, vec![Some("a"), Some("d")]);
    }

    #[test]
    fn test_filter_no_matches() {
        let ds = census();
        let out = filter(&ds, &StateEquals::new("Texas")).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.width(), 4);
    }

    #[test]
    fn test_filter_nulls_never_match() {
        let frame = df![
            "state" => [Some("Iowa"), None, Some("Iowa")],
            "age" => [None, Some(40i64), Some(40)],
            "weight" => [1.0, 2.0, 3.0],
        ]
        .unwrap();
        let ds = Dataset::new(frame).unwrap();

        let out = filter(&ds, &census_predicate(&FilterConfig::default())).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn test_filter_with_closure() {
        let ds = census();
        let heavy = FnPredicate(|r: &crate::dataset::Row<'_>| r.weight.is_some_and(|w| w > 75.0));
        let out = filter(&ds, &heavy).unwrap();
        assert_eq!(out.height(), 2);
    }
}
