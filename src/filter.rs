use polars::prelude::*;

use crate::error::DashError;
use crate::schema::order;

/// User-selected constraints on the sales table.
///
/// The three value lists are treated as sets: a row passes only if its
/// region, segment and ship mode are all members. Values absent from the
/// data are legal and simply match nothing; an empty list matches nothing
/// at all. `year: None` means no year constraint.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub year: Option<i32>,
    pub regions: Vec<String>,
    pub segments: Vec<String>,
    pub ship_modes: Vec<String>,
}

impl FilterSelection {
    /// Selection that excludes nothing: every distinct value of each
    /// multi-select column, no year constraint. This is the "untouched
    /// sidebar" default.
    pub fn select_all(table: &DataFrame) -> Result<Self, DashError> {
        Ok(Self {
            year: None,
            regions: distinct_strings(table, order::REGION)?,
            segments: distinct_strings(table, order::SEGMENT)?,
            ship_modes: distinct_strings(table, order::SHIP_MODE)?,
        })
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

/// Apply a selection to the table, producing the filtered view.
///
/// Pure conjunction of the year constraint (if any) and set membership on
/// region, segment and ship mode. Row order is preserved. An empty result
/// is valid output, not an error; callers that need a non-empty view check
/// afterwards.
pub fn apply_selection(
    table: &DataFrame,
    selection: &FilterSelection,
) -> Result<DataFrame, DashError> {
    let mut lazy = table.clone().lazy();

    if let Some(year) = selection.year {
        // year_month is 100 * year + month, so a calendar year is one
        // contiguous code range
        lazy = lazy.filter(
            col(order::ORDER_YEAR_MONTH)
                .gt_eq(lit(year * 100 + 1))
                .and(col(order::ORDER_YEAR_MONTH).lt_eq(lit(year * 100 + 12))),
        );
    }

    let df = lazy
        .filter(membership(order::REGION, &selection.regions))
        .filter(membership(order::SEGMENT, &selection.segments))
        .filter(membership(order::SHIP_MODE, &selection.ship_modes))
        .collect()?;

    Ok(df)
}

fn membership(column: &str, values: &[String]) -> Expr {
    let allowed = Series::new(column.into(), values.to_vec());
    col(column).is_in(lit(allowed), false)
}

/// Sorted distinct values of a string column.
pub(crate) fn distinct_strings(df: &DataFrame, column: &str) -> Result<Vec<String>, DashError> {
    let values: std::collections::BTreeSet<String> = df
        .column(column)?
        .as_materialized_series()
        .str()?
        .into_iter()
        .filter_map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> DataFrame {
        df!(
            order::ORDER_YEAR_MONTH => [202301i32, 202304, 202304, 202411],
            order::REGION => ["East", "West", "East", "South"],
            order::SEGMENT => ["Consumer", "Corporate", "Consumer", "Consumer"],
            order::SHIP_MODE => ["Standard", "Express", "Standard", "Standard"],
            order::SUB_CATEGORY => ["Chairs", "Phones", "Tables", "Chairs"],
            order::SALES => [100.0, 200.0, 50.0, 75.0],
            order::PROFIT => [20.0, 50.0, -5.0, 10.0],
        )
        .unwrap()
    }

    #[test]
    fn select_all_returns_full_table_in_order() {
        let table = sample_table();
        let selection = FilterSelection::select_all(&table).unwrap();
        let view = apply_selection(&table, &selection).unwrap();
        assert!(view.equals(&table));
    }

    #[test]
    fn conjunction_keeps_only_matching_rows() {
        let table = sample_table();
        let selection = FilterSelection {
            year: None,
            regions: vec!["East".into()],
            segments: vec!["Consumer".into()],
            ship_modes: vec!["Standard".into()],
        };
        let view = apply_selection(&table, &selection).unwrap();
        assert_eq!(view.height(), 2);
        let regions = distinct_strings(&view, order::REGION).unwrap();
        assert_eq!(regions, vec!["East".to_string()]);
    }

    #[test]
    fn year_constraint_narrows_by_calendar_year() {
        let table = sample_table();
        let selection = FilterSelection::select_all(&table).unwrap().with_year(2023);
        let view = apply_selection(&table, &selection).unwrap();
        assert_eq!(view.height(), 3);
        let codes: Vec<i32> = view
            .column(order::ORDER_YEAR_MONTH)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert!(codes.iter().all(|c| (202301..=202312).contains(c)));
    }

    #[test]
    fn empty_set_yields_empty_view() {
        let table = sample_table();
        let mut selection = FilterSelection::select_all(&table).unwrap();
        selection.ship_modes.clear();
        let view = apply_selection(&table, &selection).unwrap();
        assert_eq!(view.height(), 0);
    }

    #[test]
    fn unknown_value_matches_no_rows() {
        let table = sample_table();
        let mut selection = FilterSelection::select_all(&table).unwrap();
        selection.regions = vec!["Atlantis".into()];
        let view = apply_selection(&table, &selection).unwrap();
        assert_eq!(view.height(), 0);
    }

    #[test]
    fn distinct_strings_are_sorted_and_unique() {
        let table = sample_table();
        let regions = distinct_strings(&table, order::REGION).unwrap();
        assert_eq!(
            regions,
            vec!["East".to_string(), "South".to_string(), "West".to_string()]
        );
    }
}
