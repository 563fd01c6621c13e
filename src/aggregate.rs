use polars::prelude::*;

use crate::error::DashError;
use crate::schema::{order, series};

/// The four headline metrics over a non-empty filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    /// Sum of sales, rounded to the nearest whole unit.
    pub total_sales: i64,
    /// Mean sales per order, 1 decimal place.
    pub average_sales: f64,
    /// Mean profit per order, 1 decimal place.
    pub average_profit: f64,
    /// (Σprofit / Σsales) × 100, 2 decimal places.
    pub net_profit_margin: f64,
}

impl Kpis {
    /// Compute the KPI summary.
    ///
    /// The view must be non-empty; an empty view yields `EmptySelection`.
    /// Individual sales values may be zero or negative, so the sales total
    /// can still be zero on a non-empty view; that case yields
    /// `ZeroSalesTotal` instead of a division by zero.
    pub fn compute(view: &DataFrame) -> Result<Self, DashError> {
        if view.height() == 0 {
            return Err(DashError::EmptySelection);
        }

        let sales = view.column(order::SALES)?.as_materialized_series();
        let profit = view.column(order::PROFIT)?.as_materialized_series();

        let sales_sum = sales
            .sum_reduce()?
            .value()
            .try_extract::<f64>()
            .unwrap_or(0.0);
        let profit_sum = profit
            .sum_reduce()?
            .value()
            .try_extract::<f64>()
            .unwrap_or(0.0);

        if sales_sum == 0.0 {
            return Err(DashError::ZeroSalesTotal);
        }

        let sales_mean = sales.mean_reduce().value().try_extract::<f64>().unwrap_or(0.0);
        let profit_mean = profit
            .mean_reduce()
            .value()
            .try_extract::<f64>()
            .unwrap_or(0.0);

        Ok(Self {
            total_sales: sales_sum.round() as i64,
            average_sales: round_to(sales_mean, 1),
            average_profit: round_to(profit_mean, 1),
            net_profit_margin: round_to(profit_sum / sales_sum * 100.0, 2),
        })
    }
}

/// Total sales per calendar quarter, ascending chronologically.
///
/// Output columns: `quarter` (quarter start as YYYY-MM) and `sales`.
/// Labels sort lexicographically in chronological order given the
/// zero-padded format.
pub fn quarterly_sales(view: &DataFrame) -> Result<DataFrame, DashError> {
    // Map the year-month code onto its quarter start:
    // month = code % 100, quarter start = month - (month - 1) % 3.
    let code = col(order::ORDER_YEAR_MONTH);
    let month = code.clone() % lit(100);
    let quarter_code = (code - ((month - lit(1)) % lit(3))).alias(series::QUARTER);

    let grouped = view
        .clone()
        .lazy()
        .group_by_stable([quarter_code])
        .agg([col(order::SALES).sum()])
        .sort([series::QUARTER], SortMultipleOptions::default())
        .collect()?;

    let codes = grouped
        .column(series::QUARTER)?
        .as_materialized_series()
        .i32()?
        .clone();
    let sales = grouped
        .column(order::SALES)?
        .as_materialized_series()
        .f64()?
        .clone();

    let mut labels: Vec<String> = Vec::with_capacity(grouped.height());
    let mut totals: Vec<f64> = Vec::with_capacity(grouped.height());
    for (code, total) in codes.into_iter().zip(sales.into_iter()) {
        let code = code.ok_or_else(|| {
            DashError::InvalidData("null year-month code in filtered view".into())
        })?;
        labels.push(format!("{:04}-{:02}", code / 100, code % 100));
        totals.push(total.unwrap_or(0.0));
    }

    let columns: Vec<Column> = vec![
        Series::new(series::QUARTER.into(), labels).into(),
        Series::new(order::SALES.into(), totals).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Total sales per region, ascending by summed sales.
pub fn sales_by_region(view: &DataFrame) -> Result<DataFrame, DashError> {
    grouped_sales(view, order::REGION)
}

/// Total sales per sub-category, ascending by summed sales, totals rounded
/// to 2 decimal places (rounding happens after the sort, matching the
/// displayed precision rather than the sort key).
pub fn sales_by_sub_category(view: &DataFrame) -> Result<DataFrame, DashError> {
    let grouped = grouped_sales(view, order::SUB_CATEGORY)?;

    let rounded: Vec<f64> = grouped
        .column(order::SALES)?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .map(|v| round_to(v.unwrap_or(0.0), 2))
        .collect();

    let columns: Vec<Column> = vec![
        grouped.column(order::SUB_CATEGORY)?.clone(),
        Series::new(order::SALES.into(), rounded).into(),
    ];
    Ok(DataFrame::new(columns)?)
}

/// Group by one key column and sum sales, sorted ascending by the sum.
///
/// Grouping is stable and the sort maintains order, so groups with equal
/// totals keep their first-occurrence order in the view. That tie order is
/// deliberate and relied on by tests.
fn grouped_sales(view: &DataFrame, key: &str) -> Result<DataFrame, DashError> {
    let df = view
        .clone()
        .lazy()
        .group_by_stable([col(key)])
        .agg([col(order::SALES).sum()])
        .sort(
            [order::SALES],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    Ok(df)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
