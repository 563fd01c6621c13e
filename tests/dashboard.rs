//! End-to-end pipeline checks: CSV resource in, snapshot out.

use std::io::Write;

use polars::prelude::*;
use salespulse::schema::{order, series};
use salespulse::{DashError, FilterSelection, SalesModel};

const ORDERS_CSV: &str = "\
order_date,region,segment,ship_mode,sub_category,sales,profit
2023-01-15,A,Consumer,Standard,Chairs,100.0,20.0
2023-04-10,B,Consumer,Standard,Phones,200.0,50.0
2024-11-03,B,Corporate,Express,Chairs,40.0,-10.0
";

fn model_from(content: &str) -> (SalesModel, tempfile::NamedTempFile) {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    let mut model = SalesModel::new(file.path(), "orders");
    model.load().unwrap();
    (model, file)
}

fn strings(df: &DataFrame, column: &str) -> Vec<String> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap().to_string())
        .collect()
}

fn floats(df: &DataFrame, column: &str) -> Vec<f64> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

#[test]
fn default_selection_sees_the_whole_table() {
    let (model, _file) = model_from(ORDERS_CSV);
    let selection = model.default_selection().unwrap();
    let snapshot = model.snapshot(&selection).unwrap();

    assert_eq!(snapshot.kpis.total_sales, 340);
    assert_eq!(
        strings(&snapshot.quarterly_sales, series::QUARTER),
        vec!["2023-01", "2023-04", "2024-10"]
    );
}

#[test]
fn worked_example_through_year_and_sets() {
    let (model, _file) = model_from(ORDERS_CSV);
    let selection = FilterSelection {
        year: Some(2023),
        regions: vec!["A".into(), "B".into()],
        segments: model.distinct_values(order::SEGMENT).unwrap(),
        ship_modes: model.distinct_values(order::SHIP_MODE).unwrap(),
    };
    let snapshot = model.snapshot(&selection).unwrap();

    assert_eq!(snapshot.kpis.total_sales, 300);
    assert_eq!(snapshot.kpis.average_sales, 150.0);
    assert_eq!(snapshot.kpis.average_profit, 35.0);
    assert_eq!(snapshot.kpis.net_profit_margin, 23.33);

    assert_eq!(
        strings(&snapshot.quarterly_sales, series::QUARTER),
        vec!["2023-01", "2023-04"]
    );
    assert_eq!(floats(&snapshot.quarterly_sales, order::SALES), vec![100.0, 200.0]);

    // Region series ascending by sales: A (100) before B (200).
    assert_eq!(strings(&snapshot.sales_by_region, order::REGION), vec!["A", "B"]);
    assert_eq!(floats(&snapshot.sales_by_region, order::SALES), vec![100.0, 200.0]);
}

#[test]
fn unmatched_region_halts_before_aggregation() {
    let (model, _file) = model_from(ORDERS_CSV);
    let mut selection = model.default_selection().unwrap();
    selection.regions = vec!["C".into()];
    assert!(matches!(
        model.snapshot(&selection),
        Err(DashError::EmptySelection)
    ));
}

#[test]
fn failed_interaction_leaves_the_table_usable() {
    let (model, _file) = model_from(ORDERS_CSV);
    let mut empty = model.default_selection().unwrap();
    empty.segments.clear();
    assert!(model.snapshot(&empty).is_err());

    // The cached table is untouched; the next interaction succeeds.
    let selection = model.default_selection().unwrap();
    assert_eq!(model.snapshot(&selection).unwrap().kpis.total_sales, 340);
}

#[test]
fn snapshot_is_deterministic() {
    let (model, _file) = model_from(ORDERS_CSV);
    let selection = model.default_selection().unwrap();
    let first = model.snapshot(&selection).unwrap();
    let second = model.snapshot(&selection).unwrap();
    assert_eq!(first.kpis, second.kpis);
    assert!(first.quarterly_sales.equals(&second.quarterly_sales));
    assert!(first.sales_by_region.equals(&second.sales_by_region));
    assert!(first
        .sales_by_sub_category
        .equals(&second.sales_by_sub_category));
}
