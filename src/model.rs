use std::path::PathBuf;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::aggregate::{quarterly_sales, sales_by_region, sales_by_sub_category, Kpis};
use crate::error::DashError;
use crate::filter::{apply_selection, distinct_strings, FilterSelection};
use crate::schema::order;

/// Date format accepted for order dates in CSV input and ISO workbook cells.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything the front-end renders for one selection.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub kpis: Kpis,
    pub quarterly_sales: DataFrame,
    pub sales_by_region: DataFrame,
    pub sales_by_sub_category: DataFrame,
}

/// Owns the sales table for one session.
///
/// The table is parsed once and cached; every interaction reads the same
/// immutable frame. Filtering always produces a new view, so a failed
/// interaction cannot corrupt the base table.
pub struct SalesModel {
    source: PathBuf,
    sheet: String,
    orders: Option<DataFrame>,
}

impl SalesModel {
    pub fn new(source: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            sheet: sheet.into(),
            orders: None,
        }
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Parse the source resource on first call; later calls return the
    /// cached table.
    pub fn load(&mut self) -> Result<&DataFrame, DashError> {
        if self.orders.is_none() {
            let df = self.read_orders()?;
            tracing::info!(
                rows = df.height(),
                source = %self.source.display(),
                "loaded sales table"
            );
            self.orders = Some(df);
        }
        Ok(self.orders.as_ref().unwrap())
    }

    /// Drop the cached table and re-parse, recomputing the derived
    /// year-month column.
    pub fn reload(&mut self) -> Result<&DataFrame, DashError> {
        self.orders = None;
        self.load()
    }

    /// The cached table, or `NotLoaded` before the first `load()`.
    pub fn orders(&self) -> Result<&DataFrame, DashError> {
        self.orders.as_ref().ok_or(DashError::NotLoaded)
    }

    // ── Sidebar support ─────────────────────────────────────────────────────

    /// Min and max order year, for the year slider bounds.
    pub fn year_bounds(&self) -> Result<(i32, i32), DashError> {
        let codes = self
            .orders()?
            .column(order::ORDER_YEAR_MONTH)?
            .as_materialized_series()
            .i32()?
            .clone();
        match (codes.min(), codes.max()) {
            (Some(min), Some(max)) => Ok((min / 100, max / 100)),
            _ => Err(DashError::InvalidData("sales table has no rows".into())),
        }
    }

    /// Sorted distinct values of one string column, for multi-select
    /// defaults.
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>, DashError> {
        distinct_strings(self.orders()?, column)
    }

    /// The "nothing excluded" selection for the loaded table.
    pub fn default_selection(&self) -> Result<FilterSelection, DashError> {
        FilterSelection::select_all(self.orders()?)
    }

    // ── Pipeline ────────────────────────────────────────────────────────────

    /// One dashboard interaction: selection in, metrics and series out.
    ///
    /// If the selection matches no rows the pipeline stops before any
    /// aggregation and reports `EmptySelection`; that is the "no data
    /// selected" signal, not a crash. All three series are computed from
    /// the same fully filtered view.
    pub fn snapshot(&self, selection: &FilterSelection) -> Result<DashboardSnapshot, DashError> {
        let view = apply_selection(self.orders()?, selection)?;
        tracing::debug!(rows = view.height(), "applied selection");

        if view.height() == 0 {
            return Err(DashError::EmptySelection);
        }

        Ok(DashboardSnapshot {
            kpis: Kpis::compute(&view)?,
            quarterly_sales: quarterly_sales(&view)?,
            sales_by_region: sales_by_region(&view)?,
            sales_by_sub_category: sales_by_sub_category(&view)?,
        })
    }

    // ── Private helpers ─────────────────────────────────────────────────────

    fn read_orders(&self) -> Result<DataFrame, DashError> {
        let extension = self
            .source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "xlsx" => self.read_workbook(),
            "csv" => self.read_csv(),
            other => Err(DashError::UnsupportedResource(format!(
                "'{other}' (expected .xlsx or .csv): {}",
                self.source.display()
            ))),
        }
    }

    /// Read the named worksheet. The first row is the header; required
    /// columns are located by name and all others are dropped.
    fn read_workbook(&self) -> Result<DataFrame, DashError> {
        let mut workbook: Xlsx<_> = open_workbook(&self.source)?;
        let range = workbook
            .worksheet_range(&self.sheet)
            .map_err(|_| DashError::SheetNotFound(self.sheet.clone()))?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| DashError::InvalidData("worksheet is empty".into()))?;
        let headers: Vec<String> = header
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let index_of = |name: &str| -> Result<usize, DashError> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| DashError::MissingColumn(name.to_string()))
        };
        let date_idx = index_of(order::ORDER_DATE)?;
        let region_idx = index_of(order::REGION)?;
        let segment_idx = index_of(order::SEGMENT)?;
        let ship_mode_idx = index_of(order::SHIP_MODE)?;
        let sub_category_idx = index_of(order::SUB_CATEGORY)?;
        let sales_idx = index_of(order::SALES)?;
        let profit_idx = index_of(order::PROFIT)?;

        let mut columns = OrderColumns::default();
        for (row_number, row) in rows.enumerate() {
            // Sheets often carry trailing rows of empty cells; skip them.
            if row.iter().all(|cell| matches!(cell, Data::Empty)) {
                continue;
            }
            let line = row_number + 2; // 1-based, after the header
            columns.dates.push(cell_date(row, date_idx, line)?);
            columns.regions.push(cell_string(row, region_idx));
            columns.segments.push(cell_string(row, segment_idx));
            columns.ship_modes.push(cell_string(row, ship_mode_idx));
            columns.sub_categories.push(cell_string(row, sub_category_idx));
            columns.sales.push(cell_number(row, sales_idx, line)?);
            columns.profits.push(cell_number(row, profit_idx, line)?);
        }

        columns.into_frame()
    }

    /// Read a CSV with all columns as strings, then parse the required
    /// columns into their real types.
    fn read_csv(&self) -> Result<DataFrame, DashError> {
        let mut raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(self.source.clone()))?
            .finish()?;

        // Trim whitespace from column names
        let trimmed: Vec<String> = raw
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        raw.set_column_names(trimmed.as_slice())?;

        Self::require_columns(&raw, &order::REQUIRED)?;

        let dates = raw
            .column(order::ORDER_DATE)?
            .as_materialized_series()
            .str()?
            .clone();
        let regions = raw.column(order::REGION)?.as_materialized_series().str()?.clone();
        let segments = raw
            .column(order::SEGMENT)?
            .as_materialized_series()
            .str()?
            .clone();
        let ship_modes = raw
            .column(order::SHIP_MODE)?
            .as_materialized_series()
            .str()?
            .clone();
        let sub_categories = raw
            .column(order::SUB_CATEGORY)?
            .as_materialized_series()
            .str()?
            .clone();
        let sales = raw.column(order::SALES)?.as_materialized_series().str()?.clone();
        let profits = raw.column(order::PROFIT)?.as_materialized_series().str()?.clone();

        let mut columns = OrderColumns::default();
        for i in 0..raw.height() {
            let line = i + 2;
            columns.dates.push(parse_date(
                required_str(&dates, i, order::ORDER_DATE, line)?,
                line,
            )?);
            columns
                .regions
                .push(required_str(&regions, i, order::REGION, line)?.to_string());
            columns
                .segments
                .push(required_str(&segments, i, order::SEGMENT, line)?.to_string());
            columns
                .ship_modes
                .push(required_str(&ship_modes, i, order::SHIP_MODE, line)?.to_string());
            columns
                .sub_categories
                .push(required_str(&sub_categories, i, order::SUB_CATEGORY, line)?.to_string());
            columns.sales.push(parse_number(
                required_str(&sales, i, order::SALES, line)?,
                order::SALES,
                line,
            )?);
            columns.profits.push(parse_number(
                required_str(&profits, i, order::PROFIT, line)?,
                order::PROFIT,
                line,
            )?);
        }

        columns.into_frame()
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), DashError> {
        for &col_name in required {
            if df.column(col_name).is_err() {
                return Err(DashError::MissingColumn(col_name.to_string()));
            }
        }
        Ok(())
    }
}

// ── Column assembly ─────────────────────────────────────────────────────────

#[derive(Default)]
struct OrderColumns {
    dates: Vec<NaiveDate>,
    regions: Vec<String>,
    segments: Vec<String>,
    ship_modes: Vec<String>,
    sub_categories: Vec<String>,
    sales: Vec<f64>,
    profits: Vec<f64>,
}

impl OrderColumns {
    /// Build the canonical table, appending the derived year-month code.
    fn into_frame(self) -> Result<DataFrame, DashError> {
        let epoch = NaiveDate::default(); // 1970-01-01
        let days: Vec<i32> = self
            .dates
            .iter()
            .map(|d| (*d - epoch).num_days() as i32)
            .collect();
        let year_months: Vec<i32> = self
            .dates
            .iter()
            .map(|d| 100 * d.year() + d.month() as i32)
            .collect();

        let date_series =
            Series::new(order::ORDER_DATE.into(), days).cast(&DataType::Date)?;

        let columns: Vec<Column> = vec![
            date_series.into(),
            Series::new(order::REGION.into(), self.regions).into(),
            Series::new(order::SEGMENT.into(), self.segments).into(),
            Series::new(order::SHIP_MODE.into(), self.ship_modes).into(),
            Series::new(order::SUB_CATEGORY.into(), self.sub_categories).into(),
            Series::new(order::SALES.into(), self.sales).into(),
            Series::new(order::PROFIT.into(), self.profits).into(),
            Series::new(order::ORDER_YEAR_MONTH.into(), year_months).into(),
        ];
        Ok(DataFrame::new(columns)?)
    }
}

// ── Cell parsing ────────────────────────────────────────────────────────────

fn cell_string(row: &[Data], idx: usize) -> String {
    match row.get(idx) {
        Some(Data::String(s)) => s.trim().to_string(),
        Some(cell) => cell.to_string(),
        None => String::new(),
    }
}

fn cell_number(row: &[Data], idx: usize, line: usize) -> Result<f64, DashError> {
    match row.get(idx) {
        Some(Data::Float(f)) => Ok(*f),
        Some(Data::Int(i)) => Ok(*i as f64),
        Some(Data::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            DashError::InvalidData(format!("row {line}: '{s}' is not a number"))
        }),
        other => Err(DashError::InvalidData(format!(
            "row {line}: expected a number, found {other:?}"
        ))),
    }
}

fn cell_date(row: &[Data], idx: usize, line: usize) -> Result<NaiveDate, DashError> {
    match row.get(idx) {
        Some(Data::DateTime(dt)) => dt
            .as_datetime()
            .map(|ndt| ndt.date())
            .ok_or_else(|| DashError::InvalidData(format!("row {line}: invalid Excel date"))),
        Some(Data::DateTimeIso(s)) | Some(Data::String(s)) => parse_date(s, line),
        other => Err(DashError::InvalidData(format!(
            "row {line}: expected a date, found {other:?}"
        ))),
    }
}

fn parse_date(value: &str, line: usize) -> Result<NaiveDate, DashError> {
    // ISO datetimes are accepted by taking the date part.
    let date_part = value.trim();
    let date_part = date_part.get(..10).unwrap_or(date_part);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|_| {
        DashError::InvalidData(format!("row {line}: '{value}' is not a {DATE_FORMAT} date"))
    })
}

fn parse_number(value: &str, column: &str, line: usize) -> Result<f64, DashError> {
    value.trim().parse::<f64>().map_err(|_| {
        DashError::InvalidData(format!("row {line}: {column} '{value}' is not a number"))
    })
}

fn required_str<'a>(
    values: &'a StringChunked,
    idx: usize,
    column: &str,
    line: usize,
) -> Result<&'a str, DashError> {
    values
        .get(idx)
        .ok_or_else(|| DashError::InvalidData(format!("row {line}: {column} is empty")))
}
