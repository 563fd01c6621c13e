//! Filter-and-aggregate core for a retail sales dashboard.
//!
//! A [`SalesModel`] loads a sales table from a workbook sheet or CSV once
//! per session, derives a year-month code per order, and answers dashboard
//! interactions as explicit request/response calls: a [`FilterSelection`]
//! goes in, a [`DashboardSnapshot`] (KPI scalars plus the chart series)
//! comes out. Rendering is the caller's concern.
//!
//! The unrelated [`RelayClient`] forwards one text prompt per call to the
//! Google Generative Language API, with the credential read from the
//! environment.

mod aggregate;
mod error;
mod filter;
mod model;
mod relay;
pub mod schema;

pub use aggregate::{quarterly_sales, sales_by_region, sales_by_sub_category, Kpis};
pub use error::{DashError, RelayError};
pub use filter::{apply_selection, FilterSelection};
pub use model::{DashboardSnapshot, SalesModel};
pub use relay::{RelayClient, RelayClientBuilder, DEFAULT_MODEL, ENV_API_KEY};
