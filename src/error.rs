use thiserror::Error;

/// Errors from the load / filter / aggregate pipeline.
///
/// Loader failures are fatal to the session; `EmptySelection` and
/// `ZeroSalesTotal` are scoped to a single interaction and leave the
/// cached base table untouched.
#[derive(Error, Debug)]
pub enum DashError {
    #[error("Data not loaded: call load() first")]
    NotLoaded,

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Unsupported resource type: {0}")]
    UnsupportedResource(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("No rows match the current selection")]
    EmptySelection,

    #[error("Selection has zero total sales; net profit margin is undefined")]
    ZeroSalesTotal,

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the chat relay.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("API key not set: export {0}")]
    MissingApiKey(&'static str),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
}
