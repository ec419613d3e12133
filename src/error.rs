use thiserror::Error;

/// Everything the scorecard core and its adapters can fail with.
///
/// Row-level problems never show up here: unparseable cells become 0, missing
/// KPI tables become empty sets and missing ids fall back to defaults.
#[derive(Debug, Error)]
pub enum ScorecardError {
    #[error("register table is absent or empty")]
    EmptyResult,
    #[error("statistic requires at least one school in the roster")]
    EmptyRoster,
    #[error("school {0} is not in the roster")]
    NotFound(String),
    #[error("invalid workbook: {0}")]
    InvalidWorkbook(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScorecardError>;
