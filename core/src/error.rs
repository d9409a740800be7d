use serde::Serialize;
use thiserror::Error;

/// A single quantile cut point, rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileValue {
    pub fraction: f64,
    pub value:    f64,
}

#[derive(Error, Debug)]
pub enum RfmError {
    #[error(
        "Duplicate quantile boundaries for {metric} at max_score={max_score}: {}",
        format_quantiles(.quantiles)
    )]
    DuplicateQuantileBoundary {
        metric:    String,
        max_score: u32,
        quantiles: Vec<QuantileValue>,
    },

    #[error("Invalid max_score {0}: must be at least 1")]
    InvalidMaxScore(u32),

    #[error("Invalid time horizon {0} days: must be positive")]
    InvalidTimeHorizon(i64),

    #[error("Non-finite value in column '{column}' at row {index}")]
    NonFiniteValue { column: String, index: usize },

    #[error("Unknown metric tag '{0}'")]
    UnknownMetricTag(String),

    #[error("Metric table has no entry for {0}")]
    MissingMetric(String),

    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value:  String,
        source: chrono::ParseError,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type RfmResult<T> = Result<T, RfmError>;

fn format_quantiles(quantiles: &[QuantileValue]) -> String {
    let parts: Vec<String> = quantiles
        .iter()
        .map(|q| format!("{}: {}", q.fraction, q.value))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
