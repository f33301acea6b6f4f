//! Parse errors raised while reading reference datasets and live snapshots.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid {section} line (expected {expected} fields, got {actual}): {line}")]
    FieldCount {
        section: &'static str,
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("invalid {field} value {value:?} in {section} line: {line}")]
    InvalidNumber {
        section: &'static str,
        field: &'static str,
        value: String,
        line: String,
    },

    #[error("invalid timestamp {0:?}")]
    Timestamp(String),

    #[error("invalid boundaries feature {id:?}: {reason}")]
    Boundaries { id: String, reason: String },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed geojson: {0}")]
    GeoJson(#[from] geojson::Error),
}
