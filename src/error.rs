use std::io;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// Inference itself never fails; everything here is caught before an engine
/// or knowledge base exists.
#[derive(Debug, Error)]
pub enum Error {
    #[error("fuzzy set `{variable}.{name}` has unordered breakpoints {points:?}")]
    MalformedFuzzySet {
        variable: String,
        name: String,
        points: [f64; 4],
    },

    #[error("fuzzy set `{variable}.{name}` has a non-finite breakpoint")]
    NonFiniteBreakpoint { variable: String, name: String },

    #[error("fuzzy set `{variable}.{name}` is defined more than once")]
    DuplicateFuzzySet { variable: String, name: String },

    #[error("rule {0} is defined more than once")]
    DuplicateRule(u32),

    #[error("crisp value {value} for term `{term}` on channel `{channel}` is outside [0, 1]")]
    CrispOutOfRange { channel: String, term: String, value: f64 },

    #[error("channel `{0}` has no output terms")]
    EmptyCrispTable(String),

    #[error("status thresholds for channel `{0}` are not strictly ascending")]
    UnorderedThresholds(String),

    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
