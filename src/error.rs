use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures that abort a report request.
///
/// Data-quality problems inside individual rows are not errors; they are
/// collected as [`crate::warning::Warning`] values instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("essential CSV columns missing: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("CSV contains no valid transactions after cleaning")]
    EmptyInput,

    #[error("no valid dates found in the 'Date' column")]
    NoValidDates,

    #[error("selected year {year} is outside the valid range ({min}-{max})")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("invalid tax year selection: {0:?}")]
    MalformedYear(String),

    #[error("invalid decimal value: {0:?}")]
    InvalidDecimal(String),

    #[error("unsupported timestamp format: {0:?}")]
    InvalidTimestamp(String),

    #[error("invalid event record: {0}")]
    InvalidRecord(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
