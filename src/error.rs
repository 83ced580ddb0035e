use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("No rate rule for '{consultant}' on {date}, and no DEFAULT rule either")]
    NoApplicableRate { consultant: String, date: NaiveDate },

    #[error("Invalid month range {start}..={end}: must satisfy start <= end < {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("Unknown consultant: {0}")]
    UnknownConsultant(String),

    #[error("Unknown month: {0}")]
    UnknownMonth(String),

    #[error("Dataset contains no records")]
    EmptyDataset,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fiscal year end month {0}: must be between 1 and 12")]
    InvalidFiscalYearEndMonth(u32),

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
