pub mod config;
pub use config::{
    AuditConfig, Config, DisplayConfig, ExportConfig, LoaderConfig, ProfilingConfig,
    RelationshipConfig, ScoringConfig, SuitabilityConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableLensError {
    #[error("unsupported format: .{extension}")]
    UnsupportedFormat { extension: String },
    #[error("could not parse {format} content: {reason}")]
    Parse { format: String, reason: String },
    #[error("no usable data: {rows} rows x {columns} columns")]
    EmptyInput { rows: usize, columns: usize },
    #[error("audit log does not replay: {0}")]
    Replay(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("{0}")]
    Other(String),
}

impl TableLensError {
    pub fn parse(format: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable identifier for callers that branch on the failure type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Parse { .. } | Self::Parquet(_) | Self::Arrow(_) => "parse_error",
            Self::EmptyInput { .. } => "empty_input",
            Self::Replay(_) => "replay_mismatch",
            Self::Config(_) => "invalid_config",
            Self::Io(_) => "io_error",
            Self::Other(_) => "internal",
        }
    }

    /// Whether retrying with the same input could ever succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TableLensError>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorReport {
    pub kind: String,
    pub reason: String,
}

impl From<&TableLensError> for ErrorReport {
    fn from(e: &TableLensError) -> Self {
        Self {
            kind: e.kind().to_owned(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let e = TableLensError::UnsupportedFormat { extension: "pdf".into() };
        assert_eq!(e.kind(), "unsupported_format");
        assert_eq!(e.to_string(), "unsupported format: .pdf");
        assert_eq!(TableLensError::parse("csv", "bad quote").kind(), "parse_error");
        assert!(!TableLensError::parse("csv", "x").is_retryable());
    }

    #[test]
    fn error_report_carries_kind_and_reason() {
        let e = TableLensError::EmptyInput { rows: 0, columns: 3 };
        let r = ErrorReport::from(&e);
        assert_eq!(r.kind, "empty_input");
        assert!(r.reason.contains("0 rows"));
    }
}
