use ab_core::Error;

/// Errors raised while reading a source table.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A required header is absent.
    #[error("missing required column '{0}' in input data")]
    MissingColumn(String),

    /// A non-empty field could not be parsed.
    #[error("row {row}, column '{column}': {message}")]
    RowError {
        /// 1-based data row (header excluded).
        row: usize,
        /// Column name.
        column: String,
        /// What went wrong.
        message: String,
    },

    /// The header row is missing or there are no data rows.
    #[error("no rows in input data")]
    EmptyData,
}

impl From<IngestError> for Error {
    fn from(e: IngestError) -> Self {
        Error::Validation(e.to_string())
    }
}
