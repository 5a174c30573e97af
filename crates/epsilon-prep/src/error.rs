/// Errors returned by epsilon-prep operations.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// A configuration value failed validation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A parse error occurred while reading an SVM-light or delimited file.
    #[error("parse error at line {line}: {message}")]
    ParseError {
        /// 1-based line number where the error occurred.
        line: usize,
        /// Description of the parse failure.
        message: String,
    },

    /// A `.npy` file could not be decoded.
    #[error("npy format error: {0}")]
    NpyFormat(String),

    /// Array dimensions do not fit the requested operation.
    #[error("shape error: {0}")]
    Shape(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
