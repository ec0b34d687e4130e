//! Error types for the search and batch core

use thiserror::Error;

/// Main error type for the search and batch core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid FIQL expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid percent-encoding: {0}")]
    InvalidEncoding(String),

    #[error("Condition type {0} is not supported")]
    UnsupportedCondition(String),

    #[error("Special attr name {0} is not supported")]
    UnsupportedSpecialAttr(String),

    #[error("Unsupported search value {0}")]
    UnsupportedValue(String),

    /// Client-facing wrapper carrying the original expression and the failure
    #[error("Invalid search parameters: {fiql}: {cause}")]
    InvalidSearchParameters {
        fiql: String,
        #[source]
        cause: Box<CoreError>,
    },

    #[error("Missing close boundary delimiter around line {line}")]
    MissingCloseDelimiter { line: usize },

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Wrap a conversion failure as a client error for `fiql`
    pub fn invalid_search_parameters(fiql: &str, cause: CoreError) -> Self {
        match cause {
            // already wrapped by a nested conversion
            wrapped @ CoreError::InvalidSearchParameters { .. } => wrapped,
            cause => CoreError::InvalidSearchParameters {
                fiql: fiql.to_string(),
                cause: Box::new(cause),
            },
        }
    }

    /// Innermost error of a wrapped chain
    pub fn root_cause(&self) -> &CoreError {
        match self {
            CoreError::InvalidSearchParameters { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Elements reported to the client: the original expression and the root cause message
    pub fn elements(&self) -> Vec<String> {
        match self {
            CoreError::InvalidSearchParameters { fiql, cause } => {
                vec![fiql.clone(), cause.root_cause().to_string()]
            }
            other => vec![other.to_string()],
        }
    }

    /// Whether this error stems from invalid client input rather than a broken stream
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CoreError::Io(_) | CoreError::MissingCloseDelimiter { .. } | CoreError::InvalidConfig(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<CoreError> for pyo3::PyErr {
    fn from(err: CoreError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};

        match err {
            CoreError::Io(e) => PyIOError::new_err(format!("I/O error: {}", e)),
            CoreError::MissingCloseDelimiter { .. } => PyRuntimeError::new_err(err.to_string()),
            other => PyValueError::new_err(other.elements().join(": ")),
        }
    }
}

/// Result type alias for the search and batch core
pub type Result<T> = std::result::Result<T, CoreError>;
