use thiserror::Error;

/// Failures while turning an opening code into its numeric feature.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcoError {
    #[error("invalid ECO code {0:?}: expected a letter followed by digits, e.g. 'C00'")]
    InvalidFormat(String),
    #[error("ECO code must be a string (e.g. 'C00') or an integer, got {0}")]
    InvalidType(String),
}

/// Raised by a scaler or classifier while it runs. `Shape` and
/// `InvalidValue` describe a mismatch between the input and what the
/// collaborator was fit on; `Runtime` is anything else.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("{0}")]
    Runtime(String),
}

/// Every way a single prediction call can fail.
///
/// `MissingField` and `InvalidFormat` are caller mistakes; the other two are
/// server faults. Use [`PredictError::is_client_error`] rather than matching
/// on messages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid input format for {field}: {detail}")]
    InvalidFormat { field: &'static str, detail: String },
    #[error("outcome model or scaler is not loaded")]
    ModelUnavailable,
    #[error("prediction error: {0}")]
    PredictionFailure(String),
}

impl PredictError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictError::MissingField(_) | PredictError::InvalidFormat { .. }
        )
    }

    pub(crate) fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        PredictError::InvalidFormat {
            field,
            detail: detail.into(),
        }
    }
}

impl ModelError {
    pub fn is_input_mismatch(&self) -> bool {
        matches!(self, ModelError::Shape { .. } | ModelError::InvalidValue(_))
    }
}

impl From<EcoError> for PredictError {
    fn from(e: EcoError) -> Self {
        PredictError::invalid("opening_eco", e.to_string())
    }
}
