//! Admission failure types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::headers::names;

/// Why a request was ended before dispatch.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Multi-app mode and no usable app group name.
    #[error("the {} header must be set", names::APP_GROUP_NAME)]
    MissingAppGroupName,

    /// No script name, and neither an app root nor a document root.
    #[error("client did not send a {} or a {} header", names::APP_ROOT, names::DOCUMENT_ROOT)]
    MissingAppRoot,

    /// A script name was sent, but neither an app root nor a document root.
    #[error("client did not send a {} header", names::DOCUMENT_ROOT)]
    MissingDocumentRoot,

    /// Analytics requested without a key.
    #[error("header {} must be set", names::ANALYTICS_KEY)]
    MissingAnalyticsKey,

    /// Analytics filters are forwarded as text and must be UTF-8.
    #[error("header {} is not valid UTF-8", names::ANALYTICS_FILTERS)]
    InvalidAnalyticsFilters,

    /// The document root could not be resolved.
    #[error("cannot resolve document root {path}: {source}")]
    ResolveDocumentRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Single-app mode without its preloaded configuration.
    #[error("no configuration registered for the single application")]
    SingleAppMissing,
}

impl AdmissionError {
    /// Status sent with the error response.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::ResolveDocumentRoot { .. } | AdmissionError::SingleAppMissing => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AdmissionError::MissingAppGroupName => "missing_app_group_name",
            AdmissionError::MissingAppRoot => "missing_app_root",
            AdmissionError::MissingDocumentRoot => "missing_document_root",
            AdmissionError::MissingAnalyticsKey => "missing_analytics_key",
            AdmissionError::InvalidAnalyticsFilters => "invalid_analytics_filters",
            AdmissionError::ResolveDocumentRoot { .. } => "resolve_document_root",
            AdmissionError::SingleAppMissing => "single_app_missing",
        }
    }
}
