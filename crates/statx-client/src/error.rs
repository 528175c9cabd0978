//! Error types for schema discovery and table fetching.

use reqwest::StatusCode;

/// Errors returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A schema or table request returned a non-success HTTP status.
    #[error("request to {url} failed with status {status}")]
    Http {
        /// Status code the service answered with.
        status: StatusCode,
        /// URL the request was sent to.
        url: String,
    },

    /// A request could not be sent or its body could not be read.
    #[error("request to {url} failed")]
    Request {
        /// URL the request was sent to.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A response body did not match the expected shape.
    #[error("could not decode {context}: {message}")]
    Decode {
        /// What was being decoded, usually a URL or a response section.
        context: String,
        /// What was wrong with it.
        message: String,
    },

    /// A label or id matched zero or more than one schema node.
    #[error("label '{label}' has no unambiguous match ({context})")]
    NotFound {
        /// The label or id that failed to resolve.
        label: String,
        /// Where in the schema the match was attempted.
        context: String,
    },

    /// A table response did not carry exactly three fields.
    #[error("unsupported table shape: {field_count} fields, expected 3")]
    UnsupportedShape {
        /// Number of fields the response declared.
        field_count: usize,
    },

    /// The persisted schema cache could not be read or written.
    #[error("schema cache error: {message}")]
    Cache {
        /// Description of the failure.
        message: String,
    },

    /// A measure id did not follow the colon-delimited id scheme.
    #[error("invalid measure id '{id}': expected at least two colon-delimited segments")]
    InvalidMeasureId {
        /// The offending id.
        id: String,
    },
}

impl Error {
    /// Create a decode error.
    pub(crate) fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for a label that matched nothing.
    pub(crate) fn no_match(label: impl Into<String>, context: impl Into<String>) -> Self {
        Self::NotFound {
            label: label.into(),
            context: context.into(),
        }
    }

    /// Create a not-found error for a label that matched several nodes.
    pub(crate) fn ambiguous(
        label: impl Into<String>,
        context: impl Into<String>,
        matches: usize,
    ) -> Self {
        Self::NotFound {
            label: label.into(),
            context: format!("{} ({matches} matches)", context.into()),
        }
    }

    /// Create a cache error.
    pub(crate) fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }
}

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
