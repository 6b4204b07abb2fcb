//! Fetch error types.

/// Errors from a single log query.
///
/// None of these are retried here; retry policy belongs to the session driving
/// the fetches.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The configured base URL could not be joined with the logs path.
    #[error("invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport failure (connect, timeout, reading the body).
    #[error("failed to fetch logs: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response decoded but carried no entry for the queried resource.
    #[error("resource {resource} not found, keys: {keys:?}")]
    ResourceNotFound { resource: String, keys: Vec<String> },
}

impl FetchError {
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }

    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
