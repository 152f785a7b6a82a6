use thiserror::Error;

/// Faults an adapter can report. The aggregation boundary classifies every
/// variant as `ProviderStatus::Error`; timeouts are detected there, not here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Provider(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Query strings may carry API keys; keep URLs out of error details.
        let err = err.without_url();
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl From<quick_xml::DeError> for FetchError {
    fn from(err: quick_xml::DeError) -> Self {
        FetchError::Malformed(format!("xml: {err}"))
    }
}
