use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    /// The registry answered, but without a usable record.
    #[error("{registry}: {message}")]
    Registry {
        registry: &'static str,
        message: String,
        response: String,
    },

    #[error(transparent)]
    Store(#[from] refscope_core::CoreError),
}

impl ScienceError {
    pub fn registry(registry: &'static str, message: impl Into<String>, response: &str) -> Self {
        Self::Registry {
            registry,
            message: message.into(),
            response: response.to_string(),
        }
    }

    /// Raw upstream body kept for diagnostics, when there is one.
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Registry { response, .. } => Some(response),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;
