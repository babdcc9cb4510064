use thiserror::Error;

/// Failure modes of a single venue request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{venue}: request failed: {source}")]
    Http {
        venue: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{venue}: HTTP {status}: {body}")]
    Status {
        venue: &'static str,
        status: u16,
        body: String,
    },

    #[error("{venue}: API error {code}: {message}")]
    Api {
        venue: &'static str,
        code: String,
        message: String,
    },

    #[error("{venue}: malformed response: {reason}")]
    Malformed { venue: &'static str, reason: String },

    #[error("{venue}: request timed out")]
    Timeout { venue: &'static str },
}

impl ApiError {
    pub fn http(venue: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { venue }
        } else {
            Self::Http { venue, source }
        }
    }

    pub fn malformed(venue: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            venue,
            reason: reason.into(),
        }
    }

    pub fn venue(&self) -> &'static str {
        match self {
            Self::Http { venue, .. }
            | Self::Status { venue, .. }
            | Self::Api { venue, .. }
            | Self::Malformed { venue, .. }
            | Self::Timeout { venue } => venue,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
