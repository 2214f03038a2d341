use reqwest::StatusCode;
use std::error::Error as StdError;
use std::fmt::{self, Formatter};
use thiserror::Error;
use url::Url;

/// Non-2xx answer from the API or from the result host.
#[derive(Debug, Error)]
pub struct RequestFailure {
    pub url: Url,
    pub status: StatusCode,
    pub msg: String,
}

impl RequestFailure {
    pub fn new(url: Url, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            url,
            status,
            msg: msg.into(),
        }
    }

    fn suggestions(&self) -> &'static [&'static str] {
        match self.status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => &[
                "Check that the API key is correct",
                "Set it with --api-key or the X_CHECKER_API_KEY variable",
            ],
            StatusCode::NOT_FOUND => &[
                "Check that the URL is correct",
                "The task or result file may have expired on the server",
            ],
            StatusCode::PAYLOAD_TOO_LARGE => &["Split the input into several smaller files"],
            StatusCode::TOO_MANY_REQUESTS => &[
                "Wait a moment before retrying",
                "Consider reducing request frequency with a larger --interval",
            ],
            status if status.is_server_error() => &[
                "The service may be temporarily unavailable",
                "Retry later or pass --retries to retry status calls",
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(
            formatter,
            "[E002] {} returned {}\nServer response: {}",
            self.url, self.status, self.msg
        )?;

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            write!(formatter, "\n\nSuggestions:")?;
            for suggestion in suggestions {
                write!(formatter, "\n  • {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Connection level failure: DNS, TLS, refused connection, timed out or
/// broken response body.
#[derive(Debug, Error)]
#[error("[E001] Transport failure: {message}")]
pub struct TransportError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_owned()
        } else if err.is_connect() {
            "couldn't connect to server".to_owned()
        } else {
            err.to_string()
        };
        Self::with_source(message, err)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("failed reading response body", err)
    }
}
