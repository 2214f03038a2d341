use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::models::TaskRecord;
use crate::errors::{RequestFailure, TransportError};

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Status(#[from] RequestFailure),

    #[error("[E003] Unexpected response from {url}: {reason}\nResponse body: {body}")]
    Decode {
        url: Url,
        reason: String,
        body: String,
    },

    #[error("[E004] Task '{}' failed on the server ({} of {} numbers checked)\n\nSuggestions:\n  • Check that the input holds one phone number per line\n  • Submit the task again", .0.task_id, checked(.0), .0.total)]
    TaskFailed(Box<TaskRecord>),

    #[error("[E005] Task '{task_id}' didn't finish within {elapsed:?}\n\nSuggestions:\n  • Check the task later with the status command\n  • Raise the limit with --timeout")]
    Timeout { task_id: String, elapsed: Duration },

    #[error("[E006] Polling was cancelled")]
    Cancelled,

    #[error("[E007] Invalid base URL: {0}\n\nSuggestions:\n  • Provide a valid HTTP or HTTPS URL\n  • Example: https://api.checknumber.ai")]
    CannotBeBase(Url),

    #[error("[E008] No API key provided\n\nSuggestions:\n  • Pass --api-key\n  • Or set the X_CHECKER_API_KEY environment variable")]
    MissingApiKey,

    #[error("[E009] Input contains no phone numbers\n\nSuggestions:\n  • Put one phone number per line, e.g. +1234567890")]
    EmptyInput,

    #[error("[E010] File system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[E011] Invalid URL format: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

fn checked(record: &TaskRecord) -> u64 {
    record.success.saturating_add(record.failure)
}

impl ApiClientError {
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E001",
            Self::Status(_) => "E002",
            Self::Decode { .. } => "E003",
            Self::TaskFailed(_) => "E004",
            Self::Timeout { .. } => "E005",
            Self::Cancelled => "E006",
            Self::CannotBeBase(_) => "E007",
            Self::MissingApiKey => "E008",
            Self::EmptyInput => "E009",
            Self::Io(_) => "E010",
            Self::InvalidUrl(_) => "E011",
        }
    }

    /// HTTP status of a rejected request, if that's what this is.
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status(failure) => Some(failure.status),
            _ => None,
        }
    }

    /// Whether a caller-side retry has a chance of succeeding. The client
    /// itself never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(failure) => {
                failure.status.is_server_error()
                    || failure.status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
