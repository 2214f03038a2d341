// Re-export the API module components
pub use self::{
    client::TaskClient,
    errors::ApiClientError,
    models::{TaskInput, TaskRecord},
    polling::{
        poll_until_terminal, CancelToken, PollOptions, DEFAULT_POLL_INTERVAL,
        DEFAULT_POLL_TIMEOUT, MIN_POLL_INTERVAL,
    },
    transport::{
        FilePart, HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport,
        API_KEY_HEADER,
    },
    types::TaskStatus,
};

// Module declarations
mod client;
mod errors;
mod models;
mod polling;
mod transport;
mod types;
