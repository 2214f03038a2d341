use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use url::Url;

use crate::{
    config::ClientConfig,
    errors::{RequestFailure, TransportError},
};

use super::errors::ApiClientError;
use super::models::{has_numbers, TaskInput, TaskRecord};
use super::polling::{self, PollOptions};
use super::transport::{
    FilePart, HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport,
};

const TASKS_PATH: [&str; 4] = ["x", "api", "simple", "tasks"];
const DOWNLOAD_CHUNK: usize = 8 * 1024;

/// Client for the bulk task API. Cheap to clone; clones share one transport
/// and its connection pool. It keeps no per-task state, so a single instance
/// can drive any number of tasks from any number of threads.
#[derive(Clone)]
pub struct TaskClient {
    base: Url,
    api_key: String,
    request_timeout: Duration,
    download_timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskClient")
            .field("base", &self.base.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish_non_exhaustive()
    }
}

impl TaskClient {
    /// # Errors
    ///
    /// Fails if the API key is blank, if the base `Url` cannot be a base
    /// (we rely on that invariant when building request URLs) or if the
    /// HTTP client can't be created.
    pub fn new(config: ClientConfig) -> Result<Self, ApiClientError> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Same as [`TaskClient::new`] but over a caller supplied transport.
    ///
    /// # Errors
    ///
    /// Fails if the API key is blank or the base `Url` cannot be a base.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiClientError> {
        if config.api_key.trim().is_empty() {
            return Err(ApiClientError::MissingApiKey);
        }
        if config.base_url.cannot_be_a_base() {
            return Err(ApiClientError::CannotBeBase(config.base_url));
        }

        Ok(Self {
            base: config.base_url,
            api_key: config.api_key,
            request_timeout: config.request_timeout,
            download_timeout: config.download_timeout,
            transport,
        })
    }

    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// `{base}/x/api/simple/tasks`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the URL cannot be a base.
    pub fn tasks_url(&self) -> Result<Url, ApiClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiClientError::CannotBeBase(self.base.clone()))?
            .pop_if_empty()
            .extend(TASKS_PATH);
        Ok(url)
    }

    /// `{base}/x/api/simple/tasks/{task_id}?user_id={user_id}`
    ///
    /// # Errors
    ///
    /// Will return `Err` if the URL cannot be a base.
    pub fn task_status_url(&self, task_id: &str, user_id: &str) -> Result<Url, ApiClientError> {
        let mut url = self.tasks_url()?;
        url.path_segments_mut()
            .map_err(|()| ApiClientError::CannotBeBase(self.base.clone()))?
            .push(task_id);
        url.query_pairs_mut().append_pair("user_id", user_id);
        Ok(url)
    }

    /// Uploads a list of phone numbers and returns the freshly created task.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the input can't be read or holds no numbers, on
    /// network failure, on a non-success response, or when the response
    /// isn't a valid task.
    pub fn submit(&self, input: TaskInput) -> Result<TaskRecord, ApiClientError> {
        let (file_name, content) = input.load()?;
        if !has_numbers(&content) {
            return Err(ApiClientError::EmptyInput);
        }

        let url = self.tasks_url()?;
        log::debug!("Uploading {file_name} ({} bytes) to {url}", content.len());

        let response = self.transport.send(HttpRequest {
            method: Method::POST,
            url: url.clone(),
            api_key: Some(self.api_key.clone()),
            body: RequestBody::Multipart(FilePart {
                field: "file",
                file_name,
                mime: "text/plain",
                content,
            }),
            timeout: self.request_timeout,
        })?;

        let task: TaskRecord = read_json(url.clone(), response)?;
        validated(url, task)
    }

    /// Fetches the current snapshot of a task.
    ///
    /// # Errors
    ///
    /// Will return `Err` on network failure, on a non-success response, or
    /// when the response isn't a valid task.
    pub fn check_status(&self, task_id: &str, user_id: &str) -> Result<TaskRecord, ApiClientError> {
        let url = self.task_status_url(task_id, user_id)?;
        let response = self.transport.send(HttpRequest {
            method: Method::GET,
            url: url.clone(),
            api_key: Some(self.api_key.clone()),
            body: RequestBody::Empty,
            timeout: self.request_timeout,
        })?;

        let task: TaskRecord = read_json(url.clone(), response)?;
        log::debug!(
            "Task {}: status={}, success={}, failure={}, total={}",
            task.task_id,
            task.status,
            task.success,
            task.failure,
            task.total
        );
        validated(url, task)
    }

    /// See [`polling::poll_until_terminal`].
    ///
    /// # Errors
    ///
    /// See [`polling::poll_until_terminal`].
    pub fn poll_until_terminal<F>(
        &self,
        task_id: &str,
        user_id: &str,
        options: &PollOptions,
        on_progress: F,
    ) -> Result<TaskRecord, ApiClientError>
    where
        F: FnMut(&TaskRecord),
    {
        polling::poll_until_terminal(self, task_id, user_id, options, on_progress)
    }

    /// Streams the result artifact into `sink` and returns the number of
    /// bytes written. On error the sink may hold a partial download.
    ///
    /// # Errors
    ///
    /// Will return `Err` on network failure, on a non-success response, or
    /// when writing to `sink` fails.
    pub fn fetch_result_to<W: Write>(
        &self,
        result_url: &str,
        sink: &mut W,
    ) -> Result<u64, ApiClientError> {
        let url = Url::parse(result_url)?;
        // Result files usually live on a storage host, don't leak the key there
        let api_key = (url.origin() == self.base.origin()).then(|| self.api_key.clone());

        let response = self.transport.send(HttpRequest {
            method: Method::GET,
            url: url.clone(),
            api_key,
            body: RequestBody::Empty,
            timeout: self.download_timeout,
        })?;
        let response = ensure_success(url, response)?;

        copy_body(response.body, sink)
    }

    /// Downloads the result artifact to `destination`. The file only appears
    /// once the whole body has been received; on any failure nothing is left
    /// behind and a pre-existing file at `destination` is untouched.
    ///
    /// # Errors
    ///
    /// Same as [`TaskClient::fetch_result_to`], plus failures creating or
    /// renaming the file.
    pub fn fetch_result(
        &self,
        result_url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<PathBuf, ApiClientError> {
        let destination = destination.as_ref();
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Dropping the temp file on the error path removes it
        let mut partial = NamedTempFile::new_in(&dir)?;
        let written = self.fetch_result_to(result_url, partial.as_file_mut())?;
        partial.as_file_mut().flush()?;
        partial
            .persist(destination)
            .map_err(|err| ApiClientError::Io(err.error))?;

        log::debug!("Saved {written} bytes to {}", destination.display());
        Ok(destination.to_path_buf())
    }
}

fn ensure_success(url: Url, response: HttpResponse) -> Result<HttpResponse, ApiClientError> {
    if response.status.is_success() {
        return Ok(response);
    }

    let status = response.status;
    // The body is only diagnostic here, don't mask the status if it's unreadable
    let body = response.text().unwrap_or_default();
    Err(ApiClientError::from(RequestFailure::new(url, status, body)))
}

fn read_json<T: DeserializeOwned>(url: Url, response: HttpResponse) -> Result<T, ApiClientError> {
    let response = ensure_success(url.clone(), response)?;
    let text = response.text()?;
    log::debug!("Raw API Response: {text}");

    serde_json::from_str(&text).map_err(|e| {
        log::debug!("Failed to parse JSON response: {e}");
        ApiClientError::Decode {
            url,
            reason: e.to_string(),
            body: text,
        }
    })
}

fn validated(url: Url, task: TaskRecord) -> Result<TaskRecord, ApiClientError> {
    match task.validate() {
        Ok(()) => Ok(task),
        Err(reason) => Err(ApiClientError::Decode {
            url,
            reason,
            body: serde_json::to_string(&task).unwrap_or_default(),
        }),
    }
}

fn copy_body<W: Write>(mut body: Box<dyn Read + Send>, sink: &mut W) -> Result<u64, ApiClientError> {
    let mut buffer = [0_u8; DOWNLOAD_CHUNK];
    let mut written = 0_u64;

    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::from(err).into()),
        };
        sink.write_all(&buffer[..read])?;
        written += read as u64;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Unreachable;

    impl Transport for Unreachable {
        fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::new("no network in unit tests"))
        }
    }

    fn client(base: &str) -> TaskClient {
        let config = ClientConfig::new("secret").with_base_url(Url::parse(base).unwrap());
        TaskClient::with_transport(config, Arc::new(Unreachable)).unwrap()
    }

    #[test]
    fn tasks_url_from_bare_host() {
        let client = client("https://api.checknumber.ai");
        assert_eq!(
            client.tasks_url().unwrap().as_str(),
            "https://api.checknumber.ai/x/api/simple/tasks"
        );
    }

    #[test]
    fn tasks_url_keeps_base_path() {
        let client = client("http://127.0.0.1:9000/mock/");
        assert_eq!(
            client.tasks_url().unwrap().as_str(),
            "http://127.0.0.1:9000/mock/x/api/simple/tasks"
        );
    }

    #[test]
    fn status_url_encodes_ids() {
        let client = client("https://api.checknumber.ai");
        assert_eq!(
            client.task_status_url("abc/1", "me & you").unwrap().as_str(),
            "https://api.checknumber.ai/x/api/simple/tasks/abc%2F1?user_id=me+%26+you"
        );
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let config = ClientConfig::new("  ");
        let err = TaskClient::with_transport(config, Arc::new(Unreachable)).unwrap_err();
        assert!(matches!(err, ApiClientError::MissingApiKey));
    }

    #[test]
    fn non_base_url_is_rejected() {
        let config = ClientConfig::new("key").with_base_url(Url::parse("mailto:a@b.c").unwrap());
        let err = TaskClient::with_transport(config, Arc::new(Unreachable)).unwrap_err();
        assert!(matches!(err, ApiClientError::CannotBeBase(_)));
    }

    #[test]
    fn copy_body_counts_bytes() {
        let body: Box<dyn Read + Send> = Box::new(io::Cursor::new(vec![7_u8; DOWNLOAD_CHUNK * 2 + 5]));
        let mut sink = Vec::new();

        assert_eq!(copy_body(body, &mut sink).unwrap(), (DOWNLOAD_CHUNK * 2 + 5) as u64);
        assert_eq!(sink.len(), DOWNLOAD_CHUNK * 2 + 5);
    }

    #[test]
    fn transport_error_surfaces() {
        let err = client("https://api.checknumber.ai")
            .check_status("t", "u")
            .unwrap_err();
        assert!(matches!(err, ApiClientError::Transport(_)));
        assert!(err.is_transient());
    }
}
