use std::{fmt, io::Read, time::Duration};

use reqwest::{
    blocking::{multipart, Client},
    Method, StatusCode,
};
use url::Url;

use crate::errors::TransportError;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Multipart file field of an upload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FilePart {
    pub field: &'static str,
    pub file_name: String,
    pub mime: &'static str,
    pub content: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RequestBody {
    Empty,
    Multipart(FilePart),
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub api_key: Option<String>,
    pub body: RequestBody,
    pub timeout: Duration,
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Read + Send + 'static) -> Self {
        Self {
            status,
            body: Box::new(body),
        }
    }

    /// # Errors
    ///
    /// Fails when the body can't be read or isn't valid UTF-8.
    pub fn text(mut self) -> Result<String, TransportError> {
        let mut text = String::new();
        self.body.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// The HTTP seam of [`crate::api::TaskClient`]. Implementations return the
/// response for any status code; only a failure to get a response at all is
/// an error.
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Fails when no response could be obtained.
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] over a pooled `reqwest` blocking client.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Fails if the TLS backend can't be initialised.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("x-checker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            api_key,
            body,
            timeout,
        } = request;

        let mut builder = self.client.request(method, url).timeout(timeout);
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        if let RequestBody::Multipart(part) = body {
            let file = multipart::Part::bytes(part.content)
                .file_name(part.file_name)
                .mime_str(part.mime)?;
            builder = builder.multipart(multipart::Form::new().part(part.field, file));
        }

        let response = builder.send()?;
        Ok(HttpResponse::new(response.status(), response))
    }
}
