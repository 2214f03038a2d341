#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::{self, Cursor, Read},
    sync::{Arc, Mutex},
    time::Duration,
};

use reqwest::{Method, StatusCode};
use url::Url;
use x_checker::{
    api::{FilePart, HttpRequest, HttpResponse, RequestBody, TaskClient, Transport},
    config::ClientConfig,
    errors::TransportError,
};

pub const BASE: &str = "https://api.checknumber.ai";
pub const API_KEY: &str = "test-api-key";

enum Reply {
    Body(StatusCode, Vec<u8>),
    /// Sends the bytes, then the connection drops.
    Broken(StatusCode, Vec<u8>),
    Unreachable(String),
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub url: Url,
    pub api_key: Option<String>,
    pub upload: Option<FilePart>,
    pub timeout: Duration,
}

/// Plays back canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.push(Reply::Body(status_code(status), body.into()))
    }

    pub fn reply_broken(&self, status: u16, prefix: impl Into<Vec<u8>>) -> &Self {
        self.push(Reply::Broken(status_code(status), prefix.into()))
    }

    pub fn unreachable(&self, message: &str) -> &Self {
        self.push(Reply::Unreachable(message.to_owned()))
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let upload = match request.body {
            RequestBody::Multipart(part) => Some(part),
            RequestBody::Empty => None,
        };
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            url: request.url,
            api_key: request.api_key,
            upload,
            timeout: request.timeout,
        });

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Body(status, body)) => Ok(HttpResponse::new(status, Cursor::new(body))),
            Some(Reply::Broken(status, prefix)) => Ok(HttpResponse::new(
                status,
                BrokenBody {
                    data: Cursor::new(prefix),
                },
            )),
            Some(Reply::Unreachable(message)) => Err(TransportError::new(message)),
            None => Err(TransportError::new("no scripted reply left")),
        }
    }
}

struct BrokenBody {
    data: Cursor<Vec<u8>>,
}

impl Read for BrokenBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
            read => Ok(read),
        }
    }
}

/// Answers every status request with a processing snapshot of the task id
/// found in the URL.
pub struct EchoTransport;

impl Transport for EchoTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let task_id = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_owned();
        let body = serde_json::json!({
            "task_id": task_id,
            "user_id": "echo",
            "status": "processing",
            "total": 10,
            "success": 4,
            "failure": 1
        });
        Ok(HttpResponse::new(
            StatusCode::OK,
            Cursor::new(body.to_string().into_bytes()),
        ))
    }
}

pub fn client(transport: Arc<dyn Transport>) -> TaskClient {
    let config = ClientConfig::new(API_KEY).with_base_url(Url::parse(BASE).unwrap());
    TaskClient::with_transport(config, transport).unwrap()
}

pub fn task_json(task_id: &str, status: &str, total: u64, success: u64) -> String {
    let mut body = serde_json::json!({
        "created_at": "2025-01-10T08:00:00Z",
        "updated_at": "2025-01-10T08:00:05Z",
        "task_id": task_id,
        "user_id": "test",
        "status": status,
        "total": total,
        "success": success,
        "failure": 0
    });
    if status == "exported" {
        body["result_url"] = serde_json::Value::from("https://files.example.com/r.xlsx");
    }
    body.to_string()
}
